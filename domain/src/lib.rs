//! Per-user state and DOM-patch emission for live views.
//!
//! - `store`: the lock-guarded key/value store each user's page state lives in
//! - `user`: user ids and the registry mapping them to their stores
//! - `dom`: the mutation facade that broadcasts operations and persists state
//! - `context`: what an event handler receives, and the handler trait itself
//! - `template`: the rendering collaborator used for fragments and pages
//! - `html`: a small pretty-printer for rendered fragments

pub mod context;
pub mod dom;
pub mod error;
pub mod html;
pub mod store;
pub mod template;
pub mod user;

pub use context::{Context, EventHandler};
pub use dom::{Dom, DomOptions};
pub use error::{Error, Result};
pub use events::Event;
pub use store::KeyedMutexStore;
pub use template::Renderer;
pub use user::{UserId, UserIdAllocator, UserRegistry};

#[doc(hidden)]
pub use serde_json as __serde_json;

/// Key/value data passed to templates and persisted into a user's store.
pub type Data = serde_json::Map<String, serde_json::Value>;

/// Builds a [`Data`] map with `serde_json::json!` object syntax.
///
/// ```
/// let data = domain::data!({"count": 1, "label": "clicks"});
/// assert_eq!(data["count"], 1);
/// ```
#[macro_export]
macro_rules! data {
    ({ $($json:tt)* }) => {
        match $crate::__serde_json::json!({ $($json)* }) {
            $crate::__serde_json::Value::Object(map) => map,
            _ => $crate::Data::new(),
        }
    };
}
