//! Topic fan-out for live view sockets.
//!
//! This crate groups live socket connections into named topics and pushes
//! DOM-patch operations to every connection subscribed to a topic.
//!
//! # Architecture
//!
//! - **Single subscription per connection**: each socket is registered under
//!   exactly one topic, normally derived from the page path.
//! - **Sharded registry**: topics live in a `DashMap`; add, remove and
//!   broadcast on one topic hold that topic's shard lock for the whole
//!   operation, so they are atomic per topic while different topics rarely
//!   contend.
//! - **Prepared messages**: an operation is serialized once per send and the
//!   same frame is handed to every connection in the topic.
//! - **Eviction on write failure**: a connection whose writer has gone away,
//!   or whose bounded queue is full, is closed and dropped from its topic
//!   during the broadcast that noticed it, without interrupting delivery to
//!   its siblings.
//! - **Fire and forget**: no persistence, no retries. A broadcast to a topic
//!   with no subscribers is logged and ignored.
//!
//! # Modules
//!
//! - `connection`: `TopicRegistry`, `Connection` and `ConnectionId`
//! - `manager`: serializes operations and routes them by scope
//! - `message`: the outbound operation vocabulary and message scopes

pub mod connection;
pub mod manager;
pub mod message;

pub use axum::extract::ws::Message as Frame;
pub use connection::{Connection, ConnectionId, TopicRegistry, CONNECTION_BUFFER};
pub use manager::Manager;
pub use message::{Message, MessageScope, Op, Operation};
