use crate::dom::Dom;
use crate::error::{Error, Result};
use crate::store::KeyedMutexStore;
use async_trait::async_trait;
use events::Event;
use log::*;
use tokio_util::sync::CancellationToken;

/// Everything an event handler gets to work with: the event, the DOM
/// mutations for its socket, the user's store, and a cancellation token
/// scoped to the socket's originating request.
///
/// A new context is built for every event, so temporary keys marked by one
/// handler invocation do not leak into the next.
pub struct Context {
    event: Event,
    dom: Dom,
    cancellation: CancellationToken,
}

impl Context {
    pub fn new(event: Event, dom: Dom, cancellation: CancellationToken) -> Self {
        Self {
            event,
            dom,
            cancellation,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn store(&self) -> &KeyedMutexStore {
        self.dom.store()
    }

    /// Keys that later mutations in this invocation must not persist.
    pub fn temporary<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dom.temporary(keys);
    }

    /// Cancelled when the socket closes. Use it to bound outbound work.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn clear_error(&self) {
        self.dom.clear_error();
    }

    /// Log a handler error and display its user-facing message.
    pub fn show_error(&self, err: &Error) {
        let user_message = err.user_message();
        error!("{user_message}, errors: {err}");
        self.dom.show_error(&user_message);
    }
}

/// Handles one kind of event for a view.
///
/// Plain closures `Fn(&mut Context) -> Result<()>` implement this trait, so
/// only handlers that need to await something have to implement it by hand.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &mut Context) -> Result<()>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&mut Context) -> Result<()> + Send + Sync,
{
    async fn handle(&self, ctx: &mut Context) -> Result<()> {
        self(ctx)
    }
}
