use crate::controller::view::LiveView;
use axum::extract::ws::Message as Frame;
use domain::{Context, Dom, Event};
use futures_util::{Stream, StreamExt};
use log::*;
use std::fmt::Display;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SessionOptions {
    pub debug_log: bool,
    pub disable_template_cache: bool,
}

/// The per-socket event loop. Events are handled one at a time, in the order
/// they arrive; the next frame is not read until the current handler returns.
pub(crate) struct SocketSession {
    view: Arc<LiveView>,
    dom: Dom,
    cancellation: CancellationToken,
    options: SessionOptions,
}

impl SocketSession {
    pub(crate) fn new(view: Arc<LiveView>, dom: Dom, options: SessionOptions) -> Self {
        Self {
            view,
            dom,
            cancellation: CancellationToken::new(),
            options,
        }
    }

    #[cfg(test)]
    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel in-flight handlers when the read loop is abandoned early.
    pub(crate) fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Read until the client closes or the stream fails, then cancel the
    /// token handed to every handler.
    pub(crate) async fn run<S, E>(&self, mut stream: S)
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
    {
        while let Some(received) = stream.next().await {
            let frame = match received {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Socket read failed on topic {:?}: {e}", self.dom.topic());
                    break;
                }
            };
            match frame {
                Frame::Text(text) => self.handle_message(text.as_str().as_bytes()).await,
                Frame::Binary(bytes) => self.handle_message(&bytes).await,
                Frame::Close(_) => break,
                Frame::Ping(_) | Frame::Pong(_) => {}
            }
        }
        self.cancellation.cancel();
    }

    async fn handle_message(&self, bytes: &[u8]) {
        let event = match Event::from_slice(bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping inbound message: {e}");
                return;
            }
        };
        if self.options.debug_log {
            debug!("Received event =>\n{event}");
        }

        if self.options.disable_template_cache {
            self.view.reload_templates();
        }

        let mut ctx = Context::new(event, self.dom.clone(), self.cancellation.clone());
        ctx.clear_error();

        let Some(handler) = self.view.handler_for(&ctx.event().id) else {
            warn!("No handler registered for event {}", ctx.event().id);
            return;
        };

        if let Err(e) = handler.handle(&mut ctx).await {
            warn!("Handler for event {} failed, event =>\n{}", ctx.event().id, ctx.event());
            ctx.show_error(&e);
        }
    }
}
