use crate::connection::{Connection, ConnectionId, TopicRegistry};
use crate::message::{Message, MessageScope, Operation};
use axum::extract::ws::{Message as Frame, Utf8Bytes};
use log::*;
use std::sync::Arc;

pub struct Manager {
    registry: Arc<TopicRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(TopicRegistry::new()),
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Subscribe a freshly upgraded socket to `topic` and return its id
    pub fn register_connection(&self, topic: &str, connection: Connection) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.registry
            .add_connection(topic, connection_id.clone(), connection);
        info!(
            "Registered socket connection {} on topic {}",
            connection_id.as_str(),
            topic
        );
        connection_id
    }

    pub fn unregister_connection(&self, topic: &str, connection_id: &ConnectionId) {
        info!(
            "Unregistering socket connection {} from topic {}",
            connection_id.as_str(),
            topic
        );
        self.registry.remove_connection(topic, connection_id);
    }

    /// Serialize the operation once and deliver it according to its scope.
    /// Returns the prepared payload, or `None` when serialization failed.
    pub fn send_message(&self, message: Message) -> Option<Utf8Bytes> {
        let payload: Utf8Bytes = match message.operation.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                error!("Failed to serialize operation {}: {e}", message.operation.op);
                return None;
            }
        };

        let frame = Frame::Text(payload.clone());
        let delivered = match &message.scope {
            MessageScope::Topic { topic } => self.registry.broadcast(topic, &frame),
            MessageScope::All => self.registry.broadcast_all(&frame),
        };
        trace!(
            "Sent {} operation to {} connection(s) ({:?})",
            message.operation.op,
            delivered,
            message.scope
        );

        Some(payload)
    }

    pub fn send_to_topic(&self, topic: &str, operation: Operation) -> Option<Utf8Bytes> {
        self.send_message(Message {
            operation,
            scope: MessageScope::Topic {
                topic: topic.to_string(),
            },
        })
    }

    pub fn send_to_all(&self, operation: Operation) -> Option<Utf8Bytes> {
        self.send_message(Message {
            operation,
            scope: MessageScope::All,
        })
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
