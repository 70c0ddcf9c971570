use axum::extract::ws::Message as Frame;
use dashmap::DashMap;
use log::*;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Name of a broadcast group, usually derived from the request path.
pub type Topic = String;

/// Unique identifier for a connection (server-generated at upgrade time)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Frames a socket may have queued before it counts as too slow.
pub const CONNECTION_BUFFER: usize = 256;

/// Handle to a live socket.
///
/// Frames are queued onto the socket's writer task through a bounded channel.
/// A send fails once that task has stopped or once the queue is full, which is
/// how a dead or stalled socket shows up to the registry.
#[derive(Debug)]
pub struct Connection {
    sender: Sender<Frame>,
}

impl Connection {
    pub fn new(sender: Sender<Frame>) -> Self {
        Self { sender }
    }

    /// A connection and the receiving end its writer task drains.
    pub fn channel() -> (Self, Receiver<Frame>) {
        Self::with_capacity(CONNECTION_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        self.sender.try_send(frame)
    }

    /// Asks the writer task to send a close frame and stop.
    ///
    /// With a full queue the close frame is dropped; the writer still stops
    /// once the handle is dropped and its backlog is flushed.
    pub fn close(&self) {
        let _ = self.sender.try_send(Frame::Close(None));
    }
}

/// Topic → connection set registry.
///
/// Every operation on a topic holds that topic's shard lock for its whole
/// duration, so add, remove and broadcast never interleave within a topic.
/// Iteration order over a topic's connections is unspecified.
pub struct TopicRegistry {
    topics: DashMap<Topic, HashMap<ConnectionId, Connection>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Subscribe a connection to a topic, creating the topic on first use.
    /// Re-using a connection id replaces the previous handle.
    pub fn add_connection(&self, topic: &str, connection_id: ConnectionId, connection: Connection) {
        let mut connections = self.topics.entry(topic.to_string()).or_default();
        if let Some(previous) = connections.insert(connection_id.clone(), connection) {
            debug!(
                "Connection {} re-registered on topic {}",
                connection_id.as_str(),
                topic
            );
            previous.close();
        }
        debug!(
            "addConnection topic={} connection={} subscribers={}",
            topic,
            connection_id.as_str(),
            connections.len()
        );
    }

    /// Unsubscribe and close a connection. The topic entry is dropped once it
    /// has no subscribers left. Returns whether the connection was present.
    pub fn remove_connection(&self, topic: &str, connection_id: &ConnectionId) -> bool {
        let Some(mut connections) = self.topics.get_mut(topic) else {
            return false;
        };

        let removed = connections.remove(connection_id);
        if let Some(connection) = &removed {
            connection.close();
        }
        let remaining = connections.len();
        drop(connections); // Release the shard lock before removal

        if remaining == 0 {
            self.topics.remove_if(topic, |_, connections| connections.is_empty());
        }

        debug!(
            "removeConnection topic={} connection={} subscribers={}",
            topic,
            connection_id.as_str(),
            remaining
        );
        removed.is_some()
    }

    /// Write one prepared frame to every connection in a topic.
    ///
    /// A connection whose write fails is closed and evicted; the remaining
    /// connections still receive the frame. Returns how many connections
    /// accepted it.
    pub fn broadcast(&self, topic: &str, frame: &Frame) -> usize {
        let Some(mut connections) = self.topics.get_mut(topic) else {
            warn!("Topic {topic} has no subscribers, dropping message");
            return 0;
        };

        let delivered = Self::deliver(topic, &mut connections, frame);
        let empty = connections.is_empty();
        drop(connections);

        if empty {
            self.topics.remove_if(topic, |_, connections| connections.is_empty());
        }
        delivered
    }

    /// Write one prepared frame to every connection of every topic.
    pub fn broadcast_all(&self, frame: &Frame) -> usize {
        let mut delivered = 0;
        for mut entry in self.topics.iter_mut() {
            let (topic, connections) = entry.pair_mut();
            delivered += Self::deliver(topic, connections, frame);
        }
        self.topics.retain(|_, connections| !connections.is_empty());
        delivered
    }

    fn deliver(
        topic: &str,
        connections: &mut HashMap<ConnectionId, Connection>,
        frame: &Frame,
    ) -> usize {
        let mut delivered = 0;
        connections.retain(|connection_id, connection| {
            match connection.send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Connection {} on topic {} is not keeping up, evicting it",
                        connection_id.as_str(),
                        topic
                    );
                    connection.close();
                    false
                }
                Err(e) => {
                    error!(
                        "Failed writing message for topic {}, closing connection {}: {}",
                        topic,
                        connection_id.as_str(),
                        e
                    );
                    connection.close();
                    false
                }
            }
        });
        delivered
    }

    pub fn contains(&self, topic: &str, connection_id: &ConnectionId) -> bool {
        self.topics
            .get(topic)
            .map(|connections| connections.contains_key(connection_id))
            .unwrap_or(false)
    }

    pub fn connection_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
