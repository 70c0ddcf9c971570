//! One task per connected socket: a writer fed by the topic registry, and
//! the read loop that turns inbound events into handler calls.

pub(crate) mod handler;
pub(crate) mod session;
