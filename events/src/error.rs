//! Error types for inbound event decoding.
use std::error::Error as StdError;
use std::fmt;

/// Errors while decoding a socket frame into an `Event` or its params.
#[derive(Debug)]
pub struct Error {
    // Underlying error emitted by serde_json, if any
    pub source: Option<serde_json::Error>,
    // Enum representing which category of error
    pub error_kind: EventErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventErrorKind {
    // The frame is not a JSON event object
    Malformed,
    // The `id` field is absent or empty
    MissingId,
    // `params` does not match the shape the handler asked for
    Params,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Event Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Event Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}
