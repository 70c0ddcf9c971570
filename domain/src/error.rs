//! Error types for the `domain` layer.
use events::error::{Error as EventError, EventErrorKind};
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Message shown to a user when a handler error carries no user-facing cause.
pub const DEFAULT_USER_ERROR_MESSAGE: &str = "internal error";

/// Top-level domain error type.
/// Errors are modeled as `error_kind` enums describing what went wrong, plus the
/// original error in `source`. Handlers return this type; the session loop turns
/// it into an inline error banner, showing the `source` text only for errors
/// explicitly marked as user-facing with [`Error::user`].
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    /// The source error's message is meant to be displayed to the user.
    User,
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Store(StoreErrorKind),
    Render,
    Event(EventErrorKind),
    Config,
    /// Listener, socket or session store failures.
    Transport,
    /// The template file watcher could not be started.
    Watch,
    Other(String),
}

#[derive(Debug, PartialEq)]
pub enum StoreErrorKind {
    KeyNotFound,
    Encode,
    Decode,
}

impl Error {
    pub fn new(error_kind: DomainErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }

    pub fn with_source(
        error_kind: DomainErrorKind,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            error_kind,
        }
    }

    /// Wraps an error whose message is safe to show in the browser.
    ///
    /// ```
    /// let err = domain::Error::user("name is required");
    /// assert_eq!(err.user_message(), "name is required");
    /// ```
    pub fn user(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::with_source(DomainErrorKind::User, cause)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DomainErrorKind::Internal(InternalErrorKind::Other(
            message.into(),
        )))
    }

    pub(crate) fn store(kind: StoreErrorKind, source: Option<serde_json::Error>) -> Self {
        Self {
            source: source.map(|e| Box::new(e) as Box<dyn StdError + Send + Sync>),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Store(kind)),
        }
    }

    pub fn render(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::with_source(DomainErrorKind::Internal(InternalErrorKind::Render), source)
    }

    pub fn config(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::with_source(DomainErrorKind::Internal(InternalErrorKind::Config), source)
    }

    pub fn transport(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::with_source(DomainErrorKind::Internal(InternalErrorKind::Transport), source)
    }

    pub fn watch(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::with_source(DomainErrorKind::Internal(InternalErrorKind::Watch), source)
    }

    /// The message to display for this error: the user-facing cause if there
    /// is one, otherwise [`DEFAULT_USER_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match (&self.error_kind, &self.source) {
            (DomainErrorKind::User, Some(cause)) => cause.to_string(),
            _ => DEFAULT_USER_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_key_not_found(&self) -> bool {
        self.error_kind
            == DomainErrorKind::Internal(InternalErrorKind::Store(StoreErrorKind::KeyNotFound))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Domain Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Domain Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Lets handlers use `?` on `Event::decode_params`.
impl From<EventError> for Error {
    fn from(err: EventError) -> Self {
        Error {
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Event(err.error_kind)),
            source: Some(Box::new(err)),
        }
    }
}
