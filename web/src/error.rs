use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{DomainErrorKind, Error as DomainError, InternalErrorKind};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl Error {
    /// Listener, socket or session store failures.
    pub fn transport(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(DomainError::transport(source))
    }

    pub fn watch(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(DomainError::watch(source))
    }

    /// The router or controller was put together wrongly.
    pub fn config(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(DomainError::config(source))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// Bodies stay generic, the details only go to the log.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self.0);
        match self.0.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Transport) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            DomainErrorKind::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
            DomainErrorKind::User => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
            }
        }
    }
}

impl From<DomainError> for Error {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn internal_failures_map_to_500_without_details() {
        let response = Error::config("no user id allocator installed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"INTERNAL SERVER ERROR");
    }

    #[test]
    fn transport_failures_map_to_503() {
        let response = Error::transport("session store unavailable").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn user_errors_map_to_422() {
        let response = Error::from(DomainError::user("name is required")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
