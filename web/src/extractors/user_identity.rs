use crate::error::Error;
use axum::{extract::FromRequestParts, http::request::Parts};
use domain::{UserId, UserIdAllocator};
use log::*;
use std::sync::Arc;
use tower_sessions::{session, Session};

/// Session key the browser's user id is stored under.
pub(crate) const USER_KEY: &str = "user";

/// The stable per-browser user id, assigned from the shared allocator on the
/// first visit and kept in the controller's session cookie afterwards.
///
/// Needs the session layer and an `Extension<Arc<UserIdAllocator>>` on the router.
pub(crate) struct UserIdentity(pub UserId);

impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| Error::config(msg))?;

        let Some(allocator) = parts.extensions.get::<Arc<UserIdAllocator>>().cloned() else {
            return Err(Error::config("no user id allocator installed on the router"));
        };

        resolve_user(&session, &allocator)
            .await
            .map(UserIdentity)
            .map_err(|e| {
                warn!("Failed resolving user from session: {e}");
                Error::transport(e)
            })
    }
}

/// Returns the session's user id, allocating and storing a new one if the
/// session has none yet.
pub(crate) async fn resolve_user(
    session: &Session,
    allocator: &UserIdAllocator,
) -> Result<UserId, session::Error> {
    if let Some(user_id) = session.get::<UserId>(USER_KEY).await? {
        return Ok(user_id);
    }

    let user_id = allocator.next_id();
    session.insert(USER_KEY, user_id).await?;
    debug!("Assigned user id {user_id} to a new browser session");
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::MemoryStore;

    fn new_session(store: &Arc<MemoryStore>) -> Session {
        Session::new(None, Arc::clone(store), None)
    }

    #[tokio::test]
    async fn first_visit_allocates_and_later_visits_reuse() {
        let store = Arc::new(MemoryStore::default());
        let allocator = UserIdAllocator::new();
        let session = new_session(&store);

        let first = resolve_user(&session, &allocator).await.unwrap();
        let again = resolve_user(&session, &allocator).await.unwrap();

        assert_eq!(first, UserId(1));
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn distinct_browsers_get_distinct_ids() {
        let store = Arc::new(MemoryStore::default());
        let allocator = UserIdAllocator::new();

        let a = resolve_user(&new_session(&store), &allocator).await.unwrap();
        let b = resolve_user(&new_session(&store), &allocator).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(b, UserId(2));
    }
}
