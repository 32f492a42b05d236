//! The login session.
//!
//! The session lives in an `Observable` for the current process and is
//! mirrored to durable storage (`token` and JSON-encoded `user`) so the next
//! run starts logged in.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::Observable;
use super::storage::{SESSION_EXPIRED_KEY, Storage, TOKEN_KEY, USER_KEY};
use crate::error::StorageError;
use crate::models::User;

/// Authenticated iff both a user and a token are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    state: Observable<Session>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Restore the session persisted in `storage`. Missing or undecodable
    /// entries give an anonymous session.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let session = match (storage.get(TOKEN_KEY), storage.get(USER_KEY)) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Session::authenticated(user, token),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored user");
                    Session::anonymous()
                }
            },
            _ => Session::anonymous(),
        };

        debug!(authenticated = session.is_authenticated(), "Session loaded");

        Self {
            state: Observable::new(session),
            storage,
        }
    }

    pub fn session(&self) -> Session {
        self.state.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.with(Session::is_authenticated)
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Persist and publish a new session. Nothing is published, and no
    /// half-written session is left in storage, when a write fails.
    pub fn login(&self, user: User, token: String) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&user)?;
        self.storage.set(USER_KEY, &user_json)?;
        if let Err(e) = self.storage.set(TOKEN_KEY, &token) {
            if let Err(cleanup) = self.storage.remove(USER_KEY) {
                warn!(error = %cleanup, "Failed to discard stored user");
            }
            return Err(e);
        }
        self.state.set(Session::authenticated(user, token));
        Ok(())
    }

    /// Drop the session. The in-memory session is cleared even when the
    /// storage write fails; the storage error is still reported.
    pub fn logout(&self) -> Result<(), StorageError> {
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        self.state.set(Session::anonymous());
        token.and(user)
    }

    /// Replace the logged-in user's profile. No-op without a session.
    pub fn update_user(&self, user: User) -> Result<(), StorageError> {
        if !self.is_authenticated() {
            debug!("Ignoring profile update without a session");
            return Ok(());
        }

        let user_json = serde_json::to_string(&user)?;
        self.storage.set(USER_KEY, &user_json)?;
        self.state.update(|session| session.user = Some(user));
        Ok(())
    }

    /// Leave a notice for the next login prompt.
    pub fn mark_session_expired(&self) -> Result<(), StorageError> {
        self.storage.set(SESSION_EXPIRED_KEY, "true")
    }

    /// Whether the previous session expired. Reading clears the notice.
    pub fn take_session_expired(&self) -> bool {
        let expired = self.storage.get(SESSION_EXPIRED_KEY).as_deref() == Some("true");
        if expired {
            if let Err(e) = self.storage.remove(SESSION_EXPIRED_KEY) {
                warn!(error = %e, "Failed to clear session expired notice");
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    /// Memory storage that refuses to write the token.
    #[derive(Default)]
    struct TokenlessStorage {
        inner: MemoryStorage,
    }

    impl Storage for TokenlessStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == TOKEN_KEY {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn admin() -> User {
        User {
            id: 1,
            username: "admin".to_string(),
            nickname: "Administrator".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn starts_anonymous_with_empty_storage() {
        let store = SessionStore::load(Arc::new(MemoryStorage::new()));
        assert!(!store.is_authenticated());
        assert_eq!(store.session(), Session::anonymous());
    }

    #[test]
    fn login_persists_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(storage.clone());

        store.login(admin(), "tok".to_string()).unwrap();
        assert!(store.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok"));

        let reloaded = SessionStore::load(storage);
        let session = reloaded.session();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().username, "admin");
        assert_eq!(session.token(), Some("tok"));
    }

    #[test]
    fn token_without_user_is_anonymous() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok").unwrap();

        let store = SessionStore::load(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn corrupt_user_is_anonymous() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(USER_KEY, "{not json").unwrap();

        let store = SessionStore::load(storage);
        assert!(!store.is_authenticated());
        assert!(store.session().user().is_none());
    }

    #[test]
    fn logout_clears_state_and_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(storage.clone());
        store.login(admin(), "tok".to_string()).unwrap();

        store.logout().unwrap();

        assert!(!store.is_authenticated());
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn update_user_requires_session() {
        let store = SessionStore::load(Arc::new(MemoryStorage::new()));
        let mut renamed = admin();
        renamed.nickname = "Root".to_string();

        store.update_user(renamed.clone()).unwrap();
        assert!(store.session().user().is_none());

        store.login(admin(), "tok".to_string()).unwrap();
        store.update_user(renamed).unwrap();
        assert_eq!(store.session().user().unwrap().nickname, "Root");
        assert_eq!(store.session().token(), Some("tok"));
    }

    #[test]
    fn session_expired_notice_is_consumed_once() {
        let store = SessionStore::load(Arc::new(MemoryStorage::new()));
        assert!(!store.take_session_expired());

        store.mark_session_expired().unwrap();
        assert!(store.take_session_expired());
        assert!(!store.take_session_expired());
    }

    #[tokio::test]
    async fn subscribers_observe_logout() {
        let store = SessionStore::load(Arc::new(MemoryStorage::new()));
        store.login(admin(), "tok".to_string()).unwrap();
        let mut rx = store.subscribe();

        store.logout().unwrap();

        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_authenticated());
    }

    #[test]
    fn failed_login_write_leaves_no_partial_session() {
        let storage = Arc::new(TokenlessStorage::default());
        let store = SessionStore::load(storage.clone());

        assert!(store.login(admin(), "tok".to_string()).is_err());

        assert!(!store.is_authenticated());
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());
    }
}
