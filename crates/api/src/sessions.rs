//! In-memory cookie sessions.
//!
//! Tokens are random v4 UUIDs handed out at login and mapped to a user id
//! until they expire or the user logs out. Expired entries are pruned
//! lazily on lookup.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use goodshelf_types::UserId;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "goodshelf_session";

/// Pull the session token out of a request's `Cookie` header, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

struct Session {
    user_id: UserId,
    expires_at: Instant,
}

/// Session token registry shared across handlers.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session for a user and return the new token.
    pub fn create(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Resolve a token to its user, dropping it if expired.
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        match sessions.get(token) {
            Some(session) if session.expires_at > Instant::now() => Some(session.user_id),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Close a session. Unknown tokens are a no-op.
    pub fn remove(&self, token: &str) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.remove(token);
    }

    /// Close every session belonging to a user, for account deletion.
    pub fn remove_user(&self, user_id: UserId) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.retain(|_, s| s.user_id != user_id);
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; goodshelf_session=abc123; lang=en"),
        );
        assert_eq!(token_from_headers(&headers), Some("abc123".to_string()));

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(token_from_headers(&headers), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn tokens_resolve_until_removed() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(UserId::new(7));
        assert_eq!(store.resolve(&token), Some(UserId::new(7)));
        store.remove(&token);
        assert_eq!(store.resolve(&token), None);
    }

    #[test]
    fn expired_tokens_are_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(UserId::new(7));
        assert_eq!(store.resolve(&token), None);
    }

    #[test]
    fn remove_user_closes_all_their_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.create(UserId::new(1));
        let b = store.create(UserId::new(1));
        let other = store.create(UserId::new(2));
        store.remove_user(UserId::new(1));
        assert_eq!(store.resolve(&a), None);
        assert_eq!(store.resolve(&b), None);
        assert_eq!(store.resolve(&other), Some(UserId::new(2)));
    }
}
