// Session context: the one place the auth token lives
//
// The HTTP client reads the token through `TokenSource`, the gate reads
// cookie presence through `has_auth_cookie`, both backed by the same
// repository record.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staydesk_api::TokenSource;
use staydesk_cache::LocalStore;
use tracing::{info, warn};

use crate::{endpoints::Mutation, models::Credentials, slice::ApiSlice, Error, Result};

/// Store key for the session record
pub const SESSION_KEY: &str = "auth_token";

/// The auth cookie as persisted: token plus its fixed expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Read/write access to the persisted session
pub trait SessionRepository: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Session repository backed by the local store
pub struct StoreSessionRepository {
    store: Arc<LocalStore>,
}

impl StoreSessionRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }
}

impl SessionRepository for StoreSessionRepository {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.store.get_json(SESSION_KEY)?)
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        Ok(self.store.set_json(SESSION_KEY, session)?)
    }

    fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        Ok(())
    }
}

/// In-memory repository, nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    inner: Mutex<Option<StoredSession>>,
}

impl SessionRepository for MemorySessionRepository {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Explicit session context handed to the HTTP client and the gate
pub struct Session {
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl Session {
    pub fn new(repo: Arc<dyn SessionRepository>, cookie_ttl_days: i64) -> Self {
        Self {
            repo,
            ttl: Duration::days(cookie_ttl_days.max(0)),
        }
    }

    /// Session that lives only as long as this value
    pub fn in_memory(cookie_ttl_days: i64) -> Self {
        Self::new(Arc::new(MemorySessionRepository::default()), cookie_ttl_days)
    }

    /// Persist a freshly issued token with the cookie lifetime
    pub fn login(&self, token: &str) -> Result<StoredSession> {
        let issued_at = Utc::now();
        let session = StoredSession {
            token: token.to_string(),
            issued_at,
            expires_at: issued_at + self.ttl,
        };
        self.repo.save(&session)?;
        info!("Signed in, session valid until {}", session.expires_at);
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.repo.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// The live session; expired or unreadable records count as absent
    pub fn current(&self) -> Option<StoredSession> {
        match self.repo.load() {
            Ok(Some(session)) if !session.is_expired_at(Utc::now()) => Some(session),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not read session: {}", e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    /// Presence check used by the route gate
    pub fn has_auth_cookie(&self) -> bool {
        self.current().is_some()
    }

    /// Whole days left on the cookie, `None` when signed out
    pub fn days_remaining(&self) -> Option<i64> {
        self.current()
            .map(|s| (s.expires_at - Utc::now()).num_days().max(0))
    }
}

impl TokenSource for Session {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

/// Pull the token out of a login response
///
/// Accepts `token`, `accessToken` or the same nested under `data`.
pub fn extract_token(response: &Value) -> Option<String> {
    let lookup = |v: &Value| {
        v.get("token")
            .or_else(|| v.get("accessToken"))
            .and_then(Value::as_str)
            .map(String::from)
    };
    lookup(response).or_else(|| response.get("data").and_then(lookup))
}

/// Log in against the backend and persist the issued token
pub async fn sign_in(
    slice: &ApiSlice,
    session: &Session,
    credentials: Credentials,
) -> Result<StoredSession> {
    let response = slice.mutate(Mutation::Login(credentials)).await?;
    let token = extract_token(&response).ok_or(Error::MissingToken)?;
    session.login(&token)
}
