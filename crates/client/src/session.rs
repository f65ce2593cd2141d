//! Session context: the bearer token and the signed-in user.
//!
//! A [`Session`] is created once and handed to whatever needs it (the HTTP
//! client, the services, the command handlers). Persistence goes through a
//! [`SessionStore`], so tests can swap the session file for memory.
//!
//! The persisted form holds exactly two keys, `auth_token` and `user_info`,
//! and they are always written and cleared together.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use officine_core::{Access, AuthResponse, Operation, Payload, User, UserRole};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the JSON user profile.
pub const USER_KEY: &str = "user_info";

/// Errors that can occur when persisting or establishing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed session data: {0}")]
    Format(#[from] serde_json::Error),

    /// The backend answered a login without a usable token or profile.
    #[error("Réponse d'authentification invalide")]
    InvalidResponse,
}

/// The persisted pair.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub auth_token: String,
    pub user_info: Value,
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("auth_token", &"[REDACTED]")
            .field("user_info", &self.user_info)
            .finish()
    }
}

/// Where a session survives between runs.
pub trait SessionStore: Send + Sync {
    /// Load the stored pair. `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read.
    fn load(&self) -> Result<Option<StoredSession>, SessionError>;

    /// Replace the stored pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, session: &StoredSession) -> Result<(), SessionError>;

    /// Remove both keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<(), SessionError>;
}

// =============================================================================
// Stores
// =============================================================================

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let raw: Value = serde_json::from_str(&text)?;
        let token = raw
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        let user = raw.get(USER_KEY).filter(|u| !u.is_null());
        match (token, user) {
            (Some(token), Some(user)) => Ok(Some(StoredSession {
                auth_token: token.to_owned(),
                user_info: user.clone(),
            })),
            _ => Ok(None),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-memory store, for tests and one-shot use.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a session.
    #[must_use]
    pub fn with(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// Shared session context. Cloning is cheap and every clone sees the same
/// state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Box<dyn SessionStore>,
    state: RwLock<SessionState>,
}

#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<User>,
}

impl Session {
    /// Create an empty session backed by `store`. Call [`Session::restore`]
    /// to pick up a stored one.
    #[must_use]
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                state: RwLock::new(SessionState::default()),
            }),
        }
    }

    /// An empty session that is never persisted beyond the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::new())
    }

    /// Load the stored session.
    ///
    /// Both keys must be present. A profile that does not decode clears the
    /// store. Returns whether a session was restored.
    pub async fn restore(&self) -> bool {
        let stored = match self.inner.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "Stored session unreadable, signing out");
                self.clear().await;
                return false;
            }
        };
        match User::from_payload(stored.user_info) {
            Ok(user) => {
                let mut state = self.inner.state.write().await;
                state.token = Some(SecretString::from(stored.auth_token));
                state.user = Some(user);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored profile malformed, signing out");
                self.clear().await;
                false
            }
        }
    }

    /// Adopt the token and profile from a login, register or refresh answer.
    ///
    /// A response without a profile keeps the current user (token refresh).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidResponse`] if the token is missing or
    /// no profile is available, or a store error if it cannot be saved.
    pub async fn establish(&self, response: &AuthResponse) -> Result<User, SessionError> {
        let token = response.token.trim();
        if token.is_empty() {
            return Err(SessionError::InvalidResponse);
        }
        let user = match response.user.as_ref().filter(|u| !u.is_null()) {
            Some(_) => response.user().map_err(|_| SessionError::InvalidResponse)?,
            None => self
                .current_user()
                .await
                .ok_or(SessionError::InvalidResponse)?,
        };

        self.inner.store.save(&StoredSession {
            auth_token: token.to_owned(),
            user_info: serde_json::to_value(&user)?,
        })?;

        let mut state = self.inner.state.write().await;
        state.token = Some(SecretString::from(token.to_owned()));
        state.user = Some(user.clone());
        Ok(user)
    }

    /// Replace the profile, keeping the token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidResponse`] when signed out, or a store
    /// error if it cannot be saved.
    pub async fn update_user(&self, user: User) -> Result<(), SessionError> {
        let mut state = self.inner.state.write().await;
        let Some(token) = state.token.as_ref() else {
            return Err(SessionError::InvalidResponse);
        };
        self.inner.store.save(&StoredSession {
            auth_token: token.expose_secret().to_owned(),
            user_info: serde_json::to_value(&user)?,
        })?;
        state.user = Some(user);
        Ok(())
    }

    /// Forget the token and profile, in memory and in the store.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.write().await;
            state.token = None;
            state.user = None;
        }
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
    }

    /// The bearer token, if signed in.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.state.read().await.token.clone()
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.inner.state.read().await.user.clone()
    }

    /// Whether a token and a profile are both held.
    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.state.read().await;
        state.token.is_some() && state.user.is_some()
    }

    /// Whether the held token has expired at `now`.
    pub async fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        let state = self.inner.state.read().await;
        token_expired(state.token.as_ref().map(|t| t.expose_secret()), now)
    }

    pub async fn has_role(&self, role: UserRole) -> bool {
        self.inner
            .state
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(|u| u.has_role(role))
    }

    pub async fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.inner
            .state
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(|u| u.has_any_role(roles))
    }

    pub async fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin).await
    }

    pub async fn is_pharmacien(&self) -> bool {
        self.has_role(UserRole::Pharmacien).await
    }

    pub async fn is_comptable(&self) -> bool {
        self.has_role(UserRole::Comptable).await
    }

    /// Supplier and credit note management.
    pub async fn can_access_admin_features(&self) -> bool {
        self.has_any_role(UserRole::ADMIN_FEATURES).await
    }

    /// Invoices, credit notes and reports.
    pub async fn can_access_financial_features(&self) -> bool {
        self.has_any_role(UserRole::FINANCIAL_FEATURES).await
    }

    /// Check `operation` against the signed-in user.
    pub async fn check(&self, operation: Operation) -> Access {
        let state = self.inner.state.read().await;
        if state.token.is_none() {
            return Access::LoginRequired;
        }
        operation.check(state.user.as_ref())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Whether `token` has expired at `now`.
///
/// No token counts as expired. A token with a second dot-separated segment
/// is read as a JWT and expires when its `exp` claim is in the past; an
/// opaque token, an undecodable payload or a payload without `exp` never
/// expires.
#[must_use]
pub fn token_expired(token: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(token) = token else {
        return true;
    };
    let Some(payload) = token.split('.').nth(1) else {
        return false;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        return false;
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&bytes) else {
        return false;
    };
    claims
        .get("exp")
        .and_then(Value::as_i64)
        .is_some_and(|exp| exp < now.timestamp())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    fn jwt(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(json!({"exp": exp, "sub": "1"}).to_string());
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
    }

    fn login_response(role: &str) -> AuthResponse {
        serde_json::from_value(json!({
            "token": "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b",
            "user": {"id": 3, "username": "amel", "role": role}
        }))
        .unwrap()
    }

    #[test]
    fn test_token_expiry() {
        assert!(token_expired(None, now()));
        assert!(!token_expired(Some("9944b09199c62bcf"), now()));
        assert!(token_expired(Some(&jwt(now().timestamp() - 1)), now()));
        assert!(!token_expired(Some(&jwt(now().timestamp() + 3600)), now()));
        assert!(!token_expired(Some("a.%%%.c"), now()));
        let no_exp = format!("a.{}.c", URL_SAFE_NO_PAD.encode(b"{\"sub\":1}"));
        assert!(!token_expired(Some(&no_exp), now()));
    }

    #[tokio::test]
    async fn test_establish_and_roles() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated().await);
        assert_eq!(session.check(Operation::ViewDashboard).await, Access::LoginRequired);

        let user = session.establish(&login_response("COMPTABLE")).await.unwrap();
        assert_eq!(user.username, "amel");
        assert!(session.is_authenticated().await);
        assert!(session.is_comptable().await);
        assert!(!session.can_access_admin_features().await);
        assert!(session.can_access_financial_features().await);
        assert_eq!(session.check(Operation::CreateSupplier).await, Access::Denied);
        assert_eq!(session.check(Operation::CreateInvoice).await, Access::Allowed);
    }

    #[tokio::test]
    async fn test_establish_rejects_missing_token() {
        let session = Session::in_memory();
        let response: AuthResponse =
            serde_json::from_value(json!({"user": {"id": 1, "username": "x"}})).unwrap();
        assert!(matches!(
            session.establish(&response).await,
            Err(SessionError::InvalidResponse)
        ));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_keeps_user() {
        let session = Session::in_memory();
        session.establish(&login_response("ADMIN")).await.unwrap();
        let refreshed: AuthResponse = serde_json::from_value(json!({"token": "new-token"})).unwrap();
        session.establish(&refreshed).await.unwrap();
        assert_eq!(session.token().await.unwrap().expose_secret(), "new-token");
        assert!(session.is_admin().await);
    }

    #[tokio::test]
    async fn test_restore_requires_both_keys_and_valid_profile() {
        let store = MemorySessionStore::with(StoredSession {
            auth_token: "abc".to_owned(),
            user_info: json!({"id": 7, "username": "karim", "role": "PHARMACIEN"}),
        });
        let session = Session::new(store);
        assert!(session.restore().await);
        assert!(session.is_pharmacien().await);

        let corrupt = Session::new(MemorySessionStore::with(StoredSession {
            auth_token: "abc".to_owned(),
            user_info: json!("not a profile"),
        }));
        assert!(!corrupt.restore().await);
        assert!(!corrupt.is_authenticated().await);
        assert!(corrupt.inner.store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let session = Session::in_memory();
        session.establish(&login_response("ADMIN")).await.unwrap();
        session.clear().await;
        assert!(session.token().await.is_none());
        assert!(session.inner.store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("officine-session-{}", std::process::id()));
        let store = FileSessionStore::new(dir.join("session.json"));
        assert!(store.load().unwrap().is_none());

        store
            .save(&StoredSession {
                auth_token: "tok".to_owned(),
                user_info: json!({"id": 1}),
            })
            .unwrap();
        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[TOKEN_KEY], "tok");
        assert_eq!(raw[USER_KEY]["id"], 1);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_ignores_half_sessions() {
        let dir = std::env::temp_dir().join(format!("officine-half-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");
        std::fs::write(&path, r#"{"auth_token": "tok"}"#).unwrap();
        assert!(FileSessionStore::new(&path).load().unwrap().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stored_session_debug_redacts() {
        let stored = StoredSession {
            auth_token: "s3cret".to_owned(),
            user_info: Value::Null,
        };
        assert!(!format!("{stored:?}").contains("s3cret"));
    }
}
