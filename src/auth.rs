use crate::error::AuthError;
use crate::history::now_millis;
use crate::model::{AuthState, User};
use crate::store::{KvStore, load_json, save_json};
use crate::validate::{validate_email, validate_password};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const AUTH_STORAGE_KEY: &str = "trinetra_auth";

pub const DEMO_EMAIL: &str = "demo@trinetra.com";
pub const DEMO_PASSWORD: &str = "password";

fn demo_user() -> User {
    User {
        id: "1".into(),
        email: DEMO_EMAIL.into(),
        name: "Demo User".into(),
        avatar: Some(
            "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=32&h=32&fit=crop&crop=face"
                .into(),
        ),
    }
}

/// Mock sign-in against a single demo account. The session is persisted under
/// [`AUTH_STORAGE_KEY`] and cached in memory.
pub struct AuthService<S> {
    store: Arc<S>,
    delay: Duration,
    state: RwLock<AuthState>,
}

impl<S: KvStore> AuthService<S> {
    /// Restores any persisted session.
    pub fn new(store: Arc<S>, delay: Duration) -> Self {
        let state = stored_auth(store.as_ref());
        Self {
            store,
            delay,
            state: RwLock::new(state),
        }
    }

    pub fn current(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    /// Re-reads the persisted session, picking up changes made by another
    /// process sharing the store.
    pub fn restore(&self) -> AuthState {
        let state = stored_auth(self.store.as_ref());
        *self.state.write() = state.clone();
        state
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if email != DEMO_EMAIL || password != DEMO_PASSWORD {
            warn!(email, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let state = AuthState {
            is_authenticated: true,
            user: Some(demo_user()),
            token: Some(format!("mock_jwt_token_{}", now_millis())),
        };
        save_json(self.store.as_ref(), AUTH_STORAGE_KEY, &state)?;
        *self.state.write() = state.clone();
        info!(email, "signed in");
        Ok(state)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store.remove(AUTH_STORAGE_KEY)?;
        *self.state.write() = AuthState::signed_out();
        info!("signed out");
        Ok(())
    }
}

fn stored_auth(store: &dyn KvStore) -> AuthState {
    load_json(store, AUTH_STORAGE_KEY).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::store::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> AuthService<MemoryStore> {
        AuthService::new(store, Duration::ZERO)
    }

    #[tokio::test]
    async fn demo_credentials_sign_in_and_persist() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        assert!(!auth.is_authenticated());

        let state = auth.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        assert!(state.is_authenticated);
        assert_eq!(state.user.as_ref().map(|u| u.name.as_str()), Some("Demo User"));
        assert!(state.token.as_deref().unwrap().starts_with("mock_jwt_token_"));

        let restored = service(store.clone());
        assert_eq!(restored.current(), state);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        let err = auth.sign_in(DEMO_EMAIL, "hunter22").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(store.get(AUTH_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_fields_fail_before_checking_credentials() {
        let auth = service(Arc::new(MemoryStore::new()));
        let err = auth.sign_in("not-an-email", DEMO_PASSWORD).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::InvalidEmail)
        ));
        let err = auth.sign_in(DEMO_EMAIL, "pw").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::PasswordTooShort)
        ));
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_session() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        auth.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        auth.sign_out().unwrap();
        assert_eq!(auth.current(), AuthState::signed_out());
        assert_eq!(store.get(AUTH_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_session_restores_as_signed_out() {
        let store = Arc::new(MemoryStore::new());
        store.set(AUTH_STORAGE_KEY, "{\"isAuthenticated\": tru").unwrap();
        let auth = service(store);
        assert_eq!(auth.current(), AuthState::signed_out());
    }

    #[tokio::test]
    async fn restore_picks_up_external_changes() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        let other = service(store.clone());
        other.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.restore().is_authenticated);
        assert!(auth.is_authenticated());
    }
}
