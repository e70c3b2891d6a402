use thiserror::Error;
use tokio::sync::watch;

use crate::db::{Store, StoreError};
use crate::models::User;
use crate::remote::ExternalIdentity;
use crate::repository::UserRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggingIn,
    LoggedIn(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account for {0} already exists")]
    EmailTaken(String),

    #[error("A valid email address is required")]
    MissingEmail,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Account store unavailable: {0}")]
    Unavailable(#[source] StoreError),
}

/// Sign-in state machine.
///
/// Every entry path (password, registration, external provider) ends in
/// either `LoggedIn(user)` or `LoggedOut`; failures are returned to the
/// caller and never leave the state at `LoggingIn`. Calls borrow the
/// holder, so dropping it cancels any sign-in in flight.
pub struct UserViewModel {
    repository: UserRepository,
    state: watch::Sender<AuthState>,
}

impl UserViewModel {
    pub fn new(store: &Store) -> Self {
        let (state, _) = watch::channel(AuthState::LoggedOut);
        Self {
            repository: UserRepository::new(store),
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.state.send_replace(AuthState::LoggingIn);
        let found = self
            .repository
            .get_by_credential(normalize_email(email), password)
            .await;
        self.settle(match found {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Unavailable(e)),
        })
    }

    /// Creates an account and signs it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }

        self.state.send_replace(AuthState::LoggingIn);
        let created = self.repository.register(email, password).await;
        self.settle(created.map_err(|e| {
            if e.is_constraint() {
                AuthError::EmailTaken(email.to_string())
            } else {
                AuthError::Unavailable(e)
            }
        }))
    }

    /// Signs in with an identity confirmed by an external provider,
    /// creating the local account on first use.
    pub async fn sign_in_external(&self, identity: &ExternalIdentity) -> Result<User, AuthError> {
        if !identity.has_email() {
            return Err(AuthError::MissingEmail);
        }

        let mut identity = identity.clone();
        identity.email = normalize_email(&identity.email).to_string();

        self.state.send_replace(AuthState::LoggingIn);
        let resolved = self.repository.resolve_or_create_local_user(&identity).await;
        self.settle(resolved.map_err(AuthError::Unavailable))
    }

    pub fn logout(&self) {
        self.state.send_replace(AuthState::LoggedOut);
    }

    /// Deletes the signed-in account with all of its data, then logs out.
    pub async fn delete_account(&self) -> Result<(), AuthError> {
        let user = self.current_user().ok_or(AuthError::NotSignedIn)?;
        self.repository
            .delete(&user)
            .await
            .map_err(AuthError::Unavailable)?;
        tracing::info!("Deleted account {}", user.email);
        self.logout();
        Ok(())
    }

    fn settle(&self, result: Result<User, AuthError>) -> Result<User, AuthError> {
        match &result {
            Ok(user) => {
                self.state.send_replace(AuthState::LoggedIn(user.clone()));
            }
            Err(e) => {
                tracing::warn!("Sign-in failed: {}", e);
                self.state.send_replace(AuthState::LoggedOut);
            }
        }
        result
    }
}

/// Accounts are keyed by the email with surrounding whitespace removed.
fn normalize_email(email: &str) -> &str {
    email.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_store;
    use crate::models::WorkoutPlan;

    #[tokio::test]
    async fn test_register_then_login() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        assert_eq!(*vm.state().borrow(), AuthState::LoggedOut);

        let registered = vm.register("a@x.com", "p").await.unwrap();
        assert_eq!(vm.current_user(), Some(registered.clone()));

        vm.logout();
        assert_eq!(*vm.state().borrow(), AuthState::LoggedOut);

        let user = vm.login("a@x.com", "p").await.unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(*vm.state().borrow(), AuthState::LoggedIn(user));
    }

    #[tokio::test]
    async fn test_wrong_password_returns_to_logged_out() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        vm.register("a@x.com", "p").await.unwrap();
        vm.logout();

        let mut state = vm.state();
        let result = vm.login("a@x.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert_eq!(*state.borrow_and_update(), AuthState::LoggedOut);

        let result = vm.login("nobody@x.com", "p").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        vm.register("a@x.com", "p").await.unwrap();

        let result = vm.register("a@x.com", "q").await;
        assert!(matches!(result, Err(AuthError::EmailTaken(email)) if email == "a@x.com"));
        assert_eq!(vm.current_user(), None);

        assert!(matches!(
            vm.register("  ", "q").await,
            Err(AuthError::MissingEmail)
        ));
    }

    #[tokio::test]
    async fn test_external_sign_in_converges_on_local_user() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        let registered = vm.register("a@x.com", "p").await.unwrap();
        vm.logout();

        let identity = ExternalIdentity::new("google", "sub-1", "a@x.com");
        let user = vm.sign_in_external(&identity).await.unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(*vm.state().borrow(), AuthState::LoggedIn(user));

        vm.logout();
        let newcomer = ExternalIdentity::new("google", "sub-2", "b@x.com");
        let first = vm.sign_in_external(&newcomer).await.unwrap();
        let second = vm.sign_in_external(&newcomer).await.unwrap();
        assert_eq!(first.id, second.id);

        // Provider-created accounts have no usable password
        vm.logout();
        assert!(vm.login("b@x.com", "").await.is_err());
    }

    #[tokio::test]
    async fn test_email_whitespace_is_ignored_on_every_path() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        let registered = vm.register(" a@x.com ", "p").await.unwrap();
        assert_eq!(registered.email, "a@x.com");
        vm.logout();

        let user = vm.login(" a@x.com ", "p").await.unwrap();
        assert_eq!(user.id, registered.id);
        vm.logout();

        let identity = ExternalIdentity::new("google", "sub-1", "  a@x.com");
        let user = vm.sign_in_external(&identity).await.unwrap();
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn test_external_sign_in_requires_email() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        let identity = ExternalIdentity::new("google", "sub-1", "");
        assert!(matches!(
            vm.sign_in_external(&identity).await,
            Err(AuthError::MissingEmail)
        ));
        assert_eq!(*vm.state().borrow(), AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let ctx = open_store().await;
        let vm = UserViewModel::new(&ctx.store);
        let user = vm.register("a@x.com", "p").await.unwrap();
        let user_id = user.id.unwrap();
        ctx.store
            .workout_plans()
            .insert(&WorkoutPlan::new(user_id, "Squats", 3))
            .await
            .unwrap();

        vm.delete_account().await.unwrap();
        assert_eq!(*vm.state().borrow(), AuthState::LoggedOut);
        assert!(ctx.store.users().get_by_id(user_id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_plans")
            .fetch_one(ctx.store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        assert!(matches!(vm.delete_account().await, Err(AuthError::NotSignedIn)));
    }
}
