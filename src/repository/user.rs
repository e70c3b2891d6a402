use crate::credentials;
use crate::db::{LiveQuery, Store, StoreError, UserDao};
use crate::models::User;
use crate::remote::ExternalIdentity;

#[derive(Clone)]
pub struct UserRepository {
    dao: UserDao,
}

impl UserRepository {
    pub fn new(store: &Store) -> Self {
        Self { dao: store.users() }
    }

    /// Creates an account, storing a salted hash of `password`.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let user = User::new(email, credentials::hash_password(password));
        let id = self.dao.insert(&user).await?;
        Ok(user.with_id(id))
    }

    pub async fn get_by_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        self.dao.get_by_credential(email, password).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.dao.get_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.dao.get_by_email(email).await
    }

    pub async fn update(&self, user: &User) -> Result<(), StoreError> {
        self.dao.update(user).await
    }

    pub async fn change_password(&self, user: &User, password: &str) -> Result<User, StoreError> {
        let mut updated = user.clone();
        updated.password = credentials::hash_password(password);
        self.dao.update(&updated).await?;
        Ok(updated)
    }

    /// Deletes the account and everything that belongs to it.
    pub async fn delete(&self, user: &User) -> Result<(), StoreError> {
        self.dao.delete(user).await
    }

    pub fn observe_all(&self) -> LiveQuery<Vec<User>> {
        self.dao.observe_all()
    }

    /// Maps an externally authenticated identity onto a local account,
    /// creating one keyed by the identity's email if none exists.
    ///
    /// Accounts created here cannot log in with a password. The lookup and
    /// insert are separate statements; if another writer creates the same
    /// email in between, the insert's constraint failure is answered by a
    /// second lookup.
    pub async fn resolve_or_create_local_user(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<User, StoreError> {
        if let Some(user) = self.dao.get_by_email(&identity.email).await? {
            return Ok(user);
        }

        let user = User::new(&identity.email, credentials::unusable(&identity.provider));
        match self.dao.insert(&user).await {
            Ok(id) => {
                tracing::info!(
                    "Created local account {} for {} sign-in",
                    identity.email,
                    identity.provider
                );
                Ok(user.with_id(id))
            }
            Err(e) if e.is_constraint() => self
                .dao
                .get_by_email(&identity.email)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_store;

    fn google(email: &str) -> ExternalIdentity {
        ExternalIdentity::new("google", "sub-123", email)
    }

    #[tokio::test]
    async fn test_register_hashes_and_verifies() {
        let ctx = open_store().await;
        let repo = UserRepository::new(&ctx.store);

        let user = repo.register("a@x.com", "p").await.unwrap();
        assert!(user.id.is_some());
        assert_ne!(user.password, "p");
        assert!(credentials::is_hashed(&user.password));

        let found = repo.get_by_credential("a@x.com", "p").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert!(repo.get_by_credential("a@x.com", "wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let ctx = open_store().await;
        let repo = UserRepository::new(&ctx.store);

        repo.register("a@x.com", "p").await.unwrap();
        assert!(repo.register("a@x.com", "q").await.unwrap_err().is_constraint());
    }

    #[tokio::test]
    async fn test_change_password() {
        let ctx = open_store().await;
        let repo = UserRepository::new(&ctx.store);

        let user = repo.register("a@x.com", "old").await.unwrap();
        repo.change_password(&user, "new").await.unwrap();

        assert!(repo.get_by_credential("a@x.com", "old").await.unwrap().is_none());
        assert!(repo.get_by_credential("a@x.com", "new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_creates_once() {
        let ctx = open_store().await;
        let repo = UserRepository::new(&ctx.store);

        let first = repo.resolve_or_create_local_user(&google("g@x.com")).await.unwrap();
        let second = repo.resolve_or_create_local_user(&google("g@x.com")).await.unwrap();
        assert_eq!(first, second);

        // External-only accounts have no usable password
        assert!(repo
            .get_by_credential("g@x.com", &first.password)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resolve_links_existing_account() {
        let ctx = open_store().await;
        let repo = UserRepository::new(&ctx.store);

        let local = repo.register("a@x.com", "p").await.unwrap();
        let resolved = repo.resolve_or_create_local_user(&google("a@x.com")).await.unwrap();
        assert_eq!(resolved.id, local.id);
    }
}
