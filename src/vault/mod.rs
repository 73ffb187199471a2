//! Business logic for the vault: user accounts and per-owner secret
//! operations.
//!
//! Caller identity is an explicit parameter on every operation, never
//! ambient state, so authorization cannot be skipped by accident. Every
//! operation on an existing secret re-verifies ownership on every call;
//! nothing is cached between calls.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::storage::{Kind, Secret, SecretValue, Storage, StorageError, User};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("login string is empty")]
    EmptyLogin,

    #[error("password string is empty")]
    EmptyPassword,

    #[error("wrong login or password")]
    AuthFailed,

    /// Missing identity and ownership mismatch collapse into this one
    /// sentinel so callers cannot learn whether the secret exists.
    #[error("user not authorized for this action")]
    NoAuth,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Caller identity as resolved by the transport layer; `None` when the
/// request carried no valid session token.
pub type Identity = Option<Uuid>;

/// The vault service. Cheap to clone, shared across request handlers.
#[derive(Clone)]
pub struct Vault {
    storage: Arc<dyn Storage>,
}

impl Vault {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Register a new user with the given login and raw password.
    pub async fn register(&self, login: &str, raw_password: &str) -> Result<User, VaultError> {
        if login.is_empty() {
            return Err(VaultError::EmptyLogin);
        }
        if raw_password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }

        let user = User::new(Uuid::new_v4(), login.to_string(), raw_password);
        self.storage.create_user(&user).await?;

        Ok(user)
    }

    /// Authenticate a user with login and raw password.
    pub async fn login(&self, login: &str, raw_password: &str) -> Result<User, VaultError> {
        let user = match self.storage.load_user(login).await {
            Ok(user) => user,
            Err(StorageError::NotFound) => return Err(VaultError::AuthFailed),
            Err(e) => return Err(e.into()),
        };

        if !user.is_valid_password(raw_password) {
            tracing::info!(login, "password mismatch on login");
            return Err(VaultError::AuthFailed);
        }

        Ok(user)
    }

    /// Create a new secret for the caller. Assigns a fresh id, stamps the
    /// owner and derives the envelope kind from the value itself.
    pub async fn create_secret(
        &self,
        identity: Identity,
        name: String,
        description: Option<String>,
        is_encrypted: bool,
        value: SecretValue,
    ) -> Result<Secret, VaultError> {
        let user_id = identity.ok_or(VaultError::NoAuth)?;

        let secret = Secret {
            id: Uuid::new_v4(),
            user_id,
            name,
            description,
            tags: vec![],
            kind: value.kind(),
            is_encrypted,
            value,
        };

        self.storage.create_secret(&secret).await?;

        Ok(secret)
    }

    /// Fetch a secret by id, gated on ownership.
    pub async fn secret_by_id(&self, identity: Identity, id: Uuid) -> Result<Secret, VaultError> {
        self.load_secret_and_authorize(identity, id).await
    }

    /// Fetch a secret by name within the caller's namespace.
    pub async fn secret_by_name(&self, identity: Identity, name: &str) -> Result<Secret, VaultError> {
        let user_id = identity.ok_or(VaultError::NoAuth)?;
        Ok(self.storage.load_secret_by_name(user_id, name).await?)
    }

    /// All of the caller's secrets, ordered by name.
    pub async fn secrets(&self, identity: Identity) -> Result<Vec<Secret>, VaultError> {
        let user_id = identity.ok_or(VaultError::NoAuth)?;
        Ok(self.storage.load_secrets(user_id).await?)
    }

    /// Edit an existing credentials secret.
    pub async fn edit_secret_credentials(
        &self,
        identity: Identity,
        id: Uuid,
        login: &str,
        password: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        if secret.kind != Kind::Credentials {
            return Err(StorageError::WrongKind.into());
        }

        Ok(self
            .storage
            .edit_secret_credentials(&secret, login, password)
            .await?)
    }

    /// Edit an existing note secret.
    pub async fn edit_secret_note(
        &self,
        identity: Identity,
        id: Uuid,
        body: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        if secret.kind != Kind::Note {
            return Err(StorageError::WrongKind.into());
        }

        Ok(self.storage.edit_secret_note(&secret, body).await?)
    }

    /// Edit an existing blob secret.
    pub async fn edit_secret_blob(
        &self,
        identity: Identity,
        id: Uuid,
        body: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        if secret.kind != Kind::Blob {
            return Err(StorageError::WrongKind.into());
        }

        Ok(self.storage.edit_secret_blob(&secret, body).await?)
    }

    /// Edit an existing bank card secret.
    pub async fn edit_secret_bank_card(
        &self,
        identity: Identity,
        id: Uuid,
        name: &str,
        number: &str,
        date: &str,
        cvv: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        if secret.kind != Kind::BankCard {
            return Err(StorageError::WrongKind.into());
        }

        Ok(self
            .storage
            .edit_secret_bank_card(&secret, name, number, date, cvv)
            .await?)
    }

    /// Rename a secret within the caller's namespace.
    pub async fn rename_secret(
        &self,
        identity: Identity,
        id: Uuid,
        name: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        Ok(self.storage.rename_secret(secret.id, name).await?)
    }

    /// Replace a secret's description.
    pub async fn change_secret_description(
        &self,
        identity: Identity,
        id: Uuid,
        description: Option<&str>,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        Ok(self
            .storage
            .change_secret_description(secret.id, description)
            .await?)
    }

    /// Delete a secret, its value row and its tags.
    pub async fn delete_secret(&self, identity: Identity, id: Uuid) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        Ok(self.storage.delete_secret(secret.id).await?)
    }

    /// Attach a tag to a secret. Idempotent.
    pub async fn add_tag(
        &self,
        identity: Identity,
        id: Uuid,
        tag: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        Ok(self.storage.add_tag(secret.id, tag).await?)
    }

    /// Remove a tag from a secret. Removing a missing tag succeeds.
    pub async fn delete_tag(
        &self,
        identity: Identity,
        id: Uuid,
        tag: &str,
    ) -> Result<(), VaultError> {
        let secret = self.load_secret_and_authorize(identity, id).await?;
        Ok(self.storage.delete_tag(secret.id, tag).await?)
    }

    async fn load_secret_and_authorize(
        &self,
        identity: Identity,
        secret_id: Uuid,
    ) -> Result<Secret, VaultError> {
        let user_id = identity.ok_or(VaultError::NoAuth)?;

        let secret = self.storage.load_secret_by_id(secret_id).await?;
        if secret.user_id != user_id {
            tracing::info!(%secret_id, "denied access to secret owned by another user");
            return Err(VaultError::NoAuth);
        }

        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    async fn open_vault() -> (TempDir, Vault) {
        let dir = TempDir::new().expect("tempdir");
        let storage = SqliteStorage::new(&dir.path().join("vault.db"))
            .await
            .expect("open store");
        (dir, Vault::new(Arc::new(storage)))
    }

    fn bank_card() -> SecretValue {
        SecretValue::BankCard {
            name: "J DOE".to_string(),
            number: "4111 1111 1111 1111".to_string(),
            date: "12/29".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn register_validates_input_and_rejects_duplicates() {
        let (_dir, vault) = open_vault().await;

        let err = vault.register("", "password").await.unwrap_err();
        assert!(matches!(err, VaultError::EmptyLogin));

        let err = vault.register("frank", "").await.unwrap_err();
        assert!(matches!(err, VaultError::EmptyPassword));

        vault.register("frank", "password").await.expect("register");
        let err = vault.register("frank", "password").await.unwrap_err();
        assert!(matches!(
            err,
            VaultError::Storage(StorageError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn login_checks_password_and_hides_unknown_users() {
        let (_dir, vault) = open_vault().await;
        vault.register("frank", "password").await.expect("register");

        let user = vault.login("frank", "password").await.expect("login");
        assert_eq!(user.login, "frank");

        let err = vault.login("frank", "wrong").await.unwrap_err();
        assert!(matches!(err, VaultError::AuthFailed));

        // Unknown login is indistinguishable from a bad password.
        let err = vault.login("claire", "password").await.unwrap_err();
        assert!(matches!(err, VaultError::AuthFailed));
    }

    #[tokio::test]
    async fn bank_card_scenario() {
        let (_dir, vault) = open_vault().await;
        let user = vault.register("frank", "password").await.expect("register");
        let identity = Some(user.id);

        let created = vault
            .create_secret(identity, "visa".to_string(), None, false, bank_card())
            .await
            .expect("create");
        assert_eq!(created.kind, Kind::BankCard);

        let loaded = vault
            .secret_by_name(identity, "visa")
            .await
            .expect("load by name");
        assert_eq!(loaded.kind, Kind::BankCard);
        assert_eq!(loaded.value, bank_card());

        // Second "visa" for the same owner fails regardless of kind.
        let err = vault
            .create_secret(
                identity,
                "visa".to_string(),
                None,
                false,
                SecretValue::Note {
                    body: "note".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Storage(StorageError::DuplicateSecret)
        ));

        vault
            .delete_secret(identity, created.id)
            .await
            .expect("delete");
        let err = vault.secret_by_id(identity, created.id).await.unwrap_err();
        assert!(matches!(err, VaultError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn every_operation_is_gated_on_ownership() {
        let (_dir, vault) = open_vault().await;
        let owner = vault.register("frank", "password").await.expect("register");
        let stranger = vault.register("claire", "password").await.expect("register");

        let secret = vault
            .create_secret(
                Some(owner.id),
                "memo".to_string(),
                None,
                false,
                SecretValue::Note {
                    body: "body".to_string(),
                },
            )
            .await
            .expect("create");

        let them = Some(stranger.id);
        let id = secret.id;

        assert!(matches!(
            vault.secret_by_id(them, id).await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.edit_secret_note(them, id, "hacked").await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.rename_secret(them, id, "mine now").await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.delete_secret(them, id).await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.add_tag(them, id, "stolen").await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.delete_tag(them, id, "stolen").await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault
                .change_secret_description(them, id, Some("theirs"))
                .await
                .unwrap_err(),
            VaultError::NoAuth
        ));

        // Absent identity collapses to the same error.
        assert!(matches!(
            vault.secret_by_id(None, id).await.unwrap_err(),
            VaultError::NoAuth
        ));
        assert!(matches!(
            vault.secrets(None).await.unwrap_err(),
            VaultError::NoAuth
        ));

        // And the secret is untouched.
        let loaded = vault.secret_by_id(Some(owner.id), id).await.expect("load");
        assert_eq!(loaded.name, "memo");
        assert_eq!(
            loaded.value,
            SecretValue::Note {
                body: "body".to_string()
            }
        );
    }

    #[tokio::test]
    async fn edit_rejects_kind_mismatch_before_touching_storage() {
        let (_dir, vault) = open_vault().await;
        let user = vault.register("frank", "password").await.expect("register");
        let identity = Some(user.id);

        let secret = vault
            .create_secret(
                identity,
                "memo".to_string(),
                None,
                false,
                SecretValue::Note {
                    body: "original".to_string(),
                },
            )
            .await
            .expect("create");

        let err = vault
            .edit_secret_credentials(identity, secret.id, "login", "password")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Storage(StorageError::WrongKind)
        ));

        let loaded = vault.secret_by_id(identity, secret.id).await.expect("load");
        assert_eq!(
            loaded.value,
            SecretValue::Note {
                body: "original".to_string()
            }
        );
    }

    #[tokio::test]
    async fn tag_lifecycle_is_idempotent() {
        let (_dir, vault) = open_vault().await;
        let user = vault.register("frank", "password").await.expect("register");
        let identity = Some(user.id);

        let secret = vault
            .create_secret(
                identity,
                "memo".to_string(),
                None,
                false,
                SecretValue::Note {
                    body: "body".to_string(),
                },
            )
            .await
            .expect("create");

        vault.add_tag(identity, secret.id, "work").await.expect("tag");
        vault
            .add_tag(identity, secret.id, "work")
            .await
            .expect("tag twice");

        let loaded = vault.secret_by_id(identity, secret.id).await.expect("load");
        assert_eq!(loaded.tags, vec!["work".to_string()]);

        vault
            .delete_tag(identity, secret.id, "missing")
            .await
            .expect("deleting a missing tag succeeds");
        vault
            .delete_tag(identity, secret.id, "work")
            .await
            .expect("delete");

        let loaded = vault.secret_by_id(identity, secret.id).await.expect("load");
        assert!(loaded.tags.is_empty());
    }
}
