//! Secret storage with a pluggable relational backend.
//!
//! The root [`Secret`] row and its kind-specific value row share one primary
//! key (1:1, cascade-deleted with the parent). Value rows are created and
//! loaded through a fixed kind dispatch in the backend; adding a new kind is
//! one [`Kind`] member plus one dispatch arm, the root store logic does not
//! change.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Storage-layer error taxonomy.
///
/// Driver errors are wrapped in [`StorageError::Backend`] with enough context
/// to log, and are never allowed to leak past the vault boundary as raw
/// driver values.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested entity is absent.
    #[error("not found")]
    NotFound,

    /// A user with this login already exists.
    #[error("user with this login already exists")]
    DuplicateUser,

    /// A secret with this name (or id) already exists.
    #[error("secret with this name already exists")]
    DuplicateSecret,

    /// An unrecognized secret kind reached the store.
    #[error("invalid secret kind")]
    InvalidKind,

    /// Secret kind and actual secret value differ.
    #[error("secret kind does not match actual secret value")]
    WrongKind,

    /// Underlying database failure.
    #[error("storage backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    /// Blocking task join failure.
    #[error("storage task error: {0}")]
    Task(String),
}

/// Kind of a secret value. Closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Credentials,
    Note,
    Blob,
    BankCard,
}

impl Kind {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Credentials => "credentials",
            Kind::Note => "note",
            Kind::Blob => "blob",
            Kind::BankCard => "bank_card",
        }
    }

    /// Parse the storage representation. `None` for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credentials" => Some(Kind::Credentials),
            "note" => Some(Kind::Note),
            "blob" => Some(Kind::Blob),
            "bank_card" => Some(Kind::BankCard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific secret payload. One variant per [`Kind`].
///
/// When the parent secret's `is_encrypted` flag is set, every field here
/// holds an opaque client-side encryption envelope instead of plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Credentials { login: String, password: String },
    Note { body: String },
    Blob { body: String },
    BankCard {
        name: String,
        number: String,
        date: String,
        cvv: String,
    },
}

impl SecretValue {
    /// The kind this value reports for itself. Must always equal the parent
    /// secret's `kind`; a mismatch is a programming error surfaced as
    /// [`StorageError::WrongKind`].
    pub fn kind(&self) -> Kind {
        match self {
            SecretValue::Credentials { .. } => Kind::Credentials,
            SecretValue::Note { .. } => Kind::Note,
            SecretValue::Blob { .. } => Kind::Blob,
            SecretValue::BankCard { .. } => Kind::BankCard,
        }
    }
}

/// Root secret entity with its assembled payload and tags.
#[derive(Debug, Clone)]
pub struct Secret {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Empty tag set is an empty list, never absent.
    pub tags: Vec<String>,
    pub kind: Kind,
    pub is_encrypted: bool,
    pub value: SecretValue,
}

/// A user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    /// Hex SHA-256 of `raw_password || created_at_unix_seconds`.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user, hashing the raw password against the creation
    /// timestamp.
    pub fn new(id: Uuid, login: String, raw_password: &str) -> Self {
        let mut user = Self {
            id,
            login,
            password: String::new(),
            created_at: Utc::now(),
        };
        user.password = user.hashed_password(raw_password);
        user
    }

    /// True if the raw password hashes to the stored hash.
    pub fn is_valid_password(&self, raw_password: &str) -> bool {
        self.hashed_password(raw_password) == self.password
    }

    // The hash input includes the creation timestamp, so a hash is not
    // portable across user re-creation. Kept as-is; changing this breaks
    // verification of previously issued credentials.
    fn hashed_password(&self, raw_password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_password.as_bytes());
        hasher.update(self.created_at.timestamp().to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Relational storage contract the vault is written against.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a new user. Duplicate login surfaces `DuplicateUser`.
    async fn create_user(&self, user: &User) -> Result<(), StorageError>;

    /// Load a user by login.
    async fn load_user(&self, login: &str) -> Result<User, StorageError>;

    /// Create the root secret row and its value row as one atomic unit.
    async fn create_secret(&self, secret: &Secret) -> Result<(), StorageError>;

    /// Load a fully assembled secret (root + tags + value) by id.
    async fn load_secret_by_id(&self, id: Uuid) -> Result<Secret, StorageError>;

    /// Load a fully assembled secret by owner and name.
    async fn load_secret_by_name(&self, user_id: Uuid, name: &str) -> Result<Secret, StorageError>;

    /// Load all of a user's secrets, ordered by name.
    async fn load_secrets(&self, user_id: Uuid) -> Result<Vec<Secret>, StorageError>;

    /// Rename a secret. Name collision surfaces `DuplicateSecret`.
    async fn rename_secret(&self, id: Uuid, name: &str) -> Result<(), StorageError>;

    /// Replace a secret's description.
    async fn change_secret_description(
        &self,
        id: Uuid,
        description: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Delete a secret; its value row and tags go with it.
    async fn delete_secret(&self, id: Uuid) -> Result<(), StorageError>;

    /// Overwrite the value row of a credentials secret.
    async fn edit_secret_credentials(
        &self,
        secret: &Secret,
        login: &str,
        password: &str,
    ) -> Result<(), StorageError>;

    /// Overwrite the value row of a note secret.
    async fn edit_secret_note(&self, secret: &Secret, body: &str) -> Result<(), StorageError>;

    /// Overwrite the value row of a blob secret.
    async fn edit_secret_blob(&self, secret: &Secret, body: &str) -> Result<(), StorageError>;

    /// Overwrite the value row of a bank card secret.
    async fn edit_secret_bank_card(
        &self,
        secret: &Secret,
        name: &str,
        number: &str,
        date: &str,
        cvv: &str,
    ) -> Result<(), StorageError>;

    /// Idempotent tag upsert.
    async fn add_tag(&self, secret_id: Uuid, tag: &str) -> Result<(), StorageError>;

    /// Unconditional tag delete; missing tag is not an error.
    async fn delete_tag(&self, secret_id: Uuid, tag: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_str() {
        for kind in [Kind::Credentials, Kind::Note, Kind::Blob, Kind::BankCard] {
            assert_eq!(Kind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(Kind::parse("totp"), None);
    }

    #[test]
    fn value_reports_its_kind() {
        let value = SecretValue::Note {
            body: "hello".to_string(),
        };
        assert_eq!(value.kind(), Kind::Note);

        let value = SecretValue::BankCard {
            name: "J DOE".to_string(),
            number: "4111111111111111".to_string(),
            date: "12/29".to_string(),
            cvv: "123".to_string(),
        };
        assert_eq!(value.kind(), Kind::BankCard);
    }

    #[test]
    fn password_hash_is_bound_to_creation_time() {
        let user = User::new(Uuid::new_v4(), "frank".to_string(), "qwerty");
        assert!(user.is_valid_password("qwerty"));
        assert!(!user.is_valid_password("qwertz"));

        // Same password, different creation instant => different hash.
        let mut other = user.clone();
        other.created_at = user.created_at - chrono::Duration::seconds(1);
        other.password = {
            let mut hasher = Sha256::new();
            hasher.update(b"qwerty");
            hasher.update(other.created_at.timestamp().to_string().as_bytes());
            hex::encode(hasher.finalize())
        };
        assert_ne!(user.password, other.password);
    }
}
