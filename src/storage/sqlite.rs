//! SQLite-backed storage.

use super::{Kind, Secret, SecretValue, Storage, StorageError, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    login TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS secrets (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    is_encrypted INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    UNIQUE (user_id, name),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_secrets_user ON secrets(user_id, name);

CREATE TABLE IF NOT EXISTS secret_credentials (
    id TEXT PRIMARY KEY NOT NULL,
    login TEXT NOT NULL,
    password TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES secrets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS secret_note (
    id TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES secrets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS secret_blob (
    id TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES secrets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS secret_bank_card (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    number TEXT NOT NULL,
    date TEXT NOT NULL,
    cvv TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES secrets(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tags (
    secret_id TEXT NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (secret_id, text),
    FOREIGN KEY (secret_id) REFERENCES secrets(id) ON DELETE CASCADE
);
"#;

/// SQLite implementation of [`Storage`].
///
/// A single pooled connection guarded by an async mutex; all queries run on
/// the blocking pool.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        let path = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

/// Map a constraint violation to the given duplicate error, passing
/// everything else through as a backend failure.
fn map_unique(err: rusqlite::Error, duplicate: StorageError) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            duplicate
        }
        _ => StorageError::Backend(err),
    }
}

fn uuid_column(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn datetime_column(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Insert the kind-specific value row for `secret` inside `tx`.
///
/// Re-checks the envelope/value kind agreement even though the vault layer
/// already validated it; this function is also reachable directly in tests.
fn insert_value(tx: &Transaction<'_>, secret: &Secret) -> Result<(), StorageError> {
    if secret.value.kind() != secret.kind {
        return Err(StorageError::WrongKind);
    }

    let id = secret.id.to_string();
    let result = match &secret.value {
        SecretValue::Credentials { login, password } => tx.execute(
            "INSERT INTO secret_credentials (id, login, password) VALUES (?1, ?2, ?3)",
            params![id, login, password],
        ),
        SecretValue::Note { body } => tx.execute(
            "INSERT INTO secret_note (id, body) VALUES (?1, ?2)",
            params![id, body],
        ),
        SecretValue::Blob { body } => tx.execute(
            "INSERT INTO secret_blob (id, body) VALUES (?1, ?2)",
            params![id, body],
        ),
        SecretValue::BankCard {
            name,
            number,
            date,
            cvv,
        } => tx.execute(
            "INSERT INTO secret_bank_card (id, name, number, date, cvv) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, number, date, cvv],
        ),
    };

    result.map_err(|e| map_unique(e, StorageError::DuplicateSecret))?;
    Ok(())
}

/// Fetch the value row for a secret, dispatched by kind.
fn load_value(conn: &Connection, kind: Kind, id: &str) -> Result<Option<SecretValue>, StorageError> {
    let value = match kind {
        Kind::Credentials => conn
            .query_row(
                "SELECT login, password FROM secret_credentials WHERE id = ?1",
                params![id],
                |row| {
                    Ok(SecretValue::Credentials {
                        login: row.get(0)?,
                        password: row.get(1)?,
                    })
                },
            )
            .optional()?,
        Kind::Note => conn
            .query_row(
                "SELECT body FROM secret_note WHERE id = ?1",
                params![id],
                |row| Ok(SecretValue::Note { body: row.get(0)? }),
            )
            .optional()?,
        Kind::Blob => conn
            .query_row(
                "SELECT body FROM secret_blob WHERE id = ?1",
                params![id],
                |row| Ok(SecretValue::Blob { body: row.get(0)? }),
            )
            .optional()?,
        Kind::BankCard => conn
            .query_row(
                "SELECT name, number, date, cvv FROM secret_bank_card WHERE id = ?1",
                params![id],
                |row| {
                    Ok(SecretValue::BankCard {
                        name: row.get(0)?,
                        number: row.get(1)?,
                        date: row.get(2)?,
                        cvv: row.get(3)?,
                    })
                },
            )
            .optional()?,
    };

    Ok(value)
}

fn load_tags(conn: &Connection, id: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn.prepare("SELECT text FROM tags WHERE secret_id = ?1 ORDER BY rowid")?;
    let tags = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

struct SecretRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    kind_raw: String,
    is_encrypted: bool,
}

fn secret_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SecretRow> {
    let id_raw: String = row.get(0)?;
    let user_id_raw: String = row.get(1)?;
    Ok(SecretRow {
        id: uuid_column(0, &id_raw)?,
        user_id: uuid_column(1, &user_id_raw)?,
        name: row.get(2)?,
        description: row.get(3)?,
        kind_raw: row.get(4)?,
        is_encrypted: row.get::<_, i64>(5)? != 0,
    })
}

/// Attach the tag list and the kind-dispatched value to a root row.
///
/// A root row whose value row is missing is an internal consistency
/// violation: it is logged loudly and reported as `NotFound`, distinct from
/// an ordinary miss which never reaches this function.
fn assemble_secret(conn: &Connection, row: SecretRow) -> Result<Secret, StorageError> {
    let Some(kind) = Kind::parse(&row.kind_raw) else {
        tracing::error!(secret_id = %row.id, kind = %row.kind_raw, "invalid secret kind in storage");
        return Err(StorageError::InvalidKind);
    };

    let id = row.id.to_string();
    let Some(value) = load_value(conn, kind, &id)? else {
        tracing::error!(
            secret_id = %row.id,
            kind = %kind,
            "secret root row exists but its value row is missing"
        );
        return Err(StorageError::NotFound);
    };

    Ok(Secret {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        description: row.description,
        tags: load_tags(conn, &id)?,
        kind,
        is_encrypted: row.is_encrypted,
        value,
    })
}

const SECRET_COLUMNS: &str = "id, user_id, name, description, kind, is_encrypted";

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, login, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.login,
                    user.password,
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| map_unique(e, StorageError::DuplicateUser))?;
            Ok(())
        })
        .await
    }

    async fn load_user(&self, login: &str) -> Result<User, StorageError> {
        let login = login.to_string();
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, login, password, created_at FROM users WHERE login = ?1",
                    params![login],
                    |row| {
                        let id_raw: String = row.get(0)?;
                        let created_raw: String = row.get(3)?;
                        Ok(User {
                            id: uuid_column(0, &id_raw)?,
                            login: row.get(1)?,
                            password: row.get(2)?,
                            created_at: datetime_column(3, &created_raw)?,
                        })
                    },
                )
                .optional()?;

            user.ok_or(StorageError::NotFound)
        })
        .await
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StorageError> {
        let secret = secret.clone();
        self.with_conn(move |conn| {
            // Root row and value row commit together or not at all; dropping
            // the transaction on any error path rolls both back.
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO secrets (id, user_id, name, kind, is_encrypted, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    secret.id.to_string(),
                    secret.user_id.to_string(),
                    secret.name,
                    secret.kind.as_str(),
                    secret.is_encrypted as i64,
                    secret.description,
                ],
            )
            .map_err(|e| map_unique(e, StorageError::DuplicateSecret))?;

            insert_value(&tx, &secret)?;

            for tag in &secret.tags {
                tx.execute(
                    "INSERT INTO tags (secret_id, text) VALUES (?1, ?2)
                     ON CONFLICT (secret_id, text) DO UPDATE SET text = excluded.text",
                    params![secret.id.to_string(), tag],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_secret_by_id(&self, id: Uuid) -> Result<Secret, StorageError> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE id = ?1"),
                    params![id.to_string()],
                    secret_row,
                )
                .optional()?;

            let row = row.ok_or(StorageError::NotFound)?;
            assemble_secret(conn, row)
        })
        .await
    }

    async fn load_secret_by_name(&self, user_id: Uuid, name: &str) -> Result<Secret, StorageError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE user_id = ?1 AND name = ?2"),
                    params![user_id.to_string(), name],
                    secret_row,
                )
                .optional()?;

            let row = row.ok_or(StorageError::NotFound)?;
            assemble_secret(conn, row)
        })
        .await
    }

    async fn load_secrets(&self, user_id: Uuid) -> Result<Vec<Secret>, StorageError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SECRET_COLUMNS} FROM secrets WHERE user_id = ?1 ORDER BY name"
            ))?;
            let rows = stmt
                .query_map(params![user_id.to_string()], secret_row)?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            rows.into_iter()
                .map(|row| assemble_secret(conn, row))
                .collect()
        })
        .await
    }

    async fn rename_secret(&self, id: Uuid, name: &str) -> Result<(), StorageError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secrets SET name = ?1 WHERE id = ?2",
                params![name, id.to_string()],
            )
            .map_err(|e| map_unique(e, StorageError::DuplicateSecret))?;
            Ok(())
        })
        .await
    }

    async fn change_secret_description(
        &self,
        id: Uuid,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        let description = description.map(str::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secrets SET description = ?1 WHERE id = ?2",
                params![description, id.to_string()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_secret(&self, id: Uuid) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            // Value row and tags cascade with the root.
            conn.execute("DELETE FROM secrets WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })
        .await
    }

    async fn edit_secret_credentials(
        &self,
        secret: &Secret,
        login: &str,
        password: &str,
    ) -> Result<(), StorageError> {
        if secret.kind != Kind::Credentials {
            return Err(StorageError::WrongKind);
        }
        let (id, login, password) = (secret.id.to_string(), login.to_string(), password.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secret_credentials SET login = ?1, password = ?2 WHERE id = ?3",
                params![login, password, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn edit_secret_note(&self, secret: &Secret, body: &str) -> Result<(), StorageError> {
        if secret.kind != Kind::Note {
            return Err(StorageError::WrongKind);
        }
        let (id, body) = (secret.id.to_string(), body.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secret_note SET body = ?1 WHERE id = ?2",
                params![body, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn edit_secret_blob(&self, secret: &Secret, body: &str) -> Result<(), StorageError> {
        if secret.kind != Kind::Blob {
            return Err(StorageError::WrongKind);
        }
        let (id, body) = (secret.id.to_string(), body.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secret_blob SET body = ?1 WHERE id = ?2",
                params![body, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn edit_secret_bank_card(
        &self,
        secret: &Secret,
        name: &str,
        number: &str,
        date: &str,
        cvv: &str,
    ) -> Result<(), StorageError> {
        if secret.kind != Kind::BankCard {
            return Err(StorageError::WrongKind);
        }
        let id = secret.id.to_string();
        let (name, number, date, cvv) = (
            name.to_string(),
            number.to_string(),
            date.to_string(),
            cvv.to_string(),
        );
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE secret_bank_card SET name = ?1, number = ?2, date = ?3, cvv = ?4 WHERE id = ?5",
                params![name, number, date, cvv, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn add_tag(&self, secret_id: Uuid, tag: &str) -> Result<(), StorageError> {
        let tag = tag.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tags (secret_id, text) VALUES (?1, ?2)
                 ON CONFLICT (secret_id, text) DO UPDATE SET text = excluded.text",
                params![secret_id.to_string(), tag],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_tag(&self, secret_id: Uuid, tag: &str) -> Result<(), StorageError> {
        let tag = tag.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM tags WHERE secret_id = ?1 AND text = ?2",
                params![secret_id.to_string(), tag],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteStorage) {
        let dir = TempDir::new().expect("tempdir");
        let store = SqliteStorage::new(&dir.path().join("test.db"))
            .await
            .expect("open store");
        (dir, store)
    }

    async fn create_user(store: &SqliteStorage, login: &str) -> User {
        let user = User::new(Uuid::new_v4(), login.to_string(), "hunter2");
        store.create_user(&user).await.expect("create user");
        user
    }

    fn bank_card_secret(user: &User, name: &str) -> Secret {
        Secret {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: name.to_string(),
            description: None,
            tags: vec![],
            kind: Kind::BankCard,
            is_encrypted: false,
            value: SecretValue::BankCard {
                name: "J DOE".to_string(),
                number: "4111 1111 1111 1111".to_string(),
                date: "12/29".to_string(),
                cvv: "123".to_string(),
            },
        }
    }

    fn note_secret(user: &User, name: &str, body: &str) -> Secret {
        Secret {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: name.to_string(),
            description: None,
            tags: vec![],
            kind: Kind::Note,
            is_encrypted: false,
            value: SecretValue::Note {
                body: body.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn user_roundtrip_and_duplicate_login() {
        let (_dir, store) = open_store().await;

        let user = create_user(&store, "frank").await;
        let loaded = store.load_user("frank").await.expect("load user");
        assert_eq!(loaded.id, user.id);
        assert!(loaded.is_valid_password("hunter2"));

        let twin = User::new(Uuid::new_v4(), "frank".to_string(), "other");
        let err = store.create_user(&twin).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateUser));

        let err = store.load_user("nobody").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn secret_roundtrip_every_kind() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let values = [
            SecretValue::Credentials {
                login: "frank_strino".to_string(),
                password: "secret_pass".to_string(),
            },
            SecretValue::Note {
                body: "remember the milk".to_string(),
            },
            SecretValue::Blob {
                body: "aGVsbG8gd29ybGQ=".to_string(),
            },
            SecretValue::BankCard {
                name: "J DOE".to_string(),
                number: "4111 1111 1111 1111".to_string(),
                date: "12/29".to_string(),
                cvv: "123".to_string(),
            },
        ];

        for (i, value) in values.into_iter().enumerate() {
            let secret = Secret {
                id: Uuid::new_v4(),
                user_id: user.id,
                name: format!("secret-{i}"),
                description: Some("important".to_string()),
                tags: vec!["work".to_string()],
                kind: value.kind(),
                is_encrypted: false,
                value: value.clone(),
            };
            store.create_secret(&secret).await.expect("create");

            let loaded = store.load_secret_by_id(secret.id).await.expect("load");
            assert_eq!(loaded.kind, value.kind());
            assert_eq!(loaded.value, value);
            assert_eq!(loaded.tags, vec!["work".to_string()]);
            assert_eq!(loaded.description.as_deref(), Some("important"));
        }
    }

    #[tokio::test]
    async fn duplicate_name_and_duplicate_id_are_rejected() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = bank_card_secret(&user, "visa");
        store.create_secret(&secret).await.expect("create");

        // Same (owner, name), different kind.
        let same_name = note_secret(&user, "visa", "note body");
        let err = store.create_secret(&same_name).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSecret));

        // Same id, fresh name.
        let mut same_id = note_secret(&user, "fresh name", "note body");
        same_id.id = secret.id;
        let err = store.create_secret(&same_id).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSecret));

        // The failed creates must not have left partial rows behind.
        let err = store
            .load_secret_by_name(user.id, "fresh name")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn create_rolls_back_when_value_insert_fails() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let mut secret = note_secret(&user, "broken", "body");
        // Envelope kind disagrees with the value; the value insert fails
        // after the root insert succeeded, so the whole create must vanish.
        secret.kind = Kind::Blob;
        let err = store.create_secret(&secret).await.unwrap_err();
        assert!(matches!(err, StorageError::WrongKind));

        let err = store.load_secret_by_id(secret.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn rename_maps_collision_to_duplicate() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let existing = bank_card_secret(&user, "visa");
        let other = bank_card_secret(&user, "mastercard");
        store.create_secret(&existing).await.expect("create");
        store.create_secret(&other).await.expect("create");

        let err = store.rename_secret(other.id, "visa").await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSecret));

        store
            .rename_secret(other.id, "amex")
            .await
            .expect("rename to free name");
        let loaded = store.load_secret_by_id(other.id).await.expect("load");
        assert_eq!(loaded.name, "amex");
    }

    #[tokio::test]
    async fn delete_removes_root_value_and_tags() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = bank_card_secret(&user, "visa");
        store.create_secret(&secret).await.expect("create");
        store.add_tag(secret.id, "payments").await.expect("tag");

        store.delete_secret(secret.id).await.expect("delete");

        let err = store.load_secret_by_id(secret.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        // A recreate under the same name must not resurrect old tags.
        let fresh = bank_card_secret(&user, "visa");
        store.create_secret(&fresh).await.expect("recreate");
        let loaded = store.load_secret_by_id(fresh.id).await.expect("load");
        assert!(loaded.tags.is_empty());
    }

    #[tokio::test]
    async fn load_secrets_is_ordered_by_name() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;
        let stranger = create_user(&store, "claire").await;

        for name in ["zulu", "alpha", "mike"] {
            store
                .create_secret(&note_secret(&user, name, "body"))
                .await
                .expect("create");
        }
        store
            .create_secret(&note_secret(&stranger, "hers", "body"))
            .await
            .expect("create");

        let secrets = store.load_secrets(user.id).await.expect("load all");
        let names: Vec<_> = secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    }

    #[tokio::test]
    async fn edit_overwrites_only_the_value_row() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = note_secret(&user, "memo", "old body");
        store.create_secret(&secret).await.expect("create");
        store.add_tag(secret.id, "keep").await.expect("tag");

        store
            .edit_secret_note(&secret, "new body")
            .await
            .expect("edit");

        let loaded = store.load_secret_by_id(secret.id).await.expect("load");
        assert_eq!(
            loaded.value,
            SecretValue::Note {
                body: "new body".to_string()
            }
        );
        assert_eq!(loaded.name, "memo");
        assert_eq!(loaded.tags, vec!["keep".to_string()]);
    }

    #[tokio::test]
    async fn edit_with_wrong_kind_is_rejected_and_leaves_value_intact() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = note_secret(&user, "memo", "the body");
        store.create_secret(&secret).await.expect("create");

        let err = store
            .edit_secret_credentials(&secret, "login", "password")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::WrongKind));

        let loaded = store.load_secret_by_id(secret.id).await.expect("load");
        assert_eq!(
            loaded.value,
            SecretValue::Note {
                body: "the body".to_string()
            }
        );
    }

    #[tokio::test]
    async fn tags_are_idempotent() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = note_secret(&user, "memo", "body");
        store.create_secret(&secret).await.expect("create");

        store.add_tag(secret.id, "work").await.expect("tag");
        store.add_tag(secret.id, "work").await.expect("tag again");
        store.add_tag(secret.id, "urgent").await.expect("other tag");

        let loaded = store.load_secret_by_id(secret.id).await.expect("load");
        assert_eq!(loaded.tags, vec!["work".to_string(), "urgent".to_string()]);

        store
            .delete_tag(secret.id, "nonexistent")
            .await
            .expect("deleting a missing tag is fine");
        store.delete_tag(secret.id, "work").await.expect("delete");

        let loaded = store.load_secret_by_id(secret.id).await.expect("load");
        assert_eq!(loaded.tags, vec!["urgent".to_string()]);
    }

    #[tokio::test]
    async fn missing_value_row_reports_not_found() {
        let (_dir, store) = open_store().await;
        let user = create_user(&store, "frank").await;

        let secret = note_secret(&user, "memo", "body");
        store.create_secret(&secret).await.expect("create");

        // Sever the value row behind the store's back.
        {
            let conn = store.conn.clone();
            let id = secret.id.to_string();
            tokio::task::spawn_blocking(move || {
                let conn = conn.blocking_lock();
                conn.execute("DELETE FROM secret_note WHERE id = ?1", params![id])
                    .expect("raw delete");
            })
            .await
            .expect("join");
        }

        let err = store.load_secret_by_id(secret.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
