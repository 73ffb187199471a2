//! Wire types shared by the server handlers and the client.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::storage::{Kind, Secret, SecretValue};

/// Response envelope: either a successful `result` or an `error` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Request to register or log in a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub login: String,
    pub password: String,
}

/// A session token plus its expiration (unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub exp: i64,
}

/// Request to create a secret of kind `V`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest<V> {
    pub name: String,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: V,
}

/// Credentials payload on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsPayload {
    pub login: String,
    pub password: String,
}

/// Note payload on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePayload {
    pub body: String,
}

/// Blob payload on the wire: base64 of raw bytes, or an encryption envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobPayload {
    pub body: String,
}

/// Bank card payload on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankCardPayload {
    pub name: String,
    pub number: String,
    pub date: String,
    pub cvv: String,
}

impl From<CredentialsPayload> for SecretValue {
    fn from(p: CredentialsPayload) -> Self {
        SecretValue::Credentials {
            login: p.login,
            password: p.password,
        }
    }
}

impl From<NotePayload> for SecretValue {
    fn from(p: NotePayload) -> Self {
        SecretValue::Note { body: p.body }
    }
}

impl From<BlobPayload> for SecretValue {
    fn from(p: BlobPayload) -> Self {
        SecretValue::Blob { body: p.body }
    }
}

impl From<BankCardPayload> for SecretValue {
    fn from(p: BankCardPayload) -> Self {
        SecretValue::BankCard {
            name: p.name,
            number: p.number,
            date: p.date,
            cvv: p.cvv,
        }
    }
}

/// Request to rename a secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Request to replace a secret's description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRequest {
    pub description: Option<String>,
}

/// Request naming a single tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

/// Response for a freshly created secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSecretResponse {
    pub id: Uuid,
}

/// A fully populated secret on the wire. The `value` object's shape is
/// determined by `kind`; [`SecretResponse::decoded_value`] recovers the
/// typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretResponse {
    pub id: Uuid,
    pub name: String,
    pub kind: Kind,
    pub is_encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub value: serde_json::Value,
}

impl SecretResponse {
    pub fn from_secret(secret: &Secret) -> Self {
        let value = match &secret.value {
            SecretValue::Credentials { login, password } => {
                json!({ "login": login, "password": password })
            }
            SecretValue::Note { body } => json!({ "body": body }),
            SecretValue::Blob { body } => json!({ "body": body }),
            SecretValue::BankCard {
                name,
                number,
                date,
                cvv,
            } => json!({ "name": name, "number": number, "date": date, "cvv": cvv }),
        };

        Self {
            id: secret.id,
            name: secret.name.clone(),
            kind: secret.kind,
            is_encrypted: secret.is_encrypted,
            description: secret.description.clone(),
            tags: secret.tags.clone(),
            value,
        }
    }

    /// Parse the kind-shaped `value` object back into a typed payload.
    pub fn decoded_value(&self) -> Result<SecretValue, serde_json::Error> {
        fn parse<P: DeserializeOwned + Into<SecretValue>>(
            value: &serde_json::Value,
        ) -> Result<SecretValue, serde_json::Error> {
            serde_json::from_value::<P>(value.clone()).map(Into::into)
        }

        match self.kind {
            Kind::Credentials => parse::<CredentialsPayload>(&self.value),
            Kind::Note => parse::<NotePayload>(&self.value),
            Kind::Blob => parse::<BlobPayload>(&self.value),
            Kind::BankCard => parse::<BankCardPayload>(&self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_response_roundtrips_value_by_kind() {
        let secret = Secret {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "visa".to_string(),
            description: None,
            tags: vec![],
            kind: Kind::BankCard,
            is_encrypted: false,
            value: SecretValue::BankCard {
                name: "J DOE".to_string(),
                number: "4111111111111111".to_string(),
                date: "12/29".to_string(),
                cvv: "123".to_string(),
            },
        };

        let wire = SecretResponse::from_secret(&secret);
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: SecretResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.kind, Kind::BankCard);
        assert_eq!(parsed.decoded_value().unwrap(), secret.value);
    }

    #[test]
    fn blob_and_note_values_stay_distinct() {
        // Both kinds carry a single `body` field; the kind tag is what keeps
        // them apart on the wire.
        let note = Secret {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "memo".to_string(),
            description: None,
            tags: vec![],
            kind: Kind::Note,
            is_encrypted: false,
            value: SecretValue::Note {
                body: "text".to_string(),
            },
        };

        let wire = SecretResponse::from_secret(&note);
        assert_eq!(
            wire.decoded_value().unwrap(),
            SecretValue::Note {
                body: "text".to_string()
            }
        );
    }

    #[test]
    fn envelope_serializes_success_and_error() {
        let ok: ApiResponse<CreatedSecretResponse> = ApiResponse::ok(CreatedSecretResponse {
            id: Uuid::new_v4(),
        });
        assert!(ok.success);
        assert!(ok.error.is_none());

        let err: ApiResponse<CreatedSecretResponse> = ApiResponse::err("boom");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("boom"));
    }
}
