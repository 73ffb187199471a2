//! Typed HTTP client for the vault API.
//!
//! Thin wrapper over reqwest: attaches the session token, unwraps the
//! `{success, result, error}` envelope and translates HTTP statuses into
//! [`ClientError`] values the CLI can act on.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::types::{
    ApiResponse, AuthRequest, BankCardPayload, BlobPayload, CreateSecretRequest,
    CreatedSecretResponse, CredentialsPayload, DescriptionRequest, NotePayload, RenameRequest,
    SecretResponse, SessionResponse, TagRequest,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not authorized; log in first")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("empty response from server")]
    EmptyResponse,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Vault API client bound to one server and, optionally, one session.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    async fn send_raw<Req: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, %method, "sending API request");

        let mut request = self.http.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if status.is_success() {
            return Ok(response);
        }

        // Pull the server's message out of the envelope when there is one.
        let message = response
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .ok()
            .and_then(|envelope| envelope.error)
            .unwrap_or_else(|| format!("unexpected status code {}", status));

        Err(if status == StatusCode::CONFLICT {
            ClientError::Conflict(message)
        } else if status == StatusCode::BAD_REQUEST {
            ClientError::BadRequest(message)
        } else {
            ClientError::Server(message)
        })
    }

    async fn send<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<Resp, ClientError> {
        let response = self.send_raw(method, path, body).await?;
        let envelope: ApiResponse<Resp> = response.json().await?;
        envelope.result.ok_or(ClientError::EmptyResponse)
    }

    /// Send a request whose successful response carries no payload.
    async fn send_empty<Req: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<(), ClientError> {
        self.send_raw(method, path, body).await?;
        Ok(())
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<SessionResponse, ClientError> {
        self.send(
            Method::POST,
            "/api/register",
            Some(&AuthRequest {
                login: login.to_string(),
                password: password.to_string(),
            }),
        )
        .await
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<SessionResponse, ClientError> {
        self.send(
            Method::POST,
            "/api/login",
            Some(&AuthRequest {
                login: login.to_string(),
                password: password.to_string(),
            }),
        )
        .await
    }

    pub async fn secrets(&self) -> Result<Vec<SecretResponse>, ClientError> {
        self.send::<(), _>(Method::GET, "/api/secret/list", None)
            .await
    }

    pub async fn secret(&self, id: Uuid) -> Result<SecretResponse, ClientError> {
        self.send::<(), _>(Method::GET, &format!("/api/secret/{id}"), None)
            .await
    }

    pub async fn create_credentials(
        &self,
        request: &CreateSecretRequest<CredentialsPayload>,
    ) -> Result<CreatedSecretResponse, ClientError> {
        self.send(Method::POST, "/api/secret/create/credentials", Some(request))
            .await
    }

    pub async fn create_note(
        &self,
        request: &CreateSecretRequest<NotePayload>,
    ) -> Result<CreatedSecretResponse, ClientError> {
        self.send(Method::POST, "/api/secret/create/note", Some(request))
            .await
    }

    pub async fn create_blob(
        &self,
        request: &CreateSecretRequest<BlobPayload>,
    ) -> Result<CreatedSecretResponse, ClientError> {
        self.send(Method::POST, "/api/secret/create/blob", Some(request))
            .await
    }

    pub async fn create_bank_card(
        &self,
        request: &CreateSecretRequest<BankCardPayload>,
    ) -> Result<CreatedSecretResponse, ClientError> {
        self.send(Method::POST, "/api/secret/create/bank_card", Some(request))
            .await
    }

    pub async fn edit_credentials(
        &self,
        id: Uuid,
        payload: &CredentialsPayload,
    ) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/edit/credentials/{id}"),
            Some(payload),
        )
        .await
    }

    pub async fn edit_note(&self, id: Uuid, payload: &NotePayload) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/edit/note/{id}"),
            Some(payload),
        )
        .await
    }

    pub async fn edit_blob(&self, id: Uuid, payload: &BlobPayload) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/edit/blob/{id}"),
            Some(payload),
        )
        .await
    }

    pub async fn edit_bank_card(
        &self,
        id: Uuid,
        payload: &BankCardPayload,
    ) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/edit/bank_card/{id}"),
            Some(payload),
        )
        .await
    }

    pub async fn rename_secret(&self, id: Uuid, name: &str) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/{id}/rename"),
            Some(&RenameRequest {
                name: name.to_string(),
            }),
        )
        .await
    }

    pub async fn change_description(
        &self,
        id: Uuid,
        description: Option<String>,
    ) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/{id}/description"),
            Some(&DescriptionRequest { description }),
        )
        .await
    }

    pub async fn delete_secret(&self, id: Uuid) -> Result<(), ClientError> {
        self.send_empty::<()>(Method::DELETE, &format!("/api/secret/{id}"), None)
            .await
    }

    pub async fn add_tag(&self, id: Uuid, tag: &str) -> Result<(), ClientError> {
        self.send_empty(
            Method::POST,
            &format!("/api/secret/tag/{id}"),
            Some(&TagRequest {
                tag: tag.to_string(),
            }),
        )
        .await
    }

    pub async fn delete_tag(&self, id: Uuid, tag: &str) -> Result<(), ClientError> {
        self.send_empty(
            Method::DELETE,
            &format!("/api/secret/tag/{id}"),
            Some(&TagRequest {
                tag: tag.to_string(),
            }),
        )
        .await
    }
}
