//! Secret endpoints: create, load, edit, rename, describe, delete, tag.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{
    ApiResponse, BankCardPayload, BlobPayload, CreateSecretRequest, CreatedSecretResponse,
    CredentialsPayload, DescriptionRequest, NotePayload, RenameRequest, SecretResponse, TagRequest,
};
use crate::storage::{SecretValue, StorageError};
use crate::vault::VaultError;

/// Wrap a result in the response envelope.
pub fn ok<T>(code: StatusCode, result: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (code, Json(ApiResponse::ok(result)))
}

/// A successful response with no payload.
pub fn ok_empty(code: StatusCode) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        code,
        Json(ApiResponse {
            success: true,
            result: None,
            error: None,
        }),
    )
}

/// An error response in the envelope.
pub fn fail(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ApiResponse::<()>::err(message))).into_response()
}

/// Map a vault error onto an HTTP status.
///
/// The 409-vs-500 distinction for duplicates is load-bearing for callers;
/// authorization failures never reveal whether the secret exists.
pub fn vault_error_response(err: VaultError) -> Response {
    match &err {
        VaultError::EmptyLogin | VaultError::EmptyPassword => {
            fail(StatusCode::BAD_REQUEST, err.to_string())
        }
        VaultError::AuthFailed | VaultError::NoAuth => {
            fail(StatusCode::UNAUTHORIZED, err.to_string())
        }
        VaultError::Storage(storage_err) => match storage_err {
            StorageError::NotFound => fail(StatusCode::NOT_FOUND, err.to_string()),
            StorageError::DuplicateUser | StorageError::DuplicateSecret => {
                fail(StatusCode::CONFLICT, err.to_string())
            }
            StorageError::WrongKind | StorageError::InvalidKind => {
                fail(StatusCode::BAD_REQUEST, err.to_string())
            }
            StorageError::Backend(_) | StorageError::Task(_) => {
                tracing::error!(error = %err, "storage failure");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error")
            }
        },
    }
}

/// GET /api/secret/list
pub async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<SecretResponse>>>), Response> {
    let secrets = state
        .vault
        .secrets(identity)
        .await
        .map_err(vault_error_response)?;

    let list = secrets.iter().map(SecretResponse::from_secret).collect();
    Ok(ok(StatusCode::OK, list))
}

/// GET /api/secret/{id}
pub async fn get_secret(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<SecretResponse>>), Response> {
    let secret = state
        .vault
        .secret_by_id(identity, id)
        .await
        .map_err(vault_error_response)?;

    Ok(ok(StatusCode::OK, SecretResponse::from_secret(&secret)))
}

/// DELETE /api/secret/{id}
pub async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .delete_secret(identity, id)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/{id}/rename
pub async fn rename_secret(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .rename_secret(identity, id, &req.name)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/{id}/description
pub async fn change_description(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<DescriptionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .change_secret_description(identity, id, req.description.as_deref())
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

async fn create_secret(
    state: &AppState,
    identity: Option<Uuid>,
    name: String,
    description: Option<String>,
    is_encrypted: bool,
    value: SecretValue,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSecretResponse>>), Response> {
    let secret = state
        .vault
        .create_secret(identity, name, description, is_encrypted, value)
        .await
        .map_err(vault_error_response)?;

    Ok(ok(
        StatusCode::CREATED,
        CreatedSecretResponse { id: secret.id },
    ))
}

/// POST /api/secret/create/credentials
pub async fn create_credentials(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Json(req): Json<CreateSecretRequest<CredentialsPayload>>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSecretResponse>>), Response> {
    create_secret(
        &state,
        identity,
        req.name,
        req.description,
        req.is_encrypted,
        req.value.into(),
    )
    .await
}

/// POST /api/secret/create/note
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Json(req): Json<CreateSecretRequest<NotePayload>>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSecretResponse>>), Response> {
    create_secret(
        &state,
        identity,
        req.name,
        req.description,
        req.is_encrypted,
        req.value.into(),
    )
    .await
}

/// POST /api/secret/create/blob
pub async fn create_blob(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Json(req): Json<CreateSecretRequest<BlobPayload>>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSecretResponse>>), Response> {
    create_secret(
        &state,
        identity,
        req.name,
        req.description,
        req.is_encrypted,
        req.value.into(),
    )
    .await
}

/// POST /api/secret/create/bank_card
pub async fn create_bank_card(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Json(req): Json<CreateSecretRequest<BankCardPayload>>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSecretResponse>>), Response> {
    create_secret(
        &state,
        identity,
        req.name,
        req.description,
        req.is_encrypted,
        req.value.into(),
    )
    .await
}

/// POST /api/secret/edit/credentials/{id}
pub async fn edit_credentials(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<CredentialsPayload>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .edit_secret_credentials(identity, id, &req.login, &req.password)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/edit/note/{id}
pub async fn edit_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotePayload>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .edit_secret_note(identity, id, &req.body)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/edit/blob/{id}
pub async fn edit_blob(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<BlobPayload>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .edit_secret_blob(identity, id, &req.body)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/edit/bank_card/{id}
pub async fn edit_bank_card(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<BankCardPayload>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .edit_secret_bank_card(identity, id, &req.name, &req.number, &req.date, &req.cvv)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// POST /api/secret/tag/{id}
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<TagRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .add_tag(identity, id, &req.tag)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}

/// DELETE /api/secret/tag/{id}
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<TagRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), Response> {
    state
        .vault
        .delete_tag(identity, id, &req.tag)
        .await
        .map_err(vault_error_response)?;

    Ok(ok_empty(StatusCode::OK))
}
