//! Session tokens and identity resolution.
//!
//! - `POST /api/register` creates an account and returns a JWT
//! - `POST /api/login` verifies credentials and returns a JWT
//! - [`with_identity`] resolves `Authorization: Bearer <jwt>` into an
//!   [`AuthUser`] request extension for the secret handlers
//!
//! The middleware never rejects a request on its own: a missing or invalid
//! token resolves to an absent identity, and the vault layer answers with
//! the same "not authorized" error it uses for ownership mismatches.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::routes::AppState;
use super::secrets::{fail, ok, vault_error_response};
use super::types::{ApiResponse, AuthRequest, SessionResponse};
use crate::config::Config;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Subject: the user id
    sub: String,
    /// Token id
    jti: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The caller's resolved identity; `None` when the request carried no valid
/// session token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Option<Uuid>);

fn issue_jwt(config: &Config, user_id: Uuid) -> Result<SessionResponse, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::seconds(config.jwt_ttl_seconds.max(1));
    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(SessionResponse {
        token,
        exp: claims.exp,
    })
}

fn verify_jwt(token: &str, secret: &str) -> Option<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Resolve the caller's identity from the Authorization header.
pub fn resolve_identity(config: &Config, headers: &HeaderMap) -> Option<Uuid> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return None;
    }

    let claims = verify_jwt(token, &config.jwt_secret)?;
    match Uuid::parse_str(&claims.sub) {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            tracing::info!("session token carried a malformed subject");
            None
        }
    }
}

/// Middleware attaching the resolved identity to the request.
pub async fn with_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = resolve_identity(&state.config, req.headers());
    if let Some(user_id) = identity {
        tracing::debug!(%user_id, "authorized request by session token");
    }
    req.extensions_mut().insert(AuthUser(identity));
    next.run(req).await
}

/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), Response> {
    let user = state
        .vault
        .register(&req.login, &req.password)
        .await
        .map_err(vault_error_response)?;

    tracing::info!(login = %user.login, "registered new user");

    let session = issue_jwt(&state.config, user.id)
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(ok(StatusCode::CREATED, session))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), Response> {
    let user = state
        .vault
        .login(&req.login, &req.password)
        .await
        .map_err(vault_error_response)?;

    let session = issue_jwt(&state.config, user.id)
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(ok(StatusCode::OK, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config::new(PathBuf::from(":memory:"), "test-secret".to_string())
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_resolves_to_the_same_user() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let session = issue_jwt(&config, user_id).unwrap();
        let resolved = resolve_identity(&config, &bearer_headers(&session.token));

        assert_eq!(resolved, Some(user_id));
    }

    #[test]
    fn missing_or_garbage_token_resolves_to_no_identity() {
        let config = test_config();

        assert_eq!(resolve_identity(&config, &HeaderMap::new()), None);
        assert_eq!(
            resolve_identity(&config, &bearer_headers("not-a-jwt")),
            None
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = "different-secret".to_string();

        let session = issue_jwt(&other, Uuid::new_v4()).unwrap();
        assert_eq!(
            resolve_identity(&config, &bearer_headers(&session.token)),
            None
        );
    }
}
