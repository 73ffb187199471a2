//! HTTP API for the vault.
//!
//! ## Endpoints
//!
//! - `POST /api/register` - Create an account, returns a session token
//! - `POST /api/login` - Authenticate, returns a session token
//! - `GET /api/secret/list` - All of the caller's secrets
//! - `GET /api/secret/{id}` - One secret with its value
//! - `DELETE /api/secret/{id}` - Delete a secret
//! - `POST /api/secret/{id}/rename` - Rename a secret
//! - `POST /api/secret/{id}/description` - Replace the description
//! - `POST /api/secret/create/{kind}` - Create a secret of the given kind
//! - `POST /api/secret/edit/{kind}/{id}` - Overwrite a secret's payload
//! - `POST /api/secret/tag/{id}` - Attach a tag
//! - `DELETE /api/secret/tag/{id}` - Remove a tag

pub mod auth;
mod routes;
pub mod secrets;
pub mod types;

pub use routes::{router, serve, AppState};
