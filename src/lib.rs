//! # keepsake
//!
//! Self-hosted personal secret vault. A server stores user-owned secrets of
//! four kinds (login credentials, free-text notes, binary blobs, bank cards)
//! behind password authentication; the client can additionally encrypt
//! payload fields end-to-end so the server only ever holds ciphertext it
//! cannot read.
//!
//! ## Architecture
//!
//! ```text
//!   keepsake (CLI) ──┐
//!                    │  JSON over HTTP, Bearer session token
//!                    ▼
//!        ┌──────────────────────┐
//!        │   api (axum router)  │   identity resolution
//!        ├──────────────────────┤
//!        │   vault (service)    │   authorization gate, kind checks
//!        ├──────────────────────┤
//!        │  storage (SQLite)    │   root + value rows, tags, users
//!        └──────────────────────┘
//! ```
//!
//! End-to-end encryption (`crypto`) runs only in the client: payload fields
//! are sealed before transmission and opened after retrieval.
//!
//! ## Modules
//! - `storage`: entities and the relational store with kind-dispatched value rows
//! - `vault`: business operations gated on ownership
//! - `crypto`: the per-field AEAD envelope
//! - `api`: HTTP surface (routes, auth, wire types)
//! - `client`: typed API client used by the CLI

pub mod api;
pub mod client;
pub mod config;
pub mod crypto;
pub mod storage;
pub mod vault;

pub use config::Config;
