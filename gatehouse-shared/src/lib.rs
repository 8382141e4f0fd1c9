//! # Gatehouse Shared Library
//!
//! This crate contains the account lifecycle core used by the Gatehouse API
//! server: credentials, sessions, persistence, mail and the lifecycle
//! controller that ties them together.
//!
//! ## Module Organization
//!
//! - `auth`: Credential hashing, session tokens, identity and the session authority
//! - `db`: Connection pool and migrations
//! - `models`: Account, profile and session records
//! - `store`: Repository traits with PostgreSQL and in-memory implementations
//! - `mail`: Outgoing mail, SMTP and outbox transports
//! - `validation`: Form schemas and per-field error maps
//! - `lifecycle`: Account lifecycle operations

pub mod auth;
pub mod db;
pub mod lifecycle;
pub mod mail;
pub mod models;
pub mod store;
pub mod validation;

/// Current version of the Gatehouse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
