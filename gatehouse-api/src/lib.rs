//! # Gatehouse API Server Library
//!
//! HTTP surface of the Gatehouse account lifecycle.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `envelope`: JSend response envelope
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Session identity and JSON body extractors
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `seed`: Demo accounts

pub mod app;
pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod seed;
