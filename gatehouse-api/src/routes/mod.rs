/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `session`: Login, logout, re-authentication
/// - `users`: Registration, accounts, recovery and activation
/// - `meta`: Contact form

pub mod health;
pub mod meta;
pub mod session;
pub mod users;
