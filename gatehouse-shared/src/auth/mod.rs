/// Authentication primitives
///
/// This module provides the credential and session building blocks for Gatehouse:
///
/// # Modules
///
/// - [`credential`]: Argon2id credential store (hash, verify, dummy verification)
/// - [`session_token`]: Opaque session token generation and hashing
/// - [`identity`]: The requester's identity (`Anonymous` or `Authenticated`)
/// - [`session`]: Session authority (login, logout, reauth, identity resolution)
/// - [`authorization`]: Role and ownership checks
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id, 64 MB memory, 3 iterations by default
/// - **Session Tokens**: 256 bits of randomness, stored only as SHA-256 hashes
/// - **Uniform Failures**: unknown accounts are verified against a dummy hash
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::credential::{CredentialParams, CredentialStore};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = CredentialStore::new(CredentialParams::minimal())?;
/// let hash = store.hash("user_password")?;
/// assert!(store.verify("user_password", &hash));
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod credential;
pub mod identity;
pub mod session;
pub mod session_token;
