/// Credential store using Argon2id
///
/// Passwords are hashed with Argon2id into PHC strings. The cost parameters are
/// configurable; verification reads them back from the stored hash, so raising
/// the cost only affects newly set credentials.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB) by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash
///
/// Verification never fails loudly: a missing or malformed stored hash simply
/// does not verify. When no account matches a login identifier, the store still
/// runs a full verification against a dummy hash so that "unknown account" and
/// "wrong password" take the same time.
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::credential::{CredentialParams, CredentialStore};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = CredentialStore::new(CredentialParams::minimal())?;
///
/// let hash = store.hash("super_secret_password_123")?;
/// assert!(store.verify("super_secret_password_123", &hash));
/// assert!(!store.verify("wrong_password", &hash));
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

use crate::models::account::Account;

/// Error type for credential operations
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The configured Argon2 parameters are rejected by the algorithm
    #[error("Invalid credential parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for CredentialParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl CredentialParams {
    /// Smallest practical parameters, for local development and test suites only
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn build(&self) -> Result<Params, CredentialError> {
        ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))
    }
}

/// Hashes and verifies account credentials
///
/// Cheap to clone; the dummy hash is shared.
#[derive(Clone)]
pub struct CredentialStore {
    params: Params,
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl CredentialStore {
    /// Creates a credential store with the given cost parameters
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::InvalidParams` if Argon2 rejects the parameters.
    pub fn new(params: CredentialParams) -> Result<Self, CredentialError> {
        let params = params.build()?;
        let mut store = Self {
            params,
            dummy_hash: Arc::from(""),
        };

        let filler = SaltString::generate(&mut OsRng);
        store.dummy_hash = Arc::from(store.hash(filler.as_str())?);

        Ok(store)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a plaintext password into a PHC string
    ///
    /// Example output:
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::HashError` if hashing fails
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a plaintext password against a stored PHC string
    ///
    /// Returns `false` for a wrong password, an empty stored hash, or a hash
    /// that cannot be parsed.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Stored credential is not a valid PHC string");
                self.verify_unknown(plaintext);
                return false;
            }
        };

        // Parameters are embedded in the hash
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns one verification against the dummy hash; always `false`
    ///
    /// Used when no account matches a login identifier.
    pub fn verify_unknown(&self, plaintext: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_hash) {
            let _ = Argon2::default().verify_password(plaintext.as_bytes(), &parsed);
        }
        false
    }

    /// Derives a new credential for the account, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::HashError` if hashing fails; the account is
    /// left untouched in that case.
    pub fn set_credential(&self, account: &mut Account, plaintext: &str) -> Result<(), CredentialError> {
        account.password_hash = self.hash(plaintext)?;
        Ok(())
    }

    /// Verifies a plaintext password against the account's credential
    pub fn verify_credential(&self, account: &Account, plaintext: &str) -> bool {
        if account.password_hash.is_empty() {
            return self.verify_unknown(plaintext);
        }
        self.verify(plaintext, &account.password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::NewAccount;

    fn store() -> CredentialStore {
        CredentialStore::new(CredentialParams::minimal()).expect("store should build")
    }

    fn account() -> Account {
        Account::from_new(NewAccount::member("demo", "demo@example.com", String::new()))
    }

    #[test]
    fn test_hash_uses_configured_params() {
        let hash = store().hash("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=1024"));
        assert!(hash.contains("t=1"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_default_params_match_production_cost() {
        let params = CredentialParams::default();
        assert_eq!(params.memory_kib, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 4);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = CredentialStore::new(CredentialParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(CredentialError::InvalidParams(_))));
    }

    #[test]
    fn test_hash_produces_different_salts() {
        let store = store();
        let hash1 = store.hash("same_password").unwrap();
        let hash2 = store.hash("same_password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_set_then_verify_credential() {
        let store = store();
        let mut account = account();

        store.set_credential(&mut account, "default").unwrap();

        assert!(store.verify_credential(&account, "default"));
        assert!(!store.verify_credential(&account, "Default"));
        assert!(!store.verify_credential(&account, ""));
        assert!(!account.password_hash.contains("default"));
    }

    #[test]
    fn test_previous_password_rejected_after_change() {
        let store = store();
        let mut account = account();

        store.set_credential(&mut account, "first-password").unwrap();
        store.set_credential(&mut account, "second-password").unwrap();

        assert!(!store.verify_credential(&account, "first-password"));
        assert!(store.verify_credential(&account, "second-password"));
    }

    #[test]
    fn test_missing_credential_never_verifies() {
        let store = store();
        let account = account();

        assert!(!store.verify_credential(&account, ""));
        assert!(!store.verify_credential(&account, "anything"));
    }

    #[test]
    fn test_malformed_hash_returns_false() {
        let store = store();
        assert!(!store.verify("password", "invalid_hash"));
        assert!(!store.verify("password", "$argon2id$invalid"));
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        let store = store();
        assert!(!store.verify_unknown("default"));
        assert!(!store.verify_unknown(""));
    }

    #[test]
    fn test_unicode_roundtrip() {
        let store = store();
        for password in ["with spaces", "unicode-密码-パスワード", "with-special-chars!@#$%"] {
            let hash = store.hash(password).unwrap();
            assert!(store.verify(password, &hash), "Password '{}' should verify", password);
        }
    }
}
