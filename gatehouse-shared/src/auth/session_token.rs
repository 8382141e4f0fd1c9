/// Opaque session tokens
///
/// A session token is handed to the client once, at login, and travels back in
/// the session cookie or an `Authorization: Bearer` header. The server only
/// stores its SHA-256 hash, so a leaked `sessions` table cannot be replayed.
///
/// # Token Format
///
/// Tokens follow the pattern `ghs_{43_chars}` (47 chars total)
/// - Prefix: "ghs_" (4 chars)
/// - Random part: 43 alphanumeric chars (base62: [A-Za-z0-9]), about 256 bits
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::session_token::{
///     generate_session_token, hash_session_token, validate_session_token_format,
/// };
///
/// let (token, hash) = generate_session_token();
/// assert!(token.starts_with("ghs_"));
/// assert!(validate_session_token_format(&token));
/// assert_eq!(hash_session_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the token (characters)
const TOKEN_RANDOM_LENGTH: usize = 43;

/// Session token prefix
const TOKEN_PREFIX: &str = "ghs_";

/// Total length of a session token (prefix + random)
pub const SESSION_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a new session token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_session_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_session_token(&token);

    (token, hash)
}

/// Hashes a session token using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validates session token format
///
/// Checks the prefix, the total length and that the random part is ASCII
/// alphanumeric. Malformed tokens are treated as anonymous without a store
/// lookup.
pub fn validate_session_token_format(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let (token1, hash1) = generate_session_token();
        let (token2, hash2) = generate_session_token();

        assert!(token1.starts_with("ghs_"));
        assert_eq!(token1.len(), SESSION_TOKEN_LENGTH);

        assert_ne!(token1, token2);
        assert_ne!(hash1, hash2);

        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hash = hash_session_token("ghs_test");
        assert_eq!(hash, hash_session_token("ghs_test"));
        assert_ne!(hash, hash_session_token("ghs_other"));
    }

    #[test]
    fn test_validate_session_token_format() {
        let (token, _) = generate_session_token();
        assert!(validate_session_token_format(&token));

        // Wrong prefix
        assert!(!validate_session_token_format(&token.replacen("ghs_", "xyz_", 1)));

        // Too short
        assert!(!validate_session_token_format("ghs_short"));

        // Special characters
        let tampered = format!("ghs_{}!", &token[4..token.len() - 1]);
        assert!(!validate_session_token_format(&tampered));

        // Multi-byte input of the right byte length must not panic
        let unicode = format!("ghs_{}a", "é".repeat(21));
        assert!(!validate_session_token_format(&unicode));
    }
}
