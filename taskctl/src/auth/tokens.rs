//! Generation and hashing of single-use auth tokens.
//!
//! These are the opaque strings mailed to users for email verification and
//! password resets. Only their SHA-256 digest is persisted.

use sha2::{Digest, Sha256};

use rand::prelude::RngExt;
use rand::rng;

use crate::types::UserId;

/// Generate a plaintext auth token for a user.
///
/// The token is 64 cryptographically secure random bytes, hex-encoded, with
/// the owning user's UUID appended so the owner can be recovered from the
/// plaintext alone.
pub fn generate_token(user_id: UserId) -> String {
    let mut token_bytes = [0u8; 64];
    rng().fill(&mut token_bytes);

    let random_part: String = token_bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}{}", random_part, user_id.simple())
}

/// SHA-256 digest of a plaintext token, hex-encoded. This is what gets stored.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_generate_token_shape() {
        let user_id = Uuid::new_v4();
        let token = generate_token(user_id);

        // 64 bytes hex-encoded plus 32 chars of simple uuid
        assert_eq!(token.len(), 128 + 32);
        assert!(token.ends_with(&user_id.simple().to_string()));
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let user_id = Uuid::new_v4();
        assert_ne!(generate_token(user_id), generate_token(user_id));
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        let token = generate_token(Uuid::new_v4());
        let hash = hash_token(&token);

        assert_eq!(hash, hash_token(&token));
        assert_eq!(hash.len(), 64); // sha256 hex
        assert_ne!(hash, hash_token("different"));
    }
}
