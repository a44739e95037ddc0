//! Password hashing and verification.

use crate::errors::Error;

/// Default bcrypt work factor, overridable via `auth.native.password.bcrypt_cost`.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password using bcrypt with the given work factor.
pub fn hash_string_with_cost(input: &str, cost: u32) -> Result<String, Error> {
    bcrypt::hash(input, cost).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })
}

/// Hash a password using bcrypt with the default work factor.
pub fn hash_string(input: &str) -> Result<String, Error> {
    hash_string_with_cost(input, DEFAULT_BCRYPT_COST)
}

/// Verify a password against a stored bcrypt hash.
///
/// Note: verification uses the work factor embedded in the hash itself.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    bcrypt::verify(input, hash).map_err(|e| Error::Internal {
        operation: format!("verify password: {e}"),
    })
}
