//! Random single-use tokens. Only the SHA-256 digest is ever stored.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::constants::tokens::{ONE_TIME_TOKEN_BYTES, ONE_TIME_TOKEN_HEX_LEN};

/// A raw token (sent to the user) and the digest kept in the database.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub raw: String,
    pub hash: String,
}

#[must_use]
pub fn generate() -> GeneratedToken {
    let bytes: [u8; ONE_TIME_TOKEN_BYTES] = rand::rng().random();
    let raw = hex::encode(bytes);
    let hash = hash_token(&raw);
    GeneratedToken { raw, hash }
}

#[must_use]
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Cheap shape check before touching the database.
#[must_use]
pub fn is_well_formed(raw: &str) -> bool {
    !raw.is_empty() && raw.len() <= ONE_TIME_TOKEN_HEX_LEN
}
