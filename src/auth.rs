// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! API token verification.
//!
//! Every endpoint except `/health` requires the configured token, presented
//! as `Authorization: Bearer <token>` or `X-Api-Key: <token>`. Both sides
//! are hashed before comparison and compared in constant time, so neither
//! token length nor a prefix match leaks through timing.

use axum::http::HeaderMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 digest of the configured token, precomputed at startup.
pub type TokenDigest = [u8; 32];

/// Hash a token for later constant-time comparison.
pub fn token_digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

/// Check a presented token against the configured digest.
pub fn verify_token(presented: &str, expected: &TokenDigest) -> bool {
    let presented = token_digest(presented);
    bool::from(presented.ct_eq(expected))
}

/// Pull the token out of the request headers, if any.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get("authorization") {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
    }
    headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Generate a fresh API token: 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
