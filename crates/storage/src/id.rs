//! Content-addressed artifact identity.
//!
//! An artifact id is the SHA-256 of the blob contents, with the first 16
//! bytes rendered as a hyphenated UUID. The truncated form keeps the first
//! 8 hex characters; task blobs use it, weight bundles use the full form.
//! Truncation is always stated explicitly at the call site.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Deterministic id for a blob. Pure function of the input bytes.
pub fn artifact_id(data: &[u8], truncate: bool) -> String {
    let digest = Sha256::digest(data);
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    let full = Uuid::from_bytes(head).to_string();
    if truncate {
        full[..8].to_string()
    } else {
        full
    }
}
