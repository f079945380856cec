//! Identity digests.
//!
//! These hashes compress and anonymize collected data. They identify a
//! device; they do not protect anything.

use crate::error::DigestError;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Digest algorithm selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// SHA-256, always available.
    #[default]
    Sha256,
    /// MD5 for compatibility with older stored digests.
    ///
    /// Only available with the `legacy-digest` feature; otherwise SHA-256
    /// is used instead.
    Md5,
}

impl Algorithm {
    /// Whether this algorithm is compiled into the current build.
    pub fn is_available(self) -> bool {
        match self {
            Algorithm::Sha256 => true,
            Algorithm::Md5 => cfg!(feature = "legacy-digest"),
        }
    }
}

/// SHA-256 hex digest of `input`.
pub fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hex digest of `input` using the requested algorithm.
///
/// An unavailable algorithm falls back to SHA-256.
pub fn digest_with(algorithm: Algorithm, input: &str) -> String {
    match algorithm {
        Algorithm::Sha256 => digest(input),
        Algorithm::Md5 => legacy_md5(input),
    }
}

#[cfg(feature = "legacy-digest")]
fn legacy_md5(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(not(feature = "legacy-digest"))]
fn legacy_md5(input: &str) -> String {
    tracing::debug!("md5 not compiled in, using sha-256");
    digest(input)
}

/// Digest of the JSON form of `value`.
pub fn anonymize<T: Serialize + ?Sized>(value: &T) -> Result<String, DigestError> {
    let json = serde_json::to_string(value)?;
    Ok(digest(&json))
}

/// Short unique identifier: base36 millisecond timestamp plus a random suffix.
pub fn unique_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: u64 = rand::thread_rng().gen();
    format!("{}-{}", to_base36(millis), to_base36(suffix))
}

/// Whether two fingerprint digests identify the same device.
pub fn same_device(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn to_base36(mut value: u64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
