//! Content digests over normalized record data.

use crate::encoder::to_canonical_cbor;
use crate::error::CodecResult;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt::{self, Write as _};

/// A deterministic fingerprint of normalized record data.
///
/// Stored alongside each record; a write is only necessary when the freshly
/// computed digest differs from the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wraps an already computed digest string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes digests for normalized data.
///
/// Implementations must be deterministic: the same data always yields the
/// same digest, across passes and processes.
pub trait Digester: Send + Sync {
    /// Computes the digest of `data`.
    fn digest(&self, data: &serde_json::Value) -> CodecResult<Digest>;
}

/// SHA-256 over the canonical CBOR encoding of the data, hex encoded.
///
/// Object key order does not affect the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalSha256;

impl Digester for CanonicalSha256 {
    fn digest(&self, data: &serde_json::Value) -> CodecResult<Digest> {
        content_digest(data)
    }
}

/// Computes the canonical SHA-256 digest of `data`.
///
/// # Errors
///
/// Returns an error if the data cannot be canonically encoded.
pub fn content_digest(data: &serde_json::Value) -> CodecResult<Digest> {
    let bytes = to_canonical_cbor(&Value::from(data))?;
    let hash = Sha256::digest(&bytes);

    let mut hex = String::with_capacity(hash.len() * 2);
    for byte in hash.iter() {
        // writing to a String cannot fail
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(Digest(hex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn digest_is_hex_sha256() {
        let digest = content_digest(&json!({"id": "prod_1"})).unwrap();
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_ignores_key_order() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"name":"Mug","price":{"amount":1200,"currency":"usd"}}"#)
                .unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"price":{"currency":"usd","amount":1200},"name":"Mug"}"#)
                .unwrap();
        assert_eq!(content_digest(&a).unwrap(), content_digest(&b).unwrap());
    }

    #[test]
    fn digest_changes_with_content() {
        let a = content_digest(&json!({"name": "Mug", "active": true})).unwrap();
        let b = content_digest(&json!({"name": "Mug", "active": false})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn integer_and_float_differ() {
        let a = content_digest(&json!({"amount": 1})).unwrap();
        let b = content_digest(&json!({"amount": 1.0})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn digester_trait_matches_function() {
        let data = json!({"id": "price_1", "unit_amount": 500});
        assert_eq!(
            CanonicalSha256.digest(&data).unwrap(),
            content_digest(&data).unwrap()
        );
    }

    proptest! {
        #[test]
        fn digest_is_deterministic(
            pairs in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12)
        ) {
            let forward: serde_json::Map<String, serde_json::Value> =
                pairs.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let reversed: serde_json::Map<String, serde_json::Value> =
                pairs.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            let a = content_digest(&serde_json::Value::Object(forward)).unwrap();
            let b = content_digest(&serde_json::Value::Object(reversed)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
