//! # Pagesync Codec
//!
//! Canonical encoding and content digests for synchronized records.
//!
//! Records pulled from a remote API are normalized into JSON. To decide
//! whether a record changed since the last pass, the normalized JSON is
//! fingerprinted. This crate makes that fingerprint deterministic:
//! - Identical data produces identical bytes regardless of key order
//! - Cross-platform consistency
//! - Stable hashing across processes and releases
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (length-first, then bytewise on the encoded key)
//! - Integers use shortest encoding
//! - Floats are 64-bit doubles; NaN and infinities are rejected
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use pagesync_codec::content_digest;
//! use serde_json::json;
//!
//! let a = content_digest(&json!({"name": "Mug", "active": true})).unwrap();
//! let b = content_digest(&json!({"active": true, "name": "Mug"})).unwrap();
//! assert_eq!(a, b);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod digest;
mod encoder;
mod error;
mod value;

pub use digest::{content_digest, CanonicalSha256, Digest, Digester};
pub use encoder::{to_canonical_cbor, CanonicalEncoder, MAX_DEPTH};
pub use error::{CodecError, CodecResult};
pub use value::Value;
