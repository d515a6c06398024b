//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Maximum nesting depth accepted by the encoder.
pub const MAX_DEPTH: usize = 128;

/// Encode a value to canonical CBOR bytes.
///
/// The output is deterministic, following RFC 8949 Section 4.2.1:
/// - Map keys are sorted by their encoded form (length-first, then bytewise)
/// - Integers use the shortest possible encoding
/// - No indefinite-length encoding
/// - Floats are always written as 64-bit doubles, with `-0.0` folded to `0.0`
///
/// # Errors
///
/// Returns an error if the value contains a NaN or infinite float, or nests
/// deeper than [`MAX_DEPTH`].
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder.
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            depth: 0,
        }
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(b) => self.buffer.push(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Unsigned(n) => self.encode_unsigned(0, *n),
            Value::Float(f) => self.encode_float(*f)?,
            Value::Text(s) => self.encode_text(s),
            Value::Array(items) => self.nested(|enc| enc.encode_array(items))?,
            Value::Map(pairs) => self.nested(|enc| enc.encode_map(pairs))?,
        }
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<()>) -> CodecResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // -(n+1) is in [0, 2^63-1] for every negative n
            self.encode_unsigned(1, (-(n + 1)) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_float(&mut self, f: f64) -> CodecResult<()> {
        if !f.is_finite() {
            return Err(CodecError::NonFiniteFloat(f));
        }
        let f = if f == 0.0 { 0.0 } else { f };
        self.buffer.push(0xfb);
        self.buffer.extend_from_slice(&f.to_bits().to_be_bytes());
        Ok(())
    }

    fn encode_text(&mut self, text: &str) {
        self.encode_unsigned(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    fn encode_array(&mut self, items: &[Value]) -> CodecResult<()> {
        self.encode_unsigned(4, items.len() as u64);
        for item in items {
            self.encode(item)?;
        }
        Ok(())
    }

    fn encode_map(&mut self, pairs: &[(String, Value)]) -> CodecResult<()> {
        let mut encoded_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let mut key_encoder = CanonicalEncoder::new();
            key_encoder.encode_text(key);
            encoded_pairs.push((key_encoder.into_bytes(), value));
        }

        encoded_pairs.sort_by(|a, b| match a.0.len().cmp(&b.0.len()) {
            std::cmp::Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        self.encode_unsigned(5, pairs.len() as u64);
        for (encoded_key, value) in encoded_pairs {
            self.buffer.extend_from_slice(&encoded_key);
            self.encode(value)?;
        }
        Ok(())
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}
