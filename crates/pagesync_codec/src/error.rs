//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// NaN and infinite floats have no canonical form.
    #[error("non-finite float {0} cannot be canonically encoded")]
    NonFiniteFloat(f64),

    /// Nesting exceeded the encoder's depth limit.
    #[error("value nesting exceeds {limit} levels")]
    TooDeep {
        /// The configured depth limit.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::NonFiniteFloat(f64::INFINITY);
        assert!(err.to_string().contains("inf"));

        let err = CodecError::TooDeep { limit: 128 };
        assert_eq!(err.to_string(), "value nesting exceeds 128 levels");
    }
}
