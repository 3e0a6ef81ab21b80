//! Error types for the ledger primitives.

use std::fmt;
use thiserror::Error;

/// A specialized Result type for ledger primitive operations.
pub type TypesResult<T> = Result<T, TypesError>;

/// Errors raised while parsing, encoding or signing ledger primitives.
#[derive(Error, Debug)]
pub enum TypesError {
    /// Account or action name that cannot be encoded
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Malformed asset quantity such as `"1.0000 CUR"`
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature bytes of the wrong length, or a signature that does not verify
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Digest or identifier of the wrong length
    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Error occurred during BCS serialization/deserialization
    #[error("BCS error: {0}")]
    Bcs(String),

    /// Error occurred during hex encoding/decoding
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl TypesError {
    /// Creates a new BCS error
    pub fn bcs<E: fmt::Display>(err: E) -> Self {
        Self::Bcs(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypesError::InvalidName("TXN.TEST".to_string());
        assert_eq!(err.to_string(), "Invalid name: TXN.TEST");
    }

    #[test]
    fn test_bcs_error() {
        let err = TypesError::bcs("unexpected end of input");
        assert!(matches!(err, TypesError::Bcs(_)));
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
