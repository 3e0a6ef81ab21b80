//! Ed25519 keys and signatures used to authorize transactions.

use crate::checksum::Checksum256;
use crate::error::{TypesError, TypesResult};
use ed25519_dalek::{Signer as DalekSigner, Verifier as DalekVerifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ed25519 private key length in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;
/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;
/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// An Ed25519 private key.
///
/// # Example
///
/// ```rust
/// use txn_test_gen_types::{Checksum256, PrivateKey};
///
/// let key = PrivateKey::regenerate(&Checksum256::hash("a".repeat(64)));
/// let digest = Checksum256::hash(b"hello");
/// let signature = key.sign_digest(&digest);
/// assert!(key.public_key().verify_digest(&digest, &signature).is_ok());
/// ```
#[derive(Clone)]
pub struct PrivateKey {
    inner: ed25519_dalek::SigningKey,
}

impl PrivateKey {
    /// Deterministically derives a key from a 32-byte seed.
    pub fn regenerate(seed: &Checksum256) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed.as_bytes()),
        }
    }

    /// Creates a private key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> TypesResult<Self> {
        let key_bytes: [u8; PRIVATE_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            TypesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&key_bytes),
        })
    }

    /// Creates a private key from a hex string.
    pub fn from_hex(hex_str: &str) -> TypesResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)
            .map_err(|e| TypesError::InvalidPrivateKey(format!("not valid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Returns the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Signs a digest.
    pub fn sign_digest(&self, digest: &Checksum256) -> Signature {
        Signature {
            inner: self.inner.sign(digest.as_bytes()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// An Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    /// Creates a public key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> TypesResult<Self> {
        let key_bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidPublicKey(format!("got {} bytes", bytes.len())))?;
        let inner = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| TypesError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.inner.to_bytes()
    }

    /// Verifies a signature over a digest.
    pub fn verify_digest(&self, digest: &Checksum256, signature: &Signature) -> TypesResult<()> {
        self.inner
            .verify(digest.as_bytes(), &signature.inner)
            .map_err(|e| TypesError::InvalidSignature(e.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.inner.as_bytes()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(self.inner.as_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?
        } else {
            Vec::<u8>::deserialize(deserializer)?
        };
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// An Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.inner.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> TypesResult<Self> {
        let sig_bytes: [u8; SIGNATURE_LENGTH] = bytes.try_into().map_err(|_| {
            TypesError::InvalidSignature(format!("got {} bytes", bytes.len()))
        })?;
        Ok(Self {
            inner: ed25519_dalek::Signature::from_bytes(&sig_bytes),
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
