//! SHA-256 digests and the identifiers built on top of them.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The length of a checksum in bytes.
pub const CHECKSUM_LENGTH: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum256([u8; CHECKSUM_LENGTH]);

impl Checksum256 {
    /// The all-zero digest.
    pub const ZERO: Self = Self([0u8; CHECKSUM_LENGTH]);

    /// Creates a checksum from a byte array.
    pub const fn new(bytes: [u8; CHECKSUM_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Computes the SHA-256 hash of the given data.
    pub fn hash<T: AsRef<[u8]>>(data: T) -> Self {
        Self::hash_of([data])
    }

    /// Computes the SHA-256 hash of multiple byte slices.
    pub fn hash_of<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for item in items {
            hasher.update(item.as_ref());
        }
        let mut bytes = [0u8; CHECKSUM_LENGTH];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Creates a checksum from a hex string (with or without `0x` prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not 64 valid hex characters.
    pub fn from_hex(hex_str: &str) -> TypesResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        if hex_str.len() != CHECKSUM_LENGTH * 2 {
            return Err(TypesError::InvalidChecksum(format!(
                "expected {} hex characters, got {}",
                CHECKSUM_LENGTH * 2,
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; CHECKSUM_LENGTH];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Returns the checksum as a byte slice.
    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LENGTH] {
        &self.0
    }

    /// Returns the checksum as a hex string without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum256({})", self.to_hex())
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Checksum256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Checksum256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Self(<[u8; CHECKSUM_LENGTH]>::deserialize(deserializer)?))
        }
    }
}

impl From<[u8; CHECKSUM_LENGTH]> for Checksum256 {
    fn from(bytes: [u8; CHECKSUM_LENGTH]) -> Self {
        Self(bytes)
    }
}

/// Identifies the chain a transaction is signed for.
pub type ChainId = Checksum256;

/// Identifies a transaction: the hash of its packed body.
pub type TransactionId = Checksum256;

/// A block identifier. The first four bytes hold the block number
/// (big-endian); the remainder is taken from the block digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(Checksum256);

impl BlockId {
    /// Builds the identifier of block `block_num` with the given digest.
    pub fn new(block_num: u32, digest: Checksum256) -> Self {
        let mut bytes = *digest.as_bytes();
        bytes[..4].copy_from_slice(&block_num.to_be_bytes());
        Self(Checksum256(bytes))
    }

    /// The block number encoded in the identifier.
    pub fn block_num(&self) -> u32 {
        let bytes = self.0.as_bytes();
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// The 32-bit prefix transactions use to bind themselves to this block.
    pub fn ref_block_prefix(&self) -> u32 {
        let bytes = self.0.as_bytes();
        u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]])
    }

    pub fn checksum(&self) -> &Checksum256 {
        &self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId(#{} {})", self.block_num(), self.0.to_hex())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A point in time with one second resolution, as seconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimePointSec(u32);

impl TimePointSec {
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// The current wall-clock time, truncated to whole seconds.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(u32::try_from(secs).unwrap_or(u32::MAX))
    }

    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Adds a duration, saturating at the end of the representable range.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let secs = u32::try_from(duration.as_secs()).unwrap_or(u32::MAX);
        Self(self.0.saturating_add(secs))
    }
}
