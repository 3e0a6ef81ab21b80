//! Account and action names.
//!
//! Names are packed into a `u64`: up to 12 characters from `.12345a-z` at
//! 5 bits each, plus an optional 13th character from `.12345a-j` in the low
//! 4 bits.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum number of characters in a name.
pub const MAX_NAME_LENGTH: usize = 13;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A packed account, action or permission name.
///
/// # Example
///
/// ```rust
/// use txn_test_gen_types::Name;
///
/// let name: Name = "txn.test.a".parse().unwrap();
/// assert_eq!(name.to_string(), "txn.test.a");
/// assert!("Txn.Test".parse::<Name>().is_err());
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    /// The empty name.
    pub const EMPTY: Self = Self(0);

    /// Creates a name from its packed representation.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Returns the packed representation.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Packs a compile-time name. Panics on invalid input, so this is only
    /// meant for constants.
    pub const fn from_static(s: &str) -> Self {
        match pack(s.as_bytes()) {
            Some(value) => Self(value),
            None => panic!("invalid name"),
        }
    }

    /// Parses and validates a name.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidName`] if the name is too long, contains
    /// characters outside the name alphabet or ends in `.`.
    pub fn parse(s: &str) -> TypesResult<Self> {
        let value = pack(s.as_bytes()).ok_or_else(|| TypesError::InvalidName(s.to_string()))?;
        let name = Self(value);
        // Trailing dots are not representable, so they would not round-trip.
        if name.to_string() != s {
            return Err(TypesError::InvalidName(s.to_string()));
        }
        Ok(name)
    }
}

const fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

const fn pack(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > MAX_NAME_LENGTH {
        return None;
    }
    let mut value: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let symbol = match char_to_symbol(bytes[i]) {
            Some(symbol) => symbol,
            None => return None,
        };
        if i < 12 {
            value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
        } else {
            if symbol > 0x0f {
                return None;
            }
            value |= symbol;
        }
        i += 1;
    }
    Some(value)
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LENGTH];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LENGTH {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[MAX_NAME_LENGTH - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|c| *c != b'.').map_or(0, |p| p + 1);
        // Every byte comes from CHARMAP, which is ASCII.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl FromStr for Name {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::parse(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Self(u64::deserialize(deserializer)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(Name::parse("").unwrap(), Name::EMPTY);
        assert_eq!(Name::from_static("eosio").as_u64(), 0x5530_ea00_0000_0000);
        assert_eq!(Name::from_static("active").as_u64(), 0x3232_eda8_0000_0000);
    }

    #[test]
    fn test_display_trims_trailing_dots() {
        let name = Name::from_static("txn.test.t");
        assert_eq!(name.to_string(), "txn.test.t");
        assert_eq!(format!("{:?}", name), "Name(txn.test.t)");
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert!(Name::parse("Txn").is_err());
        assert!(Name::parse("txn.test.6").is_err());
        assert!(Name::parse("abcdefghijklmn").is_err());
        assert!(Name::parse("trailing.").is_err());
        // The 13th character only has 4 bits available.
        assert!(Name::parse("aaaaaaaaaaaaz").is_err());
        assert!(Name::parse("aaaaaaaaaaaaj").is_ok());
    }

    #[test]
    fn test_serde_formats() {
        let name = Name::from_static("txn.test.a");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"txn.test.a\"");
        let bytes = bcs::to_bytes(&name).unwrap();
        assert_eq!(bytes, name.as_u64().to_le_bytes().to_vec());
        assert_eq!(bcs::from_bytes::<Name>(&bytes).unwrap(), name);
    }

    proptest! {
        #[test]
        fn prop_valid_names_round_trip(s in "[a-z1-5]{1,12}") {
            let name = Name::parse(&s).unwrap();
            prop_assert_eq!(name.to_string(), s);
        }
    }
}
