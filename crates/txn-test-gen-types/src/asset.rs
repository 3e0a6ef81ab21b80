//! Token quantities such as `"1.0000 CUR"`.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a symbol code.
pub const MAX_SYMBOL_CODE_LENGTH: usize = 7;
/// Maximum number of decimal places in an asset.
pub const MAX_PRECISION: u8 = 18;

/// A token symbol: a precision in the low byte and up to seven upper-case
/// letters in the bytes above it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(u64);

impl Symbol {
    /// Creates a symbol from a precision and code.
    pub fn new(precision: u8, code: &str) -> TypesResult<Self> {
        if precision > MAX_PRECISION {
            return Err(TypesError::InvalidAsset(format!(
                "precision {precision} exceeds {MAX_PRECISION}"
            )));
        }
        if code.is_empty()
            || code.len() > MAX_SYMBOL_CODE_LENGTH
            || !code.bytes().all(|c| c.is_ascii_uppercase())
        {
            return Err(TypesError::InvalidAsset(format!("bad symbol code {code:?}")));
        }
        let mut value = u64::from(precision);
        for (i, c) in code.bytes().enumerate() {
            value |= u64::from(c) << (8 * (i + 1));
        }
        Ok(Self(value))
    }

    pub fn precision(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// The symbol code, e.g. `CUR`.
    pub fn code(&self) -> String {
        self.0
            .to_le_bytes()
            .iter()
            .skip(1)
            .take_while(|c| **c != 0)
            .map(|c| char::from(*c))
            .collect()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({},{})", self.precision(), self.code())
    }
}

/// An amount of a token at a fixed precision.
///
/// # Example
///
/// ```rust
/// use txn_test_gen_types::Asset;
///
/// let asset: Asset = "1.0000 CUR".parse().unwrap();
/// assert_eq!(asset.amount(), 10_000);
/// assert_eq!(asset.to_string(), "1.0000 CUR");
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// The amount in the smallest unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }
}

impl FromStr for Asset {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidAsset(s.to_string());
        let (quantity, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let (negative, quantity) = match quantity.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, quantity),
        };
        let (int_part, frac_part) = quantity.split_once('.').unwrap_or((quantity, ""));
        let all_digits = int_part
            .bytes()
            .chain(frac_part.bytes())
            .all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !all_digits {
            return Err(invalid());
        }
        let precision = u8::try_from(frac_part.len()).map_err(|_| invalid())?;
        let symbol = Symbol::new(precision, code.trim())?;

        let digits = format!("{int_part}{frac_part}");
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        Ok(Self {
            amount: if negative { -amount } else { amount },
            symbol,
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = u32::from(self.symbol.precision());
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{sign}{magnitude} {}", self.symbol.code());
        }
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            magnitude / scale,
            magnitude % scale,
            self.symbol.code(),
            width = precision as usize
        )
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({})", self)
    }
}

#[derive(Serialize, Deserialize)]
struct RawAsset {
    amount: i64,
    symbol: Symbol,
}

impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            RawAsset {
                amount: self.amount,
                symbol: self.symbol,
            }
            .serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let raw = RawAsset::deserialize(deserializer)?;
            Ok(Self::new(raw.amount, raw.symbol))
        }
    }
}
