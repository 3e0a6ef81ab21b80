//! Actions and the payloads the load generator places in them.

use crate::asset::Asset;
use crate::crypto::PublicKey;
use crate::error::{TypesError, TypesResult};
use crate::name::Name;
use serde::{Deserialize, Serialize};

/// The `active` permission.
pub const ACTIVE: Name = Name::from_static("active");
/// The `owner` permission.
pub const OWNER: Name = Name::from_static("owner");
/// The system account that hosts account and code management actions.
pub const SYSTEM_ACCOUNT: Name = Name::from_static("eosio");
/// The account that receives context-free actions nobody executes.
pub const NULL_ACCOUNT: Name = Name::from_static("eosio.null");

/// An actor and the permission it authorizes with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }

    /// `actor@active`.
    pub fn active(actor: Name) -> Self {
        Self::new(actor, ACTIVE)
    }
}

/// A single contract invocation with an encoded payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Action {
    /// Creates an action whose data is the BCS encoding of `payload`.
    pub fn new<T: Serialize + ?Sized>(
        account: Name,
        name: Name,
        authorization: Vec<PermissionLevel>,
        payload: &T,
    ) -> TypesResult<Self> {
        Ok(Self {
            account,
            name,
            authorization,
            data: bcs::to_bytes(payload).map_err(TypesError::bcs)?,
        })
    }

    /// Creates an action from already encoded data.
    pub fn from_raw(
        account: Name,
        name: Name,
        authorization: Vec<PermissionLevel>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            account,
            name,
            authorization,
            data,
        }
    }

    /// Decodes the payload.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> TypesResult<T> {
        bcs::from_bytes(&self.data).map_err(TypesError::bcs)
    }
}

/// `transfer` on a token contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Name,
    pub to: Name,
    pub quantity: Asset,
    pub memo: String,
}

/// `create` on a token contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Create {
    pub issuer: Name,
    pub maximum_supply: Asset,
}

/// `issue` on a token contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub to: Name,
    pub quantity: Asset,
    pub memo: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

/// A threshold of keys and accounts that together satisfy a permission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub threshold: u32,
    pub keys: Vec<KeyWeight>,
    pub accounts: Vec<PermissionLevelWeight>,
}

impl Authority {
    /// An authority satisfied by a single key.
    pub fn single_key(key: PublicKey) -> Self {
        Self {
            threshold: 1,
            keys: vec![KeyWeight { key, weight: 1 }],
            accounts: Vec::new(),
        }
    }
}

/// `newaccount` on the system account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub creator: Name,
    pub name: Name,
    pub owner: Authority,
    pub active: Authority,
}

/// `setcode` on the system account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCode {
    pub account: Name,
    pub vm_type: u8,
    pub vm_version: u8,
    #[serde(with = "hex_bytes")]
    pub code: Vec<u8>,
}

/// `setabi` on the system account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAbi {
    pub account: Name,
    #[serde(with = "hex_bytes")]
    pub abi: Vec<u8>,
}

/// Hex strings for human-readable formats, raw bytes otherwise.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}
