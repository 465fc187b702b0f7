//! Account, validator operator and consensus addresses
//!
//! All three are 20 raw bytes; the newtypes only keep them from being mixed
//! up. The string form, also used by serde, is lowercase hex.

use crate::error::{DistributionError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_LEN: usize = 20;

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; ADDRESS_LEN]);

        impl $name {
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
                    DistributionError::InvalidAddress(format!(
                        "expected {} bytes, got {}",
                        ADDRESS_LEN,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// The all-zero address, treated as "not set"
            pub fn is_empty(&self) -> bool {
                self.0 == [0u8; ADDRESS_LEN]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl FromStr for $name {
            type Err = DistributionError;

            fn from_str(s: &str) -> Result<Self> {
                if s.is_empty() {
                    return Err(DistributionError::InvalidAddress("empty address string".into()));
                }
                let bytes = hex::decode(s)
                    .map_err(|e| DistributionError::InvalidAddress(format!("{}: {}", s, e)))?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }

        impl From<[u8; ADDRESS_LEN]> for $name {
            fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }
        }
    };
}

address_type!(
    /// Account address (delegators, withdraw targets, module accounts)
    AccAddress
);
address_type!(
    /// Validator operator address
    ValAddress
);
address_type!(
    /// Validator consensus address, as reported in block votes
    ConsAddress
);

impl From<ValAddress> for AccAddress {
    fn from(val: ValAddress) -> Self {
        Self(val.0)
    }
}

impl From<AccAddress> for ValAddress {
    fn from(acc: AccAddress) -> Self {
        Self(acc.0)
    }
}

/// Address of a module account: first 20 bytes of sha256(name)
pub fn module_address(name: &str) -> AccAddress {
    let digest = Sha256::digest(name.as_bytes());
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&digest[..ADDRESS_LEN]);
    AccAddress(out)
}
