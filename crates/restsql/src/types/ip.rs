//! IP address with an optional prefix length.

use crate::error::{Error, Result};
use crate::value::{FromValue, ToValue, Value, host_prefix};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::str::FromStr;

const KIND: &str = "ip";

/// An IP address and an optional netmask size.
///
/// A prefix of 0 means "no mask": the address is a single host and renders
/// without a `/len` suffix. Storage engines report host addresses with the
/// full length (`/32`, `/128`), so that length and 0 compare equal.
///
/// ```ignore
/// let ip: Ip = "fe80::77d6:6a51:13d6:b1ef/64".parse()?;
/// assert_eq!(ip.to_string(), "fe80::77d6:6a51:13d6:b1ef/64");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Ip {
    pub addr: IpAddr,
    pub prefix: u8,
}

impl Ip {
    /// A host address without a mask.
    pub fn host(addr: IpAddr) -> Self {
        Self { addr, prefix: 0 }
    }

    /// An address with a mask, rejecting lengths longer than the address.
    pub fn with_prefix(addr: IpAddr, prefix: u8) -> Result<Self> {
        if prefix > host_prefix(&addr) {
            return Err(Error::malformed_scalar(
                KIND,
                format!("prefix /{prefix} is too long for {addr}"),
            ));
        }
        Ok(Self { addr, prefix })
    }

    /// Prefix with the "no mask" spelling resolved to the full length.
    pub fn effective_prefix(&self) -> u8 {
        if self.prefix == 0 {
            host_prefix(&self.addr)
        } else {
            self.prefix
        }
    }

    /// Whether this is a single host rather than a network.
    pub fn is_host(&self) -> bool {
        self.effective_prefix() == host_prefix(&self.addr)
    }

    /// Parse the storage representation, as either text or raw bytes.
    pub fn from_storage(bytes: &[u8]) -> Result<Self> {
        super::storage_text(KIND, bytes)?.parse()
    }
}

impl PartialEq for Ip {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.effective_prefix() == other.effective_prefix()
    }
}

impl Eq for Ip {}

impl Hash for Ip {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
        self.effective_prefix().hash(state);
    }
}

impl fmt::Display for Ip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix != 0 {
            write!(f, "{}/{}", self.addr, self.prefix)
        } else {
            write!(f, "{}", self.addr)
        }
    }
}

impl FromStr for Ip {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr
                    .parse()
                    .map_err(|e| Error::malformed_scalar(KIND, format!("{s:?}: {e}")))?;
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|e| Error::malformed_scalar(KIND, format!("{s:?}: {e}")))?;
                Self::with_prefix(addr, prefix)
            }
            None => s
                .parse()
                .map(Self::host)
                .map_err(|e| Error::malformed_scalar(KIND, format!("{s:?}: {e}"))),
        }
    }
}

impl From<IpAddr> for Ip {
    fn from(addr: IpAddr) -> Self {
        Self::host(addr)
    }
}

impl ToValue for Ip {
    fn to_value(&self) -> Value {
        Value::Inet {
            addr: self.addr,
            prefix: self.effective_prefix(),
        }
    }
}

impl FromValue for Ip {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Inet { addr, prefix } if prefix == host_prefix(&addr) => Ok(Self::host(addr)),
            Value::Inet { addr, prefix } => Self::with_prefix(addr, prefix),
            Value::Text(text) => text.parse(),
            Value::Bytes(bytes) => Self::from_storage(&bytes),
            other => Err(Error::malformed_scalar(
                KIND,
                format!("cannot scan {} into an address", other.kind()),
            )),
        }
    }
}

impl Serialize for Ip {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ip {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
