//! IPv4 CIDR blocks.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SynthError, SynthResult};

/// An IPv4 network address plus prefix length, e.g. `10.0.3.0/24`.
///
/// Host bits below the prefix are always zero; construction rejects
/// anything else rather than silently masking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// `0.0.0.0/0`, the default-route destination.
    pub const ANY: Cidr = Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    /// `10.0.0.0/16`, the default VPC range.
    pub const DEFAULT_VPC: Cidr = Cidr {
        network: Ipv4Addr::new(10, 0, 0, 0),
        prefix: 16,
    };

    pub fn new(network: Ipv4Addr, prefix: u8) -> SynthResult<Self> {
        if prefix > 32 {
            return Err(SynthError::config(
                "cidr_block",
                format!("prefix length {prefix} exceeds 32"),
            ));
        }
        if u32::from(network) & !mask(prefix) != 0 {
            return Err(SynthError::config(
                "cidr_block",
                format!("{network}/{prefix} has host bits set"),
            ));
        }
        Ok(Self { network, prefix })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn first(&self) -> u32 {
        u32::from(self.network)
    }

    fn last(&self) -> u32 {
        self.first() | !mask(self.prefix)
    }

    /// True if every address of `other` lies inside `self`.
    pub fn contains(&self, other: &Cidr) -> bool {
        self.prefix <= other.prefix && other.first() & mask(self.prefix) == self.first()
    }

    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }
}

/// Netmask for a prefix length. `/0` has no network bits.
pub(crate) fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = SynthError;

    fn from_str(s: &str) -> SynthResult<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| SynthError::config("cidr_block", format!("`{s}` has no prefix length")))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| SynthError::config("cidr_block", format!("`{addr}` is not an IPv4 address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| SynthError::config("cidr_block", format!("`{prefix}` is not a prefix length")))?;
        Cidr::new(network, prefix)
    }
}

impl TryFrom<String> for Cidr {
    type Error = SynthError;

    fn try_from(value: String) -> SynthResult<Self> {
        value.parse()
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}
