use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix length '{0}'")]
    InvalidLength(String),
    #[error("prefix length {length} exceeds {max} bits")]
    LengthOutOfRange { length: u8, max: u8 },
}

/// An address range in CIDR notation, e.g. `10.0.0.0/8` or `2001:db8::/32`.
///
/// A bare address is treated as a single-host prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPrefix {
    network: IpAddr,
    length: u8,
}

impl IpPrefix {
    pub fn new(network: IpAddr, length: u8) -> Result<Self, PrefixError> {
        let max = max_length(&network);
        if length > max {
            return Err(PrefixError::LengthOutOfRange { length, max });
        }
        Ok(Self { network, length })
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    /// Whether `ip` falls inside this prefix. Addresses of the other family never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.length);
                u32::from(network) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.length);
                u128::from(network) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for IpPrefix {
    type Err = PrefixError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (address, length) = match value.split_once('/') {
            Some((address, length)) => (address, Some(length)),
            None => (value, None),
        };

        let network: IpAddr = address
            .parse()
            .map_err(|_| PrefixError::InvalidAddress(address.to_string()))?;
        let length = match length {
            Some(length) => length
                .parse::<u8>()
                .map_err(|_| PrefixError::InvalidLength(length.to_string()))?,
            None => max_length(&network),
        };

        Self::new(network, length)
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

fn max_length(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_u32(length: u8) -> u32 {
    if length == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(length))
    }
}

fn mask_u128(length: u8) -> u128 {
    if length == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(length))
    }
}
