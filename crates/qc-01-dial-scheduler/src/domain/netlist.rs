//! IP allow-list used to restrict which addresses may be dialed.

use std::net::IpAddr;
use std::str::FromStr;

use super::errors::NetlistError;

/// A single CIDR network such as `10.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNet {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNet {
    /// Create a network, masking off host bits.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, NetlistError> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(NetlistError::InvalidCidr(format!("{addr}/{prefix_len}")));
        }
        let addr = match addr {
            IpAddr::V4(v4) => IpAddr::V4(mask_v4(u32::from(v4), prefix_len).into()),
            IpAddr::V6(v6) => IpAddr::V6(mask_v6(u128::from(v6), prefix_len).into()),
        };
        Ok(Self { addr, prefix_len })
    }

    /// Whether `ip` lies inside this network. IPv4-mapped IPv6 addresses
    /// are checked as IPv4; otherwise address families never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                mask_v4(u32::from(ip), self.prefix_len) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                mask_v6(u128::from(ip), self.prefix_len) == u128::from(net)
            }
            _ => false,
        }
    }
}

fn mask_v4(bits: u32, prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => bits & (u32::MAX << (32 - u32::from(n))),
    }
}

fn mask_v6(bits: u128, prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => bits & (u128::MAX << (128 - u32::from(n))),
    }
}

impl FromStr for IpNet {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetlistError::InvalidCidr(s.to_string());
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::new(addr, prefix_len)
    }
}

/// A list of IP networks. An address is allowed if any network contains it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Netlist {
    nets: Vec<IpNet>,
}

impl Netlist {
    /// Empty list (contains nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a network in CIDR notation.
    pub fn add(&mut self, cidr: &str) -> Result<(), NetlistError> {
        self.nets.push(cidr.parse()?);
        Ok(())
    }

    /// Whether any network in the list contains `ip`.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.nets.iter().any(|net| net.contains(ip))
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

/// Parses a comma-separated CIDR list, e.g. `"10.0.0.0/8, fd00::/8"`.
impl FromStr for Netlist {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut list = Self::new();
        for cidr in s.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            list.add(cidr)?;
        }
        Ok(list)
    }
}
