//! Core Domain Entities for Dial Scheduling
//!
//! Node identities, dialable node records and the connection flag bitset.

use std::fmt;
use std::net::SocketAddr;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use super::errors::NodeParseError;

/// 256-bit node identifier.
///
/// Displayed as 64 lowercase hex characters. Ordering is byte-wise and only
/// used to give the static node set a deterministic iteration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// A uniformly random identifier, used as a lookup target.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// First 8 bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

impl FromStr for NodeId {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| NodeParseError::InvalidId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A dialable node record.
///
/// A node without an address is *incomplete*: its endpoint has to be resolved
/// through the discovery table before it can be dialed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// TCP endpoint, if known.
    pub addr: Option<SocketAddr>,
}

impl Node {
    /// Create a node with a known endpoint.
    pub fn new(id: NodeId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr: Some(addr),
        }
    }

    /// Create a node whose endpoint must be resolved before dialing.
    pub fn incomplete(id: NodeId) -> Self {
        Self { id, addr: None }
    }

    /// Whether the endpoint is still unknown.
    pub fn is_incomplete(&self) -> bool {
        self.addr.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            Some(addr) => write!(f, "{}@{}", self.id, addr),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Parses `<hex-id>@<ip>:<port>` or a bare `<hex-id>` (incomplete node).
impl FromStr for Node {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('@') {
            Some((id, addr)) => {
                let id = id.parse()?;
                let addr = addr
                    .parse()
                    .map_err(|_| NodeParseError::InvalidAddress(addr.to_string()))?;
                Ok(Self::new(id, addr))
            }
            None => Ok(Self::incomplete(s.parse()?)),
        }
    }
}

/// Why a connection exists or is being attempted.
///
/// A bitset: a single connection may carry several flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnFlags(u8);

impl ConnFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Dynamically discovered peer, subject to the dynamic dial cap.
    pub const DYNAMIC: Self = Self(1 << 0);
    /// Operator-configured persistent peer.
    pub const STATIC: Self = Self(1 << 1);
    /// Connection initiated by the remote side.
    pub const INBOUND: Self = Self(1 << 2);
    /// Exempt from the normal peer limits.
    pub const TRUSTED: Self = Self(1 << 3);

    /// Raw bit representation.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// True if every flag in `other` is set.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag in `other` is set.
    pub fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no flag is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ConnFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConnFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ConnFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ConnFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ConnFlags, &str); 4] = [
            (ConnFlags::DYNAMIC, "dyndial"),
            (ConnFlags::STATIC, "staticdial"),
            (ConnFlags::INBOUND, "inbound"),
            (ConnFlags::TRUSTED, "trusted"),
        ];

        if self.is_empty() {
            return f.write_str("-");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConnFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnFlags({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_node_id_hex_roundtrip() {
        let id: NodeId = ID_HEX.parse().unwrap();
        assert_eq!(id, NodeId::new([1u8; 32]));
        assert_eq!(id.to_string(), ID_HEX);
        assert_eq!(id.short(), "0101010101010101");
    }

    #[test]
    fn test_node_id_rejects_short_hex() {
        assert!(matches!(
            "abcd".parse::<NodeId>(),
            Err(NodeParseError::InvalidId(_))
        ));
    }

    #[test]
    fn test_node_parses_complete_and_incomplete() {
        let complete: Node = format!("{ID_HEX}@10.0.0.1:30303").parse().unwrap();
        assert!(!complete.is_incomplete());
        assert_eq!(complete.addr, Some("10.0.0.1:30303".parse().unwrap()));

        let incomplete: Node = ID_HEX.parse().unwrap();
        assert!(incomplete.is_incomplete());
    }

    #[test]
    fn test_node_rejects_bad_address() {
        let result = format!("{ID_HEX}@not-an-addr").parse::<Node>();
        assert!(matches!(result, Err(NodeParseError::InvalidAddress(_))));
    }

    #[test]
    fn test_conn_flags_set_operations() {
        let flags = ConnFlags::STATIC | ConnFlags::TRUSTED;
        assert!(flags.contains(ConnFlags::STATIC));
        assert!(flags.intersects(ConnFlags::TRUSTED | ConnFlags::DYNAMIC));
        assert!(!flags.contains(ConnFlags::DYNAMIC));
        assert_eq!(flags & ConnFlags::TRUSTED, ConnFlags::TRUSTED);
        assert_eq!(flags.to_string(), "staticdial|trusted");
        assert_eq!(ConnFlags::NONE.to_string(), "-");
    }
}
