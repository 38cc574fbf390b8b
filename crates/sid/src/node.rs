use core::fmt;
use std::sync::OnceLock;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

use crate::{Error, Result, Sid};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`.
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identifier of the process or host generating IDs, in `0..=1023`.
///
/// The node ID fills the 10-bit node field of every [`Sid`]. Two generators
/// with different node IDs can never produce the same ID, so uniqueness across
/// a fleet comes down to keeping node IDs distinct.
///
/// Node IDs derived from host names are hashes and **can collide** between
/// hosts. Deployments that need a hard guarantee should assign node IDs
/// explicitly with [`NodeId::new`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u16);

impl NodeId {
    /// Largest node ID the layout can carry.
    pub const MAX: u16 = Sid::NODE_MASK as u16;

    /// Validates an explicitly assigned node ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeIdOutOfRange`] if `node` exceeds [`NodeId::MAX`].
    ///
    /// # Example
    ///
    /// ```
    /// use sid::NodeId;
    ///
    /// assert_eq!(NodeId::new(5).unwrap().get(), 5);
    /// assert!(NodeId::new(1024).is_err());
    /// ```
    pub fn new(node: u16) -> Result<Self> {
        if node > Self::MAX {
            return Err(Error::NodeIdOutOfRange { node: u64::from(node) });
        }
        Ok(Self(node))
    }

    /// Derives a node ID from a host name: FNV-1a, masked to 10 bits.
    pub const fn from_hostname(hostname: &str) -> Self {
        Self((fnv1a_32(hostname.as_bytes()) & Self::MAX as u32) as u16)
    }

    /// Draws a random node ID.
    pub fn random() -> Self {
        Self(rand::random::<u16>() & Self::MAX)
    }

    /// Returns the node ID for this process, resolving it on first use.
    ///
    /// Resolution hashes the local host name. If the host name is unavailable
    /// a random node ID is used instead and a warning is logged. The outcome
    /// is cached for the lifetime of the process, so every caller observes
    /// the same value.
    pub fn resolve() -> ResolvedNode {
        static RESOLVED: OnceLock<ResolvedNode> = OnceLock::new();
        *RESOLVED.get_or_init(|| Self::resolve_from(local_hostname()))
    }

    /// Picks the node ID for a host name lookup result.
    fn resolve_from(hostname: Result<String>) -> ResolvedNode {
        let resolved = match hostname {
            Ok(hostname) => ResolvedNode {
                id: Self::from_hostname(&hostname),
                source: NodeSource::Hostname,
            },
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "falling back to a random node id");
                ResolvedNode {
                    id: Self::random(),
                    source: NodeSource::Random,
                }
            }
        };

        #[cfg(feature = "tracing")]
        info!(
            node_id = resolved.id.get(),
            max_node_id = Self::MAX,
            source = %resolved.source,
            "resolved node id"
        );

        resolved
    }

    /// The raw node ID.
    pub const fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for NodeId {
    type Error = Error;

    fn try_from(node: u16) -> Result<Self> {
        Self::new(node)
    }
}

impl From<NodeId> for u16 {
    fn from(node: NodeId) -> Self {
        node.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a resolved [`NodeId`] came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeSource {
    /// Hash of the local host name.
    Hostname,
    /// Random fallback, the host name was unavailable.
    Random,
}

impl NodeSource {
    /// Lowercase name of the source, as printed by `Display`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hostname => "hostname",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node ID together with how it was obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedNode {
    /// The node ID.
    pub id: NodeId,
    /// How `id` was derived.
    pub source: NodeSource,
}

fn local_hostname() -> Result<String> {
    let hostname = gethostname::gethostname();
    let hostname = hostname.to_string_lossy();
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(Error::HostnameUnavailable);
    }
    Ok(hostname.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn hostname_node_id_is_masked_hash() {
        let node = NodeId::from_hostname("foobar");
        assert_eq!(u32::from(node.get()), 0xbf9c_f968 & 0x3ff);
        assert_eq!(node, NodeId::from_hostname("foobar"));
    }

    #[test]
    fn explicit_node_id_range() {
        assert_eq!(NodeId::new(0).unwrap().get(), 0);
        assert_eq!(NodeId::new(1023).unwrap().get(), 1023);
        assert_eq!(
            NodeId::new(1024),
            Err(Error::NodeIdOutOfRange { node: 1024 })
        );
        assert!(NodeId::try_from(u16::MAX).is_err());
    }

    #[test]
    fn random_node_id_in_range() {
        for _ in 0..1_000 {
            assert!(NodeId::random().get() <= NodeId::MAX);
        }
    }

    #[test]
    fn resolve_hashes_available_hostname() {
        let resolved = NodeId::resolve_from(Ok("foobar".to_owned()));
        assert_eq!(resolved.source, NodeSource::Hostname);
        assert_eq!(resolved.id, NodeId::from_hostname("foobar"));
        assert_eq!(u32::from(resolved.id.get()), 0xbf9c_f968 & 0x3ff);
    }

    #[test]
    fn resolve_falls_back_to_random_without_hostname() {
        for _ in 0..100 {
            let resolved = NodeId::resolve_from(Err(Error::HostnameUnavailable));
            assert_eq!(resolved.source, NodeSource::Random);
            assert!(resolved.id.get() <= NodeId::MAX);
        }
    }

    #[test]
    fn source_names() {
        assert_eq!(NodeSource::Hostname.as_str(), "hostname");
        assert_eq!(NodeSource::Random.to_string(), "random");
    }

    #[test]
    fn resolve_is_cached() {
        let first = NodeId::resolve();
        let second = NodeId::resolve();
        assert_eq!(first, second);
        assert!(first.id.get() <= NodeId::MAX);
        if let Ok(hostname) = local_hostname() {
            assert_eq!(first.source, NodeSource::Hostname);
            assert_eq!(first.id, NodeId::from_hostname(&hostname));
        }
    }
}
