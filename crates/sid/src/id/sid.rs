use chrono::{DateTime, Utc};
use core::{fmt, str::FromStr};

use crate::{Epoch, Error, NodeId, Result};

/// A 64-bit Snowflake-style ID.
///
/// - 42 bits timestamp (ms since [`Epoch::SID`] or the generator's epoch)
/// - 10 bits node ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63             22 21             12 11             0
///              +----------------+-----------------+---------------+
///  Field:      | timestamp (42) |    node (10)    | sequence (12) |
///              +----------------+-----------------+---------------+
///              |<----- MSB ---------- 64 bits --------- LSB ----->|
/// ```
///
/// Ordering on `Sid` is ordering on the raw integer, which is chronological
/// for IDs from any node as long as clocks do not regress.
///
/// # Example
///
/// ```
/// use sid::Sid;
///
/// let id = Sid::from_parts(1000, 5, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.node(), 5);
/// assert_eq!(id.sequence(), 1);
/// assert_eq!(id.to_raw(), (1000 << 22) | (5 << 12) | 1);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid {
    id: u64,
}

impl Sid {
    /// Bitmask for the 42-bit timestamp field. Occupies bits 22 through 63.
    pub const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

    /// Bitmask for the 10-bit node field. Occupies bits 12 through 21.
    pub const NODE_MASK: u64 = (1 << 10) - 1;

    /// Bitmask for the 12-bit sequence field. Occupies bits 0 through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 = 22;

    /// Number of bits to shift the node ID to its position (bit 12).
    pub const NODE_SHIFT: u64 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the three fields into an ID.
    ///
    /// Each component is masked to its field width.
    pub const fn from_parts(timestamp: u64, node: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let node = (node & Self::NODE_MASK) << Self::NODE_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | node | sequence,
        }
    }

    /// Packs an ID for `node`.
    pub(crate) fn encode(timestamp: u64, node: NodeId, sequence: u64) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from_parts(timestamp, u64::from(node.get()), sequence)
    }

    /// Wraps a raw 64-bit value.
    pub const fn from_raw(id: u64) -> Self {
        Self { id }
    }

    /// Wraps a signed 64-bit value, reinterpreting its bits.
    pub const fn from_i64(id: i64) -> Self {
        Self { id: id as u64 }
    }

    /// The raw 64-bit value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// The raw value as a signed integer, for storage in `BIGINT` columns.
    ///
    /// Same bits as [`Sid::to_raw`]. IDs with a timestamp past 2^41 ms (about
    /// 69 years after the epoch) read as negative.
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Milliseconds since the epoch at which the ID was generated.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Node ID of the generator that produced the ID.
    pub const fn node(&self) -> u64 {
        (self.id >> Self::NODE_SHIFT) & Self::NODE_MASK
    }

    /// Position of the ID within its millisecond.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Alias for [`Sid::sequence`].
    pub const fn step(&self) -> u64 {
        self.sequence()
    }

    /// Generation time, assuming the default epoch [`Epoch::SID`].
    pub fn time(&self) -> DateTime<Utc> {
        self.time_from(Epoch::SID)
    }

    /// Generation time for an ID produced by a generator using `epoch`.
    pub fn time_from(&self, epoch: Epoch) -> DateTime<Utc> {
        epoch.to_datetime(self.timestamp())
    }

    /// Returns the ID as a zero-padded 20-digit string.
    ///
    /// Padded strings sort the same way as the IDs themselves.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sid")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("node", &self.node())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl FromStr for Sid {
    type Err = Error;

    /// Parses a decimal ID, as printed by [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::from_raw(s.trim().parse()?))
    }
}

impl From<Sid> for u64 {
    fn from(id: Sid) -> Self {
        id.to_raw()
    }
}

impl From<Sid> for i64 {
    fn from(id: Sid) -> Self {
        id.to_i64()
    }
}

impl From<u64> for Sid {
    fn from(id: u64) -> Self {
        Self::from_raw(id)
    }
}

impl From<i64> for Sid {
    fn from(id: i64) -> Self {
        Self::from_i64(id)
    }
}
