use core::num::ParseIntError;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `sid` can emit.
///
/// Sequence exhaustion is not an error: the generator waits for the next
/// millisecond instead. Everything here is either a startup configuration
/// problem or a clock anomaly that the caller has to see.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The clock reported a time earlier than the last timestamp handed out.
    ///
    /// No ID is produced. Issuing one would risk duplicating an ID that was
    /// already generated at `now`, so the only recovery is for the clock to
    /// catch up again.
    #[error("clock moved backwards: last timestamp {last} ms, now {now} ms")]
    ClockRegressed {
        /// Last timestamp (ms since epoch) recorded by the generator.
        last: u64,
        /// The regressed reading (ms since epoch).
        now: u64,
    },

    /// The local host name could not be determined.
    ///
    /// Node resolution recovers from this by falling back to a random node ID,
    /// so it never reaches `generate()` callers.
    #[error("host name unavailable")]
    HostnameUnavailable,

    /// The configured epoch is not a valid RFC 3339 instant.
    #[error("invalid epoch {input:?}: {reason}")]
    EpochInvalid {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configured epoch lies after the current wall-clock time.
    #[error("epoch {epoch_ms} ms is later than the current time {now_ms} ms")]
    EpochInFuture {
        /// Epoch in ms since the Unix epoch.
        epoch_ms: u64,
        /// Wall clock in ms since the Unix epoch.
        now_ms: u64,
    },

    /// An explicitly assigned node ID does not fit in the 10-bit node field.
    #[error("node id {node} out of range (max {max})", max = crate::NodeId::MAX)]
    NodeIdOutOfRange {
        /// The rejected node ID.
        node: u64,
    },

    /// The elapsed time since the epoch no longer fits in 42 bits.
    #[error("timestamp {timestamp} ms exceeds the 42-bit timestamp field")]
    TimestampOverflow {
        /// The unrepresentable timestamp (ms since epoch).
        timestamp: u64,
    },

    /// A string could not be parsed as a decimal ID.
    #[error("invalid id: {0}")]
    ParseSid(#[from] ParseIntError),

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant does not exist
    /// with the `parking-lot` feature.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
