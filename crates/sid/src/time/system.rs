use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Epoch, Error, Result, TimeSource};

/// Milliseconds since the Unix epoch according to the wall clock.
///
/// A wall clock set before 1970 reads as zero.
pub(crate) fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// A wall-clock time source aligned to an [`Epoch`].
///
/// Every read goes to [`SystemTime::now`], so NTP steps and manual clock
/// changes are visible to the generator. A backward step surfaces as
/// [`Error::ClockRegressed`] from the generator instead of being hidden.
///
/// Readings earlier than the epoch saturate to zero.
///
/// ## See Also
/// - [`MonotonicClock`] for a source that can never go backward
///
/// [`MonotonicClock`]: crate::MonotonicClock
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch: Epoch,
}

impl SystemClock {
    /// Creates a wall clock measuring from `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the epoch lies after the current
    /// wall-clock time. IDs carry unsigned offsets from the epoch, so such a
    /// clock could not produce a valid timestamp yet.
    pub fn new(epoch: Epoch) -> Result<Self> {
        let now_ms = unix_millis_now();
        if now_ms < epoch.as_unix_millis() {
            return Err(Error::EpochInFuture {
                epoch_ms: epoch.as_unix_millis(),
                now_ms,
            });
        }
        Ok(Self { epoch })
    }

    /// The epoch this clock measures from.
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        unix_millis_now().saturating_sub(self.epoch.as_unix_millis())
    }
}
