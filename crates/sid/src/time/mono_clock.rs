use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crate::{Epoch, Error, Result, TimeSource, time::system::unix_millis_now};

/// A time source that can never move backward.
///
/// The wall clock is sampled once at construction to anchor the clock to its
/// [`Epoch`]. After that, a ticker thread advances an atomic counter from
/// [`Instant`], so NTP corrections and manual clock changes are ignored.
/// A generator driven by this clock never reports
/// [`Error::ClockRegressed`], at the cost of drifting from the wall clock
/// over long uptimes.
///
/// Clones share one ticker. The thread exits once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    ticks: Arc<AtomicU64>,
    epoch_offset: u64, // in milliseconds
    epoch: Epoch,
}

impl MonotonicClock {
    /// Starts a monotonic clock measuring from `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the epoch lies after the current
    /// wall-clock time.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the ticker thread.
    ///
    /// # Example
    ///
    /// ```
    /// use sid::{Epoch, MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::with_epoch(Epoch::SID).unwrap();
    /// let a = clock.current_millis();
    /// std::thread::sleep(std::time::Duration::from_millis(2));
    /// assert!(clock.current_millis() >= a);
    /// ```
    pub fn with_epoch(epoch: Epoch) -> Result<Self> {
        let start = Instant::now();
        let now_ms = unix_millis_now();
        let epoch_offset = now_ms
            .checked_sub(epoch.as_unix_millis())
            .ok_or(Error::EpochInFuture {
                epoch_ms: epoch.as_unix_millis(),
                now_ms,
            })?;

        let ticks = Arc::new(AtomicU64::new(0));
        let weak = Arc::downgrade(&ticks);

        thread::spawn(move || {
            let mut tick = 1;
            loop {
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let Some(ticks) = weak.upgrade() else {
                    break;
                };
                let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                ticks.store(elapsed, Ordering::Release);
                tick = elapsed + 1;
            }
        });

        Ok(Self {
            ticks,
            epoch_offset,
            epoch,
        })
    }

    /// The epoch this clock measures from.
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.ticks.load(Ordering::Acquire)
    }
}
