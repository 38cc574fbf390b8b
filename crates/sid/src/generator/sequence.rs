use core::{cmp::Ordering, time::Duration};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, Result, Sid, TimeSource,
    generator::{Mutex, MutexGuard, Poll},
};

/// How long [`Sequencer::advance`] sleeps between polls while the sequence of
/// the current millisecond is exhausted.
///
/// Sub-millisecond so the caller resumes shortly after the tick, long enough
/// to keep a waiting thread from pegging a core.
pub const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// A `(timestamp, sequence)` pair that has not been handed out before.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick {
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Position within the millisecond, `0..=4095`.
    pub sequence: u64,
}

/// The sequence counter state machine.
///
/// Holds the last timestamp handed out (unset until the first tick) and the
/// sequence value used with it. [`SequenceState::step`] is the whole
/// decision; [`Sequencer`] wraps it in a lock and a clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceState {
    last_timestamp: Option<u64>,
    sequence: u64,
}

impl SequenceState {
    /// A fresh state: no timestamp seen, sequence zero.
    pub const fn new() -> Self {
        Self {
            last_timestamp: None,
            sequence: 0,
        }
    }

    /// A state that last issued `(timestamp, sequence)`.
    ///
    /// Mostly useful for tests that need to start at the end of a
    /// millisecond.
    pub const fn from_parts(timestamp: u64, sequence: u64) -> Self {
        Self {
            last_timestamp: Some(timestamp),
            sequence: sequence & Sid::SEQUENCE_MASK,
        }
    }

    /// The last timestamp handed out, if any.
    pub const fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    /// The sequence value paired with [`Self::last_timestamp`].
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Advances the state for a clock reading of `now`.
    ///
    /// - `now` past the last timestamp: the sequence restarts at zero.
    /// - `now` equal to it: the sequence increments, or the step is
    ///   [`Poll::Pending`] once all 4096 values are spent.
    /// - `now` before it: the clock regressed and the state is left alone.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegressed`] if `now` is earlier than the last timestamp
    /// - [`Error::TimestampOverflow`] if `now` does not fit in 42 bits
    pub fn step(&mut self, now: u64) -> Result<Poll<Tick>> {
        if now > Sid::TIMESTAMP_MASK {
            return Err(Error::TimestampOverflow { timestamp: now });
        }

        let Some(last) = self.last_timestamp else {
            return Ok(self.rollover_to(now));
        };

        match now.cmp(&last) {
            Ordering::Greater => Ok(self.rollover_to(now)),
            Ordering::Equal => {
                if self.sequence < Sid::SEQUENCE_MASK {
                    self.sequence += 1;
                    Ok(Poll::Ready {
                        value: Tick {
                            timestamp: now,
                            sequence: self.sequence,
                        },
                    })
                } else {
                    Ok(Poll::Pending { yield_for: 1 })
                }
            }
            Ordering::Less => Err(Self::cold_clock_behind(last, now)),
        }
    }

    fn rollover_to(&mut self, now: u64) -> Poll<Tick> {
        self.last_timestamp = Some(now);
        self.sequence = 0;
        Poll::Ready {
            value: Tick {
                timestamp: now,
                sequence: 0,
            },
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(last: u64, now: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(last, now, behind_ms = last - now, "clock moved backwards");
        Error::ClockRegressed { last, now }
    }
}

/// A lock-guarded [`SequenceState`] driven by a [`TimeSource`].
///
/// The clock is read while the lock is held, so concurrent callers observe
/// readings in the same order as they update the state. Encoding the tick
/// into an ID happens after the lock is released.
pub struct Sequencer<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<SequenceState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<SequenceState>,
    time: T,
}

impl<T> Sequencer<T>
where
    T: TimeSource,
{
    /// Creates a sequencer with a fresh state.
    pub fn new(time: T) -> Self {
        Self::from_state(SequenceState::new(), time)
    }

    /// Creates a sequencer resuming from `state`.
    pub fn from_state(state: SequenceState, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            time,
        }
    }

    /// The time source driving this sequencer.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// A copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock is poisoned.
    pub fn state(&self) -> Result<SequenceState> {
        Ok(*self.lock()?)
    }

    /// Attempts to take the next tick without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegressed`] if the clock reads earlier than the last
    ///   tick
    /// - [`Error::TimestampOverflow`] if the clock is past the 42-bit range
    /// - [`Error::LockPoisoned`] if the lock is poisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll(&self) -> Result<Poll<Tick>> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();
        state.step(now)
    }

    /// Takes the next tick, sleeping [`POLL_INTERVAL`] between polls while
    /// the current millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// See [`Sequencer::try_poll`].
    pub fn advance(&self) -> Result<Tick> {
        self.advance_with(|_| std::thread::sleep(POLL_INTERVAL))
    }

    /// Takes the next tick, calling `f` with the suggested wait (in ms) each
    /// time the current millisecond is exhausted.
    ///
    /// The lock is not held while `f` runs.
    ///
    /// # Errors
    ///
    /// See [`Sequencer::try_poll`].
    pub fn advance_with(&self, mut f: impl FnMut(u64)) -> Result<Tick> {
        loop {
            match self.try_poll()? {
                Poll::Ready { value } => break Ok(value),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SequenceState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}
