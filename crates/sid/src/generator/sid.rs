use core::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    DEFAULT_EPOCH, Epoch, NodeId, Result, Sid, SystemClock, TimeSource,
    generator::{Poll, SequenceState, Sequencer},
};

/// A thread-safe generator of [`Sid`]s.
///
/// Composes an [`Epoch`], a fixed [`NodeId`], a [`TimeSource`] and a
/// [`Sequencer`]. Each instance is independent: construct one per process (or
/// per logical node) and pass it by reference or in an `Arc` to whoever needs
/// IDs.
///
/// ## Features
/// - ✅ Thread-safe, a single lock guards the sequence state
/// - ✅ Blocks for at most about one millisecond when 4096 IDs were issued in
///   the current millisecond
/// - ✅ Refuses to issue IDs while the clock is behind the last timestamp
///
/// # Example
///
/// ```
/// use sid::SidGenerator;
///
/// let generator = SidGenerator::new().unwrap();
/// let a = generator.generate().unwrap();
/// let b = generator.generate().unwrap();
/// assert!(b > a);
/// assert_eq!(a.node(), b.node());
/// ```
pub struct SidGenerator<T = SystemClock>
where
    T: TimeSource,
{
    node: NodeId,
    epoch: Epoch,
    sequencer: Sequencer<T>,
}

impl SidGenerator<SystemClock> {
    /// Creates a generator with the default wiring.
    ///
    /// - the epoch is parsed from [`DEFAULT_EPOCH`]
    /// - the node ID comes from [`NodeId::resolve`] (host name hash, random
    ///   fallback)
    /// - time is read from the wall clock
    ///
    /// # Errors
    ///
    /// - [`Error::EpochInvalid`] if the configured epoch does not parse
    /// - [`Error::EpochInFuture`] if the wall clock is before the epoch
    ///
    /// [`Error::EpochInvalid`]: crate::Error::EpochInvalid
    /// [`Error::EpochInFuture`]: crate::Error::EpochInFuture
    pub fn new() -> Result<Self> {
        let epoch = Epoch::parse(DEFAULT_EPOCH)?;
        Self::with_node(NodeId::resolve().id, epoch)
    }

    /// Creates a wall-clock generator for an explicit node and epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInFuture`] if the wall clock is before `epoch`.
    ///
    /// [`Error::EpochInFuture`]: crate::Error::EpochInFuture
    pub fn with_node(node: NodeId, epoch: Epoch) -> Result<Self> {
        Ok(Self::with_parts(node, epoch, SystemClock::new(epoch)?))
    }
}

impl<T> SidGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator from explicit parts.
    ///
    /// `time` must report milliseconds since `epoch`; the epoch is only used
    /// to turn timestamps back into instants.
    pub fn with_parts(node: NodeId, epoch: Epoch, time: T) -> Self {
        Self::from_state(node, epoch, SequenceState::new(), time)
    }

    /// Creates a generator resuming from a known sequence state.
    pub fn from_state(node: NodeId, epoch: Epoch, state: SequenceState, time: T) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(node = node.get(), %epoch, "created sid generator");
        Self {
            node,
            epoch,
            sequencer: Sequencer::from_state(state, time),
        }
    }

    /// Generates the next ID, waiting out sequence exhaustion.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegressed`] if the clock reads earlier than the last
    ///   issued timestamp; no ID is produced
    /// - [`Error::TimestampOverflow`] once the epoch is more than 2^42 ms
    ///   in the past
    /// - [`Error::LockPoisoned`] if another thread panicked while generating
    ///
    /// [`Error::ClockRegressed`]: crate::Error::ClockRegressed
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate(&self) -> Result<Sid> {
        let tick = self.sequencer.advance()?;
        Ok(Sid::encode(tick.timestamp, self.node, tick.sequence))
    }

    /// Generates the next ID, calling `f` with the suggested wait (ms) each
    /// time the current millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`SidGenerator::generate`].
    pub fn generate_with(&self, f: impl FnMut(u64)) -> Result<Sid> {
        let tick = self.sequencer.advance_with(f)?;
        Ok(Sid::encode(tick.timestamp, self.node, tick.sequence))
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// # Errors
    ///
    /// Same as [`SidGenerator::generate`].
    pub fn poll_id(&self) -> Result<Poll<Sid>> {
        let node = self.node;
        Ok(self
            .sequencer
            .try_poll()?
            .map(|tick| Sid::encode(tick.timestamp, node, tick.sequence)))
    }

    /// The node ID stamped into every ID.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The epoch timestamps are measured from.
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The time source in use.
    pub fn time(&self) -> &T {
        self.sequencer.time()
    }

    /// Generation time of `id` under this generator's epoch.
    pub fn time_of(&self, id: &Sid) -> chrono::DateTime<chrono::Utc> {
        id.time_from(self.epoch)
    }
}

impl<T> fmt::Debug for SidGenerator<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidGenerator")
            .field("node", &self.node)
            .field("epoch", &self.epoch)
            .field("state", &self.sequencer.state().ok())
            .finish_non_exhaustive()
    }
}
