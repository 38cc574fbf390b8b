/// The outcome of a non-blocking attempt to generate an ID.
///
/// - [`Poll::Ready`] carries the generated value.
/// - [`Poll::Pending`] means all 4096 sequence values of the current
///   millisecond are spent. Nothing can be issued until the clock moves on.
///
/// This allows non-blocking generation loops and custom backoff strategies.
///
/// # Example
///
/// ```
/// use sid::{Epoch, NodeId, Poll, SidGenerator, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let generator = SidGenerator::with_parts(NodeId::new(1).unwrap(), Epoch::SID, FixedTime);
/// match generator.poll_id().unwrap() {
///     Poll::Ready { value } => println!("ID: {value}"),
///     Poll::Pending { yield_for } => println!("Back off for {yield_for} ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll<T> {
    /// A value was produced.
    Ready {
        /// The produced value.
        value: T,
    },
    /// The sequence is exhausted for the current tick.
    Pending {
        /// Milliseconds to wait before trying again.
        yield_for: u64,
    },
}

impl<T> Poll<T> {
    /// Maps a ready value, leaving `Pending` untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Poll<U> {
        match self {
            Self::Ready { value } => Poll::Ready { value: f(value) },
            Self::Pending { yield_for } => Poll::Pending { yield_for },
        }
    }

    /// Returns `true` for [`Poll::Ready`].
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}
