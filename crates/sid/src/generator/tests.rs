use crate::{
    Epoch, Error, MonotonicClock, NodeId, Poll, SequenceState, Sid, SidGenerator, SystemClock,
    TimeSource,
};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Mutex;
use std::thread::scope;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock that replays `values`, moved along by the test.
struct MockStepTime {
    values: Vec<u64>,
    index: Cell<usize>,
}

impl MockStepTime {
    fn new(values: Vec<u64>) -> Rc<Self> {
        Rc::new(Self {
            values,
            index: Cell::new(0),
        })
    }

    fn step(&self) {
        self.index.set((self.index.get() + 1).min(self.values.len() - 1));
    }
}

impl TimeSource for MockStepTime {
    fn current_millis(&self) -> u64 {
        self.values[self.index.get()]
    }
}

fn node(id: u16) -> NodeId {
    NodeId::new(id).unwrap()
}

fn unwrap_ready(poll: Poll<Sid>) -> Sid {
    match poll {
        Poll::Ready { value } => value,
        Poll::Pending { yield_for } => panic!("unexpected pending (yield for: {yield_for})"),
    }
}

#[test]
fn documented_scenario() {
    let epoch = Epoch::parse("2020-08-01T00:00:00Z").unwrap();
    let clock = MockStepTime::new(vec![1000, 1000, 1001]);
    let generator = SidGenerator::with_parts(node(5), epoch, Rc::clone(&clock));

    let a = generator.generate().unwrap();
    clock.step();
    let b = generator.generate().unwrap();
    clock.step();
    let c = generator.generate().unwrap();

    assert_eq!((a.timestamp(), a.node(), a.sequence()), (1000, 5, 0));
    assert_eq!((b.timestamp(), b.node(), b.sequence()), (1000, 5, 1));
    assert_eq!((c.timestamp(), c.node(), c.sequence()), (1001, 5, 0));
    assert_eq!(
        generator.time_of(&a).timestamp_millis(),
        1_596_240_000_000 + 1000
    );
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = SidGenerator::with_parts(node(0), Epoch::SID, MockTime { millis: 42 });

    let ids: Vec<Sid> = (0..3).map(|_| generator.generate().unwrap()).collect();

    for (i, id) in ids.iter().enumerate() {
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.step(), i as u64);
    }
    for pair in ids.windows(2) {
        assert_eq!(pair[1].step() - pair[0].step(), 1);
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn poll_returns_pending_when_sequence_exhausted() {
    let generator = SidGenerator::from_state(
        node(0),
        Epoch::SID,
        SequenceState::from_parts(0, Sid::SEQUENCE_MASK),
        MockTime { millis: 0 },
    );
    assert_eq!(generator.poll_id(), Ok(Poll::Pending { yield_for: 1 }));
}

#[test]
fn rollover_waits_for_next_millisecond() {
    let clock = MockStepTime::new(vec![42, 43]);
    let generator = SidGenerator::with_parts(node(1), Epoch::SID, Rc::clone(&clock));
    let mut seen = HashSet::new();

    for i in 0..=Sid::SEQUENCE_MASK {
        let id = unwrap_ready(generator.poll_id().unwrap());
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
        assert!(seen.insert(id));
    }

    // The 4097th call in the same millisecond has to wait for the clock.
    let mut waits = 0;
    let id = generator
        .generate_with(|yield_for| {
            assert_eq!(yield_for, 1);
            waits += 1;
            clock.step();
        })
        .unwrap();

    assert_eq!(waits, 1);
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.step(), 0);
    assert!(seen.insert(id));
    assert_eq!(seen.len(), 4097);
}

#[test]
fn clock_regression_fails_without_an_id() {
    let clock = MockStepTime::new(vec![10, 9, 10]);
    let generator = SidGenerator::with_parts(node(3), Epoch::SID, Rc::clone(&clock));

    let first = generator.generate().unwrap();
    clock.step();
    assert_eq!(
        generator.generate(),
        Err(Error::ClockRegressed { last: 10, now: 9 })
    );
    assert!(matches!(
        generator.poll_id(),
        Err(Error::ClockRegressed { .. })
    ));

    // Once the clock catches up the sequence continues where it left off.
    clock.step();
    let next = generator.generate().unwrap();
    assert_eq!(next.timestamp(), first.timestamp());
    assert_eq!(next.step(), first.step() + 1);
}

#[test]
fn timestamp_overflow_is_surfaced() {
    let generator = SidGenerator::with_parts(
        node(0),
        Epoch::SID,
        MockTime {
            millis: Sid::TIMESTAMP_MASK + 1,
        },
    );
    assert!(matches!(
        generator.generate(),
        Err(Error::TimestampOverflow { .. })
    ));
}

#[test]
fn distinct_nodes_never_collide() {
    let clock = MockStepTime::new((0..64).collect());
    let a = SidGenerator::with_parts(node(1), Epoch::SID, Rc::clone(&clock));
    let b = SidGenerator::with_parts(node(2), Epoch::SID, Rc::clone(&clock));
    let mut seen = HashSet::new();

    for _ in 0..64 {
        for _ in 0..100 {
            assert!(seen.insert(a.generate().unwrap()));
            assert!(seen.insert(b.generate().unwrap()));
        }
        clock.step();
    }
}

fn run_generator_monotonic<T: TimeSource>(generator: &SidGenerator<T>) {
    const TOTAL_IDS: usize = 4096 * 64;

    let expected_node = u64::from(generator.node().get());
    let mut last: Option<Sid> = None;
    let mut seen = HashSet::with_capacity(TOTAL_IDS);

    for _ in 0..TOTAL_IDS {
        let id = generator.generate().unwrap();
        assert_eq!(id.node(), expected_node);
        if let Some(prev) = last {
            assert!(id > prev);
            assert!(id.time() >= prev.time());
            if id.timestamp() == prev.timestamp() {
                assert_eq!(id.step(), prev.step() + 1);
            } else {
                assert_eq!(id.step(), 0);
            }
        }
        assert!(seen.insert(id));
        last = Some(id);
    }
}

#[test]
fn system_clock_monotonic_and_unique() {
    let generator = SidGenerator::with_node(node(7), Epoch::SID).unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn monotonic_clock_monotonic_and_unique() {
    let clock = MonotonicClock::with_epoch(Epoch::SID).unwrap();
    let generator = SidGenerator::with_parts(node(7), Epoch::SID, clock);
    run_generator_monotonic(&generator);
}

#[test]
fn default_generator_uses_resolved_node() {
    let generator = SidGenerator::new().unwrap();
    assert_eq!(generator.node(), NodeId::resolve().id);
    assert_eq!(generator.epoch(), Epoch::SID);
    let id = generator.generate().unwrap();
    assert_eq!(id.node(), u64::from(generator.node().get()));
}

#[test]
fn threaded_generation_is_unique() {
    const THREADS: usize = 8;
    const TOTAL_IDS: usize = 4096 * 64;
    const IDS_PER_THREAD: usize = TOTAL_IDS / THREADS;

    let generator: SidGenerator<SystemClock> =
        SidGenerator::with_node(node(9), Epoch::SID).unwrap();
    let seen = Mutex::new(HashSet::with_capacity(TOTAL_IDS));

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                let mut last: Option<Sid> = None;
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.generate().unwrap();
                    // Each thread sees a strictly increasing stream.
                    if let Some(prev) = last {
                        assert!(id > prev);
                    }
                    last = Some(id);
                    local.push(id);
                }
                let mut seen = seen.lock().unwrap();
                for id in local {
                    assert!(seen.insert(id), "duplicate id {id:?}");
                }
            });
        }
    });

    let final_count = seen.lock().unwrap().len();
    assert_eq!(final_count, TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn poisoned_lock_is_reported() {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    struct PanicOnce {
        armed: Cell<bool>,
    }

    impl TimeSource for PanicOnce {
        fn current_millis(&self) -> u64 {
            assert!(!self.armed.replace(false), "clock failure");
            5
        }
    }

    let generator = SidGenerator::with_parts(
        node(0),
        Epoch::SID,
        PanicOnce {
            armed: Cell::new(true),
        },
    );

    let result = catch_unwind(AssertUnwindSafe(|| generator.generate()));
    assert!(result.is_err());
    assert_eq!(generator.generate(), Err(Error::LockPoisoned));
}
