use crate::{BatchError, Driftflake, DriftflakeId, Error, TimeSource};
use core::cell::Cell;
use std::collections::HashSet;
use std::thread::scope;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const TICK_NANOS: i64 = 10_000_000;

const fn ticks(n: i64) -> i64 {
    n * TICK_NANOS
}

struct FixedTime {
    nanos: i64,
}

impl TimeSource for FixedTime {
    fn unix_nanos(&self) -> i64 {
        self.nanos
    }
}

/// Replays a fixed series of readings, repeating the last one.
struct SteppedTime {
    values: Vec<i64>,
    index: Cell<usize>,
}

impl SteppedTime {
    fn new(values: Vec<i64>) -> Self {
        Self {
            values,
            index: Cell::new(0),
        }
    }
}

impl TimeSource for SteppedTime {
    fn unix_nanos(&self) -> i64 {
        let i = self.index.get();
        if i + 1 < self.values.len() {
            self.index.set(i + 1);
        }
        self.values[i]
    }
}

fn mocked_generator(machine_id: u16, now_nanos: i64) -> Driftflake<FixedTime> {
    Driftflake::builder()
        .epoch(Duration::ZERO)
        .machine_id(move || Ok(machine_id))
        .time_source(FixedTime { nanos: now_nanos })
        .build()
        .expect("generator")
}

#[test]
fn round_trip_preserves_all_fields() {
    let cases = [
        (0, 0, 0),
        (1, 1, 1),
        (12_345, 37, 0xBEEF),
        (
            DriftflakeId::max_timestamp(),
            DriftflakeId::max_sequence() as u16,
            DriftflakeId::max_machine_id() as u16,
        ),
    ];
    for (time, sequence, machine_id) in cases {
        let id = DriftflakeId::from_parts(time, sequence, machine_id);
        let parts = id.decompose();
        assert_eq!(parts.id, id.to_raw());
        assert_eq!(parts.msb, 0);
        assert_eq!(parts.time, time);
        assert_eq!(parts.sequence, u64::from(sequence));
        assert_eq!(parts.machine_id, u64::from(machine_id));
    }
}

#[test]
fn decompose_accepts_arbitrary_values() {
    let zero = DriftflakeId::from_raw(0).decompose();
    assert_eq!(zero.msb, 0);
    assert_eq!(zero.time, 0);
    assert_eq!(zero.sequence, 0);
    assert_eq!(zero.machine_id, 0);

    let max = DriftflakeId::from_raw(u64::MAX).decompose();
    assert_eq!(max.id, u64::MAX);
    assert_eq!(max.msb, 1);
    assert_eq!(max.time, DriftflakeId::max_timestamp());
    assert_eq!(max.sequence, DriftflakeId::max_sequence());
    assert_eq!(max.machine_id, DriftflakeId::max_machine_id());
}

#[test]
fn first_allocation_reflects_elapsed_ticks() {
    // Epoch at a known point, "now" mocked 25ms later: 25ms / 10ms rounds
    // down to 2 ticks.
    let epoch = Duration::from_millis(1_409_529_600_000);
    let generator = Driftflake::builder()
        .epoch(epoch)
        .machine_id(|| Ok(3))
        .time_source(FixedTime {
            nanos: epoch.as_nanos() as i64 + 25_000_000,
        })
        .build()
        .expect("generator");

    let parts = generator.next_id().expect("id").decompose();
    assert_eq!(parts.time, 2);
    assert_eq!(parts.sequence, 0);
    assert_eq!(parts.machine_id, 3);
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = mocked_generator(1, ticks(42));

    for expected in 0..=DriftflakeId::max_sequence() {
        let parts = generator.next_id().expect("id").decompose();
        assert_eq!(parts.time, 42);
        assert_eq!(parts.sequence, expected);
    }
}

#[test]
fn exhausted_tick_borrows_the_next_and_blocks_briefly() {
    let generator = mocked_generator(1, ticks(42));

    let first = generator.next_id().expect("id");
    for _ in 0..DriftflakeId::max_sequence() {
        generator.next_id().expect("id");
    }

    // 257th allocation in the same mocked tick: sequence space exhausted,
    // so the generator borrows tick 43 and sleeps out the remainder.
    let start = Instant::now();
    let overflowed = generator.next_id().expect("id");
    let blocked = start.elapsed();

    assert_eq!(first.timestamp(), 42);
    assert_eq!(overflowed.timestamp(), 43);
    assert_eq!(overflowed.sequence(), 0);
    assert!(blocked >= Duration::from_millis(5));
    // One tick of deliberate backpressure, plus scheduler slop.
    assert!(blocked < Duration::from_millis(100));
}

#[test]
fn backward_clock_jitter_never_decreases_ids() {
    let generator = Driftflake::builder()
        .epoch(Duration::ZERO)
        .machine_id(|| Ok(1))
        .time_source(SteppedTime::new(vec![
            ticks(100), // build-time epoch check
            ticks(100),
            ticks(99), // clock steps backward
            ticks(99),
        ]))
        .build()
        .expect("generator");

    let a = generator.next_id().expect("id");
    let b = generator.next_id().expect("id");
    let c = generator.next_id().expect("id");
    assert!(a < b && b < c);
    // The timestamp field holds at its high-water mark.
    assert_eq!(b.timestamp(), 100);
    assert_eq!(c.timestamp(), 100);
}

#[test]
fn consecutive_ids_strictly_increase() {
    let generator = Driftflake::builder()
        .machine_id(|| Ok(9))
        .build()
        .expect("generator");

    let mut last = None;
    for _ in 0..4_096 {
        let id = generator.next_id().expect("id");
        if let Some(prev) = last {
            assert!(id > prev, "{id} not greater than {prev}");
        }
        last = Some(id);
    }
}

#[test]
fn concurrent_allocation_yields_unique_ids() {
    const THREADS: usize = 4;
    const IDS_PER_THREAD: usize = 512;

    let generator = Driftflake::builder()
        .machine_id(|| Ok(9))
        .build()
        .expect("generator");

    let mut all = HashSet::new();
    scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.next_id().expect("id").to_raw())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            all.extend(handle.join().expect("thread"));
        }
    });
    assert_eq!(all.len(), THREADS * IDS_PER_THREAD);
}

#[test]
fn batch_returns_consecutive_ids() {
    let generator = Driftflake::builder()
        .machine_id(|| Ok(5))
        .build()
        .expect("generator");

    let ids = generator.next_ids(600).expect("batch");
    assert_eq!(ids.len(), 600);
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn empty_batch_is_allowed() {
    let generator = mocked_generator(1, ticks(42));
    assert!(generator.next_ids(0).expect("batch").is_empty());
}

#[test]
fn batch_surfaces_partial_results_on_overflow() {
    // Mock "now" to the last valid tick. The first 256 allocations fill its
    // sequence space; the 257th borrows a tick past the 39-bit limit.
    let last_tick = DriftflakeId::max_timestamp() as i64;
    let generator = mocked_generator(1, ticks(last_tick));

    let BatchError { ids, source } = generator.next_ids(300).expect_err("overflow");
    assert_eq!(ids.len(), 256);
    assert!(matches!(source, Error::TimeOverflow { .. }));
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    // Exhaustion is permanent for the instance.
    assert!(matches!(
        generator.next_id(),
        Err(Error::TimeOverflow { .. })
    ));
}

#[test]
fn future_epoch_fails_construction() {
    let hour_ahead = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time since unix epoch")
        + Duration::from_secs(3_600);
    let result = Driftflake::builder()
        .epoch(hour_ahead)
        .machine_id(|| Ok(1))
        .build();
    assert!(matches!(result, Err(Error::EpochInFuture)));
}

#[test]
fn failing_machine_id_provider_fails_construction() {
    let result = Driftflake::builder()
        .machine_id(|| Err("identity service unreachable".into()))
        .build();
    assert!(matches!(result, Err(Error::MachineId(_))));
}

#[test]
fn rejecting_validator_fails_construction() {
    let result = Driftflake::builder()
        .machine_id(|| Ok(7))
        .check_machine_id(|_| false)
        .build();
    assert!(matches!(result, Err(Error::MachineIdRejected(7))));
}

#[test]
fn machine_id_is_embedded_in_every_id() {
    let generator = mocked_generator(0xABCD, ticks(42));
    for _ in 0..10 {
        assert_eq!(generator.next_id().expect("id").machine_id(), 0xABCD);
    }
    assert_eq!(generator.machine_id(), 0xABCD);
}

#[cfg(feature = "serde")]
#[test]
fn decomposed_ids_serialize_with_external_field_names() {
    let parts = DriftflakeId::from_parts(2, 1, 3).decompose();
    let json = serde_json::to_value(parts).expect("serialize");
    assert_eq!(json["time"], 2);
    assert_eq!(json["sequence"], 1);
    assert_eq!(json["machine-id"], 3);
    assert_eq!(json["msb"], 0);
}
