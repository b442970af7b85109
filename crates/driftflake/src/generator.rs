use crate::builder::Builder;
use crate::error::{BatchError, Error, Result};
use crate::id::DriftflakeId;
use crate::mutex::{Mutex, MutexGuard};
use crate::time::{TICK_NANOS, TimeSource, WallClock, to_ticks};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mutable allocation state, only ever touched while holding the lock.
pub(crate) struct State {
    /// Last-used value of the timestamp field. Monotonically non-decreasing
    /// for the life of the generator.
    pub(crate) elapsed: i64,
    /// Last-used sequence value within `elapsed`.
    pub(crate) sequence: u16,
}

/// A distributed unique ID generator.
///
/// One instance owns the clock/sequence state for a single 16-bit machine
/// identity and hands out strictly increasing [`DriftflakeId`]s. All state
/// mutation is serialized behind a single lock, so a generator can be shared
/// freely across threads (typically via `Arc`).
///
/// Throughput is bounded by construction: at most 256 IDs per 10 ms tick.
/// When a tick's sequence space is exhausted the generator borrows the next
/// tick and sleeps, while holding the lock, until the wall clock catches up.
/// This backpressure is deliberate; it is what keeps IDs unique and ordered
/// under sustained load.
///
/// # Example
///
/// ```
/// use driftflake::Driftflake;
///
/// let generator = Driftflake::builder()
///     .machine_id(|| Ok(1))
///     .build()
///     .expect("generator");
///
/// let a = generator.next_id().expect("id");
/// let b = generator.next_id().expect("id");
/// assert!(a < b);
/// ```
pub struct Driftflake<T = WallClock>
where
    T: TimeSource,
{
    pub(crate) state: Mutex<State>,
    /// The epoch in whole ticks since the Unix epoch. Immutable.
    pub(crate) epoch_ticks: i64,
    /// Identity of this instance. Immutable.
    pub(crate) machine_id: u16,
    pub(crate) time: T,
}

impl Driftflake<WallClock> {
    /// Returns a [`Builder`] with default settings.
    pub fn builder() -> Builder<WallClock> {
        Builder::default()
    }
}

impl<T> Driftflake<T>
where
    T: TimeSource,
{
    /// Returns the machine ID embedded in every generated ID.
    pub const fn machine_id(&self) -> u16 {
        self.machine_id
    }

    /// Generates the next unique ID.
    ///
    /// May block for up to one tick (10 ms) when the current tick's sequence
    /// space is exhausted. The block happens while the generator's lock is
    /// held, stalling concurrent callers for the same bounded duration.
    ///
    /// # Errors
    ///
    /// - [`Error::TimeOverflow`] once the elapsed time no longer fits the
    ///   39-bit timestamp field. Permanent for this instance.
    /// - [`Error::LockPoisoned`] if another thread panicked while allocating.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<DriftflakeId> {
        let mut state = self.lock()?;
        self.next_id_locked(&mut state)
    }

    /// Generates a batch of `count` IDs under a single lock acquisition.
    ///
    /// No other caller can interleave within the batch, so the returned IDs
    /// are consecutive. Holding the lock for the whole batch trades fairness
    /// for throughput; callers issuing very large batches will stall
    /// concurrent allocation for the batch's duration (including any
    /// backpressure sleeps, one per 256 IDs).
    ///
    /// # Errors
    ///
    /// On failure at item `k`, returns a [`BatchError`] carrying the `k` IDs
    /// already produced. Those IDs are valid and unique; callers should not
    /// discard them.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_ids(&self, count: usize) -> Result<Vec<DriftflakeId>, BatchError> {
        let mut state = self.lock().map_err(|source| BatchError {
            ids: Vec::new(),
            source,
        })?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            match self.next_id_locked(&mut state) {
                Ok(id) => ids.push(id),
                Err(source) => return Err(BatchError { ids, source }),
            }
        }
        Ok(ids)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            self.state.lock().map_err(Error::from)
        }
    }

    /// The allocation state machine. Not reentrant: requires the lock.
    fn next_id_locked(&self, state: &mut State) -> Result<DriftflakeId> {
        const SEQUENCE_MASK: u16 = DriftflakeId::SEQUENCE_MASK as u16;

        let now = self.time.unix_nanos();
        let current = to_ticks(now) - self.epoch_ticks;
        if state.elapsed < current {
            // The clock moved into a new tick: take it and reset the
            // sequence.
            state.elapsed = current;
            state.sequence = 0;
        } else {
            // Same tick, or the clock jittered backward. Never reuse a
            // (tick, sequence) pair: advance the sequence, and when it
            // wraps, borrow the next tick and sleep until the wall clock
            // reaches it.
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.elapsed += 1;
                let overtime = state.elapsed - current;
                std::thread::sleep(sleep_until_tick(overtime, now));
            }
        }

        self.pack(state)
    }

    fn pack(&self, state: &State) -> Result<DriftflakeId> {
        // Checked on every allocation: uptime alone can push `elapsed` past
        // the field's capacity long after construction.
        if state.elapsed >= (1_i64 << DriftflakeId::TIMESTAMP_BITS) {
            return Err(Error::TimeOverflow {
                elapsed: state.elapsed,
            });
        }
        Ok(DriftflakeId::from_parts(
            state.elapsed as u64,
            state.sequence,
            self.machine_id,
        ))
    }
}

/// Time remaining until the start of the borrowed tick, `overtime` ticks
/// ahead of `now`.
fn sleep_until_tick(overtime: i64, now_nanos: i64) -> Duration {
    let nanos = overtime * TICK_NANOS - now_nanos.rem_euclid(TICK_NANOS);
    Duration::from_nanos(nanos.max(0) as u64)
}
