use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The 10 ms quantum used by the timestamp field.
pub const TICK: Duration = Duration::from_millis(10);

/// One tick in nanoseconds.
pub(crate) const TICK_NANOS: i64 = 10_000_000;

/// Default epoch: Monday, September 1, 2014 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_409_529_600_000);

/// A source of wall-clock time, expressed in nanoseconds since the Unix
/// epoch.
///
/// This abstraction lets tests substitute a fixed or stepped clock for the
/// real one. The generator derives elapsed ticks and sleep durations from
/// this single reading.
///
/// # Example
///
/// ```
/// use driftflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn unix_nanos(&self) -> i64 {
///         1_234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.unix_nanos(), 1_234);
/// ```
pub trait TimeSource {
    /// Returns the current UTC time in nanoseconds since the Unix epoch.
    fn unix_nanos(&self) -> i64;
}

/// The default [`TimeSource`], backed by [`SystemTime`].
#[derive(Copy, Clone, Debug, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn unix_nanos(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_nanos() as i64,
            // Clock set before 1970: clamp to the epoch.
            Err(_) => 0,
        }
    }
}

/// Converts an absolute time in nanoseconds to whole ticks.
pub(crate) const fn to_ticks(nanos: i64) -> i64 {
    nanos / TICK_NANOS
}
