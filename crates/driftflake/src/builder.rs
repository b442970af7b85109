use crate::error::{BoxError, Error, Result};
use crate::generator::{Driftflake, State};
use crate::id::DriftflakeId;
use crate::machine_id::lower_16_bit_private_ip;
use crate::mutex::Mutex;
use crate::time::{DEFAULT_EPOCH, TimeSource, WallClock, to_ticks};
use std::time::Duration;

type MachineIdProvider = Box<dyn FnOnce() -> core::result::Result<u16, BoxError>>;
type MachineIdValidator = Box<dyn FnOnce(u16) -> bool>;

/// Configures and constructs a [`Driftflake`] generator.
///
/// All settings are optional:
///
/// - `epoch`: the zero point of the timestamp field, as a duration since the
///   Unix epoch. Defaults to [`DEFAULT_EPOCH`]. Construction fails if it is
///   ahead of the current time.
/// - `machine_id`: a provider for the 16-bit instance identity. Defaults to
///   [`lower_16_bit_private_ip`]. Construction fails if the provider fails.
/// - `check_machine_id`: a validator for the resolved identity (e.g. a
///   registry lookup asserting uniqueness). Construction fails if it returns
///   false.
///
/// # Example
///
/// ```
/// use driftflake::Driftflake;
/// use std::time::Duration;
///
/// let generator = Driftflake::builder()
///     .epoch(Duration::from_millis(1_735_689_600_000)) // 2025-01-01 UTC
///     .machine_id(|| Ok(7))
///     .check_machine_id(|id| id != 0)
///     .build()
///     .expect("generator");
/// ```
pub struct Builder<T = WallClock> {
    epoch: Duration,
    machine_id: Option<MachineIdProvider>,
    check_machine_id: Option<MachineIdValidator>,
    time: T,
}

impl Default for Builder<WallClock> {
    fn default() -> Self {
        Self {
            epoch: DEFAULT_EPOCH,
            machine_id: None,
            check_machine_id: None,
            time: WallClock,
        }
    }
}

impl<T> Builder<T>
where
    T: TimeSource,
{
    /// Sets the epoch, expressed as a duration since the Unix epoch.
    pub fn epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    /// Sets the machine ID provider, overriding private IP discovery.
    pub fn machine_id(
        mut self,
        provider: impl FnOnce() -> core::result::Result<u16, BoxError> + 'static,
    ) -> Self {
        self.machine_id = Some(Box::new(provider));
        self
    }

    /// Sets a validator for the resolved machine ID.
    pub fn check_machine_id(mut self, validator: impl FnOnce(u16) -> bool + 'static) -> Self {
        self.check_machine_id = Some(Box::new(validator));
        self
    }

    /// Replaces the time source. Primarily a seam for tests.
    pub fn time_source<U: TimeSource>(self, time: U) -> Builder<U> {
        Builder {
            epoch: self.epoch,
            machine_id: self.machine_id,
            check_machine_id: self.check_machine_id,
            time,
        }
    }

    /// Validates the configuration and constructs the generator.
    ///
    /// # Errors
    ///
    /// - [`Error::EpochInFuture`] if the epoch is ahead of the current time.
    /// - [`Error::MachineId`] if the machine ID provider fails.
    /// - [`Error::MachineIdRejected`] if the validator returns false.
    /// - Discovery errors from [`lower_16_bit_private_ip`] when no provider
    ///   is configured.
    pub fn build(self) -> Result<Driftflake<T>> {
        let epoch_nanos = self.epoch.as_nanos() as i64;
        if epoch_nanos > self.time.unix_nanos() {
            return Err(Error::EpochInFuture);
        }

        let machine_id = match self.machine_id {
            Some(provider) => provider().map_err(Error::MachineId)?,
            None => lower_16_bit_private_ip()?,
        };
        if let Some(validator) = self.check_machine_id {
            if !validator(machine_id) {
                return Err(Error::MachineIdRejected(machine_id));
            }
        }

        Ok(Driftflake {
            // Start the sequence at its maximum so the first allocation in a
            // not-yet-advanced tick wraps to zero.
            state: Mutex::new(State {
                elapsed: 0,
                sequence: DriftflakeId::max_sequence() as u16,
            }),
            epoch_ticks: to_ticks(epoch_nanos),
            machine_id,
            time: self.time,
        })
    }
}
