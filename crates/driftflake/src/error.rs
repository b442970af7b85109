use crate::id::DriftflakeId;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Boxed error type accepted from user-supplied machine ID providers.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// All possible errors that `driftflake` can produce.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured epoch is ahead of the current wall-clock time.
    #[error("epoch is ahead of the current time")]
    EpochInFuture,

    /// The machine ID provider returned an error.
    #[error("machine id provider failed: {0}")]
    MachineId(#[source] BoxError),

    /// The machine ID validator rejected the resolved identity.
    #[error("machine id {0} rejected by validator")]
    MachineIdRejected(u16),

    /// No private IPv4 address was found on any non-loopback interface.
    #[error("no private ip address")]
    NoPrivateIpv4,

    /// Enumerating the host's network interfaces failed.
    #[error("failed to enumerate network interfaces")]
    InterfaceEnumeration(#[from] std::io::Error),

    /// The elapsed time no longer fits the timestamp field.
    ///
    /// Once reached, this is permanent for the instance: the generator can
    /// never again produce a valid ID without reconfiguration.
    #[error(
        "elapsed time {elapsed} exceeds the {bits}-bit timestamp field",
        bits = DriftflakeId::TIMESTAMP_BITS
    )]
    TimeOverflow {
        /// The tick count that overflowed.
        elapsed: i64,
    },

    /// The operation failed due to a poisoned lock.
    ///
    /// This can happen if another thread panicked while holding the
    /// generator's lock. Not produced when the `parking-lot` feature is
    /// enabled.
    #[error("generator lock poisoned")]
    LockPoisoned,
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

/// A batch allocation failure carrying the IDs produced before the failure.
///
/// Items generated before the failing one are still valid and unique;
/// callers should not discard them.
#[derive(Debug, thiserror::Error)]
#[error("batch stopped after {} ids: {source}", ids.len())]
pub struct BatchError {
    /// IDs successfully produced before the failure.
    pub ids: Vec<DriftflakeId>,
    /// The allocation failure that ended the batch.
    #[source]
    pub source: Error,
}
