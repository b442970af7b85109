use core::fmt;

/// A 63-bit Driftflake ID packed into a `u64`.
///
/// - 1 bit reserved (always zero)
/// - 39 bits timestamp (10 ms ticks since the configured epoch)
/// - 8 bits sequence
/// - 16 bits machine ID
///
/// ```text
///  Bit Index:  63           63 62            24 23            16 15             0
///              +--------------+----------------+----------------+---------------+
///  Field:      | reserved (1) | timestamp (39) |  sequence (8)  | machine (16)  |
///              +--------------+----------------+----------------+---------------+
///              |<----------- MSB ---------- 64 bits ---------- LSB ------------>|
/// ```
///
/// IDs generated by a single instance compare strictly increasing in
/// allocation order: the timestamp occupies the high bits and the sequence
/// breaks ties within a tick.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriftflakeId {
    id: u64,
}

impl DriftflakeId {
    /// Bit width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 39;

    /// Bit width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 8;

    /// Bit width of the machine ID field.
    pub const MACHINE_ID_BITS: u64 = 16;

    /// Bitmask for extracting the 39-bit timestamp field. Occupies bits 24
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 8-bit sequence field. Occupies bits 16
    /// through 23.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Bitmask for extracting the 16-bit machine ID field. Occupies bits 0
    /// through 15.
    pub const MACHINE_ID_MASK: u64 = (1 << Self::MACHINE_ID_BITS) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 24).
    pub const TIMESTAMP_SHIFT: u64 = Self::SEQUENCE_BITS + Self::MACHINE_ID_BITS;

    /// Number of bits to shift the sequence field (bit 16).
    pub const SEQUENCE_SHIFT: u64 = Self::MACHINE_ID_BITS;

    /// Number of bits to shift the machine ID field (bit 0).
    pub const MACHINE_ID_SHIFT: u64 = 0;

    /// Packs the three fields into an ID.
    ///
    /// Out-of-range inputs are masked to their field width; the generator
    /// enforces range before calling this.
    pub const fn from_parts(timestamp: u64, sequence: u16, machine_id: u16) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let sequence = ((sequence as u64) & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        let machine_id = ((machine_id as u64) & Self::MACHINE_ID_MASK) << Self::MACHINE_ID_SHIFT;
        Self {
            id: timestamp | sequence | machine_id,
        }
    }

    /// Extracts the timestamp from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Extracts the machine ID from the packed ID.
    pub const fn machine_id(&self) -> u64 {
        (self.id >> Self::MACHINE_ID_SHIFT) & Self::MACHINE_ID_MASK
    }

    /// Extracts the reserved top bit. Zero for every ID this crate produces.
    pub const fn msb(&self) -> u64 {
        self.id >> 63
    }

    /// Returns the maximum representable timestamp value.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum representable sequence value.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns the maximum representable machine ID value.
    pub const fn max_machine_id() -> u64 {
        Self::MACHINE_ID_MASK
    }

    /// Converts this ID into its raw `u64` representation.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Converts a raw `u64` into an ID.
    ///
    /// Total: any `u64` is accepted, including values never produced by a
    /// generator.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Splits the ID into its named parts.
    pub const fn decompose(&self) -> IdParts {
        IdParts {
            id: self.id,
            msb: self.msb(),
            time: self.timestamp(),
            sequence: self.sequence(),
            machine_id: self.machine_id(),
        }
    }
}

impl fmt::Display for DriftflakeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for DriftflakeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DriftflakeId")
            .field("timestamp", &self.timestamp())
            .field("sequence", &self.sequence())
            .field("machine_id", &self.machine_id())
            .finish()
    }
}

/// The decomposed fields of an ID.
///
/// A fixed-shape record rather than a map: the key set is known at design
/// time. When serialized, the machine ID field uses the external key
/// `machine-id`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdParts {
    /// The original packed value.
    pub id: u64,
    /// The reserved top bit, expected to always be zero.
    pub msb: u64,
    /// Elapsed 10 ms ticks since the generator's epoch.
    pub time: u64,
    /// Intra-tick counter.
    pub sequence: u64,
    /// Identity of the generating instance.
    #[cfg_attr(feature = "serde", serde(rename = "machine-id"))]
    pub machine_id: u64,
}
