//! Failure taxonomy for loading, validating and persisting settings.

use core::fmt;

/// Bounded record fields, named for error reporting.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum Field {
    RadioFrequency,
    RadioPowerLevel,
    RadioHighPower,
    Bme280Enabled,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RadioFrequency => write!(f, "radio_frequency"),
            Self::RadioPowerLevel => write!(f, "radio_power_level"),
            Self::RadioHighPower => write!(f, "radio_high_power"),
            Self::Bme280Enabled => write!(f, "bme280_enabled"),
        }
    }
}

/// Why a stored byte sequence matches no known schema layout.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum SchemaMismatch {
    /// The length does not match the declared version's layout.
    WrongLength(usize),
    /// The version tag is not a supported value. Blank (`0x00`) and erased
    /// (`0xFF`) storage ends up here.
    UnsupportedVersion(u8),
    /// Wrong magic bytes, the stored data might be corrupted.
    WrongMagicBytes,
    /// The checksum does not cover the stored bytes; the record is corrupted
    /// or a write was interrupted.
    WrongChecksum,
}

/// Why a stored or submitted record was not accepted.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum SettingsError {
    /// The byte sequence does not declare any known schema layout.
    SchemaMismatch(SchemaMismatch),
    /// A bounded field holds a value outside its legal set.
    FieldOutOfRange { field: Field, value: u8 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch(SchemaMismatch::WrongLength(len)) => {
                write!(f, "Unexpected record length ({} bytes)", len)
            }
            Self::SchemaMismatch(SchemaMismatch::UnsupportedVersion(v)) => {
                write!(f, "Unsupported settings format version ({})", v)
            }
            Self::SchemaMismatch(SchemaMismatch::WrongMagicBytes) => {
                write!(f, "Wrong magic bytes")
            }
            Self::SchemaMismatch(SchemaMismatch::WrongChecksum) => {
                write!(f, "Checksum mismatch")
            }
            Self::FieldOutOfRange { field, value } => {
                write!(f, "Value {} out of range for {}", value, field)
            }
        }
    }
}

/// Errors surfaced by [`SettingsStore`](crate::SettingsStore) operations.
///
/// `E` is the storage backend's own error type, passed through opaquely.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum StoreError<E> {
    /// The record failed recognition or validation; storage was not
    /// modified.
    Rejected(SettingsError),
    /// The storage backend failed to read a slot.
    ReadFailed(E),
    /// The storage backend failed to write a slot.
    WriteFailed(E),
}

impl<E> From<SettingsError> for StoreError<E> {
    fn from(err: SettingsError) -> Self {
        Self::Rejected(err)
    }
}

impl<E: fmt::Display> fmt::Display for StoreError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(err) => write!(f, "Settings rejected: {}", err),
            Self::ReadFailed(err) => write!(f, "Storage read failed: {}", err),
            Self::WriteFailed(err) => write!(f, "Storage write failed: {}", err),
        }
    }
}
