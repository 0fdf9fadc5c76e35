//! Schema version dispatch and forward migration.

use core::fmt;

use crate::error::{SchemaMismatch, SettingsError};
use crate::record::{Settings, SETTINGS_V1_SIZE};

/// Identifies one shipped slot layout and its validity rules.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde_repr::Deserialize_repr))]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
#[repr(u8)]
pub enum SchemaVersion {
    V1 = 1,
}

impl SchemaVersion {
    /// The version written by the running firmware.
    pub const CURRENT: SchemaVersion = SchemaVersion::V1;

    /// Serialized record size for this version.
    pub const fn record_size(self) -> usize {
        match self {
            Self::V1 => SETTINGS_V1_SIZE,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
        }
    }
}

/// A record of any supported schema version.
///
/// Decoding dispatches on the leading version tag; [`VersionedSettings::migrate`]
/// collapses the result to the newest layout. Supporting another version
/// means one [`SchemaVersion`] entry, one decode arm and one migration arm.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum VersionedSettings {
    V1(Settings),
}

impl VersionedSettings {
    /// Recognize and validate a stored byte sequence.
    ///
    /// The sequence must carry a known version tag and that version's exact
    /// length before its fields are validated. Blank storage (all `0x00` or
    /// erased `0xFF`) carries no valid tag and is reported as a schema
    /// mismatch, never as a panic or a partial read.
    pub fn decode(data: &[u8]) -> Result<Self, SettingsError> {
        let tag = match data.first() {
            Some(tag) => *tag,
            None => {
                return Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongLength(
                    0,
                )))
            }
        };
        let version = SchemaVersion::from_tag(tag).ok_or(SettingsError::SchemaMismatch(
            SchemaMismatch::UnsupportedVersion(tag),
        ))?;
        if data.len() != version.record_size() {
            return Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongLength(
                data.len(),
            )));
        }

        match version {
            SchemaVersion::V1 => Settings::from_slot_bytes(data).map(Self::V1),
        }
    }

    /// Upgrade to the newest layout.
    ///
    /// One-directional. Fields introduced after the stored version are
    /// populated with their factory defaults here, never with bytes
    /// reinterpreted from the old layout.
    pub fn migrate(self) -> Settings {
        match self {
            Self::V1(settings) => settings,
        }
    }

    /// The version the stored record declared.
    pub fn version(&self) -> SchemaVersion {
        match self {
            Self::V1(_) => SchemaVersion::V1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Field, SchemaMismatch, SettingsError};
    use rstest::rstest;

    #[test]
    fn decode_dispatches_to_v1() {
        let settings = Settings {
            node_id: 3,
            ..Settings::factory_default()
        };
        let stored = VersionedSettings::decode(&settings.to_slot_bytes()).unwrap();
        assert_eq!(stored.version(), SchemaVersion::V1);
        assert_eq!(stored, VersionedSettings::V1(settings));
    }

    #[test]
    fn migrate_from_v1_is_lossless() {
        let settings = Settings {
            node_id: 9,
            wakeups_per_hour: 12,
            ..Settings::factory_default()
        };
        let stored = VersionedSettings::decode(&settings.to_slot_bytes()).unwrap();
        assert_eq!(stored.migrate(), settings);
    }

    #[rstest]
    #[case(&[0xFF; SETTINGS_V1_SIZE], 0xFF)]
    #[case(&[0x00; SETTINGS_V1_SIZE], 0x00)]
    fn blank_storage_is_unrecognized(#[case] data: &[u8], #[case] tag: u8) {
        assert_eq!(
            VersionedSettings::decode(data),
            Err(SettingsError::SchemaMismatch(
                SchemaMismatch::UnsupportedVersion(tag)
            ))
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(SETTINGS_V1_SIZE - 1)]
    #[case(SETTINGS_V1_SIZE + 1)]
    #[case(64)]
    fn wrong_length_is_unrecognized_for_every_version(#[case] len: usize) {
        let mut data = [0u8; 64];
        data[0] = SchemaVersion::V1 as u8;
        assert_eq!(
            VersionedSettings::decode(&data[..len]),
            Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongLength(
                len
            )))
        );
    }

    #[test]
    fn dispatch_still_validates_fields() {
        let mut data = Settings::factory_default().to_slot_bytes();
        data[0x07] = 99; // not a documented band index
        let crc = crate::record::slot_crc(&data);
        data[0x0E..].copy_from_slice(&crc.to_le_bytes());
        assert_eq!(
            VersionedSettings::decode(&data),
            Err(SettingsError::FieldOutOfRange {
                field: Field::RadioFrequency,
                value: 99,
            })
        );
    }

    #[test]
    fn current_version_matches_slot_size() {
        assert_eq!(SchemaVersion::CURRENT.record_size(), SETTINGS_V1_SIZE);
    }
}
