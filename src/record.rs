//! The settings record itself: schema version 1 layout and field validation.

use core::fmt;

use crate::error::{Field, SchemaMismatch, SettingsError};
use crate::version::SchemaVersion;

/// Size of a serialized version 1 record in bytes. Fixed for the lifetime of
/// the version number.
pub const SETTINGS_V1_SIZE: usize = 16;

/// Magic bytes following the version tag.
pub(crate) const MAGIC: [u8; 3] = [0x5A, 0xC3, 0x3C];

/// Highest transmit power step the radio accepts.
pub const MAX_POWER_LEVEL: u8 = 31;

// Field offsets within the version 1 slot.
const OFFSET_VERSION: usize = 0x00;
const OFFSET_MAGIC: usize = 0x01;
const OFFSET_NODE_ID: usize = 0x04;
const OFFSET_GATEWAY_ID: usize = 0x05;
const OFFSET_NETWORK_ID: usize = 0x06;
const OFFSET_FREQUENCY: usize = 0x07;
const OFFSET_POWER_LEVEL: usize = 0x08;
const OFFSET_HIGH_POWER: usize = 0x09;
const OFFSET_BME280: usize = 0x0A;
const OFFSET_WAKEUPS: usize = 0x0C;
const OFFSET_CRC: usize = 0x0E;

/// Checksum over everything before the CRC field. Catches corruption and
/// interrupted writes that version and magic bytes alone cannot.
pub(crate) fn slot_crc(data: &[u8]) -> u16 {
    crc::Crc::<u16>::new(&crc::CRC_16_IBM_SDLC).checksum(&data[..OFFSET_CRC])
}

/// Supported radio bands.
///
/// Discriminants are the band indices documented by the radio driver, not
/// frequencies. Anything else is rejected when raw bytes are decoded.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde_repr::Deserialize_repr))]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
#[repr(u8)]
pub enum RadioFrequency {
    Band315Mhz = 31,
    Band433Mhz = 43,
    Band868Mhz = 86,
    Band915Mhz = 91,
}

impl RadioFrequency {
    fn from_index(raw: u8) -> Result<Self, SettingsError> {
        match raw {
            31 => Ok(Self::Band315Mhz),
            43 => Ok(Self::Band433Mhz),
            86 => Ok(Self::Band868Mhz),
            91 => Ok(Self::Band915Mhz),
            value => Err(SettingsError::FieldOutOfRange {
                field: Field::RadioFrequency,
                value,
            }),
        }
    }

    /// The driver-facing band index.
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RadioFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Band315Mhz => write!(f, "315 MHz"),
            Self::Band433Mhz => write!(f, "433 MHz"),
            Self::Band868Mhz => write!(f, "868 MHz"),
            Self::Band915Mhz => write!(f, "915 MHz"),
        }
    }
}

/// One node's configuration, fully validated.
///
/// A plain value type: field access and equality, no behavior. Consumers must
/// treat the node as inactive while [`Settings::is_provisioned`] is false.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde_support", derive(serde::Deserialize))]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub struct Settings {
    /// Settings format version
    pub version: SchemaVersion,
    /// Identity of this node within its network (0 = not provisioned)
    pub node_id: u8,
    /// The node acting as this node's uplink gateway
    pub gateway_id: u8,
    /// The logical network this node belongs to
    pub network_id: u8,
    /// Radio band
    pub radio_frequency: RadioFrequency,
    /// Transmit power step (0..=31)
    pub radio_power_level: u8,
    /// Route transmissions through the high power amplifier
    pub radio_high_power: bool,
    /// Whether a BME280 pressure sensor is attached and polled
    pub bme280_enabled: bool,
    /// How many times per hour the node wakes to transmit; 0 or negative
    /// means the node never wakes on its own
    pub wakeups_per_hour: i16,
}

impl Settings {
    /// The factory default record: unprovisioned, radio on the 868 MHz band
    /// at the lowest power step, no sensor, never waking.
    ///
    /// The only construction path that cannot fail.
    pub const fn factory_default() -> Self {
        Self {
            version: SchemaVersion::V1,
            node_id: 0,
            gateway_id: 0,
            network_id: 0,
            radio_frequency: RadioFrequency::Band868Mhz,
            radio_power_level: 0,
            radio_high_power: false,
            bme280_enabled: false,
            wakeups_per_hour: 0,
        }
    }

    /// Decode a version 1 slot.
    ///
    /// The byte sequence must have the exact version 1 length, tag, magic
    /// bytes and checksum; every bounded field is validated. Boolean bytes
    /// are strict, only `0x00` and `0x01` are accepted.
    pub fn from_slot_bytes(data: &[u8]) -> Result<Self, SettingsError> {
        if data.len() != SETTINGS_V1_SIZE {
            return Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongLength(
                data.len(),
            )));
        }
        if data[OFFSET_VERSION] != SchemaVersion::V1 as u8 {
            return Err(SettingsError::SchemaMismatch(
                SchemaMismatch::UnsupportedVersion(data[OFFSET_VERSION]),
            ));
        }
        if data[OFFSET_MAGIC..OFFSET_MAGIC + MAGIC.len()] != MAGIC {
            return Err(SettingsError::SchemaMismatch(
                SchemaMismatch::WrongMagicBytes,
            ));
        }
        let stored_crc = u16::from_le_bytes([data[OFFSET_CRC], data[OFFSET_CRC + 1]]);
        if stored_crc != slot_crc(data) {
            return Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongChecksum));
        }

        let settings = Self {
            version: SchemaVersion::V1,
            node_id: data[OFFSET_NODE_ID],
            gateway_id: data[OFFSET_GATEWAY_ID],
            network_id: data[OFFSET_NETWORK_ID],
            radio_frequency: RadioFrequency::from_index(data[OFFSET_FREQUENCY])?,
            radio_power_level: data[OFFSET_POWER_LEVEL],
            radio_high_power: decode_bool(data[OFFSET_HIGH_POWER], Field::RadioHighPower)?,
            bme280_enabled: decode_bool(data[OFFSET_BME280], Field::Bme280Enabled)?,
            wakeups_per_hour: i16::from_le_bytes([
                data[OFFSET_WAKEUPS],
                data[OFFSET_WAKEUPS + 1],
            ]),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize into the version 1 slot layout.
    ///
    /// The output length never varies with field values; the storage backend
    /// allocates a fixed slot per version.
    pub fn to_slot_bytes(&self) -> [u8; SETTINGS_V1_SIZE] {
        let mut data = [0; SETTINGS_V1_SIZE];

        data[OFFSET_VERSION] = self.version as u8;
        data[OFFSET_MAGIC..OFFSET_MAGIC + MAGIC.len()].copy_from_slice(&MAGIC);

        data[OFFSET_NODE_ID] = self.node_id;
        data[OFFSET_GATEWAY_ID] = self.gateway_id;
        data[OFFSET_NETWORK_ID] = self.network_id;
        data[OFFSET_FREQUENCY] = self.radio_frequency.index();
        data[OFFSET_POWER_LEVEL] = self.radio_power_level;
        data[OFFSET_HIGH_POWER] = self.radio_high_power as u8;
        data[OFFSET_BME280] = self.bme280_enabled as u8;
        data[OFFSET_WAKEUPS..OFFSET_WAKEUPS + 2]
            .copy_from_slice(&self.wakeups_per_hour.to_le_bytes());

        let crc = slot_crc(&data);
        data[OFFSET_CRC..OFFSET_CRC + 2].copy_from_slice(&crc.to_le_bytes());

        data
    }

    /// Re-check every bounded field.
    ///
    /// Runs after every load or migration and before every update, no matter
    /// how the values got here. Never modifies the record.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.radio_power_level > MAX_POWER_LEVEL {
            return Err(SettingsError::FieldOutOfRange {
                field: Field::RadioPowerLevel,
                value: self.radio_power_level,
            });
        }
        Ok(())
    }

    /// Whether the node has been given an identity yet. Consumers must stay
    /// inactive while this is false.
    pub fn is_provisioned(&self) -> bool {
        self.node_id != 0
    }

    /// Whether the node wakes up to transmit at all.
    pub fn reports_periodically(&self) -> bool {
        self.wakeups_per_hour >= 1
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::factory_default()
    }
}

fn decode_bool(raw: u8, field: Field) -> Result<bool, SettingsError> {
    match raw {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(SettingsError::FieldOutOfRange { field, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn provisioned() -> Settings {
        Settings {
            node_id: 17,
            gateway_id: 1,
            network_id: 42,
            radio_frequency: RadioFrequency::Band433Mhz,
            radio_power_level: 25,
            radio_high_power: true,
            bme280_enabled: true,
            wakeups_per_hour: 4,
            ..Settings::factory_default()
        }
    }

    /// Recompute the checksum after a test mutated payload bytes, as a
    /// (buggy) writer would have.
    fn reseal(mut data: [u8; SETTINGS_V1_SIZE]) -> [u8; SETTINGS_V1_SIZE] {
        let crc = slot_crc(&data);
        data[0x0E..].copy_from_slice(&crc.to_le_bytes());
        data
    }

    #[test]
    fn factory_default_is_unprovisioned() {
        let settings = Settings::factory_default();
        assert_eq!(settings.node_id, 0);
        assert!(!settings.is_provisioned());
        assert!(!settings.bme280_enabled);
        assert!(!settings.radio_high_power);
        assert_eq!(settings.wakeups_per_hour, 0);
        assert!(settings.validate().is_ok());
    }

    #[rstest]
    #[case(Settings::factory_default())]
    #[case(provisioned())]
    #[case(Settings { radio_power_level: MAX_POWER_LEVEL, ..provisioned() })]
    #[case(Settings { wakeups_per_hour: -1, ..provisioned() })]
    #[case(Settings { wakeups_per_hour: i16::MIN, ..provisioned() })]
    #[case(Settings { wakeups_per_hour: i16::MAX, ..provisioned() })]
    fn round_trip(#[case] settings: Settings) {
        let data = settings.to_slot_bytes();
        assert_eq!(Settings::from_slot_bytes(&data), Ok(settings));
    }

    #[test]
    fn serialized_layout_is_stable() {
        let data = provisioned().to_slot_bytes();
        assert_eq!(
            &data[..0x0E],
            &[
                0x01, 0x5A, 0xC3, 0x3C, // version + magic
                17, 1, 42, 43, // node, gateway, network, 433 MHz
                25, 1, 1, 0x00, // power, high power, bme280, reserved
                0x04, 0x00, // wakeups (LE)
            ]
        );
        assert_eq!(
            &data[0x0E..],
            &slot_crc(&data).to_le_bytes(),
            "checksum trails the payload"
        );
    }

    #[test]
    fn negative_wakeups_encode_little_endian() {
        let settings = Settings {
            wakeups_per_hour: -2,
            ..provisioned()
        };
        let data = settings.to_slot_bytes();
        assert_eq!(&data[0x0C..0x0E], &[0xFE, 0xFF]);
    }

    #[rstest]
    #[case(0)]
    #[case(15)]
    #[case(17)]
    #[case(44)]
    fn wrong_length_is_schema_mismatch(#[case] len: usize) {
        let data = [0x01; 44];
        assert_eq!(
            Settings::from_slot_bytes(&data[..len]),
            Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongLength(
                len
            )))
        );
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x02)]
    #[case(0xFF)]
    fn unsupported_version_tag_is_rejected(#[case] tag: u8) {
        let mut data = provisioned().to_slot_bytes();
        data[0] = tag;
        assert_eq!(
            Settings::from_slot_bytes(&data),
            Err(SettingsError::SchemaMismatch(
                SchemaMismatch::UnsupportedVersion(tag)
            ))
        );
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = provisioned().to_slot_bytes();
        data[2] = 0x42;
        assert_eq!(
            Settings::from_slot_bytes(&data),
            Err(SettingsError::SchemaMismatch(
                SchemaMismatch::WrongMagicBytes
            ))
        );
    }

    #[test]
    fn corrupted_payload_fails_the_checksum() {
        let mut data = provisioned().to_slot_bytes();
        data[0x05] ^= 0x10; // flip a bit in gateway_id
        assert_eq!(
            Settings::from_slot_bytes(&data),
            Err(SettingsError::SchemaMismatch(SchemaMismatch::WrongChecksum))
        );
    }

    #[rstest]
    #[case(0)]
    #[case(42)]
    #[case(87)]
    #[case(0xFF)]
    fn unsupported_band_index_is_rejected(#[case] index: u8) {
        let mut data = provisioned().to_slot_bytes();
        data[0x07] = index;
        assert_eq!(
            Settings::from_slot_bytes(&reseal(data)),
            Err(SettingsError::FieldOutOfRange {
                field: Field::RadioFrequency,
                value: index,
            })
        );
    }

    #[test]
    fn max_power_level_is_accepted() {
        let mut data = provisioned().to_slot_bytes();
        data[0x08] = MAX_POWER_LEVEL;
        let settings = Settings::from_slot_bytes(&reseal(data)).unwrap();
        assert_eq!(settings.radio_power_level, MAX_POWER_LEVEL);
    }

    #[test]
    fn power_level_past_max_is_rejected() {
        let mut data = provisioned().to_slot_bytes();
        data[0x08] = MAX_POWER_LEVEL + 1;
        assert_eq!(
            Settings::from_slot_bytes(&reseal(data)),
            Err(SettingsError::FieldOutOfRange {
                field: Field::RadioPowerLevel,
                value: MAX_POWER_LEVEL + 1,
            })
        );
    }

    #[rstest]
    #[case(0x09, Field::RadioHighPower)]
    #[case(0x0A, Field::Bme280Enabled)]
    fn non_boolean_flag_byte_is_rejected(#[case] offset: usize, #[case] field: Field) {
        let mut data = provisioned().to_slot_bytes();
        data[offset] = 2;
        assert_eq!(
            Settings::from_slot_bytes(&reseal(data)),
            Err(SettingsError::FieldOutOfRange { field, value: 2 })
        );
    }

    #[test]
    fn validation_is_idempotent() {
        let settings = provisioned();
        let before = settings;
        assert!(settings.validate().is_ok());
        assert!(settings.validate().is_ok());
        assert_eq!(settings, before);
    }

    #[test]
    fn node_id_zero_reads_as_unprovisioned_regardless_of_other_fields() {
        let settings = Settings {
            node_id: 0,
            ..provisioned()
        };
        let reloaded = Settings::from_slot_bytes(&settings.to_slot_bytes()).unwrap();
        assert!(!reloaded.is_provisioned());
    }

    #[rstest]
    #[case(-5, false)]
    #[case(0, false)]
    #[case(1, true)]
    #[case(60, true)]
    fn reporting_requires_at_least_one_wakeup(#[case] wakeups: i16, #[case] expected: bool) {
        let settings = Settings {
            wakeups_per_hour: wakeups,
            ..provisioned()
        };
        assert_eq!(settings.reports_periodically(), expected);
    }
}
