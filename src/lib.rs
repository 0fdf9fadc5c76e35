#![cfg_attr(not(test), no_std)]
//! # Node Settings
//!
//! The persistent configuration record of a battery powered radio/sensor
//! node. The record is written by a provisioning tool, read from non-volatile
//! storage at every boot and only rewritten through
//! [`SettingsStore::update`].
//!
//! ## Slot Layout (version 1)
//!
//! ```text
//!        0           8          16          24          32
//!        +-----------+-----------+-----------+-----------+
//! 0x00   | Version   | Magic                             |
//!        +-----------+-----------+-----------+-----------+
//! 0x04   | NodeId    | GatewayId | NetworkId | Frequency |
//!        +-----------+-----------+-----------+-----------+
//! 0x08   | PowerLvl  | HighPower | Bme280    | Reserved  |
//!        +-----------+-----------+-----------+-----------+
//! 0x0C   | WakeupsPerHour        | Checksum              |
//!        +-----------+-----------+-----------+-----------+
//! ```
//!
//! ## Fields
//!
//! ### Header (0x00 - 0x04, 4 bytes)
//!
//! - `Version`: The constant `0x01`, changes when the slot layout changes
//!   (1 byte)
//! - `Magic`: The sequence `0x5A 0xC3 0x3C`, checked on every load to catch
//!   corrupted or foreign data. Differs from blank (`0x00`) and erased
//!   (`0xFF`) storage in every byte.
//!
//! ### Identity (0x04 - 0x07, 3 bytes)
//!
//! - `NodeId`: Identity of this node within its network. `0` means the node
//!   has not been provisioned yet (1 byte, u8)
//! - `GatewayId`: The node acting as this node's uplink gateway (1 byte, u8)
//! - `NetworkId`: The logical network this node belongs to; nodes on
//!   different networks do not interoperate (1 byte, u8)
//!
//! ### Radio (0x07 - 0x0A, 3 bytes)
//!
//! - `Frequency`: Band index as documented by the radio driver, see
//!   [`RadioFrequency`] (1 byte, u8)
//! - `PowerLvl`: Transmit power step, `0..=31` (1 byte, u8)
//! - `HighPower`: Route transmissions through the high power amplifier
//!   (1 byte, strictly `0x00` or `0x01`)
//!
//! ### Sensing and Scheduling (0x0A - 0x0E)
//!
//! - `Bme280`: Whether a BME280 pressure sensor is attached and polled
//!   (1 byte, strictly `0x00` or `0x01`)
//! - `WakeupsPerHour`: How many times per hour the node wakes to transmit.
//!   `0` or negative means the node never wakes on its own (2 bytes, i16, LE)
//!
//! ### Trailer (0x0E - 0x10, 2 bytes)
//!
//! - `Checksum`: CRC-16 (X.25) over bytes 0x00-0x0E. Catches corruption and
//!   interrupted writes that the magic bytes alone would miss (2 bytes, u16,
//!   LE)
//!
//! Reserved bytes are written as `0x00` and ignored on load.
//!
//! ## Storage
//!
//! Non-volatile storage reserves two fixed slots, primary and backup. Boot
//! reads the primary slot and falls back to the backup slot, then to the
//! factory default record, so the node always comes up with a usable (if
//! unprovisioned) configuration. Updates commit the backup slot before the
//! primary slot, leaving a complete record recoverable if power is lost
//! mid-write. See [`SettingsStore`].

mod error;
mod record;
mod store;
mod version;

pub use error::{Field, SchemaMismatch, SettingsError, StoreError};
pub use record::{RadioFrequency, Settings, MAX_POWER_LEVEL, SETTINGS_V1_SIZE};
pub use store::{
    SettingsOrigin, SettingsStorage, SettingsStore, Slot, UpdateOutcome, SLOT_SIZE,
};
pub use version::{SchemaVersion, VersionedSettings};
