//! Boot-time load and the provisioning update path.

use crate::error::StoreError;
use crate::record::Settings;
use crate::version::{SchemaVersion, VersionedSettings};

/// Size of one storage slot in bytes.
pub const SLOT_SIZE: usize = SchemaVersion::CURRENT.record_size();

/// The two fixed regions the storage backend reserves for settings records.
///
/// The backup slot keeps a complete record recoverable when power is lost
/// while the primary slot is being rewritten.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum Slot {
    Primary,
    Backup,
}

/// Raw slot access provided by the non-volatile storage driver.
///
/// Addressing, erase cycles and wear management stay on the driver side; the
/// store only ever reads and writes whole slots.
pub trait SettingsStorage {
    type Error;

    fn read(&mut self, slot: Slot, buf: &mut [u8]) -> Result<(), Self::Error>;
    fn write(&mut self, slot: Slot, data: &[u8]) -> Result<(), Self::Error>;
}

/// Which source produced the boot-time record.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum SettingsOrigin {
    PrimarySlot,
    BackupSlot,
    /// Neither slot held a valid record; the node runs unprovisioned.
    FactoryDefault,
}

/// Result of an accepted update.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt_support", derive(defmt::Format))]
pub enum UpdateOutcome {
    /// The record was committed to both slots.
    Written,
    /// The submitted record equals the current one; nothing was written.
    Unchanged,
}

/// The in-memory settings record and its tie to non-volatile storage.
///
/// Loaded once at boot by a single owner. Reads go through
/// [`SettingsStore::settings`]; [`SettingsStore::update`] is the only writer
/// path.
pub struct SettingsStore {
    current: Settings,
    origin: SettingsOrigin,
}

impl SettingsStore {
    /// Load the boot-time record.
    ///
    /// Tries the primary slot, then the backup slot. Each candidate is
    /// recognized, migrated to the newest layout and re-validated. Unreadable,
    /// unrecognized and rejected slots all fall back to the factory default
    /// record, so boot never fails; the node comes up unprovisioned instead.
    pub fn load<S: SettingsStorage>(storage: &mut S) -> Self {
        let (current, origin) = match Self::load_slot(storage, Slot::Primary) {
            Some(settings) => (settings, SettingsOrigin::PrimarySlot),
            None => match Self::load_slot(storage, Slot::Backup) {
                Some(settings) => (settings, SettingsOrigin::BackupSlot),
                None => (Settings::factory_default(), SettingsOrigin::FactoryDefault),
            },
        };

        #[cfg(feature = "defmt_support")]
        match origin {
            SettingsOrigin::PrimarySlot => defmt::debug!("Settings loaded from primary slot"),
            SettingsOrigin::BackupSlot => {
                defmt::warn!("Primary settings slot invalid, loaded backup")
            }
            SettingsOrigin::FactoryDefault => {
                defmt::warn!("No valid settings record, using factory defaults")
            }
        }

        Self { current, origin }
    }

    /// Read and recognize the record currently held by one slot, without
    /// touching any in-memory state.
    ///
    /// Unlike [`SettingsStore::load`], failures are surfaced; provisioning
    /// tools use this to inspect a node before rewriting it.
    pub fn inspect_slot<S: SettingsStorage>(
        storage: &mut S,
        slot: Slot,
    ) -> Result<Settings, StoreError<S::Error>> {
        let mut buf = [0; SLOT_SIZE];
        storage.read(slot, &mut buf).map_err(StoreError::ReadFailed)?;
        let stored = VersionedSettings::decode(&buf).map_err(StoreError::Rejected)?;
        let settings = stored.migrate();
        settings.validate().map_err(StoreError::Rejected)?;
        Ok(settings)
    }

    fn load_slot<S: SettingsStorage>(storage: &mut S, slot: Slot) -> Option<Settings> {
        Self::inspect_slot(storage, slot).ok()
    }

    /// The current record.
    pub fn settings(&self) -> &Settings {
        &self.current
    }

    /// Which source the boot-time record came from.
    pub fn origin(&self) -> SettingsOrigin {
        self.origin
    }

    /// Replace the stored record. The only writer path.
    ///
    /// The record is validated first and rejected without touching storage.
    /// A record equal to the current one is not rewritten. Otherwise the
    /// backup slot is committed before the primary slot and the in-memory
    /// record is only replaced once both writes succeeded, so a power
    /// failure mid-update leaves a complete old or new record in at least
    /// one slot.
    pub fn update<S: SettingsStorage>(
        &mut self,
        storage: &mut S,
        settings: Settings,
    ) -> Result<UpdateOutcome, StoreError<S::Error>> {
        settings.validate().map_err(StoreError::Rejected)?;

        if settings == self.current {
            return Ok(UpdateOutcome::Unchanged);
        }

        let data = settings.to_slot_bytes();
        storage
            .write(Slot::Backup, &data)
            .map_err(StoreError::WriteFailed)?;
        storage
            .write(Slot::Primary, &data)
            .map_err(StoreError::WriteFailed)?;
        self.current = settings;

        #[cfg(feature = "defmt_support")]
        defmt::info!("Settings committed, node id {}", self.current.node_id);

        Ok(UpdateOutcome::Written)
    }
}
