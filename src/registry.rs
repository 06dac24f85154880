//! # Device Registry Module
//!
//! In-memory set of currently visible Bluetooth devices, keyed by address.
//!
//! ## Lifecycle
//! 1. First sighting from a scan inserts the device with `last_seen = now`
//! 2. Later sightings refresh signal strength and `last_seen` together
//! 3. A recurring prune pass drops devices not seen within the timeout
//!
//! Entries are kept in first-seen order so the device list renders stably.

use crate::models::Sighting;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightedDevice {
    pub address: String,
    pub name: Option<String>,
    pub rssi: i32,
    pub last_seen: DateTime<Utc>,
}

impl SightedDevice {
    pub fn new(
        address: impl Into<String>,
        name: Option<String>,
        rssi: i32,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            name,
            rssi,
            last_seen,
        }
    }

    /// Name to show on screen
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Device")
    }

    /// Wire representation used when saving an interaction
    pub fn to_sighting(&self) -> Sighting {
        Sighting {
            address: self.address.clone(),
            name: self.name.clone(),
            rssi: self.rssi,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<SightedDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting observed at `now`.
    ///
    /// An existing entry keeps its name when the new sighting has none, and its
    /// `last_seen` never moves backwards.
    pub fn upsert(&mut self, sighting: Sighting, now: DateTime<Utc>) {
        let name = sighting.name.filter(|n| !n.is_empty());

        match self.devices.iter_mut().find(|d| d.address == sighting.address) {
            Some(existing) => {
                existing.rssi = sighting.rssi;
                existing.last_seen = existing.last_seen.max(now);
                if name.is_some() {
                    existing.name = name;
                }
            }
            None => {
                log::debug!("New device sighted: {}", sighting.address);
                self.devices
                    .push(SightedDevice::new(sighting.address, name, sighting.rssi, now));
            }
        }
    }

    /// Drop every device whose age has reached `staleness`. Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>, staleness: TimeDelta) -> usize {
        let before = self.devices.len();
        self.devices.retain(|d| now - d.last_seen < staleness);
        before - self.devices.len()
    }

    pub fn snapshot(&self) -> Vec<SightedDevice> {
        self.devices.clone()
    }

    #[cfg(test)]
    pub fn get(&self, address: &str) -> Option<&SightedDevice> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Case-insensitive search over display name and address
pub fn filter_devices<'a>(devices: &'a [SightedDevice], query: &str) -> Vec<&'a SightedDevice> {
    let query = query.trim().to_lowercase();
    devices
        .iter()
        .filter(|d| {
            query.is_empty()
                || d.display_name().to_lowercase().contains(&query)
                || d.address.to_lowercase().contains(&query)
        })
        .collect()
}
