//! # Signal Classification Module
//!
//! Pure helpers that turn a raw RSSI reading (dBm) into the qualitative
//! descriptions shown on device cards.
//!
//! ## Thresholds
//! | RSSI (dBm)        | Bucket | Label     | Proximity         |
//! |-------------------|--------|-----------|-------------------|
//! | > -50             | strong | Excellent | Very close (< 2m) |
//! | -65 < rssi <= -50 | strong | Good      | Near (2-5m)       |
//! | -75 < rssi <= -65 | medium | Fair      | Medium (5-10m)    |
//! | <= -75            | weak   | Poor      | Far (>10m)        |

use crate::registry::SightedDevice;
use chrono::{DateTime, Utc};
use std::fmt;

/// Coarse signal quality. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalBucket {
    Weak,
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalLabel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SignalLabel::Excellent => "Excellent",
            SignalLabel::Good => "Good",
            SignalLabel::Fair => "Fair",
            SignalLabel::Poor => "Poor",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    pub label: SignalLabel,
    pub bucket: SignalBucket,
}

/// Classify a signal strength reading. Total over all integers.
pub fn classify(rssi: i32) -> SignalQuality {
    let (label, bucket) = if rssi > -50 {
        (SignalLabel::Excellent, SignalBucket::Strong)
    } else if rssi > -65 {
        (SignalLabel::Good, SignalBucket::Strong)
    } else if rssi > -75 {
        (SignalLabel::Fair, SignalBucket::Medium)
    } else {
        (SignalLabel::Poor, SignalBucket::Weak)
    };
    SignalQuality { label, bucket }
}

/// Rough distance estimate shown in the expanded device card
pub fn proximity(rssi: i32) -> &'static str {
    match classify(rssi).label {
        SignalLabel::Excellent => "Very close (< 2m)",
        SignalLabel::Good => "Near (2-5m)",
        SignalLabel::Fair => "Medium (5-10m)",
        SignalLabel::Poor => "Far (>10m)",
    }
}

/// Fill ratio (0.0..=100.0) for the signal bar
pub fn signal_bar_percent(rssi: i32) -> f32 {
    let magnitude = (rssi as f32).abs();
    ((magnitude - 30.0).max(0.0) / 70.0 * 100.0).min(100.0)
}

/// Device category guessed from its advertised name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Audio,
    MobilePhone,
    Wearable,
    Peripheral,
    Unknown,
}

impl DeviceKind {
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return DeviceKind::Unknown;
        };
        let name = name.to_lowercase();
        let matches = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if matches(&["audio", "airpod", "speaker", "headphone"]) {
            DeviceKind::Audio
        } else if matches(&["phone", "pixel", "galaxy", "iphone"]) {
            DeviceKind::MobilePhone
        } else if matches(&["watch", "band"]) {
            DeviceKind::Wearable
        } else {
            DeviceKind::Peripheral
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeviceKind::Audio => "Audio Device",
            DeviceKind::MobilePhone => "Mobile Phone",
            DeviceKind::Wearable => "Wearable Device",
            DeviceKind::Peripheral => "Peripheral Device",
            DeviceKind::Unknown => "Unknown Device Type",
        };
        write!(f, "{}", text)
    }
}

/// Human friendly "last seen" text
pub fn time_since(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - last_seen).num_seconds();
    if seconds < 5 {
        "Just now".to_string()
    } else if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else {
        "Over 1 minute ago".to_string()
    }
}

/// Bucket counts over a device list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStatistics {
    pub total: usize,
    pub strong: usize,
    pub medium: usize,
    pub weak: usize,
}

impl DeviceStatistics {
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a SightedDevice>) -> Self {
        devices
            .into_iter()
            .fold(DeviceStatistics::default(), |mut stats, device| {
                stats.total += 1;
                match classify(device.rssi).bucket {
                    SignalBucket::Strong => stats.strong += 1,
                    SignalBucket::Medium => stats.medium += 1,
                    SignalBucket::Weak => stats.weak += 1,
                }
                stats
            })
    }
}
