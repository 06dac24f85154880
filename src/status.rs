//! # System Status Module
//!
//! Availability of the kiosk's hardware and server subsystems as reported by
//! `/data/sys_check/:module`. Modules are checked one after another; a failed
//! check only affects its own module.

use crate::backend::StatusProbe;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Kinect,
    BtLowEnergy,
    Gpio,
    VisumServer,
}

impl Subsystem {
    pub fn all() -> [Subsystem; 4] {
        [
            Subsystem::Kinect,
            Subsystem::BtLowEnergy,
            Subsystem::Gpio,
            Subsystem::VisumServer,
        ]
    }

    /// Module name as used in the sys_check route
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Kinect => "Kinect",
            Subsystem::BtLowEnergy => "BtLowEnergy",
            Subsystem::Gpio => "GPIO",
            Subsystem::VisumServer => "VisumServer",
        }
    }

    /// Label shown on the status strip
    pub fn display_name(&self) -> &'static str {
        match self {
            Subsystem::Kinect => "Kinect",
            Subsystem::BtLowEnergy => "Bluetooth",
            Subsystem::Gpio => "GPIO Device",
            Subsystem::VisumServer => "VSM Server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemState {
    Available,
    Unavailable,
    Unknown,
}

impl fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SubsystemState::Available => "Available",
            SubsystemState::Unavailable => "Unavailable",
            SubsystemState::Unknown => "Unknown",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub modules: Vec<(Subsystem, SubsystemState)>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            modules: Subsystem::all()
                .into_iter()
                .map(|m| (m, SubsystemState::Unknown))
                .collect(),
        }
    }
}

impl SystemStatus {
    #[cfg(test)]
    pub fn state(&self, module: Subsystem) -> SubsystemState {
        self.modules
            .iter()
            .find(|(m, _)| *m == module)
            .map(|(_, s)| *s)
            .unwrap_or(SubsystemState::Unknown)
    }
}

pub async fn check_system<P: StatusProbe + ?Sized>(probe: &P) -> SystemStatus {
    let mut modules = Vec::with_capacity(4);
    for module in Subsystem::all() {
        let state = match probe.is_available(module).await {
            Ok(true) => SubsystemState::Available,
            Ok(false) => SubsystemState::Unavailable,
            Err(e) => {
                log::warn!("System check for {} failed: {}", module.as_str(), e);
                SubsystemState::Unknown
            }
        };
        modules.push((module, state));
    }
    SystemStatus { modules }
}
