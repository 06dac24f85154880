//! # Tracker Service Module
//!
//! Hosts the device tracker on a dedicated thread with its own Tokio runtime,
//! so polling keeps running regardless of what the UI thread is doing.
//!
//! ## Key Components
//! - `TrackerService`: owns the runtime and the tracker handle
//! - `ServiceCommand`: commands sent from the UI to the service thread
//!
//! The tracker lives exactly as long as `run`; when the UI drops its command
//! sender the handle is dropped and both polling tasks are cancelled.

use crate::backend::ScanSource;
use crate::error::TrackerError;
use crate::tracker::{SystemClock, TrackerHandle, TrackerSettings, TrackerUpdate};
use std::sync::mpsc;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommand {
    ManualScan,
    Stop,
}

pub struct TrackerService {
    command_receiver: mpsc::Receiver<ServiceCommand>,
    update_sender: mpsc::Sender<TrackerUpdate>,
    source: Arc<dyn ScanSource>,
    settings: TrackerSettings,
}

impl TrackerService {
    /// Creates a new TrackerService.
    ///
    /// Returns the service and a sender for issuing commands from the UI thread.
    pub fn new(
        update_sender: mpsc::Sender<TrackerUpdate>,
        source: Arc<dyn ScanSource>,
        settings: TrackerSettings,
    ) -> (Self, mpsc::Sender<ServiceCommand>) {
        let (command_sender, command_receiver) = mpsc::channel();

        let service = TrackerService {
            command_receiver,
            update_sender,
            source,
            settings,
        };

        (service, command_sender)
    }

    /// Runs the tracker until the command channel closes or `Stop` arrives.
    ///
    /// Blocks the calling thread; spawn it on its own thread.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = TrackerError::RuntimeCreation(e.to_string());
                log::error!("{}", error);
                let _ = self
                    .update_sender
                    .send(TrackerUpdate::ScanError(error.to_string()));
                return;
            }
        };

        let tracker = TrackerHandle::start(
            rt.handle(),
            self.source.clone(),
            Arc::new(SystemClock),
            self.settings.clone(),
            self.update_sender.clone(),
        );

        while let Ok(command) = self.command_receiver.recv() {
            match command {
                ServiceCommand::ManualScan => {
                    log::info!("Tracker service: manual scan requested");
                    tracker.manual_scan();
                }
                ServiceCommand::Stop => {
                    log::info!("Tracker service: stop requested");
                    break;
                }
            }
        }

        // cancel the tasks before the runtime goes away
        drop(tracker);
        log::info!("Tracker service: shutting down");
    }
}
