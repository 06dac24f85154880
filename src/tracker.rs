//! # Device Presence Tracker
//!
//! Keeps the device registry in sync with the backend's Bluetooth scanner.
//!
//! ## Tasks
//! - **Scan task**: one scan per `scan_interval`, awaited inline so at most one
//!   request is ever in flight. Ticks that fall due during a slow request are
//!   skipped rather than queued.
//! - **Prune task**: drops devices older than `device_timeout` every
//!   `prune_interval`, independent of scan results.
//! - **Manual scan**: runs on the scan task, so automatic scans are suspended
//!   until it has finished and the progress indicator has reset.
//!
//! Both tasks belong to the [`TrackerHandle`]; dropping it cancels them and any
//! request still in flight, so nothing writes to the registry afterwards.

use crate::backend::ScanSource;
use crate::config::Config;
use crate::models::ScanOutcome;
use crate::registry::{DeviceRegistry, SightedDevice};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const SCAN_FAILED_MESSAGE: &str =
    "Failed to scan for Bluetooth devices. Please check your connection to the server.";

/// Updates pushed to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerUpdate {
    /// Registry contents after a change
    Devices(Vec<SightedDevice>),
    /// A scan request started (`true`) or finished (`false`)
    Scanning(bool),
    ScanError(String),
    /// Manual scan progress, 0..=100
    ManualProgress(u8),
    /// Manual scan over, automatic scanning resumed
    ManualFinished,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub scan_interval: Duration,
    pub prune_interval: Duration,
    pub device_timeout: TimeDelta,
    pub manual_scan_duration: Duration,
    pub manual_scan_reset: Duration,
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            scan_interval: config.scan_interval(),
            prune_interval: config.prune_interval(),
            device_timeout: TimeDelta::from_std(config.device_timeout()).unwrap_or_else(|_| {
                log::warn!(
                    "device_timeout_ms = {} is out of range, using one year",
                    config.device_timeout_ms
                );
                max_device_timeout()
            }),
            manual_scan_duration: config.manual_scan_duration(),
            manual_scan_reset: config.manual_scan_reset(),
        }
    }
}

/// Upper bound for the staleness window; longer timeouts are clamped to it
fn max_device_timeout() -> TimeDelta {
    TimeDelta::days(365)
}

enum Command {
    ManualScan,
}

/// State shared by the scan and prune tasks
#[derive(Clone)]
struct Tracker {
    source: Arc<dyn ScanSource>,
    clock: Arc<dyn Clock>,
    registry: Arc<Mutex<DeviceRegistry>>,
    settings: TrackerSettings,
    updates: Sender<TrackerUpdate>,
}

impl Tracker {
    fn registry(&self) -> MutexGuard<'_, DeviceRegistry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, update: TrackerUpdate) {
        if let Err(why) = self.updates.send(update) {
            log::debug!("Tracker update dropped, UI has gone away: {:?}", why);
        }
    }

    /// Merge one scan result. Upsert and prune happen under a single lock.
    fn apply(&self, outcome: ScanOutcome) {
        let now = self.clock.now();
        let snapshot = {
            let mut registry = self.registry();
            if let ScanOutcome::Found(sighting) = outcome {
                registry.upsert(sighting, now);
            }
            registry.prune(now, self.settings.device_timeout);
            log::debug!("Tracking {} devices", registry.len());
            registry.snapshot()
        };
        self.send(TrackerUpdate::Devices(snapshot));
    }

    async fn scan_once(&self) {
        self.send(TrackerUpdate::Scanning(true));
        match self.source.scan().await {
            Ok(outcome) => self.apply(outcome),
            Err(e) => {
                log::warn!("Bluetooth scan failed: {}", e);
                self.send(TrackerUpdate::ScanError(SCAN_FAILED_MESSAGE.to_string()));
            }
        }
        self.send(TrackerUpdate::Scanning(false));
    }

    async fn manual_scan(&self) {
        log::info!("Manual scan started");
        self.send(TrackerUpdate::ManualProgress(0));
        self.send(TrackerUpdate::Scanning(true));

        // progress runs on its own clock, 5% per step
        let step = (self.settings.manual_scan_duration / 20).max(Duration::from_millis(1));
        let mut progress_ticker = interval_at(Instant::now() + step, step);
        let mut progress = 0u8;

        let scan = self.source.scan();
        tokio::pin!(scan);
        let result = loop {
            tokio::select! {
                result = &mut scan => break result,
                _ = progress_ticker.tick(), if progress < 100 => {
                    progress = (progress + 5).min(100);
                    self.send(TrackerUpdate::ManualProgress(progress));
                }
            }
        };

        match result {
            Ok(outcome) => {
                self.apply(outcome);
                self.send(TrackerUpdate::Scanning(false));
                self.send(TrackerUpdate::ManualProgress(100));
                tokio::time::sleep(self.settings.manual_scan_reset).await;
            }
            Err(e) => {
                log::warn!("Manual scan failed: {}", e);
                self.send(TrackerUpdate::ScanError(SCAN_FAILED_MESSAGE.to_string()));
                self.send(TrackerUpdate::Scanning(false));
            }
        }

        self.send(TrackerUpdate::ManualFinished);
        log::info!("Manual scan finished, resuming automatic scanning");
    }

    async fn scan_loop(self, mut commands: UnboundedReceiver<Command>, cancel: CancellationToken) {
        let mut ticker = interval(self.settings.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.scan_once().await,
                Some(command) = commands.recv() => match command {
                    Command::ManualScan => {
                        self.manual_scan().await;
                        // requests made while the manual scan was running are ignored
                        while commands.try_recv().is_ok() {}
                        ticker.reset();
                    }
                },
            }
        }
        log::debug!("Scan task stopped");
    }

    async fn prune_loop(self, cancel: CancellationToken) {
        let mut ticker = interval(self.settings.prune_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    let changed = {
                        let mut registry = self.registry();
                        let removed = registry.prune(now, self.settings.device_timeout);
                        if removed > 0 && registry.is_empty() {
                            log::info!("No devices in range");
                        }
                        (removed > 0).then(|| registry.snapshot())
                    };
                    if let Some(snapshot) = changed {
                        log::debug!("Pruned stale devices, {} remaining", snapshot.len());
                        self.send(TrackerUpdate::Devices(snapshot));
                    }
                }
            }
        }
        log::debug!("Prune task stopped");
    }
}

/// Owns the tracker's background tasks. Dropping it stops them.
pub struct TrackerHandle {
    registry: Arc<Mutex<DeviceRegistry>>,
    commands: UnboundedSender<Command>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TrackerHandle {
    /// Spawn the scan and prune tasks on `runtime`
    pub fn start(
        runtime: &Handle,
        source: Arc<dyn ScanSource>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
        updates: Sender<TrackerUpdate>,
    ) -> Self {
        let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
        let (commands, command_receiver) = unbounded_channel();
        let cancel = CancellationToken::new();

        let tracker = Tracker {
            source,
            clock,
            registry: registry.clone(),
            settings,
            updates,
        };

        log::info!(
            "Starting device tracker (scan every {:?}, prune every {:?})",
            tracker.settings.scan_interval,
            tracker.settings.prune_interval
        );

        let tasks = vec![
            runtime.spawn(tracker.clone().scan_loop(command_receiver, cancel.clone())),
            runtime.spawn(tracker.prune_loop(cancel.clone())),
        ];

        Self {
            registry,
            commands,
            cancel,
            tasks,
        }
    }

    pub fn manual_scan(&self) {
        if self.commands.send(Command::ManualScan).is_err() {
            log::warn!("Manual scan requested after tracker stopped");
        }
    }

    /// Current registry contents
    #[cfg(test)]
    pub fn devices(&self) -> Vec<SightedDevice> {
        self.registry
            .lock()
            .map(|r| r.snapshot())
            .unwrap_or_else(|poisoned| poisoned.into_inner().snapshot())
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
        log::info!("Device tracker stopped");
    }
}
