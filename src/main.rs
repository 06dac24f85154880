// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod analysis;
mod app;
mod assistant;
mod backend;
mod client;
mod config;
mod error;
mod lookup;
mod models;
mod recommendation;
mod registry;
mod service;
mod signal;
mod status;
mod tracker;
mod ui;

use app::VisumKiosk;
use client::VisumClient;
use config::Config;
use error::TrackerError;
use iced::Theme;
use service::TrackerService;
use std::sync::mpsc;
use std::sync::Arc;
use tracker::{TrackerSettings, TrackerUpdate};

fn main() -> iced::Result {
    // On Windows, force wgpu to use Vulkan backend instead of DirectX 12
    #[cfg(target_os = "windows")]
    std::env::set_var("WGPU_BACKEND", "vulkan");

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}; continuing with default settings", e);
            Config::default()
        }
    };

    let client = match VisumClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("{}", TrackerError::ClientSetup(e.to_string()));
            std::process::exit(1);
        }
    };

    // Channel from the tracker thread to the UI thread
    let (sender, receiver) = mpsc::channel::<TrackerUpdate>();

    let (service, command_sender) = TrackerService::new(
        sender,
        Arc::new(client.clone()),
        TrackerSettings::from(&config),
    );

    std::thread::spawn(move || {
        service.run();
    });

    iced::application("VISUM Kiosk", VisumKiosk::update, VisumKiosk::view)
        .subscription(VisumKiosk::subscription)
        .theme(|_| Theme::Dark)
        .window_size((1280.0, 800.0))
        .run_with(move || VisumKiosk::new(receiver, command_sender, client, &config))
}
