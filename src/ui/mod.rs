//! # UI Module
//!
//! Styling for the kiosk screens. View code lives in `app.rs`; this module
//! keeps colors and widget styles in one place.

pub mod styles;
