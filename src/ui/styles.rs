//! # UI Styling Module
//!
//! Centralized styling utilities for the kiosk's dark glass look.
//! Keeps button, card and status colors out of the view code.

use crate::signal::SignalLabel;
use crate::status::SubsystemState;
use iced::widget::{button, container};
use iced::{Background, Border, Color};

const ACCENT: Color = Color::from_rgb(0.0, 0.5, 1.0);

fn filled(background: Color, border: Color, width: f32, text_color: Color) -> button::Style {
    button::Style {
        background: Some(Background::Color(background)),
        text_color,
        border: Border {
            color: border,
            width,
            radius: 8.0.into(),
        },
        ..Default::default()
    }
}

fn shade(color: Color, amount: f32) -> Color {
    Color::from_rgb(
        (color.r + amount).clamp(0.0, 1.0),
        (color.g + amount).clamp(0.0, 1.0),
        (color.b + amount).clamp(0.0, 1.0),
    )
}

/// Solid button in `base`, lighter on hover and darker when pressed
fn solid(base: Color) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => filled(base, shade(base, 0.1), 1.0, Color::WHITE),
        button::Status::Hovered => filled(shade(base, 0.1), shade(base, 0.2), 1.0, Color::WHITE),
        button::Status::Pressed => filled(shade(base, -0.1), base, 1.0, Color::WHITE),
        button::Status::Disabled => filled(
            Color::from_rgb(0.25, 0.25, 0.3),
            Color::from_rgb(0.35, 0.35, 0.4),
            1.0,
            Color::from_rgb(0.6, 0.6, 0.6),
        ),
    }
}

/// Manual scan, "View Log", "Ask" and similar primary actions
pub fn action_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    solid(ACCENT)
}

/// Saving an analysis to a device
pub fn save_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    solid(Color::from_rgb(0.2, 0.65, 0.35))
}

/// Closing the interaction panel
pub fn close_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    solid(Color::from_rgb(0.75, 0.2, 0.25))
}

/// Device cards; the expanded card gets an accent border
pub fn device_card_style(is_expanded: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| {
        let background = match status {
            button::Status::Hovered => Color::from_rgba(1.0, 1.0, 1.0, 0.10),
            button::Status::Pressed => Color::from_rgba(1.0, 1.0, 1.0, 0.14),
            _ => Color::from_rgba(1.0, 1.0, 1.0, 0.05),
        };
        let (border, width) = if is_expanded {
            (ACCENT, 2.0)
        } else {
            (Color::from_rgba(1.0, 1.0, 1.0, 0.18), 1.0)
        };
        filled(background, border, width, Color::from_rgba(1.0, 1.0, 1.0, 0.9))
    }
}

/// Carousel position dots
pub fn dot_style(is_current: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, _status: button::Status| {
        let color = if is_current {
            ACCENT
        } else {
            Color::from_rgba(1.0, 1.0, 1.0, 0.3)
        };
        filled(color, color, 0.0, Color::WHITE)
    }
}

pub fn signal_color(label: SignalLabel) -> Color {
    match label {
        SignalLabel::Excellent => Color::from_rgb(0.3, 0.85, 0.45),
        SignalLabel::Good => Color::from_rgb(0.35, 0.6, 1.0),
        SignalLabel::Fair => Color::from_rgb(0.95, 0.8, 0.25),
        SignalLabel::Poor => Color::from_rgb(0.95, 0.35, 0.35),
    }
}

pub fn subsystem_color(state: SubsystemState) -> Color {
    match state {
        SubsystemState::Available => Color::from_rgb(0.3, 0.85, 0.45),
        SubsystemState::Unavailable => Color::from_rgb(0.95, 0.35, 0.35),
        SubsystemState::Unknown => Color::from_rgb(0.6, 0.6, 0.6),
    }
}

/// Transient red banner for scan and save failures
pub fn error_banner_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgba(0.6, 0.1, 0.1, 0.6))),
        text_color: Some(Color::WHITE),
        border: Border {
            color: Color::from_rgb(0.9, 0.3, 0.3),
            width: 1.0,
            radius: 6.0.into(),
        },
        ..Default::default()
    }
}

/// Frosted panel behind the interaction history and assistant
pub fn panel_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgba(1.0, 1.0, 1.0, 0.06))),
        border: Border {
            color: Color::from_rgba(1.0, 1.0, 1.0, 0.18),
            width: 1.0,
            radius: 12.0.into(),
        },
        ..Default::default()
    }
}
