//! Shared UI theme constants.

use ratatui::style::Color;

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

pub const LABEL: Color = Color::Cyan;
pub const WARN: Color = Color::Red;
pub const DETAIL: Color = Color::DarkGray;
pub const HEADING: Color = Color::Magenta;
pub const BADGE: Color = Color::Yellow;
pub const POLLING: Color = Color::Green;
