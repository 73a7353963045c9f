//! Color helpers for the terminal user interface.

use ratatui::style::Color;

use crate::color::parse_hex;
use crate::fields::GanttStatus;

/// Header and status bar background.
pub const HEADER_BG: Color = Color::Rgb(30, 41, 59);
/// Unfilled part of a task bar.
pub const TRACK: Color = Color::Rgb(71, 85, 105);
/// Confirmation dialogs.
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);

/// Terminal colour for a `#rrggbb` string. Unparseable input renders white.
pub fn hex_color(hex: &str) -> Color {
    match parse_hex(hex) {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::White,
    }
}

pub fn status_color(status: GanttStatus) -> Color {
    match status {
        GanttStatus::OnTrack => Color::Green,
        GanttStatus::AtRisk => Color::Yellow,
        GanttStatus::Delayed => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#3b82f6"), Color::Rgb(59, 130, 246));
        assert_eq!(hex_color("nonsense"), Color::White);
    }
}
