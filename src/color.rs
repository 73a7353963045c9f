//! Bar colours for the timeline.
//!
//! Root tasks carry a palette colour chosen by the user (or picked by
//! [`next_palette_color`]). Descendants are shown in a lighter, slightly desaturated
//! shade of their root colour, computed in HSL space from the task's depth.

use std::fmt::Write as _;

/// The default root colour palette: blue, green, yellow, red, purple, cyan, orange, lime.
pub const PALETTE: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#f97316", "#84cc16",
];

/// Lightness added per level of depth, in percentage points.
const LIGHTNESS_STEP: f64 = 12.0;
const LIGHTNESS_MAX: f64 = 80.0;
/// Saturation removed per level of depth, in percentage points.
const SATURATION_STEP: f64 = 5.0;
const SATURATION_MIN: f64 = 40.0;

/// A colour in hue (degrees) / saturation (%) / lightness (%) form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// Parse `#rrggbb` (leading `#` optional, any case) into channels.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Canonical lower-case `#rrggbb` form, or `None` if `hex` is not a colour.
pub fn normalize_hex(hex: &str) -> Option<String> {
    parse_hex(hex.trim()).map(|(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Convert a hex colour to HSL. Unparseable input maps to black.
pub fn hex_to_hsl(hex: &str) -> Hsl {
    let Some((r, g, b)) = parse_hex(hex) else {
        return Hsl { h: 0.0, s: 0.0, l: 0.0 };
    };
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let (mut h, mut s) = (0.0, 0.0);

    if max != min {
        let d = max - min;
        s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let sector = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        h = sector / 6.0;
    }

    Hsl { h: h * 360.0, s: s * 100.0, l: l * 100.0 }
}

/// Convert HSL back to a lower-case `#rrggbb` string.
pub fn hsl_to_hex(hsl: Hsl) -> String {
    let s = hsl.s / 100.0;
    let l = hsl.l / 100.0;
    let h = hsl.h;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let mut out = String::with_capacity(7);
    out.push('#');
    for channel in [r, g, b] {
        let byte = ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Shift an HSL colour for a task `depth` levels below the colour's owner.
///
/// Hue is kept; lightness rises by 12 points per level (capped at 80) and saturation
/// drops by 5 points per level (floored at 40).
pub fn shift_for_depth(hsl: Hsl, depth: u32) -> Hsl {
    let depth = depth as f64;
    Hsl {
        h: hsl.h,
        s: SATURATION_MIN.max(hsl.s - SATURATION_STEP * depth),
        l: LIGHTNESS_MAX.min(hsl.l + LIGHTNESS_STEP * depth),
    }
}

/// Colour for a task `depth` levels below an ancestor painted `ancestor_color`.
pub fn derive_descendant_color(ancestor_color: &str, depth: u32) -> String {
    hsl_to_hex(shift_for_depth(hex_to_hsl(ancestor_color), depth))
}

/// Pick the least-used palette colour among the existing root colours.
///
/// Ties go to the earliest palette entry. Returns `None` only for an empty palette.
pub fn next_palette_color<'p, I, S, P>(existing_root_colors: I, palette: &'p [P]) -> Option<&'p str>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    P: AsRef<str>,
{
    let mut counts = vec![0usize; palette.len()];
    for used in existing_root_colors {
        let used = used.as_ref();
        if let Some(i) = palette.iter().position(|p| p.as_ref().eq_ignore_ascii_case(used)) {
            counts[i] += 1;
        }
    }
    let min = counts.iter().copied().min()?;
    let first = counts.iter().position(|&c| c == min)?;
    Some(palette[first].as_ref())
}
