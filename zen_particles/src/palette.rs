//! Particle colors.
//!
//! One color is applied uniformly to every particle.  The user cycles
//! through a fixed preset palette; an AI generation picks a color from
//! keywords in its prompt.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Rgb
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Rgb { r, g, b } }

    /// Pack as opaque `0xAARRGGBB`, the framebuffer format.
    pub fn to_argb(self) -> u32 {
        0xFF000000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Per-channel contribution of one particle at `opacity`, for additive
    /// blending.
    pub fn weighted(self, opacity: f32) -> [u32; 3] {
        let o = opacity.clamp(0.0, 1.0);
        [
            (self.r as f32 * o) as u32,
            (self.g as f32 * o) as u32,
            (self.b as f32 * o) as u32,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = AppError;

    /// Parse `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(AppError::Color(s.to_string()));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| AppError::Color(s.to_string()));
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Presets
// ════════════════════════════════════════════════════════════════════════════

pub const WHITE:   Rgb = Rgb::new(0xff, 0xff, 0xff);
pub const RED:     Rgb = Rgb::new(0xff, 0x4d, 0x4d);
pub const GREEN:   Rgb = Rgb::new(0x4d, 0xff, 0x4d);
pub const BLUE:    Rgb = Rgb::new(0x4d, 0x4d, 0xff);
pub const YELLOW:  Rgb = Rgb::new(0xff, 0xff, 0x4d);
pub const MAGENTA: Rgb = Rgb::new(0xff, 0x4d, 0xff);
pub const CYAN:    Rgb = Rgb::new(0x4d, 0xff, 0xff);
pub const ORANGE:  Rgb = Rgb::new(0xff, 0xa5, 0x00);

/// The swatches offered in the UI, in cycling order.
pub const PRESETS: [Rgb; 8] = [WHITE, RED, GREEN, BLUE, YELLOW, MAGENTA, CYAN, ORANGE];

pub const DEFAULT_COLOR: Rgb = RED;

/// The preset after `current`; colors off the palette restart at the first.
pub fn next_preset(current: Rgb) -> Rgb {
    match PRESETS.iter().position(|&c| c == current) {
        Some(i) => PRESETS[(i + 1) % PRESETS.len()],
        None    => PRESETS[0],
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Prompt heuristic
// ════════════════════════════════════════════════════════════════════════════

pub const FIRE_COLOR:  Rgb = Rgb::new(0xff, 0xaa, 0x00);
pub const WATER_COLOR: Rgb = Rgb::new(0x00, 0xaa, 0xff);
pub const PLANT_COLOR: Rgb = Rgb::new(0x44, 0xff, 0x44);

/// Pick a particle color from keywords in an AI prompt.
///
/// Matching is case-insensitive; the first rule that hits wins.
pub fn color_for_prompt(prompt: &str) -> Rgb {
    let p = prompt.to_lowercase();
    if p.contains("fire") {
        FIRE_COLOR
    } else if p.contains("water") || p.contains("ocean") {
        WATER_COLOR
    } else if p.contains("grass") || p.contains("tree") {
        PLANT_COLOR
    } else {
        WHITE
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex() {
        assert_eq!("#ff4d4d".parse::<Rgb>().unwrap(), RED);
        assert_eq!("ffa500".parse::<Rgb>().unwrap(), ORANGE);
        assert!("#ff4d".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn display_roundtrips_presets() {
        for c in PRESETS {
            assert_eq!(c.to_string().parse::<Rgb>().unwrap(), c);
        }
    }

    #[test]
    fn argb_is_opaque() {
        assert_eq!(RED.to_argb(), 0xFFFF4D4D);
        for c in PRESETS {
            assert_eq!(c.to_argb() >> 24, 0xFF);
        }
    }

    #[test]
    fn presets_cycle() {
        assert_eq!(next_preset(WHITE), RED);
        assert_eq!(next_preset(ORANGE), WHITE);
        assert_eq!(next_preset(FIRE_COLOR), WHITE);
    }

    #[test]
    fn prompt_keywords() {
        assert_eq!(color_for_prompt("a campfire at night"), FIRE_COLOR);
        assert_eq!(color_for_prompt("ocean wave"), WATER_COLOR);
        assert_eq!(color_for_prompt("glass of water"), WATER_COLOR);
        assert_eq!(color_for_prompt("Palm Tree"), PLANT_COLOR);
        assert_eq!(color_for_prompt("tall grass"), PLANT_COLOR);
        assert_eq!(color_for_prompt("a teapot"), WHITE);
        // fire wins over water
        assert_eq!(color_for_prompt("fire and water"), FIRE_COLOR);
    }

    #[test]
    fn weighted_scales_channels() {
        assert_eq!(WHITE.weighted(0.8), [204, 204, 204]);
        assert_eq!(RED.weighted(0.0), [0, 0, 0]);
    }
}
