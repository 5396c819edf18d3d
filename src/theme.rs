use eyre::{eyre, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// HSLA color. Hue in degrees `[0, 360)`, the other channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: f32,
}

impl Color {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba(r, g, b, 255)
    }

    pub fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        let r = r as f32 / 255.0;
        let g = g as f32 / 255.0;
        let b = b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d == 0.0 {
            return Self { h: 0.0, s: 0.0, l, a: a as f32 / 255.0 };
        }

        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == r {
            ((g - b) / d).rem_euclid(6.0)
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        } * 60.0;

        Self { h, s, l, a: a as f32 / 255.0 }
    }

    pub fn to_rgba(&self) -> (u8, u8, u8, u8) {
        let c = (1.0 - (2.0 * self.l - 1.0).abs()) * self.s;
        let hp = self.h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r, g, b) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = self.l - c / 2.0;
        let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        (to_u8(r), to_u8(g), to_u8(b), (self.a.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| eyre!("invalid hex color '{hex}'"));
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::from_rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::from_rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            8 => Ok(Self::from_rgba(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                channel(&digits[6..8])?,
            )),
            _ => Err(eyre!("invalid hex color '{hex}'")),
        }
    }

    pub fn to_hex(&self) -> String {
        let (r, g, b, a) = self.to_rgba();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Moves lightness towards white (positive) or black (negative).
    pub fn lighten(&self, amount: f32) -> Self {
        let amount = amount.clamp(-1.0, 1.0);
        let l = if amount >= 0.0 {
            self.l + (1.0 - self.l) * amount
        } else {
            self.l + self.l * amount
        };
        Self { l, ..*self }
    }

    pub fn rotate_hue(&self, degrees: f32) -> Self {
        Self {
            h: (self.h + degrees).rem_euclid(360.0),
            ..*self
        }
    }
}

// Serialization module for Color <-> Hex String
pub mod hex_color {
    use super::*;

    pub fn serialize<S>(color: &Color, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Color, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Color::parse_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        hex_color::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        hex_color::deserialize(deserializer)
    }
}

/// Palette handing out colors by index.
///
/// With an explicit `list` the colors cycle; otherwise they are generated by
/// rotating the hue of `base_color`. Every completed pass over the palette
/// shifts lightness by `pass_lighten`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSet {
    pub list: Vec<Color>,
    pub base_color: Color,
    /// Multiplier applied to the requested index.
    pub step: usize,
    pub hue_step: f32,
    pub colors_per_pass: usize,
    pub pass_lighten: f32,
}

impl Default for ColorSet {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            base_color: Color::from_rgb(0x67, 0xb7, 0xdc),
            step: 1,
            hue_step: 18.0,
            colors_per_pass: 20,
            pass_lighten: -0.2,
        }
    }
}

impl ColorSet {
    pub fn from_list(list: Vec<Color>) -> Self {
        Self {
            list,
            ..Default::default()
        }
    }

    /// Color for the `index`-th element, after applying `step`.
    pub fn get_index(&self, index: usize) -> Color {
        let index = index.saturating_mul(self.step.max(1));
        let per_pass = if self.list.is_empty() {
            self.colors_per_pass.max(1)
        } else {
            self.list.len()
        };
        let pass = (index / per_pass) as f32;
        let position = index % per_pass;

        let color = match self.list.get(position) {
            Some(color) => *color,
            None => self.base_color.rotate_hue(self.hue_step * position as f32),
        };
        if pass > 0.0 {
            color.lighten(self.pass_lighten * pass)
        } else {
            color
        }
    }
}
