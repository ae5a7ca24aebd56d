//! Frequency styling: maps a feature's service count to line weight and
//! gradient colour.
//!
//! # Example
//!
//! ```rust
//! use freqmap::style::{Gradient, Rgba, line_style};
//!
//! let gradient = Gradient::new(vec![
//!     Rgba::rgb(255, 255, 204),
//!     Rgba::rgb(253, 141, 60),
//!     Rgba::rgb(189, 0, 38),
//! ]);
//!
//! let style = line_style(15.0, &gradient, 15.0);
//! assert_eq!(style.color, Rgba::rgb(189, 0, 38));
//! assert_eq!(style.weight, 5.0);
//! ```
//!
//! # Rules
//!
//! - **Zero services**: never coloured from the gradient (zero weight for
//!   lines, transparent fill for parishes)
//! - **Bucketing**: `min(ceil(services * len / max), len - 1)` against a fixed
//!   catalog maximum, not an observed one
//! - **Deterministic**: identical inputs always produce identical outputs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum weight of a line that runs at all.
pub const MIN_LINE_WEIGHT: f64 = 1.5;
/// Weight of a line running at the catalog maximum.
pub const MAX_LINE_WEIGHT: f64 = 5.0;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour {0:?}, expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(pub String);

impl FromStr for Rgba {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Rgba::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgba {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered colour ramp, low frequency first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gradient(Vec<Rgba>);

impl Gradient {
    pub fn new(colors: Vec<Rgba>) -> Self {
        Self(colors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.0
    }

    /// Colour for `services` against a fixed `max`.
    ///
    /// Returns transparent when the gradient is empty.
    pub fn pick(&self, services: f64, max: f64) -> Rgba {
        if self.0.is_empty() {
            return Rgba::TRANSPARENT;
        }
        self.0[bucket_index(services, max, self.0.len())]
    }
}

/// Gradient bucket for a service count: `min(ceil(services * len / max), len - 1)`.
///
/// Negative or NaN inputs land in bucket 0.
pub fn bucket_index(services: f64, max: f64, gradient_len: usize) -> usize {
    if gradient_len == 0 {
        return 0;
    }
    let last = gradient_len - 1;
    if max.is_nan() || max <= 0.0 {
        return last;
    }
    let raw = (services * gradient_len as f64 / max).ceil();
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(last)
}

/// Style of one line feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub color: Rgba,
    pub weight: f64,
}

/// Style of one polygon feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaStyle {
    pub outline: Rgba,
    pub outline_weight: f64,
    pub fill: Rgba,
    pub fill_opacity: f64,
}

/// Resolved style handed to the map surface for one feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureStyle {
    Line(LineStyle),
    Area(AreaStyle),
}

fn runs(services: f64) -> bool {
    services > 0.0
}

/// Weight and colour of a route line.
pub fn line_style(services: f64, gradient: &Gradient, max_services: f64) -> LineStyle {
    if !runs(services) {
        return LineStyle {
            color: Rgba::TRANSPARENT,
            weight: 0.0,
        };
    }
    let weight = (services / max_services * MAX_LINE_WEIGHT).max(MIN_LINE_WEIGHT);
    LineStyle {
        color: gradient.pick(services, max_services),
        weight,
    }
}

/// White outline with a gradient fill; transparent when nothing runs.
pub fn parish_style(services: f64, gradient: &Gradient, max_services: f64) -> AreaStyle {
    let (fill, fill_opacity) = if runs(services) {
        (gradient.pick(services, max_services), 1.0)
    } else {
        (Rgba::TRANSPARENT, 0.0)
    };
    AreaStyle {
        outline: Rgba::WHITE,
        outline_weight: 1.0,
        fill,
        fill_opacity,
    }
}

/// Municipal boundaries: outline only.
pub fn boundary_style(outline: Rgba) -> AreaStyle {
    AreaStyle {
        outline,
        outline_weight: 1.0,
        fill: Rgba::TRANSPARENT,
        fill_opacity: 0.0,
    }
}
