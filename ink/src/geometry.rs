//! Point, color, width, and tool validation.
//!
//! DESIGN
//! ======
//! Everything that crosses the network boundary is normalized here before the
//! ledger sees it: coordinates are clamped to the unit square, colors must be
//! six-digit hex, widths are clamped to the brush range, and tools parse into
//! a closed enum. The ledger and replayer can then assume well-formed values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum stroke width, inclusive.
pub const WIDTH_MIN: f64 = 1.0;

/// Maximum stroke width, inclusive.
pub const WIDTH_MAX: f64 = 60.0;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unknown tool: {0:?}")]
    UnknownTool(String),
    #[error("invalid color: {0:?}")]
    InvalidColor(String),
    #[error("point coordinates must be finite numbers")]
    NonFinitePoint,
}

// =============================================================================
// TOOL
// =============================================================================

/// Drawing tool. Erasers ignore the requested color and composite
/// destructively on replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Brush,
    Eraser,
}

impl FromStr for Tool {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brush" => Ok(Self::Brush),
            "eraser" => Ok(Self::Eraser),
            other => Err(GeometryError::UnknownTool(other.to_owned())),
        }
    }
}

// =============================================================================
// POINT
// =============================================================================

/// A canvas point normalized to the unit square.
///
/// Construction clamps finite coordinates into `[0, 1]` so strokes are
/// resolution-independent; non-finite input is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Build a normalized point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonFinitePoint`] if either coordinate is NaN
    /// or infinite.
    pub fn new(x: f64, y: f64) -> Result<Self, GeometryError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFinitePoint);
        }
        Ok(Self { x: x.clamp(0.0, 1.0), y: y.clamp(0.0, 1.0) })
    }
}

// =============================================================================
// COLOR
// =============================================================================

/// A brush color, parsed from `#rrggbb` and serialized back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color([u8; 3]);

impl Color {
    /// Sentinel color recorded for eraser strokes. The replayer composites
    /// erasers destructively, so the value never reaches the canvas.
    pub const ERASER: Self = Self([0, 0, 0]);
}

impl FromStr for Color {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeometryError::InvalidColor(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = GeometryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

// =============================================================================
// WIDTH
// =============================================================================

/// Clamp a requested stroke width into the brush range. Non-finite input
/// falls back to the minimum width.
#[must_use]
pub fn clamp_width(width: f64) -> f64 {
    if !width.is_finite() {
        return WIDTH_MIN;
    }
    width.clamp(WIDTH_MIN, WIDTH_MAX)
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
