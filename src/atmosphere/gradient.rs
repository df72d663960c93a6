//! Color stops and the CSS gradient descriptor.

use std::fmt::Write as _;

use crate::core::{Error, Result};

/// 8-bit sRGB triple.
pub type Rgb = [u8; 3];

/// CSS `skyblue`, used when rendering fails.
pub const FALLBACK_RGB: Rgb = [135, 206, 235];

/// One stop of the vertical gradient. `percent` is measured from the top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub percent: f64,
    pub rgb: Rgb,
}

/// Finished gradient, plus flat accent colors for the top and bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientDescriptor {
    /// `linear-gradient(to bottom, rgb(r,g,b) p%, ...)`.
    pub gradient: String,
    pub top: Rgb,
    pub bottom: Rgb,
    /// Stops in ascending percent order.
    pub stops: Vec<ColorStop>,
}

impl GradientDescriptor {
    /// Flat sky-blue gradient returned when anything goes wrong.
    pub fn fallback() -> Self {
        let stops = vec![
            ColorStop { percent: 0.0, rgb: FALLBACK_RGB },
            ColorStop { percent: 100.0, rgb: FALLBACK_RGB },
        ];
        Self {
            gradient: css_gradient(&stops),
            top: FALLBACK_RGB,
            bottom: FALLBACK_RGB,
            stops,
        }
    }
}

/// Round to two decimals and format without trailing zeros (`33.33`, `100`).
fn format_percent(percent: f64) -> String {
    // + 0.0 turns -0.0 into 0.0
    let rounded = (percent * 100.0).round() / 100.0 + 0.0;
    format!("{rounded}")
}

fn css_gradient(stops: &[ColorStop]) -> String {
    let mut out = String::from("linear-gradient(to bottom");
    for stop in stops {
        let [r, g, b] = stop.rgb;
        // Writing to a String cannot fail
        let _ = write!(out, ", rgb({r},{g},{b}) {}%", format_percent(stop.percent));
    }
    out.push(')');
    out
}

/// Collects stops in sample order and assembles the descriptor.
#[derive(Clone, Debug, Default)]
pub struct GradientBuilder {
    stops: Vec<ColorStop>,
}

impl GradientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stops: Vec::with_capacity(capacity),
        }
    }

    /// Add the color for fan position `s` (0 = horizon, 1 = top of view),
    /// placed at `(1 - s) * 100` percent from the top.
    pub fn push(&mut self, s: f64, rgb: Rgb) -> &mut Self {
        self.stops.push(ColorStop {
            percent: (1.0 - s) * 100.0,
            rgb,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Sort stops by ascending percent and emit the descriptor.
    pub fn build(mut self) -> Result<GradientDescriptor> {
        if let Some(bad) = self.stops.iter().find(|s| !s.percent.is_finite()) {
            return Err(Error::ComputationFailure(format!(
                "non-finite stop position {}",
                bad.percent
            )));
        }
        self.stops.sort_by(|a, b| a.percent.total_cmp(&b.percent));

        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Err(Error::ComputationFailure(
                "gradient has no color stops".to_string(),
            ));
        };
        let (top, bottom) = (first.rgb, last.rgb);

        Ok(GradientDescriptor {
            gradient: css_gradient(&self.stops),
            top,
            bottom,
            stops: self.stops,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
