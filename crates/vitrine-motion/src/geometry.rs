//! Viewport and element geometry.
//!
//! All rectangles are in document coordinates (CSS pixels from the top-left
//! of the page). The viewport is derived from a [`ScrollFrame`] snapshot.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MotionError, Result};

/// Upper bound (exclusive) of the mobile tier, in CSS pixels.
pub const MOBILE_MAX_WIDTH: f64 = 768.0;
/// Upper bound (exclusive) of the tablet tier, in CSS pixels.
pub const TABLET_MAX_WIDTH: f64 = 1024.0;

/// Scroll position and viewport size at one instant.
///
/// Written by scroll/resize notifications, read by every parallax instance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollFrame {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl ScrollFrame {
    /// A frame scrolled to the top-left corner.
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            viewport_width,
            viewport_height,
        }
    }

    /// The same viewport scrolled to `(x, y)`.
    pub fn scrolled_to(self, scroll_x: f64, scroll_y: f64) -> Self {
        Self {
            scroll_x,
            scroll_y,
            ..self
        }
    }

    /// The visible region of the document.
    pub fn viewport(&self) -> ElementRect {
        ElementRect::new(
            self.scroll_x,
            self.scroll_y,
            self.viewport_width,
            self.viewport_height,
        )
    }

    /// Width tier of the current viewport.
    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::from_width(self.viewport_width)
    }
}

/// Axis-aligned rectangle in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &ElementRect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rectangles.
    ///
    /// Edge-adjacent rectangles touch and yield a zero-area overlap; `None`
    /// means they are apart.
    pub fn intersection(&self, other: &ElementRect) -> Option<ElementRect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left <= right && top <= bottom {
            Some(ElementRect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

/// Viewport width tier used to pick responsive parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn from_width(width: f64) -> Self {
        if width < MOBILE_MAX_WIDTH {
            Self::Mobile
        } else if width < TABLET_MAX_WIDTH {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }
}

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum MarginValue {
    Px(f64),
    /// Percentage of the root's width (left/right) or height (top/bottom).
    Percent(f64),
}

impl Default for MarginValue {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl MarginValue {
    pub fn resolve(&self, reference: f64) -> f64 {
        match self {
            Self::Px(px) => *px,
            Self::Percent(pct) => reference * pct / 100.0,
        }
    }
}

impl FromStr for MarginValue {
    type Err = MotionError;

    fn from_str(token: &str) -> Result<Self> {
        let parse = |num: &str| {
            num.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| MotionError::invalid("root margin", format!("bad length `{token}`")))
        };

        if let Some(num) = token.strip_suffix("px") {
            Ok(Self::Px(parse(num)?))
        } else if let Some(num) = token.strip_suffix('%') {
            Ok(Self::Percent(parse(num)?))
        } else if parse(token)? == 0.0 {
            // A unitless zero is the only unitless length CSS accepts.
            Ok(Self::Px(0.0))
        } else {
            Err(MotionError::invalid(
                "root margin",
                format!("`{token}` needs a px or % unit"),
            ))
        }
    }
}

/// Margin that grows (positive) or shrinks (negative) the viewport before
/// intersection is computed, written like CSS `margin` shorthand.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    /// Parse a 1-4 value shorthand such as `"0px 0px -10% 0px"`.
    pub fn parse(input: &str) -> Result<Self> {
        let values = input
            .split_whitespace()
            .map(str::parse::<MarginValue>)
            .collect::<Result<Vec<_>>>()?;

        match values.as_slice() {
            [all] => Ok(Self {
                top: *all,
                right: *all,
                bottom: *all,
                left: *all,
            }),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(MotionError::invalid(
                "root margin",
                format!("expected 1 to 4 values, got `{input}`"),
            )),
        }
    }

    /// Parse a margin, falling back to zero on malformed input.
    pub fn parse_or_zero(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|error| {
            warn!(%error, "falling back to a zero root margin");
            Self::default()
        })
    }

    /// Apply the margin to a root rectangle.
    pub fn apply(&self, root: ElementRect) -> ElementRect {
        let top = self.top.resolve(root.height);
        let right = self.right.resolve(root.width);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);

        ElementRect::new(
            root.left - left,
            root.top - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

impl FromStr for RootMargin {
    type Err = MotionError;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

/// Visible-area fractions at which visibility notifications fire.
///
/// Always non-empty, sorted ascending, each value within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>")]
pub struct Thresholds(Vec<f64>);

impl From<Vec<f64>> for Thresholds {
    fn from(values: Vec<f64>) -> Self {
        Self::list(values)
    }
}

impl Thresholds {
    pub fn single(threshold: f64) -> Self {
        Self::list([threshold])
    }

    pub fn list(thresholds: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = thresholds
            .into_iter()
            .filter(|t| !t.is_nan())
            .map(|t| t.clamp(0.0, 1.0))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        if values.is_empty() {
            values.push(0.0);
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The lowest threshold, which decides whether an element counts as intersecting.
    pub fn smallest(&self) -> f64 {
        self.0.first().copied().unwrap_or(0.0)
    }

    /// Number of thresholds at or below `ratio`.
    pub fn crossed(&self, ratio: f64) -> usize {
        self.0.iter().filter(|t| ratio >= **t).count()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::single(0.0)
    }
}
