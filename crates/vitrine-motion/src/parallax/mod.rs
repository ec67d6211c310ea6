//! Scroll-linked parallax offsets.
//!
//! The offset of an element is the distance between the viewport centre and
//! the element centre, scaled by a speed factor, shaped by an easing curve on
//! a 100 px reference scale, shifted by a constant bias and clamped to
//! optional bounds. Progress is how far the viewport has travelled across the
//! element, normalized to `[0, 1]`.
//!
//! The math lives here as free functions over a [`ScrollFrame`] snapshot;
//! [`ParallaxOffset`] wires it to scroll, resize and visibility events.

mod component;

use std::fmt;

use serde::{Deserialize, Serialize};
use vitrine_config::VitrineConfig;

use crate::easing::EasingFunction;
use crate::geometry::{Breakpoint, ElementRect, RootMargin, ScrollFrame};

pub use component::{LayerOutput, ParallaxOffset, ParallaxOutput};

/// Speed used when nothing else is configured.
pub const DEFAULT_SPEED: f64 = 0.5;

/// Offsets are eased on this scale, then scaled back.
pub const EASING_REFERENCE: f64 = 100.0;

/// Axis (or axes) the element moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Vertical,
    Horizontal,
    Both,
}

/// Per-tier speed factors. Missing tiers fall back to desktop, tablet,
/// mobile, then [`DEFAULT_SPEED`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponsiveSpeed {
    pub mobile: Option<f64>,
    pub tablet: Option<f64>,
    pub desktop: Option<f64>,
}

/// Speed factor, fixed or dependent on the viewport width tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Speed {
    Uniform(f64),
    Responsive(ResponsiveSpeed),
}

impl Default for Speed {
    fn default() -> Self {
        Self::Uniform(DEFAULT_SPEED)
    }
}

impl From<f64> for Speed {
    fn from(speed: f64) -> Self {
        Self::Uniform(speed)
    }
}

impl Speed {
    pub fn resolve(&self, breakpoint: Breakpoint) -> f64 {
        let map = match self {
            Self::Uniform(speed) => return *speed,
            Self::Responsive(map) => map,
        };

        let exact = match breakpoint {
            Breakpoint::Mobile => map.mobile,
            Breakpoint::Tablet => map.tablet,
            Breakpoint::Desktop => map.desktop,
        };
        exact
            .or(map.desktop)
            .or(map.tablet)
            .or(map.mobile)
            .unwrap_or(DEFAULT_SPEED)
    }
}

/// Optional clamp range for an offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        // Not `f64::clamp`: a min above max must not panic.
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

/// One independently moving layer sharing the element's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallaxLayer {
    pub id: String,
    pub speed: Speed,
    #[serde(default)]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

impl ParallaxLayer {
    pub fn new(id: impl Into<String>, speed: impl Into<Speed>) -> Self {
        Self {
            id: id.into(),
            speed: speed.into(),
            z_index: None,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }
}

/// Configuration for a [`ParallaxOffset`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxConfig {
    pub speed: Speed,
    pub direction: Direction,
    /// Constant added after easing.
    pub bias: f64,
    pub root_margin: RootMargin,
    pub disabled: bool,
    pub easing: EasingFunction,
    pub bounds: Option<Bounds>,
    pub layers: Vec<ParallaxLayer>,
    /// Minimum interval between scroll-driven recomputations.
    pub throttle_ms: f64,
    /// Minimum interval between resize-driven bounds refreshes.
    pub resize_throttle_ms: f64,
    /// Publish `--parallax-*` custom properties.
    pub css_custom_properties: bool,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            direction: Direction::Vertical,
            bias: 0.0,
            root_margin: RootMargin::default(),
            disabled: false,
            easing: EasingFunction::Linear,
            bounds: None,
            layers: Vec::new(),
            throttle_ms: 16.0,
            resize_throttle_ms: 100.0,
            css_custom_properties: false,
        }
    }
}

impl ParallaxConfig {
    /// Defaults taken from the `[parallax]` and `[motion]` sections.
    pub fn from_config(config: &VitrineConfig) -> Self {
        let parallax = &config.parallax;
        Self {
            speed: Speed::Uniform(parallax.speed),
            root_margin: RootMargin::parse_or_zero(&parallax.root_margin),
            throttle_ms: parallax.throttle_ms.max(0.0),
            resize_throttle_ms: parallax.resize_throttle_ms.max(0.0),
            disabled: config.motion.reduced_motion,
            ..Self::default()
        }
    }

    pub fn with_speed(mut self, speed: impl Into<Speed>) -> Self {
        self.speed = speed.into();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_layer(mut self, layer: ParallaxLayer) -> Self {
        self.layers.push(layer);
        self
    }
}

/// How far the viewport has travelled across `rect`, in `[0, 1]`.
///
/// 0 while the element is still below/right of the viewport, 1 once it has
/// left through the top/left edge. `Both` measures the vertical axis.
pub fn scroll_progress(direction: Direction, rect: &ElementRect, frame: &ScrollFrame) -> f64 {
    let (travelled, span) = match direction {
        Direction::Horizontal => (
            frame.scroll_x - rect.left + frame.viewport_width,
            rect.width + frame.viewport_width,
        ),
        Direction::Vertical | Direction::Both => (
            frame.scroll_y - rect.top + frame.viewport_height,
            rect.height + frame.viewport_height,
        ),
    };

    if span <= 0.0 || !travelled.is_finite() {
        return 0.0;
    }
    (travelled / span).clamp(0.0, 1.0)
}

/// Signed viewport-centre minus element-centre distance, times `speed`.
///
/// `Both` sums the vertical and horizontal contributions.
pub fn raw_offset(
    direction: Direction,
    rect: &ElementRect,
    frame: &ScrollFrame,
    speed: f64,
) -> f64 {
    let vertical = || (frame.scroll_y + frame.viewport_height / 2.0 - rect.center_y()) * speed;
    let horizontal = || (frame.scroll_x + frame.viewport_width / 2.0 - rect.center_x()) * speed;

    match direction {
        Direction::Vertical => vertical(),
        Direction::Horizontal => horizontal(),
        Direction::Both => vertical() + horizontal(),
    }
}

/// Ease the magnitude of `raw`, keep its sign, add `bias`, then clamp.
pub fn shape_offset(raw: f64, easing: &EasingFunction, bias: f64, bounds: Option<&Bounds>) -> f64 {
    let eased = if raw == 0.0 {
        0.0
    } else {
        easing.extrapolate((raw / EASING_REFERENCE).abs()) * raw.signum() * EASING_REFERENCE
    };

    let offset = eased + bias;
    bounds.map_or(offset, |bounds| bounds.apply(offset))
}

/// 2D translation applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
}

impl Translation {
    pub const IDENTITY: Translation = Translation { x: 0.0, y: 0.0 };

    /// `offset` along the axes of `direction`.
    pub fn along(direction: Direction, offset: f64) -> Self {
        match direction {
            Direction::Vertical => Self { x: 0.0, y: offset },
            Direction::Horizontal => Self { x: offset, y: 0.0 },
            Direction::Both => Self {
                x: offset,
                y: offset,
            },
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return f.write_str("translate3d(0, 0, 0)");
        }
        // Adding zero turns -0 into 0.
        write!(f, "translate3d({}px, {}px, 0)", self.x + 0.0, self.y + 0.0)
    }
}

/// Compositor promotion hint for the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WillChange {
    Transform,
    #[default]
    Auto,
}

impl fmt::Display for WillChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transform => "transform",
            Self::Auto => "auto",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_responsive_speed_fallback() {
        let only_tablet = Speed::Responsive(ResponsiveSpeed {
            tablet: Some(0.3),
            ..Default::default()
        });
        assert_eq!(only_tablet.resolve(Breakpoint::Tablet), 0.3);
        assert_eq!(only_tablet.resolve(Breakpoint::Mobile), 0.3);
        assert_eq!(only_tablet.resolve(Breakpoint::Desktop), 0.3);

        let full = Speed::Responsive(ResponsiveSpeed {
            mobile: Some(0.1),
            tablet: None,
            desktop: Some(0.8),
        });
        assert_eq!(full.resolve(Breakpoint::Mobile), 0.1);
        assert_eq!(full.resolve(Breakpoint::Tablet), 0.8);

        let empty = Speed::Responsive(ResponsiveSpeed::default());
        assert_eq!(empty.resolve(Breakpoint::Desktop), DEFAULT_SPEED);
    }

    #[test]
    fn test_progress_clamped_and_centered() {
        let rect = ElementRect::new(0.0, 1000.0, 800.0, 200.0);
        let frame = ScrollFrame::new(800.0, 600.0);

        assert_eq!(scroll_progress(Direction::Vertical, &rect, &frame), 0.0);
        let centered = frame.scrolled_to(0.0, 800.0);
        assert!(approx_eq(scroll_progress(Direction::Vertical, &rect, &centered), 0.5));
        let past = frame.scrolled_to(0.0, 5000.0);
        assert_eq!(scroll_progress(Direction::Vertical, &rect, &past), 1.0);

        // Horizontal travel spans element width plus viewport width: 1200.
        let wide = ElementRect::new(2000.0, 0.0, 400.0, 600.0);
        assert_eq!(scroll_progress(Direction::Horizontal, &wide, &frame), 0.0);
        let quarter = frame.scrolled_to(1500.0, 0.0);
        assert!(approx_eq(scroll_progress(Direction::Horizontal, &wide, &quarter), 0.25));
        let half = frame.scrolled_to(1800.0, 0.0);
        assert!(approx_eq(scroll_progress(Direction::Horizontal, &wide, &half), 0.5));
        let beyond = frame.scrolled_to(5000.0, 0.0);
        assert_eq!(scroll_progress(Direction::Horizontal, &wide, &beyond), 1.0);
        // Vertical scroll leaves horizontal progress alone.
        let down = frame.scrolled_to(1800.0, 3000.0);
        assert!(approx_eq(scroll_progress(Direction::Horizontal, &wide, &down), 0.5));
    }

    #[test]
    fn test_raw_offset_sign() {
        let rect = ElementRect::new(0.0, 1000.0, 800.0, 200.0);
        let frame = ScrollFrame::new(800.0, 600.0);

        // Viewport centre 300, element centre 1100.
        assert!(approx_eq(raw_offset(Direction::Vertical, &rect, &frame, 0.5), -400.0));
        let below = frame.scrolled_to(0.0, 1000.0);
        assert!(approx_eq(raw_offset(Direction::Vertical, &rect, &below, 0.5), 100.0));
        assert!(approx_eq(raw_offset(Direction::Both, &rect, &below, 0.5), 100.0));

        // Viewport centre x 400, element centre x 2200.
        let wide = ElementRect::new(2000.0, 0.0, 400.0, 600.0);
        assert!(approx_eq(raw_offset(Direction::Horizontal, &wide, &frame, 0.5), -900.0));
        let right = frame.scrolled_to(2000.0, 100.0);
        assert!(approx_eq(raw_offset(Direction::Horizontal, &wide, &right, 0.5), 100.0));
        assert!(approx_eq(raw_offset(Direction::Horizontal, &wide, &right, -0.5), -100.0));
        assert!(approx_eq(raw_offset(Direction::Both, &wide, &right, 0.5), 150.0));
    }

    #[test]
    fn test_shape_offset_pipeline() {
        let linear = EasingFunction::Linear;
        assert!(approx_eq(shape_offset(-250.0, &linear, 0.0, None), -250.0));
        assert!(approx_eq(shape_offset(40.0, &linear, 10.0, None), 50.0));

        let quad = EasingFunction::QuadIn;
        // 50 -> 0.5 -> 0.25 -> 25
        assert!(approx_eq(shape_offset(50.0, &quad, 0.0, None), 25.0));
        assert!(approx_eq(shape_offset(-50.0, &quad, 0.0, None), -25.0));

        let bounds = Bounds::new(-30.0, 30.0);
        assert_eq!(shape_offset(-250.0, &linear, 0.0, Some(&bounds)), -30.0);
        assert_eq!(shape_offset(0.0, &linear, 0.0, Some(&bounds)), 0.0);
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let bounds = Bounds::new(10.0, -10.0);
        assert_eq!(bounds.apply(0.0), -10.0);
    }

    #[test]
    fn test_translation_strings() {
        assert_eq!(Translation::IDENTITY.to_string(), "translate3d(0, 0, 0)");
        assert_eq!(
            Translation::along(Direction::Vertical, 12.5).to_string(),
            "translate3d(0px, 12.5px, 0)"
        );
        assert_eq!(
            Translation::along(Direction::Both, -4.0).to_string(),
            "translate3d(-4px, -4px, 0)"
        );
        assert_eq!(WillChange::Transform.to_string(), "transform");
    }
}
