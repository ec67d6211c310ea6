//! Timing curves shared by reveals, parallax and counters.
//!
//! Curves take linear progress in `[0, 1]` and return eased progress. The
//! CSS keyword curves and `cubic-bezier()` match the browser; the
//! polynomial, bounce and elastic families are the ones counters name in
//! configuration (`easeOut`, `easeInOutCubic`, `bounce`, ...).
//!
//! ```
//! use vitrine_motion::easing::EasingFunction;
//!
//! let ease = EasingFunction::QuadOut;
//! assert_eq!(ease.evaluate(0.5), 0.75);
//!
//! // Unknown names fall back to a caller-chosen default.
//! let fallback = EasingFunction::named_or("wobbly", EasingFunction::Linear);
//! assert_eq!(fallback, EasingFunction::Linear);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MotionError, Result};

/// Where a `steps()` curve places its jumps.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// `jump-start`
    Start,
    /// `jump-end`
    #[default]
    End,
    /// `jump-both`
    Both,
    /// `jump-none`
    None,
}

/// A timing curve.
///
/// Serialized as an internally tagged object, e.g. `{"type": "quad_out"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    Linear,

    /// CSS `ease`, equivalent to `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,

    /// CSS `ease-in`, equivalent to `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// CSS `ease-out`, equivalent to `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// CSS `ease-in-out`, equivalent to `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// `cubic-bezier(x1, y1, x2, y2)`; see [`EasingFunction::cubic_bezier`].
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// `steps(count, position)`
    Steps { count: u32, position: StepPosition },

    /// `t²`
    QuadIn,
    /// `1 - (1 - t)²`
    QuadOut,
    QuadInOut,
    /// `t³`
    CubicIn,
    /// `1 - (1 - t)³`
    CubicOut,
    CubicInOut,
    /// Bounces against the end value before settling.
    Bounce,
    /// Winds up with growing oscillation before shooting to the end value.
    Elastic,
    /// Overshoots the end value and oscillates back.
    ElasticOut,
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::Ease
    }
}

impl EasingFunction {
    /// Eased value of `t`, which is clamped to `[0, 1]` first.
    ///
    /// Bezier curves with out-of-range `y` control points and the elastic
    /// family can return values outside `[0, 1]`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Steps { count, position } => stepped(*count, *position, t),
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::Bounce => bounce_out(t),
            Self::Elastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_PERIOD).sin()
                }
            }
            Self::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_PERIOD).sin() + 1.0
                }
            }
        }
    }

    /// Evaluate past the end of the curve.
    ///
    /// Parallax feeds magnitudes that routinely exceed 1. Inside `[0, 1]` this
    /// is [`evaluate`](Self::evaluate); beyond it the power-in curves keep
    /// their formula and every other curve continues with unit slope from
    /// `(1, 1)`.
    pub fn extrapolate(&self, t: f64) -> f64 {
        if t <= 1.0 {
            return self.evaluate(t);
        }

        match self {
            Self::QuadIn => t * t,
            Self::CubicIn => t * t * t,
            _ => t,
        }
    }

    /// Checked `cubic-bezier()` constructor. Both `x` control points must lie
    /// in `[0, 1]`; the `y` points are unrestricted.
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if !((0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2)) {
            return Err(MotionError::invalid(
                "easing",
                "bezier x values must be in [0, 1]",
            ));
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Create a stepped easing function. Fails if `steps` is 0.
    pub fn steps(steps: u32, position: StepPosition) -> Result<Self> {
        if steps == 0 {
            return Err(MotionError::invalid("easing", "steps must be at least 1"));
        }
        Ok(Self::Steps {
            count: steps,
            position,
        })
    }

    /// Look up an easing by name.
    ///
    /// Accepts the counter names (`linear`, `easeIn`, `easeOut`, `easeInOut`,
    /// `easeInCubic`, `easeOutCubic`, `easeInOutCubic`, `bounce`, `elastic`,
    /// `elasticOut`), where the unsuffixed `ease*` names are quadratic, and
    /// the CSS keywords (`ease`, `ease-in`, `ease-out`, `ease-in-out`).
    pub fn from_name(name: &str) -> Result<Self> {
        let easing = match name.trim() {
            "linear" => Self::Linear,
            "easeIn" => Self::QuadIn,
            "easeOut" => Self::QuadOut,
            "easeInOut" => Self::QuadInOut,
            "easeInCubic" => Self::CubicIn,
            "easeOutCubic" => Self::CubicOut,
            "easeInOutCubic" => Self::CubicInOut,
            "bounce" => Self::Bounce,
            "elastic" => Self::Elastic,
            "elasticOut" => Self::ElasticOut,
            "ease" => Self::Ease,
            "ease-in" => Self::EaseIn,
            "ease-out" => Self::EaseOut,
            "ease-in-out" => Self::EaseInOut,
            other => {
                return Err(MotionError::invalid(
                    "easing",
                    format!("unknown easing `{other}`"),
                ));
            }
        };
        Ok(easing)
    }

    /// Look up an easing by name, falling back to `fallback` for unknown names.
    pub fn named_or(name: &str, fallback: Self) -> Self {
        Self::from_name(name).unwrap_or_else(|error| {
            warn!(%error, ?fallback, "using fallback easing");
            fallback
        })
    }
}

const ELASTIC_PERIOD: f64 = (2.0 * PI) / 3.0;

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// y on the curve at the point whose x equals `progress`.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_y(y1, y2, t)
}

/// Newton iteration for the curve parameter at `target_x`.
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_x(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// x(t) = 3(1-t)²t·x1 + 3(1-t)t²·x2 + t³
#[inline]
fn bezier_x(x1: f64, x2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * x1 + 3.0 * mt * t2 * x2 + t3
}

#[inline]
fn bezier_y(y1: f64, y2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * y1 + 3.0 * mt * t2 * y2 + t3
}

#[inline]
fn bezier_x_derivative(x1: f64, x2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}

fn stepped(steps: u32, position: StepPosition, t: f64) -> f64 {
    if steps == 0 {
        return t;
    }

    let steps_f = steps as f64;

    match position {
        StepPosition::Start => (t * steps_f).ceil() / steps_f,
        StepPosition::End => (t * steps_f).floor() / steps_f,
        StepPosition::Both => {
            let total_steps = steps_f + 1.0;
            ((t * total_steps).floor() / steps_f).min(1.0)
        }
        StepPosition::None => {
            if steps == 1 {
                // One step with no jumps at either end parks halfway.
                0.5
            } else {
                let effective_steps = steps_f - 1.0;
                ((t * steps_f).floor() / effective_steps).min(1.0)
            }
        }
    }
}
