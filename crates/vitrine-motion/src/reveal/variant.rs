//! Hidden/visible poses for reveal animations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};

/// Distance slides travel, in CSS pixels.
pub const SLIDE_DISTANCE: f64 = 60.0;

/// Curve every reveal transition uses.
pub const REVEAL_EASING: EasingFunction = EasingFunction::CubicBezier {
    x1: 0.25,
    y1: 0.46,
    x2: 0.45,
    y2: 0.94,
};

/// How an element appears once revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevealVariant {
    #[default]
    FadeIn,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    ScaleUp,
    ScaleDown,
    RotateIn,
    FlipX,
    FlipY,
}

/// Visual state of a revealed element.
///
/// Translations are in CSS pixels, rotations in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub opacity: f64,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotate: f64,
    pub rotate_x: f64,
    pub rotate_y: f64,
}

impl Pose {
    /// Fully visible, untransformed.
    pub const IDENTITY: Pose = Pose {
        opacity: 1.0,
        x: 0.0,
        y: 0.0,
        scale: 1.0,
        rotate: 0.0,
        rotate_x: 0.0,
        rotate_y: 0.0,
    };

    const TRANSPARENT: Pose = Pose {
        opacity: 0.0,
        ..Pose::IDENTITY
    };

    /// Linear blend between two poses.
    pub fn lerp(from: &Pose, to: &Pose, t: f64) -> Pose {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Pose {
            opacity: mix(from.opacity, to.opacity),
            x: mix(from.x, to.x),
            y: mix(from.y, to.y),
            scale: mix(from.scale, to.scale),
            rotate: mix(from.rotate, to.rotate),
            rotate_x: mix(from.rotate_x, to.rotate_x),
            rotate_y: mix(from.rotate_y, to.rotate_y),
        }
    }

    /// CSS `transform` value; `none` for the identity.
    pub fn transform(&self) -> String {
        let mut parts = Vec::new();
        if self.x != 0.0 || self.y != 0.0 {
            parts.push(format!("translate({}px, {}px)", self.x, self.y));
        }
        if self.scale != 1.0 {
            parts.push(format!("scale({})", self.scale));
        }
        if self.rotate != 0.0 {
            parts.push(format!("rotate({}deg)", self.rotate));
        }
        if self.rotate_x != 0.0 {
            parts.push(format!("rotateX({}deg)", self.rotate_x));
        }
        if self.rotate_y != 0.0 {
            parts.push(format!("rotateY({}deg)", self.rotate_y));
        }

        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RevealVariant {
    pub const ALL: [RevealVariant; 10] = [
        Self::FadeIn,
        Self::SlideUp,
        Self::SlideDown,
        Self::SlideLeft,
        Self::SlideRight,
        Self::ScaleUp,
        Self::ScaleDown,
        Self::RotateIn,
        Self::FlipX,
        Self::FlipY,
    ];

    /// Pose before the reveal.
    pub fn hidden(&self) -> Pose {
        let base = Pose::TRANSPARENT;
        match self {
            Self::FadeIn => base,
            Self::SlideUp => Pose { y: SLIDE_DISTANCE, ..base },
            Self::SlideDown => Pose { y: -SLIDE_DISTANCE, ..base },
            Self::SlideLeft => Pose { x: SLIDE_DISTANCE, ..base },
            Self::SlideRight => Pose { x: -SLIDE_DISTANCE, ..base },
            Self::ScaleUp => Pose { scale: 0.8, ..base },
            Self::ScaleDown => Pose { scale: 1.2, ..base },
            Self::RotateIn => Pose { rotate: -180.0, ..base },
            Self::FlipX => Pose { rotate_x: -90.0, ..base },
            Self::FlipY => Pose { rotate_y: -90.0, ..base },
        }
    }

    /// Pose once the reveal has finished.
    pub fn visible(&self) -> Pose {
        Pose::IDENTITY
    }

    /// Pose `progress` of the way through the transition (eased).
    pub fn pose_at(&self, progress: f64) -> Pose {
        let eased = REVEAL_EASING.evaluate(progress);
        Pose::lerp(&self.hidden(), &self.visible(), eased)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FadeIn => "fadeIn",
            Self::SlideUp => "slideUp",
            Self::SlideDown => "slideDown",
            Self::SlideLeft => "slideLeft",
            Self::SlideRight => "slideRight",
            Self::ScaleUp => "scaleUp",
            Self::ScaleDown => "scaleDown",
            Self::RotateIn => "rotateIn",
            Self::FlipX => "flipX",
            Self::FlipY => "flipY",
        }
    }

    /// Look up a variant by name, warning and falling back to `FadeIn`.
    pub fn named_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|error: MotionError| {
            warn!(%error, "using fadeIn reveal");
            Self::FadeIn
        })
    }
}

impl FromStr for RevealVariant {
    type Err = MotionError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == name.trim())
            .ok_or_else(|| {
                MotionError::invalid("reveal variant", format!("unknown variant `{name}`"))
            })
    }
}

impl fmt::Display for RevealVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_hidden_poses() {
        assert_eq!(RevealVariant::SlideUp.hidden().y, 60.0);
        assert_eq!(RevealVariant::SlideRight.hidden().x, -60.0);
        assert_eq!(RevealVariant::ScaleDown.hidden().scale, 1.2);
        assert_eq!(RevealVariant::RotateIn.hidden().rotate, -180.0);
        assert_eq!(RevealVariant::FlipY.hidden().rotate_y, -90.0);
        for variant in RevealVariant::ALL {
            assert_eq!(variant.hidden().opacity, 0.0);
            assert_eq!(variant.visible(), Pose::IDENTITY);
        }
    }

    #[test]
    fn test_pose_at_endpoints() {
        let variant = RevealVariant::SlideLeft;
        assert_eq!(variant.pose_at(0.0), variant.hidden());
        let end = variant.pose_at(1.0);
        assert!(approx_eq(end.opacity, 1.0));
        assert!(approx_eq(end.x, 0.0));

        let mid = variant.pose_at(0.5);
        assert!(mid.opacity > 0.5, "reveal curve front-loads progress");
        assert!(mid.x > 0.0 && mid.x < 60.0);
    }

    #[test]
    fn test_transform_strings() {
        assert_eq!(Pose::IDENTITY.transform(), "none");
        assert_eq!(RevealVariant::SlideUp.hidden().transform(), "translate(0px, 60px)");
        assert_eq!(RevealVariant::FlipX.hidden().transform(), "rotateX(-90deg)");
    }

    #[test]
    fn test_names_round_trip() {
        for variant in RevealVariant::ALL {
            assert_eq!(variant.name().parse::<RevealVariant>().unwrap(), variant);
        }
        assert_eq!(RevealVariant::named_or_default("spin"), RevealVariant::FadeIn);
    }
}
