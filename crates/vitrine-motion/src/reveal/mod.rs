//! Scroll-triggered reveals.
//!
//! [`VisibilityTrigger`] flips one element to revealed when it crosses its
//! visibility threshold, optionally after a delay and optionally only once.
//! [`StaggeredReveal`] does the same for a container whose items appear one
//! after another. [`SharedRevealObserver`] lets many elements share one set
//! of observer options and route entries to per-element handlers.
//! [`RevealVariant`] describes what "appearing" looks like.
//!
//! Content is never hidden because of the environment: a disabled trigger,
//! or a host without visibility observation, reveals immediately.

mod shared;
mod stagger;
mod trigger;
mod variant;

pub use shared::{SHARED_ROOT_MARGIN, SHARED_THRESHOLD, SharedRevealObserver};
pub use stagger::StaggeredReveal;
pub use trigger::{TriggerConfig, VisibilityState, VisibilityTrigger};
pub use variant::{Pose, REVEAL_EASING, RevealVariant, SLIDE_DISTANCE};
