//! Scroll-driven motion primitives for the portfolio page.
//!
//! This crate provides:
//! - **Reveals**: elements that appear once they scroll into view
//! - **Parallax**: offsets that follow the scroll position
//! - **Counters**: numbers that count up to a value, formatted for display
//! - **Host**: the clock/visibility capability the primitives run against
//!
//! # Architecture
//!
//! ```text
//! HostRuntime (NativeHost | SimulatedHost)
//!   └── HostEvent ──> Component::handle
//!         ├── VisibilityTrigger / StaggeredReveal / SharedRevealObserver
//!         ├── ParallaxOffset
//!         └── NumericRamp / RampBatch ──> EventQueue<CounterEvent>
//! ```
//!
//! Every primitive is attached to exactly one element, owns the observers,
//! frames and timers it schedules, and releases them on
//! [`Component::detach`]. Missing host capabilities never hide content.

pub mod counter;
pub mod easing;
pub mod error;
pub mod events;
pub mod format;
pub mod geometry;
pub mod host;
pub mod parallax;
pub mod reveal;

pub use counter::{
    BatchMode, CounterConfig, CounterRun, CounterState, NumericRamp, RampBatch, VisibilityGate,
};
pub use easing::{EasingFunction, StepPosition};
pub use error::{MotionError, Result};
pub use events::{CounterEvent, EventQueue};
pub use format::{FormatMode, NumberFormat, NumberLocale};
pub use geometry::{Breakpoint, ElementRect, RootMargin, ScrollFrame, Thresholds};
pub use host::{
    Component, ElementId, Host, HostEvent, HostRuntime, NativeHost, ObserverOptions,
    SimulatedHost,
};
pub use parallax::{
    Bounds, Direction, ParallaxConfig, ParallaxLayer, ParallaxOffset, ParallaxOutput, Speed,
    Translation, WillChange,
};
pub use reveal::{
    Pose, RevealVariant, SharedRevealObserver, StaggeredReveal, TriggerConfig, VisibilityState,
    VisibilityTrigger,
};
