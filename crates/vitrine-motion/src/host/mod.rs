//! Host capabilities the motion primitives depend on.
//!
//! A browser provides visibility observation, per-frame callbacks, timers and
//! scroll/resize notifications. Here those are one [`Host`] trait. Components
//! never hold a reference to the host; they receive it on every call and get
//! notified through [`HostEvent`]s routed by [`Component::handle`].
//!
//! # Architecture
//!
//! ```text
//! HostRuntime<C: Clock>
//!   ├── SystemClock  -> NativeHost    (wall clock)
//!   └── ManualClock  -> SimulatedHost (tests, headless walkthroughs)
//!
//! HostRuntime::next_event(deadline)
//!   └── HostEvent -> Component::handle(&event, &mut host) for each component
//! ```
//!
//! Every scheduled callback is identified by a token. A component only acts
//! on events carrying a token it currently owns, and ignores everything after
//! [`Component::detach`], so a late frame or timer can never touch a
//! torn-down element.

pub mod clock;
pub mod intersection;
pub mod runtime;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{ElementRect, RootMargin, ScrollFrame, Thresholds};

pub use clock::{Clock, ManualClock, SystemClock};
pub use intersection::IntersectionEntry;
pub use runtime::{DEFAULT_FRAME_INTERVAL_MS, HostRuntime, NativeHost, SimulatedHost};

/// Identifies one visual element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Handle for a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub(crate) u64);

/// Handle for a pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub(crate) u64);

/// Handle for an active visibility observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(pub(crate) u64);

/// What a visibility observation reports on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObserverOptions {
    pub thresholds: Thresholds,
    pub root_margin: RootMargin,
}

/// Asynchronous notification delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A requested frame fired; `timestamp` is the frame time in milliseconds.
    Frame { token: FrameToken, timestamp: f64 },
    /// A timeout elapsed.
    Timer { token: TimerToken },
    /// An observed element crossed a threshold.
    Intersection {
        observer: ObserverToken,
        entry: IntersectionEntry,
    },
    /// The page scrolled.
    Scroll(ScrollFrame),
    /// The viewport changed size.
    Resize(ScrollFrame),
}

/// Environment services available to the motion primitives.
pub trait Host {
    /// Monotonic time in milliseconds.
    fn now(&self) -> f64;

    /// Ask for a [`HostEvent::Frame`] at the next frame boundary.
    fn request_frame(&mut self) -> FrameToken;

    fn cancel_frame(&mut self, token: FrameToken);

    /// Ask for a [`HostEvent::Timer`] after `delay_ms`.
    fn set_timeout(&mut self, delay_ms: f64) -> TimerToken;

    fn clear_timeout(&mut self, token: TimerToken);

    /// Start observing `element`. An initial entry is delivered right away.
    ///
    /// Fails with [`MotionError::EnvironmentUnavailable`](crate::MotionError)
    /// when the host cannot observe visibility.
    fn observe(&mut self, element: ElementId, options: &ObserverOptions) -> Result<ObserverToken>;

    fn unobserve(&mut self, token: ObserverToken);

    /// Layout box of `element` in document coordinates, if it is laid out.
    fn element_rect(&self, element: ElementId) -> Option<ElementRect>;

    /// Current scroll position and viewport size.
    fn scroll_frame(&self) -> ScrollFrame;
}

/// Something attached to exactly one element that reacts to host events.
pub trait Component {
    /// Register observations and read initial layout.
    fn attach(&mut self, host: &mut dyn Host);

    /// React to one event. Events the component does not own are ignored.
    fn handle(&mut self, event: &HostEvent, host: &mut dyn Host);

    /// Cancel everything scheduled and stop reacting to events.
    fn detach(&mut self, host: &mut dyn Host);
}

/// Deliver one event to every component.
pub fn dispatch(event: &HostEvent, host: &mut dyn Host, components: &mut [&mut dyn Component]) {
    for component in components.iter_mut() {
        component.handle(event, host);
    }
}
