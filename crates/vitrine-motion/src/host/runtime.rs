//! Event-loop implementation of [`Host`].
//!
//! `HostRuntime` keeps the page layout, the scroll position, the pending
//! frames and timers, and every active observation. Callers pull events in
//! chronological order with [`HostRuntime::next_event`] and route them to
//! their components.
//!
//! # Usage
//!
//! ```
//! use vitrine_motion::geometry::ElementRect;
//! use vitrine_motion::host::{ElementId, Host, HostEvent, SimulatedHost};
//!
//! let mut host = SimulatedHost::simulated(1280.0, 800.0);
//! host.place(ElementId(1), ElementRect::new(0.0, 1200.0, 1280.0, 400.0));
//!
//! let frame = host.request_frame();
//! match host.next_event(100.0) {
//!     Some(HostEvent::Frame { token, .. }) => assert_eq!(token, frame),
//!     other => panic!("expected a frame, got {other:?}"),
//! }
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, trace};

use crate::error::{MotionError, Result};
use crate::geometry::{ElementRect, ScrollFrame};

use super::clock::{Clock, ManualClock, SystemClock};
use super::intersection::Observation;
use super::{
    Component, ElementId, FrameToken, Host, HostEvent, ObserverOptions, ObserverToken, TimerToken,
};

/// One display refresh at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

/// Runtime driven by the wall clock.
pub type NativeHost = HostRuntime<SystemClock>;

/// Runtime driven by explicitly advanced time.
pub type SimulatedHost = HostRuntime<ManualClock>;

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: f64,
    seq: u64,
}

/// A notification raised by the environment, stamped with when it happened.
#[derive(Debug, Clone)]
struct Raised {
    at: f64,
    event: HostEvent,
}

/// Host implementation over any [`Clock`].
#[derive(Debug)]
pub struct HostRuntime<C: Clock> {
    clock: C,
    frame_interval_ms: f64,
    next_id: u64,
    frames: BTreeMap<FrameToken, Scheduled>,
    timers: BTreeMap<TimerToken, Scheduled>,
    observers: BTreeMap<ObserverToken, Observation>,
    layout: HashMap<ElementId, ElementRect>,
    scroll: ScrollFrame,
    ready: VecDeque<Raised>,
    visibility_supported: bool,
}

impl HostRuntime<ManualClock> {
    /// Deterministic runtime starting at time zero.
    pub fn simulated(viewport_width: f64, viewport_height: f64) -> Self {
        Self::new(
            ManualClock::default(),
            ScrollFrame::new(viewport_width, viewport_height),
        )
    }

    /// Move time forward to `t` without delivering anything.
    ///
    /// Scheduled callbacks that fall due on the way stay queued and are
    /// returned by the next [`next_event`](Self::next_event) call, ahead of
    /// anything raised after they fell due.
    pub fn advance_to(&mut self, t: f64) {
        self.clock.catch_up(t);
    }
}

impl HostRuntime<SystemClock> {
    /// Runtime measuring time from now.
    pub fn native(viewport_width: f64, viewport_height: f64) -> Self {
        Self::new(
            SystemClock::new(),
            ScrollFrame::new(viewport_width, viewport_height),
        )
    }

    /// Next event that is due right now.
    pub fn poll(&mut self) -> Option<HostEvent> {
        let now = self.clock.now();
        self.next_event(now)
    }
}

impl<C: Clock> HostRuntime<C> {
    pub fn new(clock: C, scroll: ScrollFrame) -> Self {
        Self {
            clock,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            next_id: 1,
            frames: BTreeMap::new(),
            timers: BTreeMap::new(),
            observers: BTreeMap::new(),
            layout: HashMap::new(),
            scroll,
            ready: VecDeque::new(),
            visibility_supported: true,
        }
    }

    /// Use a different display refresh interval.
    pub fn with_frame_interval(mut self, interval_ms: f64) -> Self {
        if interval_ms > 0.0 {
            self.frame_interval_ms = interval_ms;
        }
        self
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    /// Pretend the environment lacks visibility observation.
    pub fn set_visibility_supported(&mut self, supported: bool) {
        self.visibility_supported = supported;
    }

    /// Lay out (or move) an element.
    pub fn place(&mut self, element: ElementId, rect: ElementRect) {
        self.layout.insert(element, rect);
        self.refresh_observations();
    }

    /// Remove an element from the layout.
    pub fn remove(&mut self, element: ElementId) {
        self.layout.remove(&element);
        self.refresh_observations();
    }

    /// Scroll the page, notifying listeners and observers.
    pub fn scroll_to(&mut self, scroll_x: f64, scroll_y: f64) {
        self.scroll = self.scroll.scrolled_to(scroll_x, scroll_y);
        trace!(scroll_x, scroll_y, "scroll");
        self.raise(HostEvent::Scroll(self.scroll));
        self.refresh_observations();
    }

    /// Change the viewport size, notifying listeners and observers.
    pub fn resize(&mut self, viewport_width: f64, viewport_height: f64) {
        self.scroll.viewport_width = viewport_width.max(0.0);
        self.scroll.viewport_height = viewport_height.max(0.0);
        debug!(viewport_width, viewport_height, "resize");
        self.raise(HostEvent::Resize(self.scroll));
        self.refresh_observations();
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn active_observers(&self) -> usize {
        self.observers.len()
    }

    /// Next event due no later than `deadline`, in chronological order.
    ///
    /// Timers and frames that fell due before the oldest raised notification
    /// (scroll, resize, visibility) come first; otherwise notifications
    /// already raised come before scheduled callbacks. Timers win ties
    /// against frames. When nothing is due, a drivable clock is moved to
    /// `deadline`.
    pub fn next_event(&mut self, deadline: f64) -> Option<HostEvent> {
        // Scheduled callbacks only overtake notifications raised later.
        let cutoff = match self.ready.front().map(|raised| raised.at) {
            Some(at) if !due_before(&self.timers, at) && !due_before(&self.frames, at) => {
                return self.ready.pop_front().map(|raised| raised.event);
            }
            Some(at) => at,
            None => deadline,
        };

        let timer = earliest(&self.timers);
        let frame = earliest(&self.frames);

        let fire_timer = match (timer, frame) {
            (Some((_, t)), Some((_, f))) => (t.due, 0) <= (f.due, 1) && t.due <= cutoff,
            (Some((_, t)), None) => t.due <= cutoff,
            _ => false,
        };

        if fire_timer {
            let (token, scheduled) = timer?;
            self.timers.remove(&token);
            self.clock.catch_up(scheduled.due);
            return Some(HostEvent::Timer { token });
        }

        if let Some((token, scheduled)) = frame.filter(|(_, f)| f.due <= cutoff) {
            self.frames.remove(&token);
            self.clock.catch_up(scheduled.due);
            return Some(HostEvent::Frame {
                token,
                timestamp: scheduled.due,
            });
        }

        self.clock.catch_up(deadline);
        None
    }

    /// Deliver every event due up to `deadline` to `components`.
    ///
    /// Returns the number of events delivered.
    pub fn run_until(&mut self, deadline: f64, components: &mut [&mut dyn Component]) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.next_event(deadline) {
            super::dispatch(&event, self, components);
            delivered += 1;
        }
        delivered
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn raise(&mut self, event: HostEvent) {
        let at = self.clock.now();
        self.ready.push_back(Raised { at, event });
    }

    fn next_frame_boundary(&self) -> f64 {
        let interval = self.frame_interval_ms;
        ((self.clock.now() / interval).floor() + 1.0) * interval
    }

    fn refresh_observations(&mut self) {
        let now = self.clock.now();
        for (token, observation) in self.observers.iter_mut() {
            let rect = self.layout.get(&observation.element).copied();
            if let Some(entry) = observation.update(rect, &self.scroll, now) {
                trace!(
                    ?token,
                    ratio = entry.ratio,
                    is_intersecting = entry.is_intersecting,
                    "intersection change"
                );
                self.ready.push_back(Raised {
                    at: now,
                    event: HostEvent::Intersection {
                        observer: *token,
                        entry,
                    },
                });
            }
        }
    }
}

fn due_before<T: Copy + Ord>(queue: &BTreeMap<T, Scheduled>, at: f64) -> bool {
    earliest(queue).is_some_and(|(_, scheduled)| scheduled.due < at)
}

fn earliest<T: Copy + Ord>(queue: &BTreeMap<T, Scheduled>) -> Option<(T, Scheduled)> {
    queue
        .iter()
        .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
        .map(|(token, scheduled)| (*token, *scheduled))
}

impl<C: Clock> Host for HostRuntime<C> {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn request_frame(&mut self) -> FrameToken {
        let id = self.allocate();
        let token = FrameToken(id);
        let due = self.next_frame_boundary();
        self.frames.insert(token, Scheduled { due, seq: id });
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.frames.remove(&token);
    }

    fn set_timeout(&mut self, delay_ms: f64) -> TimerToken {
        let id = self.allocate();
        let token = TimerToken(id);
        let due = self.clock.now() + delay_ms.max(0.0);
        self.timers.insert(token, Scheduled { due, seq: id });
        token
    }

    fn clear_timeout(&mut self, token: TimerToken) {
        self.timers.remove(&token);
    }

    fn observe(&mut self, element: ElementId, options: &ObserverOptions) -> Result<ObserverToken> {
        if !self.visibility_supported {
            return Err(MotionError::EnvironmentUnavailable("visibility observation"));
        }

        let token = ObserverToken(self.allocate());
        let mut observation = Observation::new(element, options.clone());
        let rect = self.layout.get(&element).copied();
        if let Some(entry) = observation.update(rect, &self.scroll, self.clock.now()) {
            self.raise(HostEvent::Intersection {
                observer: token,
                entry,
            });
        }
        self.observers.insert(token, observation);
        debug!(?element, ?token, "observing element");
        Ok(token)
    }

    fn unobserve(&mut self, token: ObserverToken) {
        if self.observers.remove(&token).is_some() {
            debug!(?token, "stopped observing element");
        }
        self.ready.retain(|raised| {
            !matches!(raised.event, HostEvent::Intersection { observer, .. } if observer == token)
        });
    }

    fn element_rect(&self, element: ElementId) -> Option<ElementRect> {
        self.layout.get(&element).copied()
    }

    fn scroll_frame(&self) -> ScrollFrame {
        self.scroll
    }
}
