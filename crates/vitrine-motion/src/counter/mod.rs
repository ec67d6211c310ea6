//! Animated numeric counters.
//!
//! A [`NumericRamp`] moves a displayed value from `start` to `end` over a
//! fixed duration. Progress is measured against frame timestamps, minus any
//! time spent paused, so a counter that stops receiving frames simply
//! stalls and catches up later. Counters can wait for their element to
//! scroll into view before starting ([`VisibilityGate`]) and can be driven
//! together through a [`RampBatch`].
//!
//! # Architecture
//!
//! ```text
//! start() ──(delay timer)──> Frame ──> tick ──> Frame ──> ... ──> Completed
//!    │                          ▲
//! pause()  cancels frame/delay  │
//! resume() re-requests ─────────┘
//! ```

mod batch;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vitrine_config::VitrineConfig;

use crate::easing::EasingFunction;
use crate::error::MotionError;
use crate::events::{CounterEvent, EventQueue};
use crate::format::NumberFormat;
use crate::geometry::Thresholds;
use crate::host::{
    Component, ElementId, FrameToken, Host, HostEvent, IntersectionEntry, ObserverOptions,
    ObserverToken, TimerToken,
};

pub use batch::{BatchMode, DEFAULT_SEQUENTIAL_INCREMENT_MS, RampBatch};

/// Default animation length.
pub const DEFAULT_DURATION_MS: f64 = 2000.0;

/// Start the counter once its element becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityGate {
    pub threshold: f64,
    /// Stay "in view" after the first sighting.
    pub once: bool,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            once: true,
        }
    }
}

/// Configuration for a [`NumericRamp`].
#[derive(Debug, Clone, PartialEq)]
pub struct CounterConfig {
    pub start: f64,
    pub end: f64,
    pub duration_ms: f64,
    /// Wait before the first run. Restarts begin immediately.
    pub delay_ms: f64,
    pub easing: EasingFunction,
    /// Snap displayed values down to multiples of this size.
    pub step: Option<f64>,
    pub format: NumberFormat,
    pub gate: Option<VisibilityGate>,
}

impl CounterConfig {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            duration_ms: DEFAULT_DURATION_MS,
            delay_ms: 0.0,
            easing: EasingFunction::QuadOut,
            step: None,
            format: NumberFormat::default(),
            gate: None,
        }
    }

    /// A visibility-gated counter using the `[counter]` and `[motion]`
    /// sections. Reduced motion collapses the duration to zero.
    pub fn from_config(config: &VitrineConfig, start: f64, end: f64) -> Self {
        let counter = &config.counter;
        let duration_ms = if config.motion.reduced_motion {
            0.0
        } else {
            counter.duration_ms.max(0.0)
        };

        Self {
            duration_ms,
            easing: EasingFunction::named_or(&counter.easing, EasingFunction::QuadOut),
            format: NumberFormat::from_settings(counter),
            gate: Some(VisibilityGate {
                threshold: counter.threshold,
                once: counter.once,
            }),
            ..Self::new(start, end)
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_gate(mut self, gate: VisibilityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Drop values that cannot be honoured, logging each one.
    fn sanitized(mut self) -> Self {
        if let Some(step) = self.step.filter(|step| !(*step > 0.0 && step.is_finite())) {
            let error = MotionError::invalid("step", format!("{step} is not a positive size"));
            warn!(%error, "interpolating continuously");
            self.step = None;
        }
        if !(self.duration_ms >= 0.0) {
            warn!(duration_ms = self.duration_ms, "negative duration, completing immediately");
            self.duration_ms = 0.0;
        }
        self.delay_ms = self.delay_ms.max(0.0);
        self
    }

    /// Value shown at `eased` progress.
    pub fn value_at(&self, eased: f64) -> f64 {
        let span = self.end - self.start;
        match self.step {
            Some(step) => {
                let steps = (eased * span.abs() / step).floor();
                self.start + steps * step * span.signum()
            }
            None => self.start + span * eased,
        }
    }
}

/// Observable state of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    pub current_value: f64,
    /// A run is scheduled or in flight (including its start delay).
    pub is_animating: bool,
    pub is_paused: bool,
    pub has_started: bool,
    pub is_in_view: bool,
    /// Eased progress of the current run.
    pub progress: f64,
}

impl CounterState {
    fn initial(start: f64) -> Self {
        Self {
            current_value: start,
            is_animating: false,
            is_paused: false,
            has_started: false,
            is_in_view: false,
            progress: 0.0,
        }
    }
}

/// Timing bookkeeping of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterRun {
    pub current_value: f64,
    /// Timestamp of the run's first frame.
    pub start_timestamp: Option<f64>,
    pub pause_accumulated: f64,
    pub is_animating: bool,
}

/// Where a scheduled start delay stands.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Delay {
    None,
    Waiting { token: TimerToken, due: f64 },
    Suspended { remaining: f64 },
}

/// Counts from one value to another.
#[derive(Debug)]
pub struct NumericRamp {
    element: ElementId,
    config: CounterConfig,
    state: CounterState,
    start_timestamp: Option<f64>,
    pause_accumulated: f64,
    paused_at: Option<f64>,
    frame: Option<FrameToken>,
    delay: Delay,
    observer: Option<ObserverToken>,
    seen: bool,
    auto_start: bool,
    events: EventQueue,
    torn_down: bool,
}

impl NumericRamp {
    pub fn new(element: ElementId, config: CounterConfig) -> Self {
        let config = config.sanitized();
        Self {
            element,
            state: CounterState::initial(config.start),
            auto_start: config.gate.is_some(),
            config,
            start_timestamp: None,
            pause_accumulated: 0.0,
            paused_at: None,
            frame: None,
            delay: Delay::None,
            observer: None,
            seen: false,
            events: EventQueue::new(),
            torn_down: false,
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn state(&self) -> CounterState {
        self.state
    }

    pub fn run(&self) -> CounterRun {
        CounterRun {
            current_value: self.state.current_value,
            start_timestamp: self.start_timestamp,
            pause_accumulated: self.pause_accumulated,
            is_animating: self.state.is_animating,
        }
    }

    pub fn current_value(&self) -> f64 {
        self.state.current_value
    }

    pub fn is_animating(&self) -> bool {
        self.state.is_animating
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    pub fn has_started(&self) -> bool {
        self.state.has_started
    }

    /// Started at least once and currently neither running nor paused.
    pub fn is_complete(&self) -> bool {
        self.state.has_started && !self.state.is_animating && !self.state.is_paused
    }

    /// The current value rendered with the configured format.
    pub fn formatted(&self) -> String {
        self.config.format.format(self.state.current_value)
    }

    /// Take the lifecycle events produced since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = CounterEvent> + '_ {
        self.events.drain()
    }

    /// Begin a run. A no-op while running; resumes when paused.
    pub fn start(&mut self, host: &mut dyn Host) {
        if self.torn_down {
            return;
        }
        if self.state.is_paused {
            self.resume(host);
            return;
        }
        if self.state.is_animating {
            return;
        }

        let delay = if self.state.has_started {
            0.0
        } else {
            self.config.delay_ms
        };

        self.state.is_animating = true;
        self.state.has_started = true;
        self.start_timestamp = None;
        self.pause_accumulated = 0.0;
        self.paused_at = None;
        self.events.push(CounterEvent::Started);
        debug!(
            element = ?self.element,
            from = self.config.start,
            to = self.config.end,
            delay,
            "counter started"
        );

        if delay > 0.0 {
            self.delay = Delay::Waiting {
                token: host.set_timeout(delay),
                due: host.now() + delay,
            };
        } else {
            self.frame = Some(host.request_frame());
        }
    }

    /// Halt frame scheduling, remembering when.
    pub fn pause(&mut self, host: &mut dyn Host) {
        if self.torn_down || !self.state.is_animating {
            return;
        }

        let now = host.now();
        self.state.is_animating = false;
        self.state.is_paused = true;
        self.paused_at = Some(now);

        if let Some(token) = self.frame.take() {
            host.cancel_frame(token);
        }
        if let Delay::Waiting { token, due } = self.delay {
            host.clear_timeout(token);
            self.delay = Delay::Suspended {
                remaining: (due - now).max(0.0),
            };
        }
        self.events.push(CounterEvent::Paused);
        debug!(element = ?self.element, value = self.state.current_value, "counter paused");
    }

    /// Continue a paused run; the paused interval does not count towards
    /// the duration.
    pub fn resume(&mut self, host: &mut dyn Host) {
        if self.torn_down || !self.state.is_paused {
            return;
        }

        let now = host.now();
        if let (Some(_), Some(paused_at)) = (self.start_timestamp, self.paused_at) {
            self.pause_accumulated += (now - paused_at).max(0.0);
        }
        self.paused_at = None;
        self.state.is_paused = false;
        self.state.is_animating = true;

        if let Delay::Suspended { remaining } = self.delay {
            self.delay = Delay::Waiting {
                token: host.set_timeout(remaining),
                due: now + remaining,
            };
        } else {
            self.frame = Some(host.request_frame());
        }
        self.events.push(CounterEvent::Resumed);
        debug!(element = ?self.element, paused_ms = self.pause_accumulated, "counter resumed");
    }

    /// Cancel everything and return to the configured start value.
    ///
    /// A gated counter does not auto-start again afterwards.
    pub fn reset(&mut self, host: &mut dyn Host) {
        self.cancel_scheduled(host);
        if self.state.is_animating || self.state.is_paused {
            self.events.push(CounterEvent::Cancelled);
        }

        let is_in_view = self.state.is_in_view;
        self.state = CounterState {
            is_in_view,
            ..CounterState::initial(self.config.start)
        };
        self.start_timestamp = None;
        self.pause_accumulated = 0.0;
        self.paused_at = None;
        self.auto_start = false;
        debug!(element = ?self.element, "counter reset");
    }

    fn cancel_scheduled(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.frame.take() {
            host.cancel_frame(token);
        }
        if let Delay::Waiting { token, .. } = self.delay {
            host.clear_timeout(token);
        }
        self.delay = Delay::None;
    }

    fn tick(&mut self, timestamp: f64, host: &mut dyn Host) {
        let started = *self.start_timestamp.get_or_insert(timestamp);
        let elapsed = timestamp - started - self.pause_accumulated;
        let progress = if self.config.duration_ms > 0.0 {
            (elapsed / self.config.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let eased = self.config.easing.evaluate(progress);
        let value = self.config.value_at(eased);
        self.state.current_value = value;
        self.state.progress = eased;
        self.events.push(CounterEvent::Updated { value });
        trace!(element = ?self.element, progress, value, "counter frame");

        if progress < 1.0 {
            self.frame = Some(host.request_frame());
        } else {
            self.state.is_animating = false;
            self.state.current_value = self.config.end;
            self.events.push(CounterEvent::Completed);
            debug!(element = ?self.element, value = self.config.end, "counter completed");
        }
    }

    fn on_entry(&mut self, entry: &IntersectionEntry, host: &mut dyn Host) {
        let once = self.config.gate.is_some_and(|gate| gate.once);
        self.seen |= entry.is_intersecting;
        self.state.is_in_view = if once { self.seen } else { entry.is_intersecting };

        if once && self.seen {
            if let Some(token) = self.observer.take() {
                host.unobserve(token);
            }
        }
        self.maybe_auto_start(host);
    }

    fn maybe_auto_start(&mut self, host: &mut dyn Host) {
        if self.auto_start && self.state.is_in_view && !self.state.has_started {
            self.start(host);
        }
    }
}

impl Component for NumericRamp {
    fn attach(&mut self, host: &mut dyn Host) {
        if self.torn_down || self.observer.is_some() {
            return;
        }
        let Some(gate) = self.config.gate else {
            return;
        };

        let options = ObserverOptions {
            thresholds: Thresholds::single(gate.threshold),
            ..ObserverOptions::default()
        };
        match host.observe(self.element, &options) {
            Ok(token) => self.observer = Some(token),
            Err(error) => {
                warn!(%error, element = ?self.element, "starting counter without observation");
                self.seen = true;
                self.state.is_in_view = true;
                self.maybe_auto_start(host);
            }
        }
    }

    fn handle(&mut self, event: &HostEvent, host: &mut dyn Host) {
        if self.torn_down {
            return;
        }

        match event {
            HostEvent::Intersection { observer, entry } if Some(*observer) == self.observer => {
                self.on_entry(entry, host);
            }
            HostEvent::Timer { token } => {
                if let Delay::Waiting { token: waiting, .. } = self.delay {
                    if waiting == *token {
                        self.delay = Delay::None;
                        self.frame = Some(host.request_frame());
                    }
                }
            }
            HostEvent::Frame { token, timestamp } if Some(*token) == self.frame => {
                self.frame = None;
                self.tick(*timestamp, host);
            }
            _ => {}
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        self.cancel_scheduled(host);
        if let Some(token) = self.observer.take() {
            host.unobserve(token);
        }
        self.state.is_animating = false;
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatMode;
    use crate::geometry::ElementRect;
    use crate::host::SimulatedHost;

    const STAT: ElementId = ElementId(5);

    fn pump(host: &mut SimulatedHost, ramp: &mut NumericRamp, deadline: f64) {
        host.run_until(deadline, &mut [ramp as &mut dyn Component]);
    }

    fn linear(start: f64, end: f64, duration_ms: f64) -> CounterConfig {
        CounterConfig::new(start, end)
            .with_duration(duration_ms)
            .with_easing(EasingFunction::Linear)
    }

    #[test]
    fn test_runs_to_end_value() {
        let mut host = SimulatedHost::simulated(800.0, 600.0).with_frame_interval(10.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 100.0, 100.0));
        ramp.start(&mut host);

        // First frame at t=10 anchors the run.
        pump(&mut host, &mut ramp, 60.0);
        assert!((ramp.current_value() - 50.0).abs() < 1e-9);
        assert!(ramp.is_animating());

        pump(&mut host, &mut ramp, 200.0);
        assert_eq!(ramp.current_value(), 100.0);
        assert!(ramp.is_complete());
        assert_eq!(host.pending_frames(), 0);

        let events: Vec<_> = ramp.drain_events().collect();
        assert!(events.first().is_some_and(CounterEvent::is_started));
        assert!(events.last().is_some_and(CounterEvent::is_completed));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 500.0));
        ramp.start(&mut host);
        ramp.start(&mut host);
        assert_eq!(host.pending_frames(), 1);
        assert_eq!(ramp.drain_events().filter(CounterEvent::is_started).count(), 1);
    }

    #[test]
    fn test_step_snaps_down() {
        let config = linear(0.0, 100.0, 1000.0).with_step(25.0);
        assert_eq!(config.value_at(0.6), 50.0);
        assert_eq!(config.value_at(1.0), 100.0);

        let falling = linear(100.0, 0.0, 1000.0).with_step(30.0);
        assert_eq!(falling.value_at(0.5), 70.0);
    }

    #[test]
    fn test_invalid_step_interpolates() {
        let ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 100.0).with_step(0.0));
        assert_eq!(ramp.config().step, None);
        assert_eq!(ramp.config().value_at(0.5), 5.0);
    }

    #[test]
    fn test_zero_duration_completes_on_first_frame() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        let mut ramp = NumericRamp::new(STAT, linear(3.0, 7.0, 0.0));
        ramp.start(&mut host);
        pump(&mut host, &mut ramp, 20.0);
        assert_eq!(ramp.current_value(), 7.0);
        assert!(ramp.is_complete());
    }

    #[test]
    fn test_delay_only_on_first_start() {
        let mut host = SimulatedHost::simulated(800.0, 600.0).with_frame_interval(10.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 50.0).with_delay(300.0));
        ramp.start(&mut host);
        pump(&mut host, &mut ramp, 290.0);
        assert_eq!(ramp.current_value(), 0.0);
        assert!(ramp.run().start_timestamp.is_none());

        pump(&mut host, &mut ramp, 400.0);
        assert!(ramp.is_complete());

        ramp.start(&mut host);
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(host.pending_frames(), 1);
    }

    #[test]
    fn test_pause_suspends_delay() {
        let mut host = SimulatedHost::simulated(800.0, 600.0).with_frame_interval(10.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 50.0).with_delay(300.0));
        ramp.start(&mut host);
        pump(&mut host, &mut ramp, 100.0);
        ramp.pause(&mut host);
        assert_eq!(host.pending_timers(), 0);

        pump(&mut host, &mut ramp, 1000.0);
        assert!(ramp.is_paused());
        ramp.resume(&mut host);
        // 200ms of delay were left.
        pump(&mut host, &mut ramp, 1190.0);
        assert!(ramp.run().start_timestamp.is_none());
        pump(&mut host, &mut ramp, 1300.0);
        assert!(ramp.is_complete());
    }

    #[test]
    fn test_start_while_paused_resumes() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 500.0));
        ramp.start(&mut host);
        pump(&mut host, &mut ramp, 100.0);
        ramp.pause(&mut host);
        ramp.start(&mut host);
        assert!(!ramp.is_paused());
        assert!(ramp.is_animating());
        assert!(ramp.run().start_timestamp.is_some());
    }

    #[test]
    fn test_reset_returns_to_start() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        let mut ramp = NumericRamp::new(STAT, linear(5.0, 10.0, 500.0));
        ramp.start(&mut host);
        pump(&mut host, &mut ramp, 200.0);
        ramp.reset(&mut host);

        let state = ramp.state();
        assert_eq!(state.current_value, 5.0);
        assert!(!state.is_animating);
        assert!(!state.has_started);
        assert_eq!(host.pending_frames(), 0);
        assert!(ramp.drain_events().any(|event| event == CounterEvent::Cancelled));
    }

    #[test]
    fn test_gate_starts_once_in_view() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        host.place(STAT, ElementRect::new(0.0, 1000.0, 200.0, 100.0));
        let config = linear(0.0, 10.0, 100.0).with_gate(VisibilityGate::default());
        let mut ramp = NumericRamp::new(STAT, config);
        ramp.attach(&mut host);
        pump(&mut host, &mut ramp, 50.0);
        assert!(!ramp.has_started());

        host.scroll_to(0.0, 600.0);
        pump(&mut host, &mut ramp, 500.0);
        assert!(ramp.state().is_in_view);
        assert!(ramp.is_complete());
        assert_eq!(host.active_observers(), 0);

        host.scroll_to(0.0, 0.0);
        pump(&mut host, &mut ramp, 600.0);
        assert!(ramp.state().is_in_view);
        assert_eq!(ramp.current_value(), 10.0);
    }

    #[test]
    fn test_reset_disarms_gate() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        host.place(STAT, ElementRect::new(0.0, 100.0, 200.0, 100.0));
        let config = linear(0.0, 10.0, 100.0).with_gate(VisibilityGate {
            threshold: 0.1,
            once: false,
        });
        let mut ramp = NumericRamp::new(STAT, config);
        ramp.attach(&mut host);
        pump(&mut host, &mut ramp, 20.0);
        assert!(ramp.has_started());

        ramp.reset(&mut host);
        host.scroll_to(0.0, 2000.0);
        host.scroll_to(0.0, 0.0);
        pump(&mut host, &mut ramp, 300.0);
        assert!(!ramp.has_started());
    }

    #[test]
    fn test_gate_fails_open() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        host.set_visibility_supported(false);
        let config = linear(0.0, 10.0, 100.0).with_gate(VisibilityGate::default());
        let mut ramp = NumericRamp::new(STAT, config);
        ramp.attach(&mut host);
        assert!(ramp.has_started());
    }

    #[test]
    fn test_detach_ignores_late_frames() {
        let mut host = SimulatedHost::simulated(800.0, 600.0);
        let mut ramp = NumericRamp::new(STAT, linear(0.0, 10.0, 500.0));
        ramp.start(&mut host);
        let frame = host.request_frame();
        ramp.detach(&mut host);
        assert_eq!(host.pending_frames(), 1);

        ramp.handle(&HostEvent::Frame { token: frame, timestamp: 50.0 }, &mut host);
        pump(&mut host, &mut ramp, 1000.0);
        assert_eq!(ramp.current_value(), 0.0);
    }

    #[test]
    fn test_formatted_value() {
        let format = NumberFormat::new(FormatMode::Abbreviated).with_suffix("+");
        let ramp = NumericRamp::new(STAT, CounterConfig::new(1_500.0, 0.0).with_format(format));
        assert_eq!(ramp.formatted(), "1.5K+");
    }

    #[test]
    fn test_reduced_motion_config() {
        let mut config = VitrineConfig::default();
        config.motion.reduced_motion = true;
        config.counter.easing = "wobble".to_string();
        let counter = CounterConfig::from_config(&config, 0.0, 42.0);
        assert_eq!(counter.duration_ms, 0.0);
        assert_eq!(counter.easing, EasingFunction::QuadOut);
        assert_eq!(counter.gate, Some(VisibilityGate::default()));
    }
}
