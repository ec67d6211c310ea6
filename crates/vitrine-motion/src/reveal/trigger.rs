use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vitrine_config::VitrineConfig;

use crate::geometry::{RootMargin, Thresholds};
use crate::host::{
    Component, ElementId, Host, HostEvent, IntersectionEntry, ObserverOptions, ObserverToken,
    TimerToken,
};

use super::variant::{Pose, RevealVariant};

/// Configuration for a [`VisibilityTrigger`].
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    pub thresholds: Thresholds,
    pub root_margin: RootMargin,
    /// Latch `revealed` the first time it becomes true.
    pub once: bool,
    /// Delay between crossing into view and revealing.
    pub delay_ms: f64,
    /// Length of the reveal transition.
    pub duration_ms: f64,
    pub variant: RevealVariant,
    /// Skip observation entirely and reveal at once.
    pub disabled: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::single(0.1),
            root_margin: RootMargin::parse_or_zero("0px 0px -10% 0px"),
            once: true,
            delay_ms: 0.0,
            duration_ms: 600.0,
            variant: RevealVariant::FadeIn,
            disabled: false,
        }
    }
}

impl TriggerConfig {
    /// Defaults taken from the `[reveal]` and `[motion]` sections.
    pub fn from_config(config: &VitrineConfig) -> Self {
        let reveal = &config.reveal;
        Self {
            thresholds: Thresholds::single(reveal.threshold),
            root_margin: RootMargin::parse_or_zero(&reveal.root_margin),
            once: reveal.once,
            delay_ms: reveal.delay_ms.max(0.0),
            duration_ms: reveal.duration_ms.max(0.0),
            variant: RevealVariant::named_or_default(&reveal.variant),
            disabled: config.motion.reduced_motion,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.thresholds = Thresholds::single(threshold);
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms.max(0.0);
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub(crate) fn observer_options(&self) -> ObserverOptions {
        ObserverOptions {
            thresholds: self.thresholds.clone(),
            root_margin: self.root_margin,
        }
    }
}

/// What a [`VisibilityTrigger`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisibilityState {
    /// The element should be shown.
    pub revealed: bool,
    /// The element is currently inside the observed region.
    pub is_intersecting: bool,
    /// Latched on the first reveal when `once` is set, otherwise mirrors
    /// `is_intersecting`.
    pub has_triggered: bool,
    /// Visible fraction of the element from the latest notification.
    pub ratio: f64,
}

/// Reveals one element when it scrolls into view.
#[derive(Debug)]
pub struct VisibilityTrigger {
    element: ElementId,
    config: TriggerConfig,
    state: VisibilityState,
    observer: Option<ObserverToken>,
    pending: Option<TimerToken>,
    revealed_at: Option<f64>,
    torn_down: bool,
}

impl VisibilityTrigger {
    pub fn new(element: ElementId, config: TriggerConfig) -> Self {
        Self {
            element,
            config,
            state: VisibilityState::default(),
            observer: None,
            pending: None,
            revealed_at: None,
            torn_down: false,
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn state(&self) -> VisibilityState {
        self.state
    }

    pub fn revealed(&self) -> bool {
        self.state.revealed
    }

    pub fn ratio(&self) -> f64 {
        self.state.ratio
    }

    /// A delayed reveal is waiting on its timer.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Pose of the element at host time `now`.
    pub fn pose(&self, now: f64) -> Pose {
        let variant = self.config.variant;
        match self.revealed_at {
            Some(_) if !self.state.revealed => variant.hidden(),
            Some(start) if self.config.duration_ms > 0.0 => {
                variant.pose_at((now - start) / self.config.duration_ms)
            }
            Some(_) => variant.visible(),
            None => variant.hidden(),
        }
    }

    fn reveal(&mut self, now: f64) {
        if !self.state.revealed {
            debug!(element = ?self.element, "revealed");
            self.revealed_at = Some(now);
        }
        self.state.revealed = true;
        if self.config.once {
            self.state.has_triggered = true;
        }
    }

    fn fail_open(&mut self, now: f64) {
        self.state.revealed = true;
        self.state.has_triggered = true;
        self.state.is_intersecting = true;
        self.state.ratio = 1.0;
        self.revealed_at = Some(now);
    }

    fn on_entry(&mut self, entry: &IntersectionEntry, host: &mut dyn Host) {
        trace!(
            element = ?self.element,
            ratio = entry.ratio,
            is_intersecting = entry.is_intersecting,
            "visibility change"
        );
        self.state.ratio = entry.ratio;
        self.state.is_intersecting = entry.is_intersecting;
        if !self.config.once {
            self.state.has_triggered = entry.is_intersecting;
        }

        if entry.is_intersecting {
            if (self.config.once && self.state.has_triggered)
                || self.state.revealed
                || self.pending.is_some()
            {
                return;
            }

            if self.config.delay_ms > 0.0 {
                self.pending = Some(host.set_timeout(self.config.delay_ms));
            } else {
                self.reveal(host.now());
            }
        } else if !self.config.once {
            self.state.revealed = false;
            self.revealed_at = None;
            if let Some(token) = self.pending.take() {
                host.clear_timeout(token);
            }
        }
    }
}

impl Component for VisibilityTrigger {
    fn attach(&mut self, host: &mut dyn Host) {
        if self.torn_down || self.observer.is_some() {
            return;
        }

        if self.config.disabled {
            debug!(element = ?self.element, "reveal disabled, showing immediately");
            self.fail_open(host.now());
            return;
        }

        match host.observe(self.element, &self.config.observer_options()) {
            Ok(token) => self.observer = Some(token),
            Err(error) => {
                warn!(%error, element = ?self.element, "revealing without observation");
                self.fail_open(host.now());
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
            HostEvent::Timer { token } if Some(*token) == self.pending => {
                self.pending = None;
                self.reveal(host.now());
            }
            _ => {}
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.observer.take() {
            host.unobserve(token);
        }
        if let Some(token) = self.pending.take() {
            host.clear_timeout(token);
        }
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ElementRect;
    use crate::host::{SimulatedHost, dispatch};

    const ELEMENT: ElementId = ElementId(1);

    fn page() -> SimulatedHost {
        let mut host = SimulatedHost::simulated(1000.0, 1000.0);
        host.place(ELEMENT, ElementRect::new(0.0, 2000.0, 1000.0, 400.0));
        host
    }

    fn plain_config() -> TriggerConfig {
        TriggerConfig {
            root_margin: RootMargin::default(),
            ..TriggerConfig::default()
        }
    }

    fn run(host: &mut SimulatedHost, trigger: &mut VisibilityTrigger, deadline: f64) {
        host.run_until(deadline, &mut [trigger as &mut dyn Component]);
    }

    #[test]
    fn test_reveals_on_entry() {
        let mut host = page();
        let mut trigger = VisibilityTrigger::new(ELEMENT, plain_config());
        trigger.attach(&mut host);
        run(&mut host, &mut trigger, 0.0);
        assert!(!trigger.revealed());

        host.scroll_to(0.0, 1200.0);
        run(&mut host, &mut trigger, 10.0);
        let state = trigger.state();
        assert!(state.revealed);
        assert!(state.has_triggered);
        assert!((state.ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_once_latches() {
        let mut host = page();
        let mut trigger = VisibilityTrigger::new(ELEMENT, plain_config());
        trigger.attach(&mut host);
        host.scroll_to(0.0, 1500.0);
        run(&mut host, &mut trigger, 10.0);
        host.scroll_to(0.0, 0.0);
        run(&mut host, &mut trigger, 20.0);

        let state = trigger.state();
        assert!(state.revealed);
        assert!(state.has_triggered);
        assert!(!state.is_intersecting);
    }

    #[test]
    fn test_repeatable_mirrors_intersection() {
        let mut host = page();
        let mut trigger = VisibilityTrigger::new(ELEMENT, plain_config().with_once(false));
        trigger.attach(&mut host);
        host.scroll_to(0.0, 1500.0);
        run(&mut host, &mut trigger, 10.0);
        assert!(trigger.revealed());

        host.scroll_to(0.0, 0.0);
        run(&mut host, &mut trigger, 20.0);
        assert!(!trigger.revealed());
        assert!(!trigger.state().has_triggered);
    }

    #[test]
    fn test_leaving_cancels_pending_reveal() {
        let mut host = page();
        let config = plain_config().with_once(false).with_delay(300.0);
        let mut trigger = VisibilityTrigger::new(ELEMENT, config);
        trigger.attach(&mut host);

        host.scroll_to(0.0, 1500.0);
        run(&mut host, &mut trigger, 100.0);
        assert!(trigger.is_pending());

        host.scroll_to(0.0, 0.0);
        run(&mut host, &mut trigger, 1000.0);
        assert!(!trigger.revealed());
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_overdue_delay_reveals_before_exit() {
        let mut host = page();
        let config = plain_config().with_once(false).with_delay(100.0);
        let mut trigger = VisibilityTrigger::new(ELEMENT, config);
        host.scroll_to(0.0, 1500.0);
        trigger.attach(&mut host);
        run(&mut host, &mut trigger, 0.0);
        assert!(trigger.is_pending());

        host.advance_to(500.0);
        host.scroll_to(0.0, 0.0);

        let mut seen = Vec::new();
        while let Some(event) = host.next_event(500.0) {
            dispatch(&event, &mut host, &mut [&mut trigger as &mut dyn Component]);
            seen.push((event, trigger.revealed()));
        }

        assert!(matches!(seen[0], (HostEvent::Timer { .. }, true)));
        assert!(matches!(seen[1], (HostEvent::Scroll(_), true)));
        assert!(matches!(seen[2], (HostEvent::Intersection { .. }, false)));
        assert_eq!(seen.len(), 3);
        assert!(!trigger.is_pending());
    }

    #[test]
    fn test_no_second_timer_while_pending() {
        let mut host = page();
        let config = TriggerConfig {
            thresholds: Thresholds::list([0.1, 0.5, 0.9]),
            ..plain_config().with_delay(200.0)
        };
        let mut trigger = VisibilityTrigger::new(ELEMENT, config);
        trigger.attach(&mut host);

        host.scroll_to(0.0, 1100.0);
        run(&mut host, &mut trigger, 10.0);
        host.scroll_to(0.0, 1300.0);
        run(&mut host, &mut trigger, 20.0);
        assert_eq!(host.pending_timers(), 1);

        run(&mut host, &mut trigger, 210.0);
        assert!(trigger.revealed());
    }

    #[test]
    fn test_unavailable_observation_fails_open() {
        let mut host = page();
        host.set_visibility_supported(false);
        let mut trigger = VisibilityTrigger::new(ELEMENT, plain_config());
        trigger.attach(&mut host);
        assert!(trigger.revealed());
        assert_eq!(trigger.ratio(), 1.0);
    }

    #[test]
    fn test_disabled_reveals_without_observing() {
        let mut host = page();
        let config = TriggerConfig {
            disabled: true,
            ..plain_config()
        };
        let mut trigger = VisibilityTrigger::new(ELEMENT, config);
        trigger.attach(&mut host);
        assert!(trigger.revealed());
        assert_eq!(host.active_observers(), 0);
    }

    #[test]
    fn test_detach_releases_everything() {
        let mut host = page();
        let mut trigger = VisibilityTrigger::new(ELEMENT, plain_config().with_delay(500.0));
        trigger.attach(&mut host);
        host.scroll_to(0.0, 1500.0);
        run(&mut host, &mut trigger, 10.0);
        assert!(trigger.is_pending());

        trigger.detach(&mut host);
        assert_eq!(host.active_observers(), 0);
        assert_eq!(host.pending_timers(), 0);
        run(&mut host, &mut trigger, 1000.0);
        assert!(!trigger.revealed());
    }

    #[test]
    fn test_pose_follows_reveal() {
        let mut host = page();
        let config = TriggerConfig {
            variant: RevealVariant::SlideUp,
            ..plain_config()
        };
        let mut trigger = VisibilityTrigger::new(ELEMENT, config);
        trigger.attach(&mut host);
        assert_eq!(trigger.pose(0.0), RevealVariant::SlideUp.hidden());

        host.scroll_to(0.0, 1500.0);
        run(&mut host, &mut trigger, 0.0);
        assert!(trigger.revealed());
        let settled = trigger.pose(host.now() + 600.0);
        assert!(settled.y.abs() < 1e-6);
        assert!((settled.opacity - 1.0).abs() < 1e-6);
    }
}
