use tracing::{debug, warn};
use vitrine_config::VitrineConfig;

use crate::host::{Component, ElementId, Host, HostEvent, ObserverToken, TimerToken};

use super::trigger::TriggerConfig;

/// Reveals the items of a container one after another.
///
/// The container is observed once; on its first intersecting notification
/// item `i` becomes visible `i * stagger_ms` later.
#[derive(Debug)]
pub struct StaggeredReveal {
    container: ElementId,
    config: TriggerConfig,
    stagger_ms: f64,
    visible: Vec<bool>,
    in_view: bool,
    observer: Option<ObserverToken>,
    timers: Vec<(TimerToken, usize)>,
    torn_down: bool,
}

impl StaggeredReveal {
    pub fn new(
        container: ElementId,
        item_count: usize,
        config: TriggerConfig,
        stagger_ms: f64,
    ) -> Self {
        Self {
            container,
            config,
            stagger_ms: stagger_ms.max(0.0),
            visible: vec![false; item_count],
            in_view: false,
            observer: None,
            timers: Vec::new(),
            torn_down: false,
        }
    }

    /// Reveal settings and stagger interval from the `[reveal]` section.
    pub fn from_config(container: ElementId, item_count: usize, config: &VitrineConfig) -> Self {
        Self::new(
            container,
            item_count,
            TriggerConfig::from_config(config),
            config.reveal.stagger_ms,
        )
    }

    /// The container has entered view at least once.
    pub fn in_view(&self) -> bool {
        self.in_view
    }

    pub fn item_count(&self) -> usize {
        self.visible.len()
    }

    pub fn is_item_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    /// Transition delay for child `index`.
    pub fn stagger_delay(&self, index: usize) -> f64 {
        index as f64 * self.stagger_ms
    }

    fn show_all(&mut self) {
        self.in_view = true;
        self.visible.fill(true);
    }

    fn start(&mut self, host: &mut dyn Host) {
        self.in_view = true;
        debug!(container = ?self.container, items = self.visible.len(), "staggering items");

        for index in 0..self.visible.len() {
            let delay = self.config.delay_ms + self.stagger_delay(index);
            if delay <= 0.0 {
                self.visible[index] = true;
            } else {
                self.timers.push((host.set_timeout(delay), index));
            }
        }

        if let Some(token) = self.observer.take() {
            host.unobserve(token);
        }
    }
}

impl Component for StaggeredReveal {
    fn attach(&mut self, host: &mut dyn Host) {
        if self.torn_down || self.observer.is_some() || self.in_view {
            return;
        }

        if self.config.disabled {
            self.show_all();
            return;
        }

        match host.observe(self.container, &self.config.observer_options()) {
            Ok(token) => self.observer = Some(token),
            Err(error) => {
                warn!(%error, container = ?self.container, "showing all items without observation");
                self.show_all();
            }
        }
    }

    fn handle(&mut self, event: &HostEvent, host: &mut dyn Host) {
        if self.torn_down {
            return;
        }

        match event {
            HostEvent::Intersection { observer, entry }
                if Some(*observer) == self.observer && entry.is_intersecting && !self.in_view =>
            {
                self.start(host);
            }
            HostEvent::Timer { token } => {
                if let Some(position) = self.timers.iter().position(|(t, _)| t == token) {
                    let (_, index) = self.timers.swap_remove(position);
                    self.visible[index] = true;
                }
            }
            _ => {}
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.observer.take() {
            host.unobserve(token);
        }
        for (token, _) in self.timers.drain(..) {
            host.clear_timeout(token);
        }
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ElementRect, RootMargin};
    use crate::host::SimulatedHost;

    const CONTAINER: ElementId = ElementId(10);

    fn setup(items: usize) -> (SimulatedHost, StaggeredReveal) {
        let mut host = SimulatedHost::simulated(1000.0, 800.0);
        host.place(CONTAINER, ElementRect::new(0.0, 1000.0, 1000.0, 600.0));
        let config = TriggerConfig {
            root_margin: RootMargin::default(),
            ..TriggerConfig::default()
        };
        let mut reveal = StaggeredReveal::new(CONTAINER, items, config, 100.0);
        reveal.attach(&mut host);
        (host, reveal)
    }

    #[test]
    fn test_items_appear_in_order() {
        let (mut host, mut reveal) = setup(3);
        host.run_until(0.0, &mut [&mut reveal as &mut dyn Component]);
        assert!(!reveal.in_view());

        host.scroll_to(0.0, 600.0);
        host.run_until(0.0, &mut [&mut reveal as &mut dyn Component]);
        assert!(reveal.in_view());
        assert!(reveal.is_item_visible(0));
        assert!(!reveal.is_item_visible(1));

        host.run_until(150.0, &mut [&mut reveal as &mut dyn Component]);
        assert_eq!(reveal.visible_count(), 2);
        host.run_until(200.0, &mut [&mut reveal as &mut dyn Component]);
        assert_eq!(reveal.visible_count(), 3);
        assert_eq!(host.active_observers(), 0);
    }

    #[test]
    fn test_stagger_delay_per_index() {
        let (_, reveal) = setup(4);
        assert_eq!(reveal.stagger_delay(0), 0.0);
        assert_eq!(reveal.stagger_delay(3), 300.0);
        assert!(!reveal.is_item_visible(10));
    }

    #[test]
    fn test_detach_cancels_remaining_items() {
        let (mut host, mut reveal) = setup(5);
        host.scroll_to(0.0, 600.0);
        host.run_until(120.0, &mut [&mut reveal as &mut dyn Component]);
        assert_eq!(reveal.visible_count(), 2);

        reveal.detach(&mut host);
        assert_eq!(host.pending_timers(), 0);
        host.run_until(1000.0, &mut [&mut reveal as &mut dyn Component]);
        assert_eq!(reveal.visible_count(), 2);
    }

    #[test]
    fn test_unavailable_observation_shows_everything() {
        let mut host = SimulatedHost::simulated(1000.0, 800.0);
        host.set_visibility_supported(false);
        let mut reveal = StaggeredReveal::new(CONTAINER, 3, TriggerConfig::default(), 100.0);
        reveal.attach(&mut host);
        assert_eq!(reveal.visible_count(), 3);
    }
}
