use tracing::{debug, trace, warn};

use crate::geometry::{ElementRect, ScrollFrame, Thresholds};
use crate::host::{
    Component, ElementId, FrameToken, Host, HostEvent, ObserverOptions, ObserverToken, TimerToken,
};

use super::{
    ParallaxConfig, Translation, WillChange, raw_offset, scroll_progress, shape_offset,
};

/// Offset of one named layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutput {
    pub id: String,
    pub z_index: Option<i32>,
    pub offset: f64,
    pub transform: Translation,
}

/// Everything a [`ParallaxOffset`] reports for the current scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxOutput {
    pub transform: Translation,
    pub progress: f64,
    pub offset: f64,
    pub is_active: bool,
    pub layers: Vec<LayerOutput>,
}

/// Leading-edge throttle with one trailing run.
#[derive(Debug, Default)]
struct Throttle {
    timer: Option<TimerToken>,
    trailing: bool,
}

impl Throttle {
    /// Returns true when the caller should act now.
    fn hit(&mut self, host: &mut dyn Host, interval_ms: f64) -> bool {
        if interval_ms <= 0.0 {
            return true;
        }
        if self.timer.is_some() {
            self.trailing = true;
            return false;
        }
        self.timer = Some(host.set_timeout(interval_ms));
        true
    }

    /// Handles the throttle's own timer. Returns true when a trailing run is due.
    fn expire(&mut self, token: TimerToken, host: &mut dyn Host, interval_ms: f64) -> bool {
        if self.timer != Some(token) {
            return false;
        }
        self.timer = None;
        if !self.trailing {
            return false;
        }
        self.trailing = false;
        self.hit(host, interval_ms)
    }

    fn owns(&self, token: TimerToken) -> bool {
        self.timer == Some(token)
    }

    fn cancel(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.timer.take() {
            host.clear_timeout(token);
        }
        self.trailing = false;
    }
}

/// Moves one element (and its layers) with the scroll position.
#[derive(Debug)]
pub struct ParallaxOffset {
    element: ElementId,
    config: ParallaxConfig,
    rect: Option<ElementRect>,
    frame: ScrollFrame,
    in_view: bool,
    observer: Option<ObserverToken>,
    pending_frame: Option<FrameToken>,
    scroll_throttle: Throttle,
    resize_throttle: Throttle,
    torn_down: bool,
}

impl ParallaxOffset {
    pub fn new(element: ElementId, config: ParallaxConfig) -> Self {
        Self {
            element,
            config,
            rect: None,
            frame: ScrollFrame::default(),
            in_view: false,
            observer: None,
            pending_frame: None,
            scroll_throttle: Throttle::default(),
            resize_throttle: Throttle::default(),
            torn_down: false,
        }
    }

    pub fn config(&self) -> &ParallaxConfig {
        &self.config
    }

    /// The element is in view and the effect is enabled.
    pub fn is_active(&self) -> bool {
        self.in_view && !self.config.disabled && !self.torn_down
    }

    /// Scroll snapshot the current output was computed from.
    pub fn scroll_frame(&self) -> ScrollFrame {
        self.frame
    }

    pub fn progress(&self) -> f64 {
        self.rect.map_or(0.0, |rect| {
            scroll_progress(self.config.direction, &rect, &self.frame)
        })
    }

    /// Offset of the element itself.
    pub fn offset(&self) -> f64 {
        self.offset_for(self.config.speed.resolve(self.frame.breakpoint()))
    }

    fn offset_for(&self, speed: f64) -> f64 {
        let Some(rect) = self.rect.filter(|_| self.is_active()) else {
            return 0.0;
        };
        let raw = raw_offset(self.config.direction, &rect, &self.frame, speed);
        shape_offset(raw, &self.config.easing, self.config.bias, self.config.bounds.as_ref())
    }

    fn translation(&self, offset: f64) -> Translation {
        if self.is_active() {
            Translation::along(self.config.direction, offset)
        } else {
            Translation::IDENTITY
        }
    }

    pub fn transform(&self) -> Translation {
        self.translation(self.offset())
    }

    pub fn layers(&self) -> Vec<LayerOutput> {
        let breakpoint = self.frame.breakpoint();
        self.config
            .layers
            .iter()
            .map(|layer| {
                let shaped = self.offset_for(layer.speed.resolve(breakpoint));
                let offset = layer.bounds.map_or(shaped, |bounds| bounds.apply(shaped));
                LayerOutput {
                    id: layer.id.clone(),
                    z_index: layer.z_index,
                    offset,
                    transform: self.translation(offset),
                }
            })
            .collect()
    }

    pub fn output(&self) -> ParallaxOutput {
        let offset = self.offset();
        ParallaxOutput {
            transform: self.translation(offset),
            progress: self.progress(),
            offset,
            is_active: self.is_active(),
            layers: self.layers(),
        }
    }

    /// Compositor hint: `transform` while active, `auto` otherwise.
    pub fn will_change(&self) -> WillChange {
        if self.is_active() {
            WillChange::Transform
        } else {
            WillChange::Auto
        }
    }

    /// `--parallax-*` custom properties, empty unless enabled.
    pub fn custom_properties(&self) -> Vec<(String, String)> {
        if !self.config.css_custom_properties {
            return Vec::new();
        }

        let mut properties = vec![
            ("--parallax-offset".to_string(), format!("{}px", self.offset() + 0.0)),
            ("--parallax-progress".to_string(), self.progress().to_string()),
        ];
        properties.extend(self.layers().into_iter().map(|layer| {
            (
                format!("--parallax-{}-offset", layer.id),
                format!("{}px", layer.offset + 0.0),
            )
        }));
        properties
    }

    fn refresh_bounds(&mut self, host: &dyn Host) {
        self.rect = host.element_rect(self.element);
        self.frame = host.scroll_frame();
        if self.rect.is_none() {
            debug!(element = ?self.element, "parallax element has no layout");
        }
    }

    fn schedule_recompute(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.pending_frame.take() {
            host.cancel_frame(token);
        }
        self.pending_frame = Some(host.request_frame());
    }
}

impl Component for ParallaxOffset {
    fn attach(&mut self, host: &mut dyn Host) {
        if self.torn_down || self.observer.is_some() {
            return;
        }
        self.refresh_bounds(host);

        let options = ObserverOptions {
            thresholds: Thresholds::single(0.0),
            root_margin: self.config.root_margin,
        };
        match host.observe(self.element, &options) {
            Ok(token) => self.observer = Some(token),
            Err(error) => {
                warn!(
                    %error,
                    element = ?self.element,
                    "treating parallax element as always in view"
                );
                self.in_view = true;
            }
        }
    }

    fn handle(&mut self, event: &HostEvent, host: &mut dyn Host) {
        if self.torn_down {
            return;
        }

        match event {
            HostEvent::Intersection { observer, entry } if Some(*observer) == self.observer => {
                self.in_view = entry.is_intersecting;
                debug!(element = ?self.element, active = self.is_active(), "parallax visibility");
            }
            HostEvent::Scroll(_) => {
                if self.scroll_throttle.hit(host, self.config.throttle_ms) {
                    self.schedule_recompute(host);
                }
            }
            HostEvent::Resize(_) => {
                if self.resize_throttle.hit(host, self.config.resize_throttle_ms) {
                    self.refresh_bounds(host);
                }
            }
            HostEvent::Frame { token, .. } if Some(*token) == self.pending_frame => {
                self.pending_frame = None;
                self.frame = host.scroll_frame();
                trace!(
                    element = ?self.element,
                    offset = self.offset(),
                    progress = self.progress(),
                    "parallax recompute"
                );
            }
            HostEvent::Timer { token } if self.scroll_throttle.owns(*token) => {
                if self.scroll_throttle.expire(*token, host, self.config.throttle_ms) {
                    self.schedule_recompute(host);
                }
            }
            HostEvent::Timer { token } if self.resize_throttle.owns(*token) => {
                if self.resize_throttle.expire(*token, host, self.config.resize_throttle_ms) {
                    self.refresh_bounds(host);
                }
            }
            _ => {}
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        if let Some(token) = self.observer.take() {
            host.unobserve(token);
        }
        if let Some(token) = self.pending_frame.take() {
            host.cancel_frame(token);
        }
        self.scroll_throttle.cancel(host);
        self.resize_throttle.cancel(host);
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;
    use crate::parallax::{Bounds, ParallaxLayer};

    const HERO: ElementId = ElementId(1);
    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn page() -> SimulatedHost {
        let mut host = SimulatedHost::simulated(1280.0, 800.0);
        host.place(HERO, ElementRect::new(0.0, 600.0, 1280.0, 400.0));
        host
    }

    fn pump(host: &mut SimulatedHost, parallax: &mut ParallaxOffset, deadline: f64) {
        host.run_until(deadline, &mut [parallax as &mut dyn Component]);
    }

    #[test]
    fn test_offset_follows_scroll() {
        let mut host = page();
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);
        assert!(parallax.is_active());

        // Viewport centre 400, element centre 800.
        assert!(approx_eq(parallax.offset(), -200.0));
        assert_eq!(parallax.will_change(), WillChange::Transform);

        host.scroll_to(0.0, 400.0);
        pump(&mut host, &mut parallax, 20.0);
        assert!(approx_eq(parallax.offset(), 0.0));
        assert!(approx_eq(parallax.progress(), 0.5));
    }

    #[test]
    fn test_inactive_outside_view() {
        let mut host = page();
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        host.scroll_to(0.0, 3000.0);
        pump(&mut host, &mut parallax, 20.0);

        assert!(!parallax.is_active());
        assert_eq!(parallax.offset(), 0.0);
        assert_eq!(parallax.transform(), Translation::IDENTITY);
        assert_eq!(parallax.will_change(), WillChange::Auto);
        assert_eq!(parallax.progress(), 1.0);
    }

    #[test]
    fn test_disabled_never_moves() {
        let mut host = page();
        let config = ParallaxConfig {
            disabled: true,
            ..ParallaxConfig::default()
        };
        let mut parallax = ParallaxOffset::new(HERO, config);
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);
        assert!(!parallax.is_active());
        assert_eq!(parallax.offset(), 0.0);
    }

    #[test]
    fn test_scroll_burst_coalesces() {
        let mut host = page();
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);

        host.scroll_to(0.0, 100.0);
        host.scroll_to(0.0, 200.0);
        host.scroll_to(0.0, 300.0);
        // Deliver the three scroll notifications only.
        for _ in 0..3 {
            let event = host.next_event(0.0).unwrap();
            parallax.handle(&event, &mut host);
        }
        assert_eq!(host.pending_frames(), 1);
        assert_eq!(host.pending_timers(), 1);

        // The leading frame and the trailing run both land on the final position.
        pump(&mut host, &mut parallax, 100.0);
        assert_eq!(parallax.scroll_frame().scroll_y, 300.0);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn test_layers_apply_global_then_own_bounds() {
        let mut host = page();
        let config = ParallaxConfig::default()
            .with_bounds(Bounds::new(-150.0, 150.0))
            .with_layer(ParallaxLayer::new("back", 0.2).with_z_index(-1))
            .with_layer(ParallaxLayer::new("front", 1.0).with_bounds(Bounds::new(-50.0, 50.0)));
        let mut parallax = ParallaxOffset::new(HERO, config);
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);

        let output = parallax.output();
        assert_eq!(output.offset, -150.0);
        assert!(approx_eq(output.layers[0].offset, -80.0));
        assert_eq!(output.layers[0].z_index, Some(-1));
        assert_eq!(output.layers[1].offset, -50.0);
        assert_eq!(output.layers[1].transform.to_string(), "translate3d(0px, -50px, 0)");
    }

    #[test]
    fn test_custom_properties() {
        let mut host = page();
        let config = ParallaxConfig {
            css_custom_properties: true,
            ..ParallaxConfig::default().with_layer(ParallaxLayer::new("glow", 0.25))
        };
        let mut parallax = ParallaxOffset::new(HERO, config);
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);

        let properties = parallax.custom_properties();
        assert_eq!(properties[0], ("--parallax-offset".to_string(), "-200px".to_string()));
        assert_eq!(properties[1].0, "--parallax-progress");
        assert_eq!(properties[2], ("--parallax-glow-offset".to_string(), "-100px".to_string()));
    }

    #[test]
    fn test_resize_rereads_bounds() {
        let mut host = page();
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        pump(&mut host, &mut parallax, 0.0);

        host.place(HERO, ElementRect::new(0.0, 800.0, 1280.0, 400.0));
        host.resize(1280.0, 1000.0);
        pump(&mut host, &mut parallax, 10.0);
        // Viewport centre 500, element centre 1000.
        assert!(approx_eq(parallax.offset(), -250.0));
    }

    #[test]
    fn test_unavailable_observation_fails_open() {
        let mut host = page();
        host.set_visibility_supported(false);
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        assert!(parallax.is_active());
    }

    #[test]
    fn test_detach_cancels_scheduled_work() {
        let mut host = page();
        let mut parallax = ParallaxOffset::new(HERO, ParallaxConfig::default());
        parallax.attach(&mut host);
        host.scroll_to(0.0, 100.0);
        let event = host.next_event(0.0).unwrap();
        parallax.handle(&event, &mut host);
        assert_eq!(host.pending_frames(), 1);

        parallax.detach(&mut host);
        assert_eq!(host.pending_frames(), 0);
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(host.active_observers(), 0);
        assert!(!parallax.is_active());
    }
}
