use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::geometry::{RootMargin, Thresholds};
use crate::host::{
    Component, ElementId, Host, HostEvent, IntersectionEntry, ObserverOptions, ObserverToken,
};

/// Visibility threshold shared by every element of a [`SharedRevealObserver`].
pub const SHARED_THRESHOLD: f64 = 0.1;

/// Root margin shared by every element of a [`SharedRevealObserver`].
pub const SHARED_ROOT_MARGIN: &str = "0px 0px -10% 0px";

type RevealHandler = Box<dyn FnMut(&IntersectionEntry)>;

struct Registration {
    token: ObserverToken,
    handler: RevealHandler,
}

/// One page-wide observer that many elements register reveal handlers with.
///
/// Every element gets its own observation with the same fixed options, and
/// each entry is handed to the handler of the element it belongs to.
pub struct SharedRevealObserver {
    options: ObserverOptions,
    registrations: BTreeMap<ElementId, Registration>,
    torn_down: bool,
}

impl fmt::Debug for SharedRevealObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRevealObserver")
            .field("options", &self.options)
            .field("elements", &self.registrations.keys().collect::<Vec<_>>())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl Default for SharedRevealObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRevealObserver {
    pub fn new() -> Self {
        Self {
            options: ObserverOptions {
                thresholds: Thresholds::single(SHARED_THRESHOLD),
                root_margin: RootMargin::parse_or_zero(SHARED_ROOT_MARGIN),
            },
            registrations: BTreeMap::new(),
            torn_down: false,
        }
    }

    /// Start routing entries for `element` to `handler`.
    ///
    /// Observing an element again replaces its handler. Without visibility
    /// observation the handler runs once with a fully visible entry.
    pub fn observe<F>(&mut self, element: ElementId, host: &mut dyn Host, mut handler: F)
    where
        F: FnMut(&IntersectionEntry) + 'static,
    {
        if self.torn_down {
            debug!(?element, "shared observer detached, ignoring observe");
            return;
        }
        self.unobserve(element, host);

        match host.observe(element, &self.options) {
            Ok(token) => {
                let handler = Box::new(handler);
                self.registrations.insert(element, Registration { token, handler });
            }
            Err(error) => {
                warn!(%error, ?element, "revealing without observation");
                handler(&IntersectionEntry {
                    element,
                    ratio: 1.0,
                    is_intersecting: true,
                    time: host.now(),
                });
            }
        }
    }

    /// Stop observing `element`; entries already queued for it are dropped.
    pub fn unobserve(&mut self, element: ElementId, host: &mut dyn Host) {
        if let Some(registration) = self.registrations.remove(&element) {
            host.unobserve(registration.token);
        }
    }

    pub fn is_observing(&self, element: ElementId) -> bool {
        self.registrations.contains_key(&element)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }
}

impl Component for SharedRevealObserver {
    // Observations are registered per element through `observe`.
    fn attach(&mut self, _host: &mut dyn Host) {}

    fn handle(&mut self, event: &HostEvent, _host: &mut dyn Host) {
        if self.torn_down {
            return;
        }

        if let HostEvent::Intersection { observer, entry } = event {
            let registration = self
                .registrations
                .get_mut(&entry.element)
                .filter(|registration| registration.token == *observer);
            if let Some(registration) = registration {
                (registration.handler)(entry);
            }
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        for (_, registration) in std::mem::take(&mut self.registrations) {
            host.unobserve(registration.token);
        }
        self.torn_down = true;
    }
}
