//! Geometric visibility observation.
//!
//! Mirrors what a browser's intersection observer reports: the root is the
//! viewport adjusted by the root margin, the ratio is the visible share of
//! the element's area, and an entry is only produced when the element
//! crosses one of its thresholds or starts/stops intersecting.

use crate::geometry::{ElementRect, ScrollFrame};

use super::{ElementId, ObserverOptions};

/// One visibility notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    /// Visible fraction of the element's area, in `[0, 1]`.
    pub ratio: f64,
    /// The element touches the root and meets the smallest threshold.
    pub is_intersecting: bool,
    /// Host time the change was detected.
    pub time: f64,
}

/// Visible fraction of `element` inside `root`, or `None` when they are apart.
///
/// Zero-area elements count as fully visible while they touch the root.
pub fn intersection_ratio(element: &ElementRect, root: &ElementRect) -> Option<f64> {
    let overlap = element.intersection(root)?;
    let area = element.area();

    if area <= 0.0 || root.contains(element) {
        return Some(1.0);
    }
    Some((overlap.area() / area).clamp(0.0, 1.0))
}

/// Per-observer bookkeeping kept by the runtime.
#[derive(Debug, Clone)]
pub(crate) struct Observation {
    pub(crate) element: ElementId,
    options: ObserverOptions,
    last: Option<(usize, bool)>,
}

impl Observation {
    pub(crate) fn new(element: ElementId, options: ObserverOptions) -> Self {
        Self {
            element,
            options,
            last: None,
        }
    }

    fn measure(&self, rect: Option<ElementRect>, frame: &ScrollFrame) -> (f64, bool, usize) {
        let root = self.options.root_margin.apply(frame.viewport());
        let Some(ratio) = rect.and_then(|rect| intersection_ratio(&rect, &root)) else {
            return (0.0, false, 0);
        };

        let thresholds = &self.options.thresholds;
        let is_intersecting = ratio >= thresholds.smallest();
        (ratio, is_intersecting, thresholds.crossed(ratio))
    }

    /// Recompute against the current layout, returning an entry if the
    /// crossing state changed (always on the first call).
    pub(crate) fn update(
        &mut self,
        rect: Option<ElementRect>,
        frame: &ScrollFrame,
        time: f64,
    ) -> Option<IntersectionEntry> {
        let (ratio, is_intersecting, crossed) = self.measure(rect, frame);
        let state = (crossed, is_intersecting);

        if self.last == Some(state) {
            return None;
        }
        self.last = Some(state);

        Some(IntersectionEntry {
            element: self.element,
            ratio,
            is_intersecting,
            time,
        })
    }
}
