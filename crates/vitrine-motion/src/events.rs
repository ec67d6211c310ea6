//! Counter lifecycle events.
//!
//! A [`NumericRamp`](crate::counter::NumericRamp) pushes events into its
//! [`EventQueue`] as it runs; the owner drains them after each batch of host
//! events to update the display or chain the next animation.
//!
//! Consecutive [`CounterEvent::Updated`] events collapse into the latest one,
//! so an undrained queue grows with lifecycle transitions only, not with
//! frames.
//!
//! # Usage
//!
//! ```
//! use vitrine_motion::events::{CounterEvent, EventQueue};
//!
//! let mut queue = EventQueue::new();
//! queue.push(CounterEvent::Started);
//! queue.push(CounterEvent::Updated { value: 4.0 });
//! queue.push(CounterEvent::Updated { value: 9.0 });
//! queue.push(CounterEvent::Completed);
//! assert_eq!(queue.len(), 3);
//!
//! let completed = queue.drain().filter(CounterEvent::is_completed).count();
//! assert_eq!(completed, 1);
//! assert!(queue.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Event emitted when a counter changes state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CounterEvent {
    /// The first frame of a run was scheduled.
    Started,
    /// A frame produced a new displayed value.
    Updated {
        /// Value after step snapping.
        value: f64,
    },
    /// The counter was paused mid-run.
    Paused,
    /// A paused counter picked up again.
    Resumed,
    /// The counter reached its end value.
    Completed,
    /// The counter was reset before completing.
    Cancelled,
}

impl CounterEvent {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Value carried by an update, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Updated { value } => Some(*value),
            _ => None,
        }
    }
}

/// Queue for collecting counter events between drains.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<CounterEvent>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event`, replacing a trailing update when `event` is an update.
    pub fn push(&mut self, event: CounterEvent) {
        if event.value().is_some() {
            if let Some(last) = self.events.back_mut().filter(|last| last.value().is_some()) {
                *last = event;
                return;
            }
        }
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Pop the next event from the queue.
    pub fn pop(&mut self) -> Option<CounterEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, returning an iterator.
    pub fn drain(&mut self) -> impl Iterator<Item = CounterEvent> + '_ {
        self.events.drain(..)
    }

    pub fn peek(&self) -> Option<&CounterEvent> {
        self.events.front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_predicates() {
        assert!(CounterEvent::Started.is_started());
        assert!(!CounterEvent::Started.is_completed());
        assert!(CounterEvent::Completed.is_completed());
        assert_eq!(CounterEvent::Updated { value: 3.5 }.value(), Some(3.5));
        assert_eq!(CounterEvent::Paused.value(), None);
    }

    #[test]
    fn test_event_queue_operations() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());

        queue.push(CounterEvent::Started);
        queue.push(CounterEvent::Updated { value: 1.0 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek(), Some(&CounterEvent::Started));

        assert_eq!(queue.pop(), Some(CounterEvent::Started));
        assert_eq!(queue.pop(), Some(CounterEvent::Updated { value: 1.0 }));
        assert!(queue.pop().is_none());

        queue.push(CounterEvent::Completed);
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_consecutive_updates_collapse() {
        let mut queue = EventQueue::new();
        queue.push(CounterEvent::Started);
        for frame in 1..=1000 {
            queue.push(CounterEvent::Updated {
                value: frame as f64,
            });
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(CounterEvent::Started));
        assert_eq!(queue.pop(), Some(CounterEvent::Updated { value: 1000.0 }));

        queue.push(CounterEvent::Updated { value: 1.0 });
        queue.push(CounterEvent::Paused);
        queue.push(CounterEvent::Updated { value: 2.0 });
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(
            events,
            vec![
                CounterEvent::Updated { value: 1.0 },
                CounterEvent::Paused,
                CounterEvent::Updated { value: 2.0 },
            ]
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = CounterEvent::Updated { value: 12.0 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("updated"));

        let parsed: CounterEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
