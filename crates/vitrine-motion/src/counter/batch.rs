use serde::{Deserialize, Serialize};
use tracing::debug;
use vitrine_config::VitrineConfig;

use crate::events::CounterEvent;
use crate::host::{Component, ElementId, Host, HostEvent};

use super::{CounterConfig, NumericRamp};

/// Extra start delay per index in sequential mode.
pub const DEFAULT_SEQUENTIAL_INCREMENT_MS: f64 = 500.0;

/// How a batch staggers its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Every counter starts with its own delay.
    #[default]
    Parallel,
    /// Counter `i` waits an extra `i * increment` on top of its own delay.
    Sequential,
}

/// Several counters controlled together.
#[derive(Debug)]
pub struct RampBatch {
    mode: BatchMode,
    counters: Vec<NumericRamp>,
}

impl RampBatch {
    pub fn new(
        mode: BatchMode,
        counters: impl IntoIterator<Item = (ElementId, CounterConfig)>,
        increment_ms: f64,
    ) -> Self {
        let counters = counters
            .into_iter()
            .enumerate()
            .map(|(index, (element, mut config))| {
                if mode == BatchMode::Sequential {
                    config.delay_ms += index as f64 * increment_ms.max(0.0);
                }
                NumericRamp::new(element, config)
            })
            .collect();

        Self { mode, counters }
    }

    /// Batch using the configured sequential increment.
    pub fn from_config(
        mode: BatchMode,
        counters: impl IntoIterator<Item = (ElementId, CounterConfig)>,
        config: &VitrineConfig,
    ) -> Self {
        Self::new(mode, counters, config.counter.sequential_delay_ms)
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn counters(&self) -> &[NumericRamp] {
        &self.counters
    }

    pub fn counter(&self, index: usize) -> Option<&NumericRamp> {
        self.counters.get(index)
    }

    pub fn start_all(&mut self, host: &mut dyn Host) {
        debug!(count = self.counters.len(), mode = ?self.mode, "starting counter batch");
        for counter in &mut self.counters {
            counter.start(host);
        }
    }

    pub fn pause_all(&mut self, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.pause(host);
        }
    }

    pub fn resume_all(&mut self, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.resume(host);
        }
    }

    pub fn reset_all(&mut self, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.reset(host);
        }
    }

    /// Every counter has run to its end value. True for an empty batch.
    pub fn all_completed(&self) -> bool {
        self.counters.iter().all(NumericRamp::is_complete)
    }

    pub fn any_animating(&self) -> bool {
        self.counters.iter().any(NumericRamp::is_animating)
    }

    /// Drain every counter's events, tagged with the counter's index.
    pub fn drain_events(&mut self) -> Vec<(usize, CounterEvent)> {
        self.counters
            .iter_mut()
            .enumerate()
            .flat_map(|(index, counter)| {
                counter
                    .drain_events()
                    .map(|event| (index, event))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl Component for RampBatch {
    fn attach(&mut self, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.attach(host);
        }
    }

    fn handle(&mut self, event: &HostEvent, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.handle(event, host);
        }
    }

    fn detach(&mut self, host: &mut dyn Host) {
        for counter in &mut self.counters {
            counter.detach(host);
        }
    }
}
