use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to the curation set when a job completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultPolicy {
    /// Append the new batch after the items already in the set.
    #[default]
    Accumulate,
    /// Clear the set before seeding, so only the latest batch is shown.
    Replace,
}

/// Configuration for a [`GenerationSession`](crate::GenerationSession).
///
/// Use [`SessionConfig::builder()`] for ergonomic construction, or
/// [`SessionConfig::default()`] for the console defaults (10% every 500ms,
/// at most 50 items per request).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between two progress ticks of a running job.
    pub tick_interval: Duration,

    /// Percentage points added per tick (1..=100).
    pub progress_step: u8,

    /// Largest `count` a single request may ask for.
    pub max_count: u32,

    /// Whether completed batches accumulate or replace the curation set.
    pub result_policy: ResultPolicy,

    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            progress_step: 10,
            max_count: 50,
            result_policy: ResultPolicy::Accumulate,
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the delay between progress ticks.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Set the percentage points added per tick.
    pub fn with_progress_step(mut self, step: u8) -> Self {
        self.config.progress_step = step;
        self
    }

    /// Set the maximum number of items a single request may ask for.
    pub fn with_max_count(mut self, max: u32) -> Self {
        self.config.max_count = max;
        self
    }

    /// Choose whether completed batches accumulate or replace.
    pub fn with_result_policy(mut self, policy: ResultPolicy) -> Self {
        self.config.result_policy = policy;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Build the final [`SessionConfig`].
    ///
    /// A zero step would never finish a job and a zero maximum would reject
    /// every request, so both are raised to 1.
    pub fn build(mut self) -> SessionConfig {
        self.config.progress_step = self.config.progress_step.clamp(1, 100);
        self.config.max_count = self.config.max_count.max(1);
        self.config.event_capacity = self.config.event_capacity.max(1);
        self.config
    }
}
