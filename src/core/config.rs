//! Engine configuration.
//!
//! Limits that bound the work the engine does on behalf of a single host
//! call. Games pass an `EngineConfig` when building a flow engine or session;
//! the defaults suit boards with a few hundred elements.

use serde::{Deserialize, Serialize};

/// Engine limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum nodes visited by one selection-path search.
    /// When exhausted the search answers "available" and logs a warning.
    pub lookahead_budget: usize,

    /// Largest subset size tried when a multi-element selection feeds later
    /// selections or carries a custom check.
    pub max_subset_size: usize,

    /// Numeric ranges with at most this many values are offered as choices.
    /// Wider ranges are free input.
    pub max_enumerated_numbers: usize,

    /// Iteration cap for loops that declare none of their own.
    pub max_loop_iterations: u32,

    /// Node transitions allowed in one run without player input.
    pub max_flow_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead_budget: 10_000,
            max_subset_size: 3,
            max_enumerated_numbers: 100,
            max_loop_iterations: 10_000,
            max_flow_steps: 100_000,
        }
    }
}

impl EngineConfig {
    /// Set the lookahead budget.
    #[must_use]
    pub fn with_lookahead_budget(mut self, budget: usize) -> Self {
        self.lookahead_budget = budget;
        self
    }

    /// Set the largest subset size tried for multi-element selections.
    #[must_use]
    pub fn with_max_subset_size(mut self, size: usize) -> Self {
        self.max_subset_size = size;
        self
    }

    /// Set the widest numeric range offered as discrete choices.
    #[must_use]
    pub fn with_max_enumerated_numbers(mut self, count: usize) -> Self {
        self.max_enumerated_numbers = count;
        self
    }

    /// Set the default loop iteration cap.
    #[must_use]
    pub fn with_max_loop_iterations(mut self, iterations: u32) -> Self {
        self.max_loop_iterations = iterations;
        self
    }

    /// Set the node transition cap per run.
    #[must_use]
    pub fn with_max_flow_steps(mut self, steps: usize) -> Self {
        self.max_flow_steps = steps;
        self
    }
}
