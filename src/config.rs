//! Knobs for a fill attempt. None of these affect which assignments count as solutions; they
//! only change how much work the search does and when it gives up.

use instant::Duration;

/// How to propagate a tentative choice before recursing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Run AC-3 seeded with just the arcs pointing into the chosen slot (and into any slot that
    /// lost a candidate to the uniqueness rule).
    #[default]
    Incremental,
    /// Run AC-3 over every arc in the grid.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOptions {
    pub propagation: Propagation,

    /// When a word is chosen, remove it from every other open slot's domain right away instead of
    /// waiting for the validator to reject it.
    pub forward_check_uniqueness: bool,

    /// Give up after visiting this many search states. In a parallel search the limit covers all
    /// branches together.
    pub max_states: Option<u64>,

    /// Give up after this much wall-clock time.
    pub time_limit: Option<Duration>,
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions {
            propagation: Propagation::Incremental,
            forward_check_uniqueness: true,
            max_states: None,
            time_limit: None,
        }
    }
}

impl FillOptions {
    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_forward_check_uniqueness(mut self, enabled: bool) -> Self {
        self.forward_check_uniqueness = enabled;
        self
    }

    pub fn with_max_states(mut self, max_states: u64) -> Self {
        self.max_states = Some(max_states);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}
