/// Limits applied while a program runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deepest chain of active function calls before the run fails with a
    /// semantic error.
    pub max_call_depth: usize,
}

impl Config {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
