//! Configuration for the pass pipeline and the dump parser.
//!
//! This module provides plain configuration structs with sensible defaults, named presets
//! and `with_*` builder methods.

/// Configuration for the pass pipeline.
///
/// Controls iteration limits, parallelism across methods and which of the built-in passes
/// are scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of fixpoint iterations per method (default: 8).
    pub max_iterations: usize,

    /// Distribute independent methods over the rayon thread pool (default: true).
    pub parallel: bool,

    /// Enable dead code elimination pass.
    pub enable_dead_code_elimination: bool,

    /// Enable copy propagation pass.
    pub enable_copy_propagation: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            parallel: true,
            enable_dead_code_elimination: true,
            enable_copy_propagation: true,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default settings.
    ///
    /// # Returns
    ///
    /// A new `PipelineConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that runs a single sequential iteration.
    ///
    /// Useful for tests and for tools that want deterministic event ordering across methods.
    #[must_use]
    pub fn single_pass() -> Self {
        Self {
            max_iterations: 1,
            parallel: false,
            ..Self::default()
        }
    }

    /// Creates a configuration with every pass disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enable_dead_code_elimination: false,
            enable_copy_propagation: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of fixpoint iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enables or disables parallel processing of methods.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables dead code elimination.
    #[must_use]
    pub fn with_dead_code_elimination(mut self, enabled: bool) -> Self {
        self.enable_dead_code_elimination = enabled;
        self
    }

    /// Enables or disables copy propagation.
    #[must_use]
    pub fn with_copy_propagation(mut self, enabled: bool) -> Self {
        self.enable_copy_propagation = enabled;
        self
    }

    /// Returns true if any pass is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.enable_dead_code_elimination || self.enable_copy_propagation
    }
}

/// Configuration for the XML dump parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Abort on the first per-node error instead of dropping the node (default: false).
    pub strict: bool,
}

impl ParserConfig {
    /// Creates a lenient parser configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that fails on the first malformed node or dangling reference.
    #[must_use]
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_iterations, 8);
        assert!(config.parallel);
        assert!(config.any_enabled());

        assert!(!PipelineConfig::disabled().any_enabled());
        assert!(!PipelineConfig::single_pass().parallel);

        let config = PipelineConfig::new()
            .with_max_iterations(3)
            .with_copy_propagation(false);
        assert_eq!(config.max_iterations, 3);
        assert!(!config.enable_copy_propagation);
        assert!(config.enable_dead_code_elimination);

        assert!(ParserConfig::strict().strict);
        assert!(!ParserConfig::default().strict);
    }
}
