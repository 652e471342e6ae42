//! Pass scheduler for orchestrating IR pass execution.
//!
//! The `PassScheduler` runs an ordered list of passes over each method until no pass reports
//! a change or the iteration limit is hit. Methods are independent of each other, so with
//! [`PipelineConfig::parallel`] set they are processed on the rayon thread pool.

use rayon::prelude::*;

use crate::{
    compiler::{passes::CopyPropagationPass, passes::DeadCodeEliminationPass, EventLog, IrPass},
    ir::Method,
    PipelineConfig, Result,
};

/// Orchestrates pass execution over a set of methods.
pub struct PassScheduler {
    config: PipelineConfig,
    passes: Vec<Box<dyn IrPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl PassScheduler {
    /// Creates a scheduler with the built-in passes the configuration enables.
    ///
    /// Copy propagation runs before dead code elimination so that the copies it bypasses are
    /// removed in the same iteration.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        let mut scheduler = Self::empty(config);
        if config.enable_copy_propagation {
            scheduler.add_pass(Box::new(CopyPropagationPass::new()));
        }
        if config.enable_dead_code_elimination {
            scheduler.add_pass(Box::new(DeadCodeEliminationPass::new()));
        }
        scheduler
    }

    /// Creates a scheduler without any passes.
    #[must_use]
    pub fn empty(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
            passes: Vec::new(),
        }
    }

    /// Appends a pass to the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn IrPass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Returns the names of the scheduled passes, in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass once over one method.
    fn run_passes_once(&self, method: &mut Method, events: &mut EventLog) -> Result<bool> {
        let mut changed = false;
        for pass in &self.passes {
            if pass.run_on_method(method, events)? {
                log::trace!("{} changed {}", pass.name(), method.name());
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Runs the pipeline on one method until it is stable.
    ///
    /// # Returns
    ///
    /// The number of iterations performed.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails.
    pub fn run_method(&self, method: &mut Method, events: &mut EventLog) -> Result<usize> {
        let mut iterations = 0;
        for iteration in 0..self.config.max_iterations {
            iterations = iteration + 1;
            if !self.run_passes_once(method, events)? {
                break;
            }
        }
        Ok(iterations)
    }

    /// Runs the pipeline on every method.
    ///
    /// Events of all methods are appended to `events` in method order.
    ///
    /// # Returns
    ///
    /// The largest number of iterations any method needed.
    ///
    /// # Errors
    ///
    /// Returns the first error any pass reported.
    pub fn run(&self, methods: &mut [Method], events: &mut EventLog) -> Result<usize> {
        if self.passes.is_empty() {
            return Ok(0);
        }

        let process = |method: &mut Method| -> Result<(usize, EventLog)> {
            let mut log = EventLog::new();
            let iterations = self.run_method(method, &mut log)?;
            Ok((iterations, log))
        };

        let results = if self.config.parallel {
            methods
                .par_iter_mut()
                .map(process)
                .collect::<Result<Vec<_>>>()?
        } else {
            methods.iter_mut().map(process).collect::<Result<Vec<_>>>()?
        };

        let mut iterations = 0;
        for (count, log) in results {
            iterations = iterations.max(count);
            events.merge(log);
        }

        log::debug!(
            "pipeline [{}] over {} methods: {} iterations, {} events",
            self.pass_names().join(", "),
            methods.len(),
            iterations,
            events.len()
        );
        Ok(iterations)
    }
}
