//! Step pipeline
//!
//! A run is an ordered list of named [`Step`]s over one shared context. The
//! [`Pipeline`] executes them strictly in order and stops at the first
//! failure; side effects of completed steps are left in place. Each step may
//! declare a skip predicate, checked right before it would run. In dry-run
//! mode no step body runs; the step's description is logged instead.

pub mod steps;

use crate::error::{ReleaseError, Result};
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

type RunFn<C> = Box<dyn Fn(&mut C) -> Result<()>>;
type SkipFn<C> = Box<dyn Fn(&C) -> bool>;
type DescribeFn<C> = Box<dyn Fn(&C) -> String>;

/// A named unit of work over the context `C`.
pub struct Step<C> {
    name: String,
    run: RunFn<C>,
    skip_if: Option<SkipFn<C>>,
    describe: Option<DescribeFn<C>>,
}

impl<C> Step<C> {
    pub fn new(name: impl Into<String>, run: impl Fn(&mut C) -> Result<()> + 'static) -> Self {
        Step {
            name: name.into(),
            run: Box::new(run),
            skip_if: None,
            describe: None,
        }
    }

    /// Skip the step whenever `predicate` holds for the context at that point.
    pub fn skip_if(mut self, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        self.skip_if = Some(Box::new(predicate));
        self
    }

    /// What the step would do, shown by dry runs.
    pub fn describe(mut self, describe: impl Fn(&C) -> String + 'static) -> Self {
        self.describe = Some(Box::new(describe));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn should_skip(&self, ctx: &C) -> bool {
        self.skip_if.as_ref().is_some_and(|predicate| predicate(ctx))
    }

    fn description(&self, ctx: &C) -> String {
        match &self.describe {
            Some(describe) => describe(ctx),
            None => self.name.clone(),
        }
    }
}

/// Where a pipeline is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running(usize),
    Succeeded,
    Failed { step: String, index: usize },
}

/// How one step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ran,
    Skipped,
    /// Dry run: the step's description, nothing executed
    Previewed(String),
    Failed(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, StepOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

/// Options fixed for the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log every step's intended action instead of performing it
    pub dry_run: bool,
    /// `-v` count
    pub verbosity: u8,
}

/// Sequencer for an ordered list of steps.
pub struct Pipeline<C> {
    steps: Vec<Step<C>>,
    state: PipelineState,
    records: Vec<StepRecord>,
}

impl<C> Pipeline<C> {
    pub fn new(steps: Vec<Step<C>>) -> Self {
        Pipeline {
            steps,
            state: PipelineState::Pending,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Per-step results of the last run, in execution order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute every step in order.
    ///
    /// The first failing step stops the run; its error comes back wrapped in
    /// [`ReleaseError::Step`] and no later step is evaluated.
    pub fn run(&mut self, ctx: &mut C, options: &RunOptions) -> Result<()> {
        self.records.clear();
        info!(steps = self.steps.len(), dry_run = options.dry_run, "starting pipeline");

        for (index, step) in self.steps.iter().enumerate() {
            self.state = PipelineState::Running(index);
            let started = Instant::now();

            let outcome = if step.should_skip(ctx) {
                info!(step = %step.name, "skipping step");
                StepOutcome::Skipped
            } else if options.dry_run {
                let description = step.description(ctx);
                info!(step = %step.name, "would {}", description);
                StepOutcome::Previewed(description)
            } else {
                info!(step = %step.name, "running step");
                match (step.run)(ctx) {
                    Ok(()) => StepOutcome::Ran,
                    Err(e) => {
                        error!(step = %step.name, error = %e, "step failed");
                        self.records.push(StepRecord {
                            name: step.name.clone(),
                            outcome: StepOutcome::Failed(e.to_string()),
                            duration_ms: started.elapsed().as_millis() as u64,
                        });
                        self.state = PipelineState::Failed {
                            step: step.name.clone(),
                            index,
                        };
                        return Err(ReleaseError::step(step.name.clone(), e));
                    }
                }
            };

            self.records.push(StepRecord {
                name: step.name.clone(),
                outcome,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        self.state = PipelineState::Succeeded;
        info!("pipeline finished");
        Ok(())
    }
}

impl<C> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .field("state", &self.state)
            .finish()
    }
}
