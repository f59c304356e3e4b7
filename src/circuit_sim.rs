use std::fmt::Debug;

use crate::config::ITERATION_CAP;

pub type Iterations = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunResult {
    Finished { after_iterations: Iterations },
    ReachedMaxIterations { max_iterations: Iterations },
}

impl RunResult {
    pub fn converged(&self) -> bool {
        matches!(self, RunResult::Finished { .. })
    }
}

pub trait CircuitSim: Debug {
    /// Runs one propagation pass. Returns true if any piece's output changed.
    fn step(&mut self) -> bool;

    fn run(&mut self, max_iterations: Iterations) -> RunResult {
        for iterations in 1..=max_iterations {
            if !self.step() {
                return RunResult::Finished {
                    after_iterations: iterations,
                };
            }
        }
        RunResult::ReachedMaxIterations { max_iterations }
    }

    /// Propagates until no output changes, giving up after [`ITERATION_CAP`] passes.
    ///
    /// Feedback loops that never settle are left in whatever state the last pass produced.
    fn simulate(&mut self) -> RunResult {
        self.run(ITERATION_CAP)
    }
}
