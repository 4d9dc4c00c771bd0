//! Command regression: run the interpreter once and diff its output files against golden files.
//!
//! The interpreter runs a fixed embedded script that writes `search.json` and `save.json` into
//! `tests/` under the working directory, whatever the fixture directory is. The golden files are
//! read from the fixture directory. Both generated files and the interpreter binary are removed when [`run`]
//! returns, whatever the outcome.
//!
//! [`run`]: CommandRegressionRunner::run

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jsonharness_core::GoldenComparison;

use crate::config::{HarnessConfig, SAVE_GOLDEN, SAVE_OUTPUT, SEARCH_GOLDEN, SEARCH_OUTPUT};
use crate::process::{Invocation, ProcessRunner};
use crate::toolchain::{ArtifactGuard, BuiltBinary, remove_artifact};

/// What the regression step concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegressionResult {
    /// The interpreter finished; both comparisons were made independently
    Completed {
        search: GoldenComparison,
        save: GoldenComparison,
    },
    /// Killed after exceeding its timeout; comparisons skipped
    TimedOut { timeout: Duration },
    /// Exited nonzero, was killed by a signal, or could not be started; comparisons skipped
    ExecutionFailure { exit_code: Option<i32>, output: String },
}

impl RegressionResult {
    pub fn passed(&self) -> bool {
        match self {
            RegressionResult::Completed { search, save } => search.matched && save.matched,
            _ => false,
        }
    }

    pub fn comparisons(&self) -> Vec<&GoldenComparison> {
        match self {
            RegressionResult::Completed { search, save } => vec![search, save],
            _ => Vec::new(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            RegressionResult::Completed { .. } => "completed",
            RegressionResult::TimedOut { .. } => "timed_out",
            RegressionResult::ExecutionFailure { .. } => "execution_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionReport {
    /// Display name of the interpreter binary
    pub interpreter: String,
    pub result: RegressionResult,
    pub elapsed: Duration,
}

pub struct CommandRegressionRunner<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    work_dir: PathBuf,
    output_dir: PathBuf,
    fixture_dir: PathBuf,
    timeout: Duration,
}

impl<'a, R: ProcessRunner + ?Sized> CommandRegressionRunner<'a, R> {
    pub fn new(runner: &'a R, config: &HarnessConfig) -> Self {
        Self {
            runner,
            work_dir: config.work_dir.clone(),
            output_dir: config.output_dir(),
            fixture_dir: config.fixture_dir(),
            timeout: config.regression_timeout,
        }
    }

    pub fn search_output(&self) -> PathBuf {
        self.output_dir.join(SEARCH_OUTPUT)
    }

    pub fn save_output(&self) -> PathBuf {
        self.output_dir.join(SAVE_OUTPUT)
    }

    /// Run `interpreter` once under the timeout and compare its outputs.
    ///
    /// Takes ownership of the binary so it is deleted on return along with the generated files.
    #[tracing::instrument(skip_all, fields(interpreter = %interpreter.path().display()))]
    pub fn run(&self, interpreter: BuiltBinary) -> RegressionReport {
        let search = self.search_output();
        let save = self.save_output();

        let mut generated = ArtifactGuard::new();
        generated.track(&search);
        generated.track(&save);
        // Leftovers from an aborted earlier run must not be mistaken for fresh output
        remove_artifact(&search);
        remove_artifact(&save);

        let name = interpreter
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| interpreter.path().display().to_string());
        // The binary is started from inside `work_dir`, so its own path must not be relative
        let program = std::path::absolute(interpreter.path()).unwrap_or_else(|_| interpreter.path().to_path_buf());
        let invocation = Invocation::new(program)
            .timeout(self.timeout)
            .current_dir(&self.work_dir);

        let start = Instant::now();
        let result = match self.runner.run(&invocation) {
            Err(e) => {
                tracing::warn!(error = %e, "interpreter could not be started");
                RegressionResult::ExecutionFailure {
                    exit_code: None,
                    output: e.to_string(),
                }
            }
            Ok(outcome) if outcome.timed_out => RegressionResult::TimedOut { timeout: self.timeout },
            Ok(outcome) if !outcome.success() => RegressionResult::ExecutionFailure {
                exit_code: outcome.exit_code,
                output: outcome.output,
            },
            Ok(_) => RegressionResult::Completed {
                search: compare(&search, &self.fixture_dir.join(SEARCH_GOLDEN)),
                save: compare(&save, &self.fixture_dir.join(SAVE_GOLDEN)),
            },
        };

        RegressionReport {
            interpreter: name,
            result,
            elapsed: start.elapsed(),
        }
    }
}

/// Exact byte comparison. An unreadable file on either side is a mismatch.
pub fn compare(actual: &Path, golden: &Path) -> GoldenComparison {
    let actual_bytes = match fs::read(actual) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %actual.display(), error = %e, "generated file missing");
            return GoldenComparison::missing(actual, golden);
        }
    };
    let golden_bytes = match fs::read(golden) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %golden.display(), error = %e, "golden file missing");
            return GoldenComparison::missing(actual, golden);
        }
    };
    GoldenComparison::from_bytes(actual, golden, &actual_bytes, &golden_bytes)
}
