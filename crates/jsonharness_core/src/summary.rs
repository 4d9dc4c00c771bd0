//! Aggregates produced at the end of each harness phase.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::outcome::TestOutcome;

/// Counts for one conformance run.
///
/// `total` is fixed up front to the number of fixtures discovered; `passed + failed == total` once
/// every fixture has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn for_fixtures(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Pass => self.passed += 1,
            TestOutcome::Fail => self.failed += 1,
        }
    }

    /// Every discovered fixture has a verdict.
    pub fn is_complete(&self) -> bool {
        self.passed + self.failed == self.total
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.is_complete()
    }
}

/// Harness phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Build,
    Conformance,
    Regression,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Build, Phase::Conformance, Phase::Regression];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Build => "build",
            Phase::Conformance => "conformance",
            Phase::Regression => "regression",
        }
    }
}

/// Result of comparing one generated file against its golden counterpart.
///
/// `matched` is exact byte equality: no whitespace or line-ending normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenComparison {
    pub actual_path: PathBuf,
    pub golden_path: PathBuf,
    pub matched: bool,
}

impl GoldenComparison {
    pub fn from_bytes(
        actual_path: impl Into<PathBuf>,
        golden_path: impl Into<PathBuf>,
        actual: &[u8],
        golden: &[u8],
    ) -> Self {
        Self {
            actual_path: actual_path.into(),
            golden_path: golden_path.into(),
            matched: actual == golden,
        }
    }

    /// A comparison where the generated file could not be read.
    pub fn missing(actual_path: impl Into<PathBuf>, golden_path: impl Into<PathBuf>) -> Self {
        Self {
            actual_path: actual_path.into(),
            golden_path: golden_path.into(),
            matched: false,
        }
    }

    /// File name of the generated file, for display.
    pub fn name(&self) -> String {
        file_name(&self.actual_path)
    }

    pub fn golden_name(&self) -> String {
        file_name(&self.golden_path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
