//! The full pipeline: build the parser, run every fixture through it, build the interpreter, run the
//! command regression, print the summary.
//!
//! Each step starts only after the previous one has finished. A failed build or a missing fixture
//! directory aborts the run; everything else ends up in the [`HarnessReport`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use jsonharness_core::{Phase, RunSummary};

use crate::config::HarnessConfig;
use crate::conformance::ParserConformanceRunner;
use crate::corpus;
use crate::error::{HarnessError, HarnessResult};
use crate::process::ProcessRunner;
use crate::regression::{CommandRegressionRunner, RegressionReport};
use crate::report::{ReportPrinter, Reporter};
use crate::toolchain::BuildCoordinator;

/// Wall time spent in each phase. Both builds count towards `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseTimings {
    pub build: Duration,
    pub conformance: Duration,
    pub regression: Duration,
}

impl PhaseTimings {
    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Build => self.build,
            Phase::Conformance => self.conformance,
            Phase::Regression => self.regression,
        }
    }
}

/// Outcome of a run that was not aborted.
#[derive(Debug, Clone)]
pub struct HarnessReport {
    pub conformance: RunSummary,
    /// `None` when the regression phase was skipped
    pub regression: Option<RegressionReport>,
    pub timings: PhaseTimings,
    /// Set when the `--summary-json` file could not be written
    pub summary_error: Option<String>,
}

impl HarnessReport {
    /// Every fixture passed and, if it ran, the regression matched both golden files.
    pub fn passed(&self) -> bool {
        self.conformance.all_passed() && self.regression.as_ref().is_none_or(|r| r.result.passed())
    }

    /// Passed, and every requested output was written.
    pub fn succeeded(&self) -> bool {
        self.passed() && self.summary_error.is_none()
    }
}

/// Drives one harness run against a [`ProcessRunner`].
pub struct Harness<'a, R: ProcessRunner + ?Sized> {
    config: &'a HarnessConfig,
    runner: &'a R,
}

impl<'a, R: ProcessRunner + ?Sized> Harness<'a, R> {
    pub fn new(config: &'a HarnessConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    /// Run every phase, reporting progress as it happens.
    ///
    /// A fatal error is passed to [`Reporter::on_fatal`] before being returned.
    pub fn run(&self, reporter: &mut dyn Reporter) -> HarnessResult<HarnessReport> {
        match self.execute(reporter) {
            Ok(report) => Ok(report),
            Err(e) => {
                if let Err(report_err) = reporter.on_fatal(&e) {
                    tracing::warn!(error = %report_err, "failed to report fatal error");
                }
                Err(e)
            }
        }
    }

    fn execute(&self, reporter: &mut dyn Reporter) -> HarnessResult<HarnessReport> {
        let config = self.config;
        let coordinator = BuildCoordinator::new(self.runner, config);
        let mut timings = PhaseTimings::default();

        let parser = coordinator.build(&config.parser)?;
        timings.build += parser.elapsed;
        reporter.on_build_complete(&config.parser.output, parser.elapsed)?;

        let fixtures = corpus::scan(&config.fixture_dir())?;
        let conformance = ParserConformanceRunner::new(self.runner, parser.path(), config).run(fixtures, reporter)?;
        timings.conformance = conformance.summary.elapsed;
        drop(parser);

        let regression = if config.skip_regression {
            tracing::debug!("regression phase skipped");
            None
        } else {
            let interpreter = coordinator.build(&config.interpreter)?;
            timings.build += interpreter.elapsed;
            reporter.on_build_complete(&config.interpreter.output, interpreter.elapsed)?;

            let report = CommandRegressionRunner::new(self.runner, config).run(interpreter);
            timings.regression = report.elapsed;
            reporter.on_regression_complete(&report)?;
            Some(report)
        };

        let mut report = HarnessReport {
            conformance: conformance.summary,
            regression,
            timings,
            summary_error: None,
        };
        reporter.on_run_complete(&report)?;
        if let Some(path) = &config.summary_json {
            if let Err(e) = write_summary(path, &report) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write summary JSON");
                report.summary_error = Some(e.to_string());
            }
        }
        Ok(report)
    }
}

fn write_summary(path: &Path, report: &HarnessReport) -> HarnessResult<()> {
    let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &ReportPrinter::summary_json(report))
        .map_err(|e| HarnessError::io(path, io::Error::other(e)))?;
    writeln!(writer).map_err(|e| HarnessError::io(path, e))?;
    writer.flush().map_err(|e| HarnessError::io(path, e))
}
