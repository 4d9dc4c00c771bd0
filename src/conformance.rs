//! Parser conformance run: one parser invocation per fixture, classified by file name.
//!
//! With `jobs > 1` fixtures are spread over a bounded pool of scoped worker threads. Workers only
//! produce verdicts; the calling thread owns the counters and the reporter, and emits results in
//! discovery order by buffering anything that completes early.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use jsonharness_core::{ExecutionOutcome, Fixture, RejectPolicy, RunSummary, TestOutcome, TestResult, classify};

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::process::{Invocation, ProcessRunner};
use crate::report::Reporter;

/// Argument asking the parser for a verbose trace instead of its terse behavior.
pub const TRACE_FLAG: &str = "--output";

/// Debug material collected for a failing fixture in verbose mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    /// Raw fixture text
    pub source: String,
    /// Merged output of the `--output` re-run
    pub trace: String,
}

/// Everything the conformance phase produced.
#[derive(Debug, Clone)]
pub struct ConformanceRun {
    pub summary: RunSummary,
    /// One result per fixture, in discovery order
    pub results: Vec<TestResult>,
}

struct Evaluated {
    result: TestResult,
    detail: Option<FailureDetail>,
}

pub struct ParserConformanceRunner<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    parser: PathBuf,
    verbose: bool,
    policy: RejectPolicy,
    jobs: usize,
}

impl<'a, R: ProcessRunner + ?Sized> ParserConformanceRunner<'a, R> {
    pub fn new(runner: &'a R, parser: &Path, config: &HarnessConfig) -> Self {
        Self {
            runner,
            parser: parser.to_path_buf(),
            verbose: config.verbose,
            policy: config.reject_policy,
            jobs: config.jobs.max(1),
        }
    }

    /// Run every fixture through the parser.
    ///
    /// Per-fixture trouble (nonzero exit, unexpected output, a parser that cannot be started) only
    /// affects that fixture's verdict. The only errors returned come from the reporter.
    #[tracing::instrument(skip_all, fields(fixtures = fixtures.len(), jobs = self.jobs))]
    pub fn run(&self, fixtures: Vec<Fixture>, reporter: &mut dyn Reporter) -> HarnessResult<ConformanceRun> {
        let start = Instant::now();
        let mut summary = RunSummary::for_fixtures(fixtures.len());
        let mut results = Vec::with_capacity(fixtures.len());
        reporter.on_collection_complete(fixtures.len())?;

        if self.jobs == 1 || fixtures.len() < 2 {
            for fixture in fixtures {
                let evaluated = self.evaluate(fixture);
                emit(evaluated, reporter, &mut summary, &mut results)?;
            }
        } else {
            self.run_parallel(&fixtures, reporter, &mut summary, &mut results)?;
        }

        summary.elapsed = start.elapsed();
        debug_assert!(summary.is_complete());
        reporter.on_conformance_complete(&summary)?;
        Ok(ConformanceRun { summary, results })
    }

    fn run_parallel(
        &self,
        fixtures: &[Fixture],
        reporter: &mut dyn Reporter,
        summary: &mut RunSummary,
        results: &mut Vec<TestResult>,
    ) -> HarnessResult<()> {
        let next = AtomicUsize::new(0);
        let workers = self.jobs.min(fixtures.len());
        let (tx, rx) = mpsc::channel::<(usize, Evaluated)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(fixture) = fixtures.get(index) else {
                            break;
                        };
                        // Receiver gone means the reporter failed; stop early
                        if tx.send((index, self.evaluate(fixture.clone()))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut pending = BTreeMap::new();
            let mut next_emit = 0;
            for (index, evaluated) in rx {
                pending.insert(index, evaluated);
                while let Some(evaluated) = pending.remove(&next_emit) {
                    emit(evaluated, reporter, summary, results)?;
                    next_emit += 1;
                }
            }
            Ok(())
        })
    }

    fn evaluate(&self, fixture: Fixture) -> Evaluated {
        let outcome = self.invoke(&fixture, false);
        let verdict = classify(fixture.kind(), &outcome, self.policy);
        tracing::trace!(fixture = %fixture.name(), ?verdict, "classified");

        let detail = (verdict == TestOutcome::Fail && self.verbose).then(|| self.failure_detail(&fixture));
        Evaluated {
            result: TestResult::new(fixture, verdict),
            detail,
        }
    }

    fn invoke(&self, fixture: &Fixture, trace: bool) -> ExecutionOutcome {
        let mut invocation = Invocation::new(&self.parser).arg(fixture.path());
        if trace {
            invocation = invocation.arg(TRACE_FLAG);
        }
        match self.runner.run(&invocation) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(fixture = %fixture.path().display(), error = %e, "parser invocation failed");
                ExecutionOutcome {
                    exit_code: None,
                    output: e.to_string(),
                    timed_out: false,
                }
            }
        }
    }

    /// Fixture text plus a `--output` re-run. The re-run is for humans only and never counted.
    fn failure_detail(&self, fixture: &Fixture) -> FailureDetail {
        let source = match fs::read(fixture.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("<unable to read {}: {}>", fixture.path().display(), e),
        };
        let trace = self.invoke(fixture, true).output;
        FailureDetail { source, trace }
    }
}

fn emit(
    evaluated: Evaluated,
    reporter: &mut dyn Reporter,
    summary: &mut RunSummary,
    results: &mut Vec<TestResult>,
) -> HarnessResult<()> {
    let Evaluated { result, detail } = evaluated;
    summary.record(result.outcome);
    reporter.on_fixture_complete(&result)?;
    if let Some(detail) = &detail {
        reporter.on_fixture_failure_detail(&result.fixture, detail)?;
    }
    results.push(result);
    Ok(())
}
