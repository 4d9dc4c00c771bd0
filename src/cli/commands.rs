//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io::{self, Write};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::harness::Harness;
use crate::process::{ProcessRunner, SystemProcessRunner};
use crate::report::ConsoleReporter;

use super::{CliError, CliResult, ExitCode};

/// Run the harness against real processes, reporting on stdout.
pub fn run_harness(config: &HarnessConfig, color: bool) -> CliResult<ExitCode> {
    let stdout = io::stdout();
    let mut reporter = ConsoleReporter::new(stdout.lock(), color);
    run_with(config, &SystemProcessRunner, &mut reporter)
}

/// Run the harness with any runner and output sink.
///
/// A finished run that had failures, or whose summary JSON could not be written, exits 1 without a
/// message since the report and the log already say why. A fatal error exits 1 with its rendered
/// diagnostic.
pub fn run_with<R, W>(config: &HarnessConfig, runner: &R, reporter: &mut ConsoleReporter<W>) -> CliResult<ExitCode>
where
    R: ProcessRunner + ?Sized,
    W: Write,
{
    match Harness::new(config, runner).run(reporter) {
        Ok(report) if report.succeeded() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => Err(CliError::failure(render(e))),
    }
}

fn render(error: HarnessError) -> String {
    format!("{:?}", miette::Report::new(error))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HarnessResult;
    use crate::process::Invocation;
    use jsonharness_core::ExecutionOutcome;

    #[test]
    fn test_build_failure_exits_with_message() {
        let runner = |_: &Invocation| -> HarnessResult<ExecutionOutcome> {
            Ok(ExecutionOutcome::exited(1, "json.cpp:1:1: error: unknown type name\n"))
        };
        let config = HarnessConfig::default();
        let mut reporter = ConsoleReporter::new(Vec::new(), false);

        let err = run_with(&config, &runner, &mut reporter).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("compilation of `parser` failed"));

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "Compilation failed (parser)\n");
    }

    #[test]
    fn test_unwritten_summary_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tests")).unwrap();
        let runner = |inv: &Invocation| -> HarnessResult<ExecutionOutcome> {
            if let Some(pos) = inv.args.iter().position(|a| a == "-o") {
                let dir = inv.current_dir.clone().unwrap();
                std::fs::write(dir.join(&inv.args[pos + 1]), b"\x7fELF").unwrap();
            }
            Ok(ExecutionOutcome::exited(0, ""))
        };
        let config = HarnessConfig::new()
            .with_work_dir(dir.path())
            .with_skip_regression(true)
            .with_summary_json(Some(dir.path().join("missing").join("summary.json")));
        let mut reporter = ConsoleReporter::new(Vec::new(), false);

        let code = run_with(&config, &runner, &mut reporter).unwrap();
        assert_eq!(code, ExitCode::FAILURE);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.contains("Ran 0 tests: 0 passed, 0 failed"));
    }
}
