//! Reporting.
//!
//! ## Reporter Trait
//!
//! The harness phases call a [`Reporter`] as things happen: one glyph per fixture, timing lines after
//! each phase, and the final summary. [`ConsoleReporter`] is the terminal implementation.
//!
//! ## Formatting
//!
//! [`ReportPrinter`] turns values into [`Line`]s tagged with a [`Severity`]. It is stateless and does
//! no I/O. Severities become ANSI colors only inside [`ConsoleReporter`], and only when color is on.

use std::io::{self, Write};
use std::time::Duration;

use jsonharness_core::{Fixture, GoldenComparison, Phase, RunSummary, Severity, TestResult};
use serde_json::json;

use crate::conformance::FailureDetail;
use crate::error::HarnessError;
use crate::harness::HarnessReport;
use crate::regression::{RegressionReport, RegressionResult};

/// Receives harness progress.
pub trait Reporter {
    /// Called after a toolchain build succeeds
    fn on_build_complete(&mut self, target: &str, elapsed: Duration) -> io::Result<()>;

    /// Called once the corpus has been scanned
    fn on_collection_complete(&mut self, _fixture_count: usize) -> io::Result<()> {
        Ok(())
    }

    /// Called once per fixture, in discovery order
    fn on_fixture_complete(&mut self, result: &TestResult) -> io::Result<()>;

    /// Called after `on_fixture_complete` for a failing fixture when verbose dumps are on
    fn on_fixture_failure_detail(&mut self, _fixture: &Fixture, _detail: &FailureDetail) -> io::Result<()> {
        Ok(())
    }

    /// Called when every fixture has a verdict
    fn on_conformance_complete(&mut self, summary: &RunSummary) -> io::Result<()>;

    /// Called after the interpreter run and golden comparisons
    fn on_regression_complete(&mut self, report: &RegressionReport) -> io::Result<()>;

    /// Called at the very end of a run that was not aborted
    fn on_run_complete(&mut self, report: &HarnessReport) -> io::Result<()>;

    /// Called when the run is aborted by a fatal error
    fn on_fatal(&mut self, error: &HarnessError) -> io::Result<()>;
}

/// A rendered line of report text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub severity: Severity,
    pub text: String,
}

impl Line {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Stateless report formatting.
pub struct ReportPrinter;

impl ReportPrinter {
    pub fn build_line(target: &str, elapsed: Duration) -> Line {
        Line::new(
            Severity::Header,
            format!("Compilation of {} took {:.6} seconds", target, elapsed.as_secs_f64()),
        )
    }

    pub fn ran_line(summary: &RunSummary) -> Line {
        Line::new(
            Severity::Header,
            format!("Ran {} tests in {:.6} seconds", summary.total, summary.elapsed.as_secs_f64()),
        )
    }

    pub fn failure_header(fixture: &Fixture) -> Line {
        Line::new(Severity::Fail, format!("test {} failed", fixture.path().display()))
    }

    pub fn comparison_line(comparison: &GoldenComparison) -> Line {
        if comparison.matched {
            Line::new(
                Severity::Ok,
                format!("{} matches {}", comparison.name(), comparison.golden_name()),
            )
        } else {
            Line::new(
                Severity::Fail,
                format!("{} differs from {}", comparison.name(), comparison.golden_name()),
            )
        }
    }

    pub fn regression_lines(report: &RegressionReport) -> Vec<Line> {
        match &report.result {
            RegressionResult::Completed { search, save } => {
                vec![Self::comparison_line(search), Self::comparison_line(save)]
            }
            RegressionResult::TimedOut { timeout } => vec![Line::new(
                Severity::Fail,
                format!(
                    "{} timed out after {:.1} seconds, comparisons skipped",
                    report.interpreter,
                    timeout.as_secs_f64()
                ),
            )],
            RegressionResult::ExecutionFailure { exit_code, output } => {
                let status = match exit_code {
                    Some(code) => format!("exit code {code}"),
                    None => "terminated by signal".to_string(),
                };
                let mut lines = vec![Line::new(
                    Severity::Fail,
                    format!("{} failed ({}), comparisons skipped", report.interpreter, status),
                )];
                if !output.trim().is_empty() {
                    lines.push(Line::new(Severity::Plain, output.trim_end()));
                }
                lines
            }
        }
    }

    pub fn summary_line(report: &HarnessReport) -> Line {
        let c = &report.conformance;
        let mut text = format!("Ran {} tests: {} passed, {} failed", c.total, c.passed, c.failed);
        if let Some(regression) = &report.regression {
            let verdict = if regression.result.passed() { "passed" } else { "failed" };
            text.push_str(&format!("; command regression {verdict}"));
        }
        let timings: Vec<String> = Phase::ALL
            .iter()
            .map(|phase| format!("{} {:.2}s", phase.as_str(), report.timings.get(*phase).as_secs_f64()))
            .collect();
        text.push_str(&format!(" ({})", timings.join(", ")));

        let severity = if report.passed() { Severity::Ok } else { Severity::Fail };
        Line::new(severity, text)
    }

    pub fn fatal_lines(error: &HarnessError) -> Vec<Line> {
        match error {
            HarnessError::BuildFailure { target, .. } => {
                vec![Line::new(Severity::Fail, format!("Compilation failed ({target})"))]
            }
            other => vec![Line::new(Severity::Fail, other.to_string())],
        }
    }

    /// Machine-readable form of a finished run.
    pub fn summary_json(report: &HarnessReport) -> serde_json::Value {
        let c = &report.conformance;
        let regression = report.regression.as_ref().map(|r| {
            let comparisons: Vec<_> = r
                .result
                .comparisons()
                .into_iter()
                .map(|cmp| {
                    json!({
                        "actual": cmp.actual_path.display().to_string(),
                        "golden": cmp.golden_path.display().to_string(),
                        "matched": cmp.matched,
                    })
                })
                .collect();
            let exit_code = match &r.result {
                RegressionResult::ExecutionFailure { exit_code, .. } => *exit_code,
                _ => None,
            };
            json!({
                "status": r.result.status(),
                "exit_code": exit_code,
                "comparisons": comparisons,
                "elapsed_secs": r.elapsed.as_secs_f64(),
            })
        });

        json!({
            "passed": report.passed(),
            "conformance": {
                "total": c.total,
                "passed": c.passed,
                "failed": c.failed,
                "elapsed_secs": c.elapsed.as_secs_f64(),
            },
            "regression": regression,
            "timings": {
                "build_secs": report.timings.build.as_secs_f64(),
                "conformance_secs": report.timings.conformance.as_secs_f64(),
                "regression_secs": report.timings.regression.as_secs_f64(),
            },
        })
    }
}

fn style(severity: Severity) -> &'static str {
    match severity {
        Severity::Header => "\x1b[95m",
        Severity::Ok => "\x1b[92m",
        Severity::Fail => "\x1b[91m",
        Severity::Plain => "",
    }
}

const RESET: &str = "\x1b[0m";

/// Terminal reporter: glyphs on one line, then timing and summary lines.
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
    /// Glyphs have been written without a trailing newline
    mid_line: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            mid_line: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_styled(&mut self, severity: Severity, text: &str) -> io::Result<()> {
        if self.color && severity != Severity::Plain {
            write!(self.out, "{}{}{}", style(severity), text, RESET)
        } else {
            write!(self.out, "{}", text)
        }
    }

    fn end_glyph_line(&mut self) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        Ok(())
    }

    fn write_line(&mut self, line: &Line) -> io::Result<()> {
        self.end_glyph_line()?;
        self.write_styled(line.severity, &line.text)?;
        writeln!(self.out)
    }

    fn write_lines(&mut self, lines: &[Line]) -> io::Result<()> {
        for line in lines {
            self.write_line(line)?;
        }
        self.out.flush()
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_build_complete(&mut self, target: &str, elapsed: Duration) -> io::Result<()> {
        self.write_lines(&[ReportPrinter::build_line(target, elapsed)])
    }

    fn on_fixture_complete(&mut self, result: &TestResult) -> io::Result<()> {
        let glyph = result.glyph();
        self.write_styled(glyph.severity(), &glyph.as_char().to_string())?;
        self.mid_line = true;
        self.out.flush()
    }

    fn on_fixture_failure_detail(&mut self, fixture: &Fixture, detail: &FailureDetail) -> io::Result<()> {
        let mut lines = vec![ReportPrinter::failure_header(fixture)];
        lines.push(Line::new(Severity::Plain, detail.source.trim_end()));
        if !detail.trace.trim().is_empty() {
            lines.push(Line::new(Severity::Plain, detail.trace.trim_end()));
        }
        self.write_lines(&lines)
    }

    fn on_conformance_complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.write_lines(&[ReportPrinter::ran_line(summary)])
    }

    fn on_regression_complete(&mut self, report: &RegressionReport) -> io::Result<()> {
        self.write_lines(&ReportPrinter::regression_lines(report))
    }

    fn on_run_complete(&mut self, report: &HarnessReport) -> io::Result<()> {
        self.write_lines(&[ReportPrinter::summary_line(report)])
    }

    fn on_fatal(&mut self, error: &HarnessError) -> io::Result<()> {
        self.write_lines(&ReportPrinter::fatal_lines(error))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::harness::PhaseTimings;
    use jsonharness_core::TestOutcome;

    fn rendered(reporter: ConsoleReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn completed(search: bool, save: bool) -> RegressionReport {
        RegressionReport {
            interpreter: "testcmds".to_string(),
            result: RegressionResult::Completed {
                search: GoldenComparison {
                    actual_path: "tests/search.json".into(),
                    golden_path: "tests/search_compact_correct.json".into(),
                    matched: search,
                },
                save: GoldenComparison {
                    actual_path: "tests/save.json".into(),
                    golden_path: "tests/save_compact_correct.json".into(),
                    matched: save,
                },
            },
            elapsed: Duration::from_millis(20),
        }
    }

    fn harness_report(failed: usize, regression: Option<RegressionReport>) -> HarnessReport {
        HarnessReport {
            conformance: RunSummary {
                total: 4,
                passed: 4 - failed,
                failed,
                elapsed: Duration::from_millis(250),
            },
            regression,
            timings: PhaseTimings {
                build: Duration::from_millis(1500),
                conformance: Duration::from_millis(250),
                regression: Duration::from_millis(20),
            },
            summary_error: None,
        }
    }

    #[test]
    fn test_timing_lines() {
        insta::assert_snapshot!(
            ReportPrinter::build_line("parser", Duration::from_millis(1500)).text,
            @"Compilation of parser took 1.500000 seconds"
        );
        let summary = RunSummary {
            total: 3,
            passed: 3,
            failed: 0,
            elapsed: Duration::from_millis(125),
        };
        insta::assert_snapshot!(ReportPrinter::ran_line(&summary).text, @"Ran 3 tests in 0.125000 seconds");
    }

    #[test]
    fn test_summary_line() {
        let report = harness_report(1, Some(completed(true, false)));
        let line = ReportPrinter::summary_line(&report);
        assert_eq!(line.severity, Severity::Fail);
        insta::assert_snapshot!(
            line.text,
            @"Ran 4 tests: 3 passed, 1 failed; command regression failed (build 1.50s, conformance 0.25s, regression 0.02s)"
        );
    }

    #[test]
    fn test_summary_line_without_regression() {
        let line = ReportPrinter::summary_line(&harness_report(0, None));
        assert_eq!(line.severity, Severity::Ok);
        insta::assert_snapshot!(
            line.text,
            @"Ran 4 tests: 4 passed, 0 failed (build 1.50s, conformance 0.25s, regression 0.02s)"
        );
    }

    #[test]
    fn test_regression_lines_report_each_comparison() {
        let lines = ReportPrinter::regression_lines(&completed(false, true));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Line::new(Severity::Fail, "search.json differs from search_compact_correct.json"));
        assert_eq!(lines[1], Line::new(Severity::Ok, "save.json matches save_compact_correct.json"));
    }

    #[test]
    fn test_regression_timeout_line() {
        let report = RegressionReport {
            interpreter: "testcmds".to_string(),
            result: RegressionResult::TimedOut {
                timeout: Duration::from_secs(30),
            },
            elapsed: Duration::from_secs(30),
        };
        let lines = ReportPrinter::regression_lines(&report);
        insta::assert_snapshot!(lines[0].text.as_str(), @"testcmds timed out after 30.0 seconds, comparisons skipped");
    }

    #[test]
    fn test_console_glyphs_then_lines() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        for (name, outcome) in [
            ("y_empty_object.json", TestOutcome::Pass),
            ("n_trailing_comma.json", TestOutcome::Pass),
            ("y_bad.json", TestOutcome::Fail),
        ] {
            let result = TestResult::new(Fixture::new(format!("tests/{name}")), outcome);
            reporter.on_fixture_complete(&result).unwrap();
        }
        let summary = RunSummary {
            total: 3,
            passed: 2,
            failed: 1,
            elapsed: Duration::from_millis(10),
        };
        reporter.on_conformance_complete(&summary).unwrap();

        assert_eq!(rendered(reporter), "yne\nRan 3 tests in 0.010000 seconds\n");
    }

    #[test]
    fn test_console_color_resolved_at_print() {
        let mut reporter = ConsoleReporter::new(Vec::new(), true);
        let result = TestResult::new(Fixture::new("tests/y_bad.json"), TestOutcome::Fail);
        reporter.on_fixture_complete(&result).unwrap();
        assert_eq!(rendered(reporter), "\x1b[91me\x1b[0m");
    }

    #[test]
    fn test_failure_detail_dump() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        let fixture = Fixture::new("tests/y_number.json");
        let result = TestResult::new(fixture.clone(), TestOutcome::Fail);
        reporter.on_fixture_complete(&result).unwrap();
        let detail = FailureDetail {
            source: "[1e5]\n".to_string(),
            trace: "Unexpected character 'e'\n".to_string(),
        };
        reporter.on_fixture_failure_detail(&fixture, &detail).unwrap();

        assert_eq!(
            rendered(reporter),
            "e\ntest tests/y_number.json failed\n[1e5]\nUnexpected character 'e'\n"
        );
    }

    #[test]
    fn test_fatal_build_failure_message() {
        let err = HarnessError::BuildFailure {
            target: "parser".to_string(),
            exit_code: Some(1),
            diagnostics: "error: expected ';'".to_string(),
        };
        let lines = ReportPrinter::fatal_lines(&err);
        assert_eq!(lines, [Line::new(Severity::Fail, "Compilation failed (parser)")]);
    }

    #[test]
    fn test_summary_json_shape() {
        let value = ReportPrinter::summary_json(&harness_report(0, Some(completed(true, true))));
        assert_eq!(value["passed"], true);
        assert_eq!(value["conformance"]["total"], 4);
        assert_eq!(value["regression"]["status"], "completed");
        assert_eq!(value["regression"]["comparisons"].as_array().unwrap().len(), 2);
        assert_eq!(value["regression"]["comparisons"][1]["matched"], true);

        let skipped = ReportPrinter::summary_json(&harness_report(0, None));
        assert!(skipped["regression"].is_null());
    }
}
