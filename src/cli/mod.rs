//! CLI module for the JSON toolchain harness
//!
//! ## Usage
//!
//! `jsonharness [--more] [--tests DIR] [--workdir DIR] [--cxx PROGRAM] [-j N] ...`
//!
//! With no flags it behaves like the stock harness: build `parser` and `testcmds` with
//! `clang++ -O2` in the current directory, run every fixture under `tests/`, then diff the
//! interpreter's output against the golden files.
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::env;
use std::fmt;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use jsonharness_core::RejectPolicy;

use crate::config::{BuildCheck, HarnessConfig};
use crate::version::HARNESS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Which toolchain runs count as failed builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildCheckArg {
    /// Nonzero exit or any compiler output
    Strict,
    /// Nonzero exit only; warnings are tolerated
    ExitCode,
}

impl From<BuildCheckArg> for BuildCheck {
    fn from(arg: BuildCheckArg) -> Self {
        match arg {
            BuildCheckArg::Strict => BuildCheck::Strict,
            BuildCheckArg::ExitCode => BuildCheck::ExitCode,
        }
    }
}

/// Conformance and regression harness for the JSON parser toolchain
#[derive(Parser, Debug)]
#[command(name = "jsonharness")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Build the JSON toolchain, run the fixture corpus and the command regression", long_about = None)]
pub struct Cli {
    /// Print the fixture and a parser trace for every failure
    #[arg(short = 'm', long = "more", visible_alias = "verbose", visible_short_alias = 'v')]
    pub more: bool,

    /// Fixture corpus directory, relative to the working directory
    #[arg(long = "tests", value_name = "DIR", default_value = "tests")]
    pub tests: PathBuf,

    /// Directory holding the C++ sources
    #[arg(long = "workdir", value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// C++ compiler driver
    #[arg(long = "cxx", value_name = "PROGRAM", env = "JSONHARNESS_CXX", default_value = "clang++")]
    pub cxx: String,

    /// Seconds the interpreter may run before it is killed
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Parallel parser invocations
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// When a compiler run counts as a failed build
    #[arg(long = "build-check", value_enum, default_value_t = BuildCheckArg::Strict)]
    pub build_check: BuildCheckArg,

    /// Require n_ fixtures to be rejected (output or nonzero exit) instead of always passing
    #[arg(long = "strict-rejects")]
    pub strict_rejects: bool,

    /// Stop after the conformance run
    #[arg(long = "skip-regression")]
    pub skip_regression: bool,

    /// Write a JSON summary of the run to PATH
    #[arg(long = "summary-json", value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    pub fn config(&self) -> HarnessConfig {
        let reject_policy = if self.strict_rejects {
            RejectPolicy::RequireRejection
        } else {
            RejectPolicy::AlwaysPass
        };
        HarnessConfig::new()
            .with_work_dir(&self.workdir)
            .with_tests_dir(&self.tests)
            .with_compiler(&self.cxx)
            .with_regression_timeout(Duration::from_secs(self.timeout))
            .with_verbose(self.more)
            .with_jobs(self.jobs)
            .with_build_check(self.build_check.into())
            .with_reject_policy(reject_policy)
            .with_skip_regression(self.skip_regression)
            .with_summary_json(self.summary_json.clone())
    }

    /// Color is on for a terminal unless disabled by flag or `NO_COLOR`.
    pub fn color(&self) -> bool {
        !self.no_color && env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.config();
    tracing::debug!(?config, "starting harness");
    commands::run_harness(&config, cli.color())
}

// ============================================================================
// Tests
// ============================================================================
