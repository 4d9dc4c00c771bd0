//! Harness configuration.
//!
//! Defaults describe the stock toolchain checkout: C++ sources in the working directory, fixtures
//! under `tests/`, `clang++ -O2`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jsonharness_core::RejectPolicy;

/// Golden file the generated `search.json` must match byte for byte.
pub const SEARCH_GOLDEN: &str = "search_compact_correct.json";
/// Golden file the generated `save.json` must match byte for byte.
pub const SAVE_GOLDEN: &str = "save_compact_correct.json";
/// Directory, relative to the working directory, the interpreter's embedded script writes into.
/// Fixed by the script and independent of the fixture directory.
pub const OUTPUT_DIR: &str = "tests";
/// File the interpreter's embedded script writes its search result to.
pub const SEARCH_OUTPUT: &str = "search.json";
/// File the interpreter's embedded script writes the saved document to.
pub const SAVE_OUTPUT: &str = "save.json";

/// One executable to compile from a set of source units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Output executable name, relative to the working directory
    pub output: String,
    /// Source units handed to the compiler, relative to the working directory
    pub sources: Vec<String>,
}

impl BuildTarget {
    pub fn new<I, S>(output: &str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: output.to_string(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// The standalone parser: `parser <fixture> [--output]`.
    pub fn parser() -> Self {
        Self::new("parser", ["json.cpp", "test.cpp", "parser.cpp"])
    }

    /// The command interpreter running its embedded script.
    pub fn interpreter() -> Self {
        Self::new(
            "testcmds",
            ["json.cpp", "parser.cpp", "interpreter.cpp", "utils.cpp", "testcmds.cpp"],
        )
    }
}

/// When a toolchain run counts as a failed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildCheck {
    /// Nonzero exit, or any output at all (warnings included)
    #[default]
    Strict,
    /// Nonzero exit only; warnings on a successful build are tolerated
    ExitCode,
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding the C++ sources; builds and the interpreter run here
    pub work_dir: PathBuf,
    /// Fixture corpus root, relative to `work_dir` unless absolute
    pub tests_dir: PathBuf,
    /// C++ compiler driver
    pub compiler: String,
    /// Optimization flag passed to the compiler
    pub opt_level: String,
    pub parser: BuildTarget,
    pub interpreter: BuildTarget,
    /// Upper bound on the interpreter run
    pub regression_timeout: Duration,
    /// Dump fixture text and a `--output` trace for each failure
    pub verbose: bool,
    /// Parallel parser invocations during the conformance phase
    pub jobs: usize,
    pub build_check: BuildCheck,
    pub reject_policy: RejectPolicy,
    /// Stop after the conformance phase
    pub skip_regression: bool,
    /// Write a JSON summary here after the run
    pub summary_json: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            tests_dir: PathBuf::from("tests"),
            compiler: "clang++".to_string(),
            opt_level: "-O2".to_string(),
            parser: BuildTarget::parser(),
            interpreter: BuildTarget::interpreter(),
            regression_timeout: Duration::from_secs(30),
            verbose: false,
            jobs: 1,
            build_check: BuildCheck::default(),
            reject_policy: RejectPolicy::default(),
            skip_regression: false,
            summary_json: None,
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_tests_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tests_dir = dir.into();
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_regression_timeout(mut self, timeout: Duration) -> Self {
        self.regression_timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the worker count; zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_build_check(mut self, check: BuildCheck) -> Self {
        self.build_check = check;
        self
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    pub fn with_skip_regression(mut self, skip: bool) -> Self {
        self.skip_regression = skip;
        self
    }

    pub fn with_summary_json(mut self, path: Option<PathBuf>) -> Self {
        self.summary_json = path;
        self
    }

    /// Resolved fixture directory.
    pub fn fixture_dir(&self) -> PathBuf {
        self.resolve(&self.tests_dir)
    }

    /// Where the interpreter writes its output files.
    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join(OUTPUT_DIR)
    }

    /// Resolved path of a built executable.
    pub fn binary_path(&self, target: &BuildTarget) -> PathBuf {
        self.work_dir.join(&target.output)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
