//! Fatal harness errors.
//!
//! Only conditions that abort the whole run live here. Per-fixture failures, regression timeouts and
//! golden mismatches are ordinary values carried in the run report.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("compilation of `{target}` failed")]
    #[diagnostic(code(jsonharness::build_failure))]
    BuildFailure {
        target: String,
        exit_code: Option<i32>,
        /// Toolchain output, shown as the diagnostic help text
        #[help]
        diagnostics: String,
    },

    #[error("fixture directory `{}` does not exist", .0.display())]
    #[diagnostic(
        code(jsonharness::directory_not_found),
        help("run from the toolchain checkout or pass --tests <DIR>")
    )]
    DirectoryNotFound(PathBuf),

    #[error("failed to start `{program}`")]
    #[diagnostic(code(jsonharness::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on `{}`", .path.display())]
    #[diagnostic(code(jsonharness::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report")]
    #[diagnostic(code(jsonharness::report))]
    Report(#[from] io::Error),
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a failed toolchain build.
    pub fn is_build_failure(&self) -> bool {
        matches!(self, HarnessError::BuildFailure { .. })
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
