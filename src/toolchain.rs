//! Building the parser and interpreter executables with the external C++ toolchain.
//!
//! A build that fails is fatal to the whole run. A build that succeeds hands back a [`BuiltBinary`],
//! which deletes the executable when dropped so no artifact outlives the run on any exit path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{BuildCheck, BuildTarget, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::process::{Invocation, ProcessRunner};

/// Removes every tracked file when dropped.
///
/// Missing files are fine; any other removal error is logged and otherwise ignored.
#[derive(Debug, Default)]
pub struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_artifact(&path);
        }
    }
}

pub(crate) fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
    }
}

/// A successfully built executable. Deleted from disk on drop.
#[derive(Debug)]
pub struct BuiltBinary {
    path: PathBuf,
    /// Wall time of the compiler run
    pub elapsed: Duration,
    /// Toolchain output of a successful build (warnings under `BuildCheck::ExitCode`)
    pub output: String,
    _guard: ArtifactGuard,
}

impl BuiltBinary {
    /// Take ownership of an executable built elsewhere; it is deleted on drop like any other.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut guard = ArtifactGuard::new();
        guard.track(&path);
        Self {
            path,
            elapsed: Duration::ZERO,
            output: String::new(),
            _guard: guard,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Drives the compiler for each [`BuildTarget`].
pub struct BuildCoordinator<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    config: &'a HarnessConfig,
}

impl<'a, R: ProcessRunner + ?Sized> BuildCoordinator<'a, R> {
    pub fn new(runner: &'a R, config: &'a HarnessConfig) -> Self {
        Self { runner, config }
    }

    /// The compiler invocation for `target`, run from the working directory.
    pub fn invocation(&self, target: &BuildTarget) -> Invocation {
        Invocation::new(&self.config.compiler)
            .arg(&self.config.opt_level)
            .args(&target.sources)
            .arg("-o")
            .arg(&target.output)
            .current_dir(&self.config.work_dir)
    }

    /// Compile `target`.
    ///
    /// ## Errors
    ///
    /// [`HarnessError::BuildFailure`] when the compiler cannot be started, exits nonzero, or (under
    /// [`BuildCheck::Strict`]) prints anything. Any partially written executable is removed first.
    #[tracing::instrument(skip_all, fields(target = %target.output))]
    pub fn build(&self, target: &BuildTarget) -> HarnessResult<BuiltBinary> {
        let binary = self.config.binary_path(target);
        let invocation = self.invocation(target);
        tracing::debug!(command = %invocation.command_line(), "compiling");

        let start = Instant::now();
        let outcome = match self.runner.run(&invocation) {
            Ok(outcome) => outcome,
            Err(e) => {
                remove_artifact(&binary);
                return Err(HarnessError::BuildFailure {
                    target: target.output.clone(),
                    exit_code: None,
                    diagnostics: e.to_string(),
                });
            }
        };
        let elapsed = start.elapsed();

        let diagnostics = !outcome.output.trim().is_empty();
        let failed = match self.config.build_check {
            BuildCheck::Strict => !outcome.success() || diagnostics,
            BuildCheck::ExitCode => !outcome.success(),
        };
        if failed {
            remove_artifact(&binary);
            return Err(HarnessError::BuildFailure {
                target: target.output.clone(),
                exit_code: outcome.exit_code,
                diagnostics: outcome.output,
            });
        }

        if diagnostics {
            tracing::warn!(target = %target.output, "toolchain printed diagnostics on a successful build");
        }

        let mut guard = ArtifactGuard::new();
        guard.track(&binary);
        Ok(BuiltBinary {
            path: binary,
            elapsed,
            output: outcome.output,
            _guard: guard,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jsonharness_core::ExecutionOutcome;
    use std::ffi::OsString;

    fn config_in(dir: &Path) -> HarnessConfig {
        HarnessConfig::new().with_work_dir(dir)
    }

    /// Fake compiler: writes the `-o` output then reports `outcome`.
    fn compiler(outcome: ExecutionOutcome) -> impl Fn(&Invocation) -> HarnessResult<ExecutionOutcome> + Sync {
        move |inv: &Invocation| -> HarnessResult<ExecutionOutcome> {
            let dir = inv.current_dir.clone().unwrap();
            let pos = inv.args.iter().position(|a| a == "-o").unwrap();
            fs::write(dir.join(&inv.args[pos + 1]), b"\x7fELF").unwrap();
            Ok(outcome.clone())
        }
    }

    #[test]
    fn test_compiler_command_line() {
        let runner = compiler(ExecutionOutcome::exited(0, ""));
        let config = HarnessConfig::default();
        let coordinator = BuildCoordinator::new(&runner, &config);
        let inv = coordinator.invocation(&BuildTarget::parser());

        assert_eq!(inv.program, PathBuf::from("clang++"));
        let args: Vec<OsString> = ["-O2", "json.cpp", "test.cpp", "parser.cpp", "-o", "parser"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(inv.args, args);
        assert_eq!(inv.current_dir, Some(PathBuf::from(".")));
    }

    #[test]
    fn test_successful_build_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = compiler(ExecutionOutcome::exited(0, ""));
        let config = config_in(dir.path());
        let coordinator = BuildCoordinator::new(&runner, &config);

        let built = coordinator.build(&BuildTarget::parser()).unwrap();
        assert_eq!(built.path(), dir.path().join("parser"));
        assert!(built.path().exists());

        drop(built);
        assert!(!dir.path().join("parser").exists());
    }

    #[test]
    fn test_nonzero_exit_is_build_failure_and_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = compiler(ExecutionOutcome::exited(1, "json.cpp:3:1: error: expected ';'\n"));
        let config = config_in(dir.path());
        let coordinator = BuildCoordinator::new(&runner, &config);

        let err = coordinator.build(&BuildTarget::parser()).unwrap_err();
        match err {
            HarnessError::BuildFailure {
                target,
                exit_code,
                diagnostics,
            } => {
                assert_eq!(target, "parser");
                assert_eq!(exit_code, Some(1));
                assert!(diagnostics.contains("expected ';'"));
            }
            other => panic!("expected BuildFailure, got {other:?}"),
        }
        assert!(!dir.path().join("parser").exists());
    }

    #[test]
    fn test_warnings_fail_strict_build() {
        let dir = tempfile::tempdir().unwrap();
        let runner = compiler(ExecutionOutcome::exited(0, "warning: unused variable 'x'\n"));
        let config = config_in(dir.path());
        let coordinator = BuildCoordinator::new(&runner, &config);

        assert!(coordinator.build(&BuildTarget::interpreter()).unwrap_err().is_build_failure());
        assert!(!dir.path().join("testcmds").exists());
    }

    #[test]
    fn test_warnings_tolerated_by_exit_code_check() {
        let dir = tempfile::tempdir().unwrap();
        let runner = compiler(ExecutionOutcome::exited(0, "warning: unused variable 'x'\n"));
        let config = config_in(dir.path()).with_build_check(BuildCheck::ExitCode);
        let coordinator = BuildCoordinator::new(&runner, &config);

        let built = coordinator.build(&BuildTarget::interpreter()).unwrap();
        assert!(built.output.contains("unused variable"));
    }

    #[test]
    fn test_missing_compiler_is_build_failure() {
        let runner = |inv: &Invocation| -> HarnessResult<ExecutionOutcome> {
            Err(HarnessError::Spawn {
                program: inv.program.display().to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        };
        let config = HarnessConfig::default();
        let coordinator = BuildCoordinator::new(&runner, &config);
        let err = coordinator.build(&BuildTarget::parser()).unwrap_err();
        assert!(err.is_build_failure());
    }

    #[test]
    fn test_guard_removes_tracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("search.json");
        let b = dir.path().join("save.json");
        fs::write(&a, "[]").unwrap();

        let mut guard = ArtifactGuard::new();
        guard.track(&a);
        guard.track(&b); // never created
        drop(guard);

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_whitespace_output_passes_strict_build() {
        let dir = tempfile::tempdir().unwrap();
        let runner = compiler(ExecutionOutcome::exited(0, "\n  \n"));
        let config = config_in(dir.path());
        let coordinator = BuildCoordinator::new(&runner, &config);

        let built = coordinator.build(&BuildTarget::parser()).unwrap();
        assert_eq!(built.path(), config.binary_path(&config.parser));
        assert!(built.path().exists());
    }
}
