#![forbid(unsafe_code)]
//! Conformance and regression harness for a JSON parser toolchain.
//!
//! The harness compiles the parser and the command interpreter with an external C++ toolchain, runs
//! the parser over a corpus of fixture files classified by file name, runs the interpreter's embedded
//! command script once, and byte-compares its output files against checked-in golden files.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Layout
//!
//! - [`process`]: spawning external programs behind the [`ProcessRunner`] trait
//! - [`corpus`]: fixture discovery
//! - [`toolchain`]: compiling the two executables
//! - [`conformance`]: one parser run per fixture
//! - [`regression`]: the interpreter run and golden comparisons
//! - [`report`]: glyphs, timing lines and the summary
//! - [`harness`]: the pipeline tying them together

pub mod cli;
pub mod config;
pub mod conformance;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod process;
pub mod regression;
pub mod report;
pub mod toolchain;
pub mod version;

pub use config::{BuildCheck, BuildTarget, HarnessConfig};
pub use conformance::{ConformanceRun, FailureDetail, ParserConformanceRunner};
pub use error::{HarnessError, HarnessResult};
pub use harness::{Harness, HarnessReport, PhaseTimings};
pub use process::{Invocation, ProcessRunner, SystemProcessRunner};
pub use regression::{CommandRegressionRunner, RegressionReport, RegressionResult};
pub use report::{ConsoleReporter, ReportPrinter, Reporter};
pub use toolchain::{ArtifactGuard, BuildCoordinator, BuiltBinary};
