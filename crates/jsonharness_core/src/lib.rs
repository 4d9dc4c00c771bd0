//! Shared data model and classification rules for the JSON toolchain harness.
//!
//! This crate holds the values the harness passes between its phases: fixtures, process outcomes,
//! per-fixture results, run summaries and golden comparisons. It also holds the pure rules that turn
//! a parser invocation into a pass/fail verdict.
//!
//! ## Notes
//!
//! - This is a “model” crate: **no IO**, no process spawning, no terminal styling.
//! - Styling is described by [`Severity`] and resolved to escape codes only by the reporter in the
//!   `jsonharness` crate.

pub mod fixture;
pub mod outcome;
pub mod severity;
pub mod summary;

pub use fixture::{Fixture, FixtureKind, NON_CONFORMANT_PREFIX, fixture_kind};
pub use outcome::{ExecutionOutcome, Glyph, RejectPolicy, TestOutcome, TestResult, classify};
pub use severity::Severity;
pub use summary::{GoldenComparison, Phase, RunSummary};
