//! Process outcomes and the rules that turn them into per-fixture verdicts.

use crate::fixture::{Fixture, FixtureKind};
use crate::severity::Severity;

/// What a single external process invocation produced.
///
/// Produced once per invocation and never mutated afterward. A nonzero exit or a timeout is a normal
/// value here; callers decide whether it matters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    /// Exit code, `None` when the process was terminated by a signal (including our own kill on timeout)
    pub exit_code: Option<i32>,
    /// Standard output and standard error merged into one text
    pub output: String,
    /// Whether the invocation hit its timeout and was forcibly terminated
    pub timed_out: bool,
}

impl ExecutionOutcome {
    /// An invocation that ran to completion.
    pub fn exited(code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            output: output.into(),
            timed_out: false,
        }
    }

    /// An invocation that was killed after exceeding its timeout.
    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            output: output.into(),
            timed_out: true,
        }
    }

    /// Completed in time with exit code zero.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Completed in time, with exit code zero and no output at all.
    pub fn is_silent_success(&self) -> bool {
        self.success() && self.output.is_empty()
    }
}

/// Pass/fail verdict for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestOutcome {
    Pass,
    Fail,
}

/// How `n_` fixtures are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectPolicy {
    /// Every `n_` fixture passes without looking at the parser's behavior.
    #[default]
    AlwaysPass,
    /// An `n_` fixture passes only when the parser said something or exited nonzero.
    RequireRejection,
}

/// Classify one parser invocation against what the fixture expects.
///
/// - `ExpectConformant`: pass iff the parser exited zero and printed nothing.
/// - `ExpectNonConformant`: always pass under [`RejectPolicy::AlwaysPass`]; under
///   [`RejectPolicy::RequireRejection`] pass iff the run was not a silent success.
pub fn classify(kind: FixtureKind, outcome: &ExecutionOutcome, policy: RejectPolicy) -> TestOutcome {
    let pass = match (kind, policy) {
        (FixtureKind::ExpectConformant, _) => outcome.is_silent_success(),
        (FixtureKind::ExpectNonConformant, RejectPolicy::AlwaysPass) => true,
        (FixtureKind::ExpectNonConformant, RejectPolicy::RequireRejection) => !outcome.is_silent_success(),
    };
    if pass { TestOutcome::Pass } else { TestOutcome::Fail }
}

/// One-character live marker emitted per fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// `n`: a passing non-conformant fixture
    NonConformant,
    /// `y`: a passing conformant fixture
    Conformant,
    /// `e`: any failure
    Error,
}

impl Glyph {
    pub fn for_result(kind: FixtureKind, outcome: TestOutcome) -> Self {
        match (outcome, kind) {
            (TestOutcome::Fail, _) => Glyph::Error,
            (TestOutcome::Pass, FixtureKind::ExpectNonConformant) => Glyph::NonConformant,
            (TestOutcome::Pass, FixtureKind::ExpectConformant) => Glyph::Conformant,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Glyph::NonConformant => 'n',
            Glyph::Conformant => 'y',
            Glyph::Error => 'e',
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Glyph::Error => Severity::Fail,
            Glyph::NonConformant | Glyph::Conformant => Severity::Ok,
        }
    }
}

/// Verdict for one fixture. Exactly one per scanned fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub fixture: Fixture,
    pub outcome: TestOutcome,
}

impl TestResult {
    pub fn new(fixture: Fixture, outcome: TestOutcome) -> Self {
        Self { fixture, outcome }
    }

    pub fn glyph(&self) -> Glyph {
        Glyph::for_result(self.fixture.kind(), self.outcome)
    }

    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Pass
    }
}
