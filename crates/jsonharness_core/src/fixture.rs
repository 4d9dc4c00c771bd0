//! Fixtures and the filename convention that decides what a fixture expects.
//!
//! A fixture whose file name starts with `n_` is malformed input the parser should reject. Every
//! other file (commonly `y_` prefixed, or unprefixed) is input the parser must accept silently.

use std::path::{Path, PathBuf};

/// File name prefix marking an expected-non-conformant fixture.
pub const NON_CONFORMANT_PREFIX: &str = "n_";

/// What the parser is expected to do with a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    /// Well-formed input: the parser must accept it without printing anything.
    ExpectConformant,
    /// Malformed input (`n_` prefix).
    ExpectNonConformant,
}

impl FixtureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FixtureKind::ExpectConformant => "conformant",
            FixtureKind::ExpectNonConformant => "non-conformant",
        }
    }
}

/// Classify a fixture from its file name alone.
///
/// Only the file name is inspected, never the directory it lives in or its contents.
pub fn fixture_kind(name: &str) -> FixtureKind {
    if name.starts_with(NON_CONFORMANT_PREFIX) {
        FixtureKind::ExpectNonConformant
    } else {
        FixtureKind::ExpectConformant
    }
}

/// A single input file from the fixture corpus.
///
/// Immutable once scanned: the kind is computed at construction from the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    name: String,
    path: PathBuf,
    kind: FixtureKind,
}

impl Fixture {
    /// Build a fixture from its path. The name is the final path component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = fixture_kind(&name);
        Self { name, path, kind }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FixtureKind {
        self.kind
    }
}
