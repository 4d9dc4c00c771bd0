//! Property-based tests for corpus scanning and the conformance run
//!
//! These tests use proptest to generate fixture corpora of random shape and check that every
//! discovered file gets exactly one verdict, however the work is split across workers.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use jsonharness::corpus;
use jsonharness::{ConsoleReporter, HarnessConfig, HarnessResult, Invocation, ParserConformanceRunner};
use jsonharness_core::{ExecutionOutcome, FixtureKind};
use proptest::prelude::*;

/// Parser that complains about every file whose name contains "bad".
fn parser(inv: &Invocation) -> HarnessResult<ExecutionOutcome> {
    let name = Path::new(&inv.args[0])
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.contains("bad") {
        Ok(ExecutionOutcome::exited(1, "Unexpected end of input\n"))
    } else {
        Ok(ExecutionOutcome::exited(0, ""))
    }
}

fn fixture_name() -> impl Strategy<Value = String> {
    ("(n_|y_|i_)?", "[a-z]{1,8}", "(_bad)?").prop_map(|(prefix, stem, suffix)| format!("{prefix}{stem}{suffix}.json"))
}

fn corpus_layout() -> impl Strategy<Value = BTreeSet<(u8, String)>> {
    prop::collection::btree_set((0u8..3, fixture_name()), 0..24)
}

fn materialize(root: &Path, layout: &BTreeSet<(u8, String)>) -> usize {
    let mut written = BTreeSet::new();
    for (depth, name) in layout {
        let mut dir = root.to_path_buf();
        for level in 0..*depth {
            dir = dir.join(format!("d{level}"));
        }
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, "{}").unwrap();
        written.insert(path);
    }
    written.len()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: the scan finds every file, and each gets one verdict per the naming rule
    #[test]
    fn every_discovered_fixture_gets_one_verdict(layout in corpus_layout(), jobs in 1usize..5) {
        let dir = tempfile::tempdir().unwrap();
        let expected = materialize(dir.path(), &layout);

        let fixtures = corpus::scan(dir.path()).unwrap();
        prop_assert_eq!(fixtures.len(), expected);

        let expected_failures = fixtures
            .iter()
            .filter(|f| f.kind() == FixtureKind::ExpectConformant && f.name().contains("bad"))
            .count();

        let config = HarnessConfig::new().with_jobs(jobs);
        let runner = parser;
        let conformance = ParserConformanceRunner::new(&runner, Path::new("parser"), &config);
        let run = conformance
            .run(fixtures, &mut ConsoleReporter::new(io::sink(), false))
            .unwrap();

        prop_assert_eq!(run.summary.total, expected);
        prop_assert!(run.summary.is_complete());
        prop_assert_eq!(run.summary.failed, expected_failures);
        prop_assert_eq!(run.results.len(), expected);
    }
}
