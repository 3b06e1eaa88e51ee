mod common;

use std::path::Path;

use tracecov::highlight::Highlighter;
use tracecov::{ingest, report};

/// Highlighter that can never run, forcing the escaped-text fallback so
/// tests don't depend on enscript being installed.
fn fallback_highlighter() -> Highlighter {
    Highlighter {
        program: "definitely-not-an-installed-highlighter".to_string(),
        args: vec![],
    }
}

/// End-to-end: scan a listing directory, build the tree, write every page.
#[test]
fn report_generation_end_to_end() {
    let input = common::coverage_dir(&[
        ("frobnitz.core.cover", include_str!("fixtures/frobnitz.core.cover")),
        ("frobnitz.util.cover", include_str!("fixtures/frobnitz.util.cover")),
        ("frobnitz.tests.cover", ">>>>>> assert False\n"),
    ]);
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("reports");

    report::make_coverage_reports(input.path(), &out_dir, false, &fallback_highlighter()).unwrap();

    // One page per non-root node plus the overall summary; no root page,
    // and no page for the filtered-out tests module.
    assert!(out_dir.join("frobnitz.html").exists());
    assert!(out_dir.join("frobnitz.core.html").exists());
    assert!(out_dir.join("frobnitz.util.html").exists());
    assert!(out_dir.join("all.html").exists());
    assert!(!out_dir.join("index.html").exists());
    assert!(!out_dir.join("frobnitz.tests.html").exists());

    // Package totals: core 4/5 + util 2/2 = 6/7.
    let all = std::fs::read_to_string(out_dir.join("all.html")).unwrap();
    assert!(all.contains("covered 85% (1 of 7 uncovered)"));
    assert!(all.contains("covered 80% (1 of 5 uncovered)"));
    assert!(all.contains("covered 100% (0 of 2 uncovered)"));
    assert!(all.contains("Generated for revision"));

    // The module page embeds the listing with the uncovered line marked.
    let core = std::fs::read_to_string(out_dir.join("frobnitz.core.html")).unwrap();
    assert!(core.contains("<pre>"));
    assert!(core.contains(
        "<div class=\"notcovered\">&gt;&gt;&gt;&gt;&gt;&gt;     raise ValueError(value)</div>"
    ));
    assert!(core.contains("import os"));
}

/// The worst offenders are listed first on the summary page.
#[test]
fn summary_page_ranks_by_uncovered_lines() {
    let input = common::coverage_dir(&[
        ("aaa.tidy.cover", &common::listing(10, 0)),
        ("zzz.messy.cover", &common::listing(0, 10)),
    ]);
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("reports");

    report::make_coverage_reports(input.path(), &out_dir, false, &fallback_highlighter()).unwrap();

    let all = std::fs::read_to_string(out_dir.join("all.html")).unwrap();
    let messy = all.find("href=\"zzz.messy.html\"").unwrap();
    let tidy = all.find("href=\"aaa.tidy.html\"").unwrap();
    assert!(messy < tidy);
}

/// Rendering the same tree twice produces byte-identical output.
#[test]
fn report_generation_is_idempotent() {
    let input = common::coverage_dir(&[
        ("frobnitz.core.cover", include_str!("fixtures/frobnitz.core.cover")),
        ("frobnitz.util.cover", include_str!("fixtures/frobnitz.util.cover")),
    ]);
    let filenames = ingest::list_report_files(input.path()).unwrap();
    let tree = ingest::build_tree(&filenames, input.path()).unwrap();

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let highlighter = fallback_highlighter();
    for dir in [first.path(), second.path()] {
        report::generate_tree_pages(&tree, input.path(), dir, &highlighter, "fixed").unwrap();
        report::generate_overall_page(&tree, &dir.join("all.html"), "fixed").unwrap();
    }

    for name in [
        "frobnitz.html",
        "frobnitz.core.html",
        "frobnitz.util.html",
        "all.html",
    ] {
        let a = std::fs::read(first.path().join(name)).unwrap();
        let b = std::fs::read(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

/// An input directory that does not exist aborts the run.
#[test]
fn missing_input_directory_fails() {
    let output = tempfile::tempdir().unwrap();
    let result = report::make_coverage_reports(
        Path::new("/nonexistent/coverage"),
        &output.path().join("reports"),
        false,
        &fallback_highlighter(),
    );
    assert!(result.is_err());
}
