use std::fs;

use tempfile::TempDir;

/// Materialize a directory of coverage listings from (filename, body)
/// pairs. The caller must hold onto the `TempDir` to keep it alive.
pub fn coverage_dir(listings: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in listings {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

/// Build a listing with the given number of covered and uncovered lines.
pub fn listing(covered: usize, uncovered: usize) -> String {
    let mut text = String::new();
    for _ in 0..covered {
        text.push_str("    1: pass\n");
    }
    for _ in 0..uncovered {
        text.push_str(">>>>>> pass\n");
    }
    text
}
