/// Parser for trace-style annotated coverage listings (`.cover` files).
///
/// Each line of a listing mirrors one source line, prefixed with a fixed
/// 7-character status field:
///
///   `       `   (all spaces) the line is not executable
///   `  NNN: `   the line was executed NNN times
///   `>>>>>> `   the line is executable but was never executed
///
/// The execution count is informational only and is never parsed; lines
/// are classified purely by structure.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;

/// Width of the status prefix in front of every source line.
const PREFIX_WIDTH: usize = 7;

/// Marker prefix on executable lines that were never executed.
const UNCOVERED_MARKER: &str = ">>>>>>";

/// Classification of a single listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Not executable; does not count toward any total.
    NotExecutable,
    /// Executable and executed at least once.
    Covered,
    /// Executable but never executed.
    Uncovered,
}

/// Classify one listing line (without its trailing newline).
///
/// Lines too short to carry a status prefix, or whose prefix is all
/// spaces, are not executable. The remaining lines are executable and
/// split on the `>>>>>>` marker.
#[must_use]
pub fn classify(line: &str) -> LineKind {
    let mut width = 0;
    let mut all_spaces = true;
    for c in line.chars().take(PREFIX_WIDTH) {
        width += 1;
        all_spaces &= c == ' ';
    }
    if width < PREFIX_WIDTH || all_spaces {
        LineKind::NotExecutable
    } else if line.starts_with(UNCOVERED_MARKER) {
        LineKind::Uncovered
    } else {
        LineKind::Covered
    }
}

/// Accumulated line counts for one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub covered: u64,
    pub uncovered: u64,
}

impl Tally {
    /// Total number of executable lines.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.covered + self.uncovered
    }
}

/// Tally every line read from `reader`.
fn tally_lines(reader: impl BufRead) -> Result<Tally> {
    let mut tally = Tally::default();
    for line in reader.lines() {
        match classify(&line?) {
            LineKind::NotExecutable => {}
            LineKind::Covered => tally.covered += 1,
            LineKind::Uncovered => tally.uncovered += 1,
        }
    }
    Ok(tally)
}

/// Tally a coverage listing on disk.
///
/// Fails with an I/O error if the file cannot be opened or read; callers
/// obtain filenames from a directory scan, so a failure here points at an
/// external race or a permissions problem and is not swallowed.
pub fn tally_file(path: &Path) -> Result<Tally> {
    let file = File::open(path)?;
    tally_lines(BufReader::new(file))
}

/// Tally a listing and return `(covered, total)`, the report tree's shape.
pub fn parse_file(path: &Path) -> Result<(u64, u64)> {
    let tally = tally_file(path)?;
    Ok((tally.covered, tally.total()))
}

/// Tally a listing and return `(covered, uncovered)`, the diff engine's shape.
pub fn count_coverage(path: &Path) -> Result<(u64, u64)> {
    let tally = tally_file(path)?;
    Ok((tally.covered, tally.uncovered))
}
