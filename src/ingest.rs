//! Scan a directory of coverage listings and build the coverage tree.

use std::path::Path;

use crate::error::Result;
use crate::parse;
use crate::tree::CoverageNode;

/// Extension carried by every coverage listing.
pub const COVER_EXTENSION: &str = ".cover";

/// Segments that mark a file as test code rather than covered code.
const TEST_SEGMENTS: [&str; 2] = ["tests", "ftests"];

/// Whether a filename names a listing that belongs in the report tree.
///
/// Listings must end in `.cover`. Names starting with `<` come from
/// tracing synthesized code (e.g. `<doctest ...>`) and are skipped, as
/// are modules inside a `tests` or `ftests` package — the match is on
/// whole dotted segments, not substrings, so `testing.cover` stays in.
#[must_use]
pub fn is_report_file(filename: &str) -> bool {
    filename.ends_with(COVER_EXTENSION)
        && !filename.starts_with('<')
        && !filename
            .split('.')
            .any(|segment| TEST_SEGMENTS.contains(&segment))
}

/// Split a listing filename into its package/module path.
///
/// The trailing segment is the extension marker and is dropped:
/// `a.b.__init__.cover` becomes `["a", "b", "__init__"]`.
#[must_use]
pub fn module_path(filename: &str) -> Vec<String> {
    let mut segments: Vec<String> = filename.split('.').map(str::to_string).collect();
    segments.pop();
    segments
}

/// List report-worthy listing filenames in `dir`, sorted by name.
pub fn list_report_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if is_report_file(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Parse every listing in `filenames` (relative to `dir`) and build the
/// coverage tree. Filenames are independent; intermediate package nodes
/// are created on demand in whatever order the names arrive.
pub fn build_tree(filenames: &[String], dir: &Path) -> Result<CoverageNode> {
    let mut tree = CoverageNode::new();
    for filename in filenames {
        let path = module_path(filename);
        let (covered, total) = parse::parse_file(&dir.join(filename))?;
        tree.set_at(&path, covered, total)?;
    }
    Ok(tree)
}
