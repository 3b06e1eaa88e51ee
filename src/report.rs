//! HTML report rendering.
//!
//! One page is written per non-root tree node, named after its dotted
//! path, plus an `all.html` summary listing every node. Pages link to
//! each other through the path/URL helpers below.

use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::process::Command;

use chrono::Utc;

use crate::error::Result;
use crate::highlight::Highlighter;
use crate::ingest;
use crate::tree::CoverageNode;

/// Full dotted name of a node; the root is "everything".
#[must_use]
pub fn index_to_name(index: &[String]) -> String {
    if index.is_empty() {
        "everything".to_string()
    } else {
        index.join(".")
    }
}

/// Relative URL of a node's HTML page.
#[must_use]
pub fn index_to_url(index: &[String]) -> String {
    if index.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}.html", index.join("."))
    }
}

/// Name of the plain-text listing backing a node.
#[must_use]
pub fn index_to_filename(index: &[String]) -> String {
    if index.is_empty() {
        String::new()
    } else {
        format!("{}{}", index.join("."), ingest::COVER_EXTENSION)
    }
}

/// Last path segment, indented one step per level of nesting; used for
/// the tree-shaped listing in page tables.
#[must_use]
pub fn index_to_nice_name(index: &[String]) -> String {
    match index.last() {
        Some(last) => format!("{}{}", "&nbsp;".repeat(4 * (index.len() - 1)), last),
        None => "Everything".to_string(),
    }
}

/// Colour band for a coverage bar. Thresholds are inclusive at the lower
/// bound of each band.
#[must_use]
pub fn percent_to_colour(percent: u64) -> &'static str {
    if percent == 100 {
        "green"
    } else if percent >= 90 {
        "yellow"
    } else if percent >= 80 {
        "orange"
    } else {
        "red"
    }
}

const STYLE: &str = "\
  <style type=\"text/css\">
    a {text-decoration: none; display: block; padding-right: 1em;}
    a:hover {background: #EFA;}
    hr {height: 1px; border: none; border-top: 1px solid gray;}
    .notcovered {background: #FCC;}
    .footer {margin: 2em; font-size: small; color: gray;}
  </style>
";

/// Six `>` characters as they appear after HTML escaping.
const ESCAPED_MARKER: &str = "&gt;&gt;&gt;&gt;&gt;&gt;";

fn page_header(name: &str) -> String {
    format!(
        "<html>\n  <head><title>Test coverage for {name}</title>\n{STYLE}  </head>\n  <body><h1>Test coverage for {name}</h1>\n  <table>\n"
    )
}

fn page_footer(footer: &str) -> String {
    format!("  <div class=\"footer\">\n  {footer}\n  </div>\n</body>\n</html>\n")
}

fn table_row(node: &CoverageNode, index: &[String]) -> String {
    let (covered, total) = node.coverage();
    let uncovered = total - covered;
    let percent = node.percent();
    let mut nice_name = index_to_nice_name(index);
    if node.is_leaf() {
        nice_name.push_str(".py");
    } else {
        nice_name.push('/');
    }
    format!(
        "<tr><td><a href=\"{url}\">{nice_name}</a></td> <td style=\"background: {colour}\">&nbsp;&nbsp;&nbsp;&nbsp;</td> <td>covered {percent}% ({uncovered} of {total} uncovered)</td></tr>\n",
        url = index_to_url(index),
        colour = percent_to_colour(percent),
    )
}

/// Wrap never-executed lines of a highlighted listing in a marker `div`.
///
/// The uncovered marker may have been HTML-escaped, and the highlighter
/// may have put markup directly in front of it, so both the escaped
/// marker at the start of a line and the escaped marker right after a
/// tag's closing `>` are recognized.
fn mark_uncovered_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        if content.starts_with(ESCAPED_MARKER) || content.contains(&format!(">{ESCAPED_MARKER}")) {
            out.push_str(&format!("<div class=\"notcovered\">{content}</div>"));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Render the page for the node at `my_index`.
///
/// The table lists every ancestor of the node and its direct children;
/// for module pages the annotated source listing is appended.
#[must_use]
pub fn render_page(
    tree: &CoverageNode,
    my_index: &[String],
    input_dir: &Path,
    highlighter: &Highlighter,
    footer: &str,
) -> String {
    let mut related: Vec<Vec<String>> = Vec::new();
    tree.traverse(&mut |_, path| {
        let is_ancestor_or_self =
            path.len() <= my_index.len() && path == &my_index[..path.len()];
        let is_child =
            path.len() == my_index.len() + 1 && &path[..my_index.len()] == my_index;
        if is_ancestor_or_self || is_child {
            related.push(path.to_vec());
        }
    });

    let mut rows: Vec<(Vec<String>, &CoverageNode)> = related
        .into_iter()
        .filter_map(|path| tree.get_at(&path).map(|node| (path, node)))
        .collect();
    rows.sort_by_key(|(path, node)| {
        (
            path.len(),
            Reverse(node.uncovered()),
            path.last().cloned().unwrap_or_default(),
        )
    });

    let mut html = page_header(&index_to_name(my_index));
    for (path, node) in &rows {
        if path.is_empty() {
            continue; // the root has no page of its own
        }
        html.push_str(&table_row(node, path));
    }
    html.push_str("</table><hr/>\n");

    if tree.get_at(my_index).is_some_and(CoverageNode::is_leaf) {
        let listing = input_dir.join(index_to_filename(my_index));
        let text = mark_uncovered_lines(&highlighter.highlight_file(&listing));
        html.push_str(&format!("<pre>{text}</pre>\n"));
    }

    html.push_str(&page_footer(footer));
    html
}

/// Render the overall summary page: every node in the tree, ordered by
/// uncovered-line count (worst first) with the name as tie-break.
#[must_use]
pub fn render_overall_page(tree: &CoverageNode, footer: &str) -> String {
    let title: Vec<&str> = tree.children().keys().map(String::as_str).collect();
    let mut html = page_header(&title.join(", "));

    let mut ordered: Vec<Vec<String>> = Vec::new();
    tree.traverse_ordered(
        &|name, node| (Reverse(node.uncovered()), name.to_string()),
        &mut |_, path| {
            if !path.is_empty() {
                ordered.push(path.to_vec());
            }
        },
    );
    for path in &ordered {
        if let Some(node) = tree.get_at(path) {
            html.push_str(&table_row(node, path));
        }
    }

    html.push_str("</table><hr/>\n");
    html.push_str(&page_footer(footer));
    html
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(html.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write one HTML page per non-root tree node into `output_dir`.
pub fn generate_tree_pages(
    tree: &CoverageNode,
    input_dir: &Path,
    output_dir: &Path,
    highlighter: &Highlighter,
    footer: &str,
) -> Result<()> {
    let mut indexes: Vec<Vec<String>> = Vec::new();
    tree.traverse(&mut |_, path| {
        if !path.is_empty() {
            indexes.push(path.to_vec());
        }
    });
    for index in &indexes {
        let html = render_page(tree, index, input_dir, highlighter, footer);
        write_page(&output_dir.join(index_to_url(index)), &html)?;
    }
    Ok(())
}

/// Write the overall summary page to `output_path`.
pub fn generate_overall_page(tree: &CoverageNode, output_path: &Path, footer: &str) -> Result<()> {
    write_page(output_path, &render_overall_page(tree, footer))
}

/// Version-control revision of the tree being reported on, for the page
/// footer. Degrades to "UNKNOWN" when the directory is not a checkout or
/// git is unavailable.
#[must_use]
pub fn get_revision(path: &Path) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--short", "HEAD"])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let rev = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if rev.is_empty() {
                "UNKNOWN".to_string()
            } else {
                rev
            }
        }
        _ => "UNKNOWN".to_string(),
    }
}

/// Convert the listings in `input_dir` into HTML files in `output_dir`.
pub fn make_coverage_reports(
    input_dir: &Path,
    output_dir: &Path,
    verbose: bool,
    highlighter: &Highlighter,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    if verbose {
        println!("Loading coverage reports from {}", input_dir.display());
    }
    let filenames = ingest::list_report_files(input_dir)?;
    let tree = ingest::build_tree(&filenames, input_dir)?;
    if verbose {
        println!("{tree}");
    }

    let revision = get_revision(&input_dir.join(".."));
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.6f");
    let footer = format!("Generated for revision {revision} on {timestamp}Z");

    generate_tree_pages(&tree, input_dir, output_dir, highlighter, &footer)?;
    generate_overall_page(&tree, &output_dir.join("all.html"), &footer)?;
    if verbose {
        println!("Generated HTML files in {}", output_dir.display());
    }
    Ok(())
}
