//! Syntax highlighting via an external command, with a plain-text
//! fallback when the command is unavailable or misbehaves.

use std::path::Path;
use std::process::Command;

/// Escape `&`, `<` and `>` for embedding in HTML text content.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// External highlighter invocation: `<program> <args...> <file>`,
/// expected to emit HTML with the highlighted code between `<PRE>` and
/// `</PRE>` on stdout.
pub struct Highlighter {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Highlighter {
    /// The enscript invocation used by the classic report generator.
    fn default() -> Self {
        Self {
            program: "enscript".to_string(),
            args: [
                "-q",
                "--footer",
                "--header",
                "-h",
                "--language=html",
                "--highlight=python",
                "--color",
                "-o",
                "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Highlighter {
    /// Return highlighted HTML for `path`.
    ///
    /// Never fails: if the external command cannot be launched, exits
    /// non-zero, or produces output without a `<PRE>` block, the file is
    /// rendered as escaped plain text instead. An unreadable source file
    /// degrades to an empty listing.
    #[must_use]
    pub fn highlight_file(&self, path: &Path) -> String {
        match self.run(path) {
            Some(html) => html,
            None => escape(&std::fs::read_to_string(path).unwrap_or_default()),
        }
    }

    fn run(&self, path: &Path) -> Option<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8(output.stdout).ok()?;
        let start = text.find("<PRE>")? + "<PRE>".len();
        let end = text[start..].find("</PRE>")? + start;
        Some(text[start..end].to_string())
    }
}
