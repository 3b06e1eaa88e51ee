//! Compare the coverage listings of two test runs and flag regressions:
//! newly added untested lines in existing modules, or brand-new modules
//! that arrive with untested lines. Improvements are deliberately not
//! reported, and old-only files (deleted or renamed modules) are skipped.
//!
//! Every finding is routed through a pluggable [`Reporter`] sink so the
//! same comparison can print to stdout or accumulate into an email body.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::ingest::COVER_EXTENSION;
use crate::mail::Mailer;
use crate::parse;

/// Compile raw `--include`/`--exclude` patterns. Happens before any
/// directory is touched, so a bad pattern fails fast.
pub fn compile_patterns(patterns: &[String]) -> crate::error::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Ok(Regex::new(p)?))
        .collect()
}

/// Whether `name` matches any of the given patterns (unanchored search).
#[must_use]
pub fn matches(name: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|regex| regex.is_match(name))
}

/// Keep the names that match at least one include pattern (an empty
/// include list matches everything) and no exclude pattern.
#[must_use]
pub fn filter_files(names: Vec<String>, include: &[Regex], exclude: &[Regex]) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| include.is_empty() || matches(name, include))
        .filter(|name| !matches(name, exclude))
        .collect()
}

/// List coverage listings in `dir`. Names from tracing synthesized code
/// (e.g. `<doctest ...>`) are skipped.
pub fn find_coverage_files(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list coverage files in {}", dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(COVER_EXTENSION) && !name.starts_with('<') {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Module name for a listing path: the filename with `.cover` stripped.
#[must_use]
pub fn module_name(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.strip_suffix(COVER_EXTENSION).unwrap_or(name).to_string()
}

/// Join a base URL and a page name with exactly one slash between them.
#[must_use]
pub fn urljoin(base: &str, page: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), page)
}

/// Sink for regression findings.
pub trait Reporter {
    /// Record one regression in the listing at `filename`.
    fn warn(&mut self, filename: &Path, message: &str);
}

/// Reporter that prints findings to stdout as they are found.
pub struct ReportPrinter {
    web_url: Option<String>,
}

impl ReportPrinter {
    #[must_use]
    pub fn new(web_url: Option<String>) -> Self {
        Self { web_url }
    }
}

impl Reporter for ReportPrinter {
    fn warn(&mut self, filename: &Path, message: &str) {
        let module = module_name(filename);
        println!("{module}: {message}");
        if let Some(ref base) = self.web_url {
            println!("See {}", urljoin(base, &format!("{module}.html")));
            println!();
        }
    }
}

/// Reporter that collects findings and sends them as a single email,
/// but only if there was anything to report.
pub struct ReportEmailer {
    from: Option<String>,
    to: String,
    subject: String,
    web_url: Option<String>,
    mailer: Box<dyn Mailer>,
    warnings: Vec<String>,
}

impl ReportEmailer {
    #[must_use]
    pub fn new(
        from: Option<String>,
        to: String,
        subject: String,
        web_url: Option<String>,
        mailer: Box<dyn Mailer>,
    ) -> Self {
        Self {
            from,
            to,
            subject,
            web_url,
            mailer,
            warnings: Vec::new(),
        }
    }

    /// Send the collected findings. A run without regressions sends
    /// nothing.
    pub fn send(self) -> Result<()> {
        if self.warnings.is_empty() {
            return Ok(());
        }
        let body = self.warnings.join("\n");
        self.mailer
            .send(self.from.as_deref(), &self.to, &self.subject, &body)
    }
}

impl Reporter for ReportEmailer {
    fn warn(&mut self, filename: &Path, message: &str) {
        let module = module_name(filename);
        self.warnings.push(format!("{module}: {message}"));
        if let Some(ref base) = self.web_url {
            let url = urljoin(base, &format!("{module}.html"));
            self.warnings.push(format!("See {url}\n"));
        }
    }
}

/// Compare one listing present in both snapshots.
fn compare_file(oldfile: &Path, newfile: &Path, reporter: &mut dyn Reporter) -> Result<()> {
    let (_, old_uncovered) = parse::count_coverage(oldfile)?;
    let (_, new_uncovered) = parse::count_coverage(newfile)?;
    if new_uncovered > old_uncovered {
        let increase = new_uncovered - old_uncovered;
        reporter.warn(newfile, &format!("{increase} new lines of untested code"));
    }
    Ok(())
}

/// Check a listing that only exists in the new snapshot.
fn new_file(newfile: &Path, reporter: &mut dyn Reporter) -> Result<()> {
    let (covered, uncovered) = parse::count_coverage(newfile)?;
    if uncovered > 0 {
        let total = covered + uncovered;
        reporter.warn(
            newfile,
            &format!("new file with {uncovered} lines of untested code (out of {total})"),
        );
    }
    Ok(())
}

/// Compare two directories of coverage listings, routing findings
/// through `reporter`. Listings are matched by bare filename and
/// processed in name order.
pub fn compare_dirs(
    olddir: &Path,
    newdir: &Path,
    include: &[Regex],
    exclude: &[Regex],
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let old_files = filter_files(find_coverage_files(olddir)?, include, exclude);
    let mut new_files = filter_files(find_coverage_files(newdir)?, include, exclude);
    new_files.sort();

    for name in &new_files {
        if old_files.contains(name) {
            compare_file(&olddir.join(name), &newdir.join(name), reporter)?;
        } else {
            new_file(&newdir.join(name), reporter)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Test sink that records formatted findings.
    #[derive(Default)]
    struct Recorder {
        messages: Vec<String>,
    }

    impl Reporter for Recorder {
        fn warn(&mut self, filename: &Path, message: &str) {
            self.messages
                .push(format!("{}: {}", module_name(filename), message));
        }
    }

    fn regexes(patterns: &[&str]) -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    /// A listing with the given covered/uncovered line counts.
    fn listing(covered: u64, uncovered: u64) -> String {
        let mut text = String::new();
        for _ in 0..covered {
            text.push_str("    1: pass\n");
        }
        for _ in 0..uncovered {
            text.push_str(">>>>>> pass\n");
        }
        text
    }

    #[test]
    fn test_matches() {
        assert!(matches("foo", &regexes(&["x", "o"])));
        assert!(!matches("foo", &regexes(&["x", "f$"])));
        assert!(!matches("foo", &[]));
    }

    #[test]
    fn test_filter_files() {
        let names = || {
            vec![
                "ivija.food".to_string(),
                "ivija.food.tests".to_string(),
                "other.ivija".to_string(),
            ]
        };
        assert_eq!(
            filter_files(names(), &regexes(&["^ivija"]), &regexes(&["tests"])),
            ["ivija.food"]
        );
        assert_eq!(
            filter_files(names(), &[], &regexes(&["tests"])),
            ["ivija.food", "other.ivija"]
        );
        assert_eq!(
            filter_files(names(), &regexes(&["^ivija"]), &[]),
            ["ivija.food", "ivija.food.tests"]
        );
        assert_eq!(
            filter_files(names(), &[], &[]),
            ["ivija.food", "ivija.food.tests", "other.ivija"]
        );
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name(Path::new("/tmp/frob.somepkg.cover")), "frob.somepkg");
        assert_eq!(module_name(Path::new("plain.cover")), "plain");
    }

    #[test]
    fn test_urljoin() {
        assert_eq!(
            urljoin("http://example.com", "a.html"),
            "http://example.com/a.html"
        );
        assert_eq!(
            urljoin("http://example.com/", "a.html"),
            "http://example.com/a.html"
        );
    }

    #[test]
    fn test_regression_in_existing_file() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(old.path().join("pkg.mod.cover"), listing(8, 2)).unwrap();
        fs::write(new.path().join("pkg.mod.cover"), listing(5, 5)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(old.path(), new.path(), &[], &[], &mut recorder).unwrap();
        assert_eq!(
            recorder.messages,
            ["pkg.mod: 3 new lines of untested code"]
        );
    }

    #[test]
    fn test_improvement_is_silent() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(old.path().join("pkg.mod.cover"), listing(5, 5)).unwrap();
        fs::write(new.path().join("pkg.mod.cover"), listing(9, 1)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(old.path(), new.path(), &[], &[], &mut recorder).unwrap();
        assert!(recorder.messages.is_empty());
    }

    #[test]
    fn test_new_file_with_untested_lines() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(new.path().join("pkg.fresh.cover"), listing(5, 3)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(old.path(), new.path(), &[], &[], &mut recorder).unwrap();
        assert_eq!(
            recorder.messages,
            ["pkg.fresh: new file with 3 lines of untested code (out of 8)"]
        );
    }

    #[test]
    fn test_fully_covered_new_file_is_silent() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(new.path().join("pkg.fresh.cover"), listing(4, 0)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(old.path(), new.path(), &[], &[], &mut recorder).unwrap();
        assert!(recorder.messages.is_empty());
    }

    #[test]
    fn test_deleted_file_is_ignored() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(old.path().join("pkg.gone.cover"), listing(0, 10)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(old.path(), new.path(), &[], &[], &mut recorder).unwrap();
        assert!(recorder.messages.is_empty());
    }

    #[test]
    fn test_excluded_files_are_not_compared() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        fs::write(old.path().join("pkg.mod.cover"), listing(8, 2)).unwrap();
        fs::write(new.path().join("pkg.mod.cover"), listing(5, 5)).unwrap();

        let mut recorder = Recorder::default();
        compare_dirs(
            old.path(),
            new.path(),
            &[],
            &regexes(&["pkg"]),
            &mut recorder,
        )
        .unwrap();
        assert!(recorder.messages.is_empty());
    }

    /// Mailer stub that records delivered messages.
    #[derive(Clone, Default)]
    struct MockMailer {
        sent: std::rc::Rc<std::cell::RefCell<Vec<(Option<String>, String, String, String)>>>,
    }

    impl Mailer for MockMailer {
        fn send(&self, from: Option<&str>, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.borrow_mut().push((
                from.map(str::to_string),
                to.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_emailer_sends_collected_warnings_as_one_body() {
        let mock = MockMailer::default();
        let mut emailer = ReportEmailer::new(
            Some("ci@example.com".to_string()),
            "dev@example.com".to_string(),
            "Unit test coverage regression".to_string(),
            Some("http://example.com/coverage".to_string()),
            Box::new(mock.clone()),
        );
        emailer.warn(Path::new("pkg.mod.cover"), "3 new lines of untested code");
        emailer.send().unwrap();

        let sent = mock.sent.borrow();
        assert_eq!(sent.len(), 1);
        let (from, to, subject, body) = &sent[0];
        assert_eq!(from.as_deref(), Some("ci@example.com"));
        assert_eq!(to, "dev@example.com");
        assert_eq!(subject, "Unit test coverage regression");
        assert_eq!(
            body,
            "pkg.mod: 3 new lines of untested code\nSee http://example.com/coverage/pkg.mod.html\n"
        );
    }

    #[test]
    fn test_emailer_sends_nothing_without_warnings() {
        let mock = MockMailer::default();
        let emailer = ReportEmailer::new(
            None,
            "dev@example.com".to_string(),
            "subject".to_string(),
            None,
            Box::new(mock.clone()),
        );
        emailer.send().unwrap();
        assert!(mock.sent.borrow().is_empty());
    }

    #[test]
    fn test_missing_directory_aborts() {
        let new = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::default();
        let result = compare_dirs(
            Path::new("/nonexistent/olddir"),
            new.path(),
            &[],
            &[],
            &mut recorder,
        );
        assert!(result.is_err());
    }
}
