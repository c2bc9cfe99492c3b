//! Glob-style path filtering.
//!
//! Decides which files in a build tree receive placeholder and shortcode
//! substitution. Patterns are matched against paths relative to the domain
//! root, both normalised to forward slashes with leading slashes removed:
//!
//! - `*` matches any run of characters except `/`
//! - `?` matches exactly one character
//! - everything else is literal, compared case-insensitively
//!
//! So `/*.php` selects `index.php` and `header.php` but not
//! `plugins/x/plugin.php`.

use regex::{Regex, RegexBuilder};
use std::path::Path;

/// Extensions processed when a project lists no patterns.
pub const DEFAULT_EXTENSIONS: &[&str] = &["php", "html", "htm", "css", "js", "json", "txt", "md", "svg"];

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Translate a glob into an anchored, case-insensitive regex.
fn compile(pattern: &str) -> Option<Regex> {
    let mut source = String::from("^");
    for ch in normalize(pattern).chars() {
        match ch {
            '*' => source.push_str("[^/]*"),
            '?' => source.push('.'),
            c => source.push_str(&regex::escape(&c.to_string())),
        }
    }
    source.push('$');
    RegexBuilder::new(&source).case_insensitive(true).build().ok()
}

/// Match a single glob against a relative path.
pub fn matches(pattern: &str, relative_path: &str) -> bool {
    compile(pattern).is_some_and(|re| re.is_match(&normalize(relative_path)))
}

/// A compiled list of globs, built once per project.
#[derive(Debug, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
    /// A list was given, even if none of its entries can match.
    supplied: bool,
}

impl PatternSet {
    /// Compile patterns. Empty entries match nothing.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            supplied: !patterns.is_empty(),
            patterns: patterns
                .iter()
                .map(|p| p.as_ref())
                .filter(|p| !p.is_empty())
                .filter_map(compile)
                .collect(),
        }
    }

    /// True when no list was given and the extension fallback applies.
    pub fn is_empty(&self) -> bool {
        !self.supplied
    }

    /// Whether `file` (somewhere under `root`) should be processed.
    ///
    /// With no pattern list, falls back to [`DEFAULT_EXTENSIONS`]. A list is
    /// authoritative even when none of its entries match anything.
    pub fn should_process(&self, root: &Path, file: &Path) -> bool {
        if !self.supplied {
            return has_text_extension(file);
        }
        let relative = file.strip_prefix(root).unwrap_or(file);
        let relative = normalize(&relative.to_string_lossy());
        self.patterns.iter().any(|re| re.is_match(&relative))
    }
}

/// Whether a file carries one of the [`DEFAULT_EXTENSIONS`].
pub fn has_text_extension(file: &Path) -> bool {
    file.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| DEFAULT_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether a file holds markup the HTML passes care about.
pub fn is_markup_file(file: &Path) -> bool {
    file.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "html" | "htm" | "php"))
}

/// Convenience wrapper: compile `patterns` and test one file.
pub fn should_process(root: &Path, file: &Path, patterns: &[String]) -> bool {
    PatternSet::new(patterns).should_process(root, file)
}
