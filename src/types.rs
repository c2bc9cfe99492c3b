//! Build report types.
//!
//! The orchestrator returns one [`ProjectReport`] per configured project; the
//! output module turns them into the lines the CLI prints.

use crate::html::SchemaOutcome;
use std::path::PathBuf;

/// What one project's build did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectReport {
    pub domain: String,
    /// Domain output root, `<build_dir>/<domain>`.
    pub root: PathBuf,
    pub theme: PathBuf,
    /// Set when the theme could not be copied; the other steps still ran.
    pub theme_problem: Option<String>,
    /// Set when the project was not built at all.
    pub skipped: Option<String>,
    /// Theme files copied into the root (existing files are never counted).
    pub files_copied: usize,
    /// Files rewritten by token, placeholder or shortcode substitution.
    pub files_substituted: usize,
    pub links_encrypted: usize,
    /// Files whose button anchors were rewritten.
    pub buttons_injected: usize,
    pub style_lines: usize,
    pub header_updated: bool,
    /// Outcome per structured-data flag, `shema1` then `shema2`.
    pub schema: Vec<(String, SchemaOutcome)>,
    /// Plugin files copied into `<root>/plugins`.
    pub plugin_files: usize,
    /// Warning to show when a default admin key was provisioned.
    pub admin_warning: Option<String>,
}

impl ProjectReport {
    pub fn skipped(domain: &str, reason: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_built(&self) -> bool {
        self.skipped.is_none()
    }
}

/// Result of a full build run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub build_dir: PathBuf,
    /// Whether the build directory was removed first.
    pub cleaned: bool,
    pub projects: Vec<ProjectReport>,
}

impl BuildReport {
    pub fn built(&self) -> usize {
        self.projects.iter().filter(|p| p.is_built()).count()
    }

    pub fn skipped(&self) -> usize {
        self.projects.len() - self.built()
    }

    pub fn files_copied(&self) -> usize {
        self.projects.iter().map(|p| p.files_copied).sum()
    }
}
