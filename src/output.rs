//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **project-centric, not file-centric**. Each project leads with
//! its positional index and domain; what the build did is shown as indented
//! context lines underneath. Individual file paths only appear in `log`
//! diagnostics (`RUST_LOG=debug`).
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! 001 example.com → build/example.com
//!     Theme: themes/basic
//!     Copied: 6 files
//!     Substituted: 3 files
//!     Links: 1 encrypted, 2 files with buttons
//!     Styles: 2 new lines
//!     Header: updated
//!     shema1: included
//!     shema2: removed
//!     Plugins: 3 files
//! 002 ../evil (skipped: unsafe domain name '../evil')
//!
//! default admin password 'admin' written to build/example.com/plugins/tinymce/admin/admin.key, change it
//!
//! Built 1 project, skipped 1, copied 6 files
//! ```
//!
//! ## Check
//!
//! ```text
//! Projects
//! 001 example.com (themes/basic)
//! 002 ../evil (skipped: unsafe domain name '../evil')
//!
//! Plugins
//! 001 tinymce
//!     Shortcodes: content
//!     Functions: loadTinyContent
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::Config;
use crate::generate::{skip_reason, theme_problem};
use crate::html::SchemaOutcome;
use crate::plugin::PluginRegistry;
use crate::types::{BuildReport, ProjectReport};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn schema_label(outcome: SchemaOutcome) -> &'static str {
    match outcome {
        SchemaOutcome::Included => "included",
        SchemaOutcome::Removed => "removed",
        SchemaOutcome::AlreadyIncluded => "already included",
        SchemaOutcome::Missing => "missing include, rebuild with --clean",
        SchemaOutcome::Absent => "off",
    }
}

/// Skipped entity line: `002 name (skipped: reason)`.
fn skipped_line(index: usize, domain: &str, reason: &str) -> String {
    format!("{} {} (skipped: {})", format_index(index), domain, reason)
}

// ============================================================================
// Build output
// ============================================================================

/// Lines for one project of a build.
pub fn format_project_report(index: usize, report: &ProjectReport) -> Vec<String> {
    if let Some(reason) = &report.skipped {
        return vec![skipped_line(index, &report.domain, reason)];
    }
    let ctx = indent(1);
    let mut lines = vec![format!(
        "{} {} \u{2192} {}",
        format_index(index),
        report.domain,
        report.root.display()
    )];
    match &report.theme_problem {
        Some(problem) => lines.push(format!("{ctx}Theme: not copied ({problem})")),
        None => lines.push(format!("{ctx}Theme: {}", report.theme.display())),
    }
    lines.push(format!("{ctx}Copied: {}", plural(report.files_copied, "file")));
    if report.files_substituted > 0 {
        lines.push(format!(
            "{ctx}Substituted: {}",
            plural(report.files_substituted, "file")
        ));
    }
    if report.links_encrypted > 0 || report.buttons_injected > 0 {
        lines.push(format!(
            "{ctx}Links: {} encrypted, {} with buttons",
            report.links_encrypted,
            plural(report.buttons_injected, "file")
        ));
    }
    if report.style_lines > 0 {
        lines.push(format!(
            "{ctx}Styles: {} new {}",
            report.style_lines,
            if report.style_lines == 1 { "line" } else { "lines" }
        ));
    }
    if report.header_updated {
        lines.push(format!("{ctx}Header: updated"));
    }
    for (name, outcome) in &report.schema {
        lines.push(format!("{ctx}{}: {}", name, schema_label(*outcome)));
    }
    if report.plugin_files > 0 {
        lines.push(format!("{ctx}Plugins: {}", plural(report.plugin_files, "file")));
    }
    lines
}

/// Format the full build report.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.cleaned {
        lines.push(format!("Cleaned {}", report.build_dir.display()));
    }
    for (i, project) in report.projects.iter().enumerate() {
        lines.extend(format_project_report(i + 1, project));
    }

    let warnings: Vec<&str> = report
        .projects
        .iter()
        .filter_map(|p| p.admin_warning.as_deref())
        .collect();
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.extend(warnings.iter().map(|w| w.to_string()));
    }

    lines.push(String::new());
    lines.push(format!(
        "Built {}, skipped {}, copied {}",
        plural(report.built(), "project"),
        report.skipped(),
        plural(report.files_copied(), "file")
    ));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format what a build would do, without touching the filesystem beyond
/// existence checks.
pub fn format_check_output(config: &Config, base: &Path, plugins: &PluginRegistry) -> Vec<String> {
    let mut lines = vec!["Projects".to_string()];
    if config.projects.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, project) in config.projects.iter().enumerate() {
        if let Some(reason) = skip_reason(project) {
            lines.push(skipped_line(i + 1, &project.domain, &reason));
            continue;
        }
        let theme = match theme_problem(project, base) {
            Some(problem) => format!("{problem}, copy skipped"),
            None => project.theme.clone(),
        };
        lines.push(format!("{} {} ({})", format_index(i + 1), project.domain, theme));
    }

    lines.push(String::new());
    lines.push("Plugins".to_string());
    if plugins.plugins().is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, plugin) in plugins.plugins().iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), plugin.name));
        if !plugin.shortcodes.is_empty() {
            let tags: Vec<&str> = plugin.shortcodes.iter().map(|(t, _)| t.as_str()).collect();
            lines.push(format!("{}Shortcodes: {}", indent(1), tags.join(", ")));
        }
        if !plugin.functions.is_empty() {
            let names: Vec<&str> = plugin.functions.iter().map(|(n, _)| n.as_str()).collect();
            lines.push(format!("{}Functions: {}", indent(1), names.join(", ")));
        }
    }
    lines
}

/// Print check output to stdout.
pub fn print_check_output(config: &Config, base: &Path, plugins: &PluginRegistry) {
    for line in format_check_output(config, base, plugins) {
        println!("{}", line);
    }
}

// ============================================================================
// Content blocks
// ============================================================================

/// Format the block listing of one data directory.
pub fn format_block_list(ids: &[u32], dir: &Path) -> Vec<String> {
    let mut lines = vec![format!("Blocks in {}", dir.display())];
    if ids.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for id in ids {
        lines.push(format!(
            "{}{} \u{2192} [content id=\"{}\"]",
            indent(1),
            crate::content::block_file_name(*id),
            id
        ));
    }
    lines
}
