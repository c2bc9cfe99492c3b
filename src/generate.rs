//! Build orchestration.
//!
//! Turns each configured project into a servable directory under
//! `<build_dir>/<domain>/`. Projects are built one after another, and every
//! step reads and writes whole files.
//!
//! ## Per-Project Steps
//!
//! ```text
//! check domain ──▶ copy theme ──▶ robots/sitemap tokens ──▶ styles
//!                                                             │
//!     ┌───────────────────── data map non-empty ──────────────┘
//!     ▼
//! encrypt links ──▶ header meta / canonical / schema ──▶ placeholders +
//! shortcodes + alt/srcset ──▶ button links
//!     │
//!     ▼
//! copy plugins ──▶ button links in plugin data ──▶ admin key
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! build/
//! └── example.com/
//!     ├── header.php             # Meta, canonical and schema rewritten
//!     ├── index.php              # Placeholders and shortcodes expanded
//!     ├── encrypted.php          # Redirect map for btn_link* values
//!     ├── robots.txt             # {{DOMAIN}} substituted
//!     ├── sitemap.xml            # {{DOMAIN}} and {{DATE}} substituted
//!     ├── styles/styles.css      # Generated rules appended once
//!     └── plugins/
//!         └── tinymce/
//!             ├── data/content-1.html
//!             └── admin/admin.key
//! ```
//!
//! ## Failure Policy
//!
//! A directory that cannot be created aborts the whole run. An unsafe domain
//! skips its project. Everything else is best effort: a missing theme skips
//! the copy, missing files skip their step, failed writes are logged and the
//! build moves on.

use crate::config::{AdminConfig, Config, Project, is_safe_domain};
use crate::content::DATA_SUBDIR;
use crate::html::{
    add_missing_alt_attributes, add_responsive_srcset, apply_canonical_link, apply_schema_flags,
    apply_static_header_data,
};
use crate::links::{generate_encrypted_links_file, process_button_links_by_class};
use crate::pattern::{PatternSet, is_markup_file};
use crate::placeholder::replace_data_placeholders;
use crate::plugin::PluginRegistry;
use crate::shortcode::ShortcodeProcessor;
use crate::styles::write_styles;
use crate::theme::{copy_dir_no_overwrite, resolve_theme};
use crate::types::{BuildReport, ProjectReport};
use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Static files that carry `{{DOMAIN}}`/`{{DATE}}` tokens.
pub const TOKEN_FILES: [&str; 2] = ["robots.txt", "sitemap.xml"];

/// Where plugins are installed inside a domain root.
pub const PLUGINS_SUBDIR: &str = "plugins";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to remove build directory {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create a directory and its parents, or fail the build.
pub fn ensure_dir(path: &Path) -> Result<(), GenerateError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| GenerateError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove the build output root. Returns whether anything was removed.
pub fn clean_build_dir(path: &Path) -> Result<bool, GenerateError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(|source| GenerateError::Clean {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Build every project in list order.
///
/// `base` is the directory config paths resolve against. With `clean` the
/// build directory is removed first.
pub fn generate(
    config: &Config,
    base: &Path,
    plugins: &PluginRegistry,
    clean: bool,
) -> Result<BuildReport, GenerateError> {
    let build_dir = base.join(&config.build_dir);
    let cleaned = clean && clean_build_dir(&build_dir)?;
    if cleaned {
        info!("removed {}", build_dir.display());
    }
    ensure_dir(&build_dir)?;

    let mut projects = Vec::with_capacity(config.projects.len());
    for project in &config.projects {
        let report = build_project(project, base, &build_dir, &config.admin, plugins)?;
        projects.push(report);
    }

    Ok(BuildReport {
        build_dir,
        cleaned,
        projects,
    })
}

/// Why a project cannot be built, if it cannot.
pub fn skip_reason(project: &Project) -> Option<String> {
    if !is_safe_domain(&project.domain) {
        return Some(format!("unsafe domain name '{}'", project.domain));
    }
    None
}

/// Why a project's theme cannot be copied, if it cannot.
///
/// The rest of the build still runs over whatever the domain root holds.
pub fn theme_problem(project: &Project, base: &Path) -> Option<String> {
    if project.theme.trim().is_empty() {
        return Some("no theme configured".to_string());
    }
    let theme = resolve_theme(base, &project.theme);
    if !theme.is_dir() {
        return Some(format!("theme not found: {}", theme.display()));
    }
    None
}

/// Build one project into `<build_dir>/<domain>`.
pub fn build_project(
    project: &Project,
    base: &Path,
    build_dir: &Path,
    admin: &AdminConfig,
    plugins: &PluginRegistry,
) -> Result<ProjectReport, GenerateError> {
    if let Some(reason) = skip_reason(project) {
        warn!("skipping project '{}': {}", project.domain, reason);
        return Ok(ProjectReport::skipped(&project.domain, reason));
    }

    let root = build_dir.join(&project.domain);
    let theme = resolve_theme(base, &project.theme);
    ensure_dir(&root)?;

    let mut report = ProjectReport {
        domain: project.domain.clone(),
        root: root.clone(),
        theme: theme.clone(),
        ..ProjectReport::default()
    };

    match theme_problem(project, base) {
        Some(problem) => {
            warn!("project '{}': {}, theme copy skipped", project.domain, problem);
            report.theme_problem = Some(problem);
        }
        None => report.files_copied = copy_dir_no_overwrite(&theme, &root)?,
    }
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    report.files_substituted += apply_site_tokens(&root, &project.domain, &today);
    report.style_lines = write_styles(&root, &project.styles)?;

    if !project.data.is_empty() {
        let (data, links) = generate_encrypted_links_file(&root, &project.data);
        report.links_encrypted = links.len();

        report.header_updated |= apply_static_header_data(&root, &data);
        report.header_updated |= apply_canonical_link(&root, project);
        let outcomes = apply_schema_flags(&root, project);
        report.schema = ["shema1", "shema2"]
            .iter()
            .map(|name| name.to_string())
            .zip(outcomes)
            .collect();

        let patterns = PatternSet::new(&project.postprocess);
        report.files_substituted += postprocess_files(&root, &patterns, &data, plugins);
        report.buttons_injected += process_button_links_by_class(&root, &data);
        report.plugin_files = copy_plugins(&root, plugins)?;
        for plugin in plugins.plugins() {
            let data_dir = root
                .join(PLUGINS_SUBDIR)
                .join(plugin.dir_name())
                .join(DATA_SUBDIR);
            report.buttons_injected += process_button_links_by_class(&data_dir, &data);
        }
    } else {
        debug!("project '{}' has no data, skipping data passes", project.domain);
        report.plugin_files = copy_plugins(&root, plugins)?;
    }

    report.admin_warning = provision_admin_key(&root, admin)?;
    Ok(report)
}

/// Replace `{{DOMAIN}}` and `{{DATE}}` in a file's content.
pub fn substitute_tokens(content: &str, domain: &str, date: &str) -> String {
    content
        .replace("{{DOMAIN}}", domain)
        .replace("{{DATE}}", date)
}

/// Substitute tokens in `robots.txt` and `sitemap.xml`, when present.
fn apply_site_tokens(root: &Path, domain: &str, date: &str) -> usize {
    let mut changed = 0;
    for name in TOKEN_FILES {
        let path = root.join(name);
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        let updated = substitute_tokens(&content, domain, date);
        if updated == content {
            continue;
        }
        match fs::write(&path, updated) {
            Ok(()) => changed += 1,
            Err(e) => warn!("could not write {}: {}", path.display(), e),
        }
    }
    changed
}

/// Placeholder, shortcode and image-attribute pass over every selected file.
///
/// Files that are not valid UTF-8 are skipped. Returns the number of files
/// rewritten.
fn postprocess_files(
    root: &Path,
    patterns: &PatternSet,
    data: &crate::config::DataMap,
    plugins: &PluginRegistry,
) -> usize {
    let mut processor = ShortcodeProcessor::new(plugins.shortcodes());
    let mut rewritten = 0;
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !patterns.should_process(root, path) {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            debug!("skipping unreadable {}", path.display());
            continue;
        };
        processor.set_current_file(path);
        let mut updated = replace_data_placeholders(&content, data);
        updated = processor.process(&updated);
        if is_markup_file(path) {
            updated = add_missing_alt_attributes(&updated);
            updated = add_responsive_srcset(&updated, root);
        }
        if updated == content {
            continue;
        }
        match fs::write(path, updated) {
            Ok(()) => rewritten += 1,
            Err(e) => warn!("could not write {}: {}", path.display(), e),
        }
    }
    rewritten
}

/// Mirror every loaded plugin into `<root>/plugins/<dir name>`.
fn copy_plugins(root: &Path, plugins: &PluginRegistry) -> Result<usize, GenerateError> {
    let mut copied = 0;
    for plugin in plugins.plugins() {
        let target = root.join(PLUGINS_SUBDIR).join(plugin.dir_name());
        copied += copy_dir_no_overwrite(&plugin.dir, &target)?;
    }
    Ok(copied)
}

/// Argon2 PHC hash of a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Write the default admin key when the domain has none.
///
/// Returns the warning to show the user when a key was written.
pub fn provision_admin_key(
    root: &Path,
    admin: &AdminConfig,
) -> Result<Option<String>, GenerateError> {
    let path = root.join(&admin.key_file);
    if path.exists() {
        return Ok(None);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let hash = match hash_password(&admin.default_password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("could not hash default admin password: {}", e);
            return Ok(None);
        }
    };
    if let Err(e) = fs::write(&path, hash) {
        warn!("could not write {}: {}", path.display(), e);
        return Ok(None);
    }
    let message = format!(
        "default admin password '{}' written to {}, change it",
        admin.default_password,
        path.display()
    );
    warn!("{}", message);
    Ok(Some(message))
}
