//! Site configuration module.
//!
//! Handles loading and validating `sitepress.toml`. One file describes every
//! site to build: where the output goes, where plugins live, and a list of
//! projects, each with a domain, a theme, a data map and style rules.
//!
//! ## Config File Layout
//!
//! ```toml
//! build_dir = "build"
//! plugins_dir = "plugins"
//!
//! [admin]
//! key_file = "plugins/tinymce/admin/admin.key"
//! default_password = "admin"
//!
//! [[projects]]
//! domain = "example.com"
//! theme = "./themes/theme1"
//! canonical = ""
//! schema1 = true
//! schema2 = false
//! postprocess = ["/*.php"]
//!
//! [projects.data]
//! title = "Example"
//! btn_link1 = "https://partner.example/x"
//!
//! [[projects.styles]]
//! class = "header"
//! file = "styles/styles.css"
//! background = "#101010"
//! ```
//!
//! Paths are resolved against the directory that holds the config file.
//! Unknown keys are rejected to catch typos early, except inside
//! `[projects.data]` and style rules, which are free-form by nature.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file the CLI looks for by default.
pub const DEFAULT_CONFIG_FILE: &str = "sitepress.toml";

/// Stylesheet a style rule lands in when it names no `file`.
pub const DEFAULT_STYLE_FILE: &str = "styles/styles.css";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Free-form project data: key to scalar value, in file order.
pub type DataMap = toml::Table;

/// Top-level configuration loaded from `sitepress.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output root. Each project builds into `<build_dir>/<domain>/`.
    pub build_dir: String,
    /// Plugin root scanned for `*/plugin.toml` descriptors.
    pub plugins_dir: String,
    /// Default admin credential provisioning.
    pub admin: AdminConfig,
    /// Sites to build, in order.
    pub projects: Vec<Project>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_dir: "build".to_string(),
            plugins_dir: "plugins".to_string(),
            admin: AdminConfig::default(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Validate values the build relies on.
    ///
    /// Projects with an unusable domain are not an error here: the build
    /// skips them and reports why.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build_dir must not be empty".into(),
            ));
        }
        if self.plugins_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "plugins_dir must not be empty".into(),
            ));
        }
        if self.admin.key_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "admin.key_file must not be empty".into(),
            ));
        }
        if !is_contained_path(&self.admin.key_file) {
            return Err(ConfigError::Validation(format!(
                "admin.key_file must stay inside the domain root: {}",
                self.admin.key_file
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for project in &self.projects {
            if let Some(rule) = project.styles.iter().find(|r| !is_contained_path(&r.file)) {
                return Err(ConfigError::Validation(format!(
                    "style file must stay inside the domain root: {}",
                    rule.file
                )));
            }
            if project.domain.is_empty() {
                continue;
            }
            if !seen.insert(project.domain.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate project domain: {}",
                    project.domain
                )));
            }
        }
        Ok(())
    }
}

/// Admin credential written into every build that lacks one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    /// Key file path, relative to the domain root.
    pub key_file: String,
    /// Password hashed into a freshly provisioned key file.
    pub default_password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            key_file: "plugins/tinymce/admin/admin.key".to_string(),
            default_password: "admin".to_string(),
        }
    }
}

/// One site to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Project {
    /// Output directory name; must match `[A-Za-z0-9._-]+`.
    pub domain: String,
    /// Theme directory, relative to the config directory (`./` optional).
    pub theme: String,
    /// Canonical URL override. Empty means "use the domain".
    pub canonical: String,
    /// Include the first structured-data fragment (`shema1.php`).
    #[serde(alias = "shema1")]
    pub schema1: bool,
    /// Include the second structured-data fragment (`shema2.php`).
    #[serde(alias = "shema2")]
    pub schema2: bool,
    /// Globs (relative to the domain root) eligible for placeholder and
    /// shortcode substitution. Empty means "text-like extensions".
    pub postprocess: Vec<String>,
    /// Values substituted into templates.
    pub data: DataMap,
    /// Generated CSS rules.
    pub styles: Vec<StyleRule>,
}

/// A generated CSS rule: selector class, target stylesheet, properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleRule {
    /// Class name, with or without the leading dot.
    #[serde(default)]
    pub class: String,
    /// Target stylesheet relative to the domain root.
    #[serde(default = "default_style_file")]
    pub file: String,
    /// Every other key is a CSS property.
    #[serde(flatten)]
    pub properties: toml::Table,
}

fn default_style_file() -> String {
    DEFAULT_STYLE_FILE.to_string()
}

impl StyleRule {
    /// Render the rule as a single CSS line, or `None` when it has no class
    /// or no usable property.
    ///
    /// A `background` value that is neither an image nor a gradient is
    /// written as `background-color`.
    pub fn render(&self) -> Option<String> {
        if self.class.is_empty() {
            return None;
        }
        let declarations: Vec<String> = self
            .properties
            .iter()
            .filter_map(|(key, value)| {
                let value = value.as_str().filter(|v| !v.is_empty())?;
                let property = if key == "background" && !is_background_image(value) {
                    "background-color"
                } else {
                    key.as_str()
                };
                Some(format!("{property}: {value}"))
            })
            .collect();
        if declarations.is_empty() {
            return None;
        }
        let selector = if self.class.starts_with('.') {
            self.class.clone()
        } else {
            format!(".{}", self.class)
        };
        Some(format!("{} {{ {}; }}", selector, declarations.join("; ")))
    }
}

fn is_background_image(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("url(") || lower.contains("gradient")
}

/// Stringify a data value the way templates expect to see it.
///
/// Arrays and tables are not scalar and yield `None`.
pub fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(true) => Some("1".to_string()),
        toml::Value::Boolean(false) => Some(String::new()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Look up a non-empty string value in a data map.
pub fn data_str<'a>(data: &'a DataMap, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Whether a domain is safe to use as a directory name.
pub fn is_safe_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Load and validate a config file.
/// Whether a relative path stays below the directory it is joined to: no
/// root, no drive prefix, no `..`.
pub fn is_contained_path(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.contains('\\')
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Directory config-relative paths resolve against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Returns a fully-commented starter `sitepress.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Sitepress Configuration
# =======================
# Paths are relative to the directory holding this file.

# Output root. Each project is built into <build_dir>/<domain>/.
build_dir = "build"

# Plugin root. Every <plugins_dir>/<name>/plugin.toml is loaded.
plugins_dir = "plugins"

# ---------------------------------------------------------------------------
# Admin credential
# ---------------------------------------------------------------------------
[admin]
# Written into each domain root when missing. Change the password after
# the first build.
key_file = "plugins/tinymce/admin/admin.key"
default_password = "admin"

# ---------------------------------------------------------------------------
# Projects (one [[projects]] block per site)
# ---------------------------------------------------------------------------
[[projects]]
# Output directory name; letters, digits, dot, dash and underscore only.
domain = "example.com"
theme = "./themes/theme1"

# Canonical URL. Empty uses https://<domain>/, a path like "/about" is
# appended to the domain, a full URL is used as is.
canonical = ""

# Structured-data fragments (WebPage/Organization, Person/ImageObject).
schema1 = true
schema2 = false

# Files eligible for placeholder and shortcode substitution.
postprocess = ["/*.php"]

[projects.data]
html_lang = "en"
site_name = "Example"
title = "Example"
description = "An example site"
logo = 'src="./img/logo.webp"'
logo_width = "180"
# Partner links are replaced by ./encrypted.php?key=<fingerprint>.
btn_link1 = "https://partner.example/offer"
btn_text1 = "Sign up"

[[projects.styles]]
class = "header"
file = "styles/styles.css"
background = "#101010"

[[projects.styles]]
class = "main"
color = "#eeeeee"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_paths() {
        let config = Config::default();
        assert_eq!(config.build_dir, "build");
        assert_eq!(config.plugins_dir, "plugins");
        assert_eq!(config.admin.default_password, "admin");
        assert!(config.projects.is_empty());
    }

    #[test]
    fn parse_minimal_project() {
        let config = parse_config(
            r#"
[[projects]]
domain = "example.com"
theme = "./themes/a"
"#,
        )
        .unwrap();
        assert_eq!(config.projects.len(), 1);
        let project = &config.projects[0];
        assert_eq!(project.domain, "example.com");
        assert!(!project.schema1);
        assert!(project.data.is_empty());
        assert!(project.postprocess.is_empty());
    }

    #[test]
    fn legacy_schema_spelling_accepted() {
        let config = parse_config(
            r#"
[[projects]]
domain = "a.com"
shema1 = true
shema2 = true
"#,
        )
        .unwrap();
        assert!(config.projects[0].schema1);
        assert!(config.projects[0].schema2);
    }

    #[test]
    fn data_preserves_file_order() {
        let config = parse_config(
            r#"
[[projects]]
domain = "a.com"
[projects.data]
zeta = "1"
alpha = "2"
btn_link2 = "x"
btn_link1 = "y"
"#,
        )
        .unwrap();
        let keys: Vec<&str> = config.projects[0].data.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "btn_link2", "btn_link1"]);
    }

    #[test]
    fn unknown_key_rejected() {
        let result = parse_config("unknown_option = true\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_project_key_rejected() {
        let result = parse_config(
            r#"
[[projects]]
domain = "a.com"
themes = "typo"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_domain_rejected() {
        let result = parse_config(
            r#"
[[projects]]
domain = "a.com"
[[projects]]
domain = "a.com"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn style_file_outside_domain_rejected() {
        for file in ["../shared.css", "/etc/site.css", "styles/../../x.css"] {
            let result = parse_config(&format!(
                "[[projects]]\ndomain = \"a.com\"\n[[projects.styles]]\nclass = \"h\"\nfile = \"{file}\"\ncolor = \"red\"\n"
            ));
            assert!(matches!(result, Err(ConfigError::Validation(_))), "{file}");
        }
    }

    #[test]
    fn contained_paths() {
        assert!(is_contained_path("styles/styles.css"));
        assert!(is_contained_path("./styles/a.css"));
        assert!(!is_contained_path("../a.css"));
        assert!(!is_contained_path("/abs.css"));
        assert!(!is_contained_path(r"..\a.css"));
        assert!(!is_contained_path("plugins/../../admin.key"));
    }

    #[test]
    fn empty_build_dir_rejected() {
        let result = parse_config("build_dir = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unsafe_domain_is_not_a_config_error() {
        let config = parse_config(
            r#"
[[projects]]
domain = "../etc"
"#,
        )
        .unwrap();
        assert!(!is_safe_domain(&config.projects[0].domain));
    }

    #[test]
    fn load_config_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("sitepress.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sitepress.toml");
        fs::write(&path, "build_dir = \"out\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.build_dir, "out");
    }

    #[test]
    fn base_dir_of_bare_filename_is_cwd() {
        assert_eq!(base_dir(Path::new("sitepress.toml")), PathBuf::from("."));
        assert_eq!(
            base_dir(Path::new("site/sitepress.toml")),
            PathBuf::from("site")
        );
    }

    #[test]
    fn safe_domains() {
        assert!(is_safe_domain("example.com"));
        assert!(is_safe_domain("my_site-2.example.org"));
        assert!(!is_safe_domain(""));
        assert!(!is_safe_domain("a/b"));
        assert!(!is_safe_domain("a b"));
    }

    #[test]
    fn scalar_values_stringify() {
        assert_eq!(
            scalar_to_string(&toml::Value::String("x".into())).as_deref(),
            Some("x")
        );
        assert_eq!(
            scalar_to_string(&toml::Value::Integer(180)).as_deref(),
            Some("180")
        );
        assert_eq!(
            scalar_to_string(&toml::Value::Boolean(true)).as_deref(),
            Some("1")
        );
        assert_eq!(
            scalar_to_string(&toml::Value::Boolean(false)).as_deref(),
            Some("")
        );
        assert_eq!(scalar_to_string(&toml::Value::Array(vec![])), None);
    }

    // =========================================================================
    // Style rules
    // =========================================================================

    fn rule(toml_src: &str) -> StyleRule {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn style_rule_default_file() {
        let r = rule("class = \"header\"\ncolor = \"red\"\n");
        assert_eq!(r.file, DEFAULT_STYLE_FILE);
    }

    #[test]
    fn style_rule_plain_background_becomes_background_color() {
        let r = rule("class = \"header\"\nbackground = \"#fff\"\n");
        assert_eq!(r.render().unwrap(), ".header { background-color: #fff; }");
    }

    #[test]
    fn style_rule_gradient_keeps_background() {
        let r = rule(
            "class = \".hero\"\nbackground = \"linear-gradient(red, blue), url('a.webp')\"\n",
        );
        assert_eq!(
            r.render().unwrap(),
            ".hero { background: linear-gradient(red, blue), url('a.webp'); }"
        );
    }

    #[test]
    fn style_rule_multiple_properties_in_order() {
        let r = rule("class = \"btn\"\ncolor = \"#000\"\nbackground = \"#fff\"\n");
        assert_eq!(
            r.render().unwrap(),
            ".btn { color: #000; background-color: #fff; }"
        );
    }

    #[test]
    fn style_rule_without_usable_property_dropped() {
        assert!(rule("class = \"header\"\nbackground = \"\"\n").render().is_none());
        assert!(rule("class = \"header\"\nwidth = 3\n").render().is_none());
        assert!(rule("color = \"red\"\n").render().is_none());
    }

    #[test]
    fn stock_config_is_valid() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].styles.len(), 2);
        assert!(config.projects[0].schema1);
    }
}
