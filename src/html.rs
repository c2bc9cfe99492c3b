//! HTML post-processors.
//!
//! Independent text transforms over built files. The header passes target a
//! theme's shared `header.php`; the image passes apply to any markup.
//!
//! | Pass | Effect |
//! |------|--------|
//! | [`upsert_header_meta`] | description meta, `<title>`, favicon link |
//! | [`upsert_canonical`] | one `<link rel="canonical">` |
//! | [`rewrite_schema_flags`] | fixes the structured-data includes at build time |
//! | [`add_missing_alt_attributes`] | alt text derived from the image filename |
//! | [`add_responsive_srcset`] | `srcset` from `-600`/`-1200`/`-1920` siblings on disk |
//!
//! Every pass is safe to run repeatedly: upserts replace rather than append,
//! and the image passes test for the attribute before adding it.
//!
//! Generated tags are rendered with maud so attribute values are escaped
//! consistently.

use crate::config::{DataMap, Project, data_str};
use log::{debug, warn};
use maud::html;
use regex::{Captures, NoExpand, Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Shared header fragment the header passes rewrite.
pub const HEADER_FILE: &str = "header.php";

/// `sizes` value written alongside a generated `srcset`.
pub const SRCSET_SIZES: &str = "(max-width: 600px) 600px, (max-width: 1200px) 1200px, 1920px";

/// Widths probed for responsive image variants.
pub const SRCSET_WIDTHS: [u32; 3] = [600, 1200, 1920];

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

static DESCRIPTION_META: LazyLock<Regex> =
    LazyLock::new(|| ci(r#"<meta[^>]*name=(?:"description"|'description')"#));
static TITLE: LazyLock<Regex> = LazyLock::new(|| ci(r"(?s)<title>.*?</title>"));
static FAVICON: LazyLock<Regex> =
    LazyLock::new(|| ci(r#"<link[^>]*rel=["'](?:shortcut\s+)?icon["'][^>]*>"#));
static HEAD_OPEN: LazyLock<Regex> = LazyLock::new(|| ci(r"<head(?:\s[^>]*)?>"));
static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| ci(r#"<link[^>]*rel=(?:"canonical"|'canonical')[^>]*>"#));
static VIEWPORT: LazyLock<Regex> =
    LazyLock::new(|| ci(r#"<meta[^>]*name=(?:"viewport"|'viewport')[^>]*>"#));
static SCHEME: LazyLock<Regex> = LazyLock::new(|| ci(r"^https?://"));
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

static IMG: LazyLock<Regex> = LazyLock::new(|| ci(r"<img([^>]*)>"));
static ALT_ATTR: LazyLock<Regex> = LazyLock::new(|| ci(r"\salt\s*="));
static EMPTY_ALT: LazyLock<Regex> = LazyLock::new(|| ci(r#"\salt\s*=\s*(?:"\s*"|'\s*')"#));
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| ci(r#"\ssrc\s*=\s*["']([^"']+)["']"#));
static SRCSET_ATTR: LazyLock<Regex> = LazyLock::new(|| ci(r"\ssrcset\s*="));
static ALT_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_\d]+").unwrap());

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    html! { (value) }.into_string()
}

/// The first line break in `content`, `\n` when it has none.
fn line_ending(content: &str) -> &str {
    LINE_BREAK.find(content).map_or("\n", |m| m.as_str())
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

// ============================================================================
// Header meta / title / favicon
// ============================================================================

/// Upsert description, title and favicon from project data.
///
/// - `description`: replaces the first line holding a description meta tag
/// - `title`: replaces the contents of every `<title>` element
/// - `favicon`: replaces an existing icon link, else goes right after
///   `<head>`, else at the top of the document
pub fn upsert_header_meta(content: &str, data: &DataMap) -> String {
    let mut content = content.to_string();

    if let Some(description) = data_str(data, "description") {
        let tag = html! { meta name="description" content=(description); }.into_string();
        let mut replaced = false;
        let lines: Vec<String> = LINE_BREAK
            .split(&content)
            .map(|line| {
                if !replaced && DESCRIPTION_META.is_match(line) {
                    replaced = true;
                    format!("{}{}", indentation(line), tag)
                } else {
                    line.to_string()
                }
            })
            .collect();
        content = lines.join(line_ending(&content));
    }

    if let Some(title) = data_str(data, "title") {
        let tag = html! { title { (title) } }.into_string();
        content = TITLE.replace_all(&content, NoExpand(&tag)).into_owned();
    }

    if let Some(favicon) = data_str(data, "favicon") {
        let tag = html! { link rel="icon" href=(favicon) type="image/x-icon"; }.into_string();
        content = if FAVICON.is_match(&content) {
            FAVICON.replacen(&content, 1, NoExpand(&tag)).into_owned()
        } else {
            insert_after_first(&content, &HEAD_OPEN, &tag)
                .unwrap_or_else(|| format!("{tag}{}{content}", line_ending(&content)))
        };
    }

    content
}

/// Insert `tag` on a new line after the first match of `anchor`.
fn insert_after_first(content: &str, anchor: &Regex, tag: &str) -> Option<String> {
    let m = anchor.find(content)?;
    Some(format!(
        "{}{}    {}{}",
        &content[..m.end()],
        line_ending(content),
        tag,
        &content[m.end()..]
    ))
}

// ============================================================================
// Canonical link
// ============================================================================

/// Resolve the canonical href for a project.
///
/// An empty override falls back to the domain. Values without a scheme are
/// read as a bare host when they contain no `/`, otherwise as a path on the
/// project domain.
pub fn normalize_canonical(value: &str, domain: &str) -> String {
    let value = match value.trim() {
        "" => domain.trim(),
        v => v,
    };
    if SCHEME.is_match(value) {
        return value.to_string();
    }
    if !value.contains('/') {
        format!("https://{value}/")
    } else {
        format!(
            "https://{}/{}",
            domain.trim_end_matches('/'),
            value.trim_start_matches('/')
        )
    }
}

/// Replace the canonical link, or insert one after the viewport meta, the
/// title, or `<head>`, falling back to the top of the document.
pub fn upsert_canonical(content: &str, href: &str) -> String {
    let tag = html! { link rel="canonical" href=(href); }.into_string();
    if CANONICAL.is_match(content) {
        return CANONICAL.replacen(content, 1, NoExpand(&tag)).into_owned();
    }
    insert_after_first(content, &VIEWPORT, &tag)
        .or_else(|| insert_after_first(content, &TITLE, &tag))
        .or_else(|| insert_after_first(content, &HEAD_OPEN, &tag))
        .unwrap_or_else(|| format!("{tag}{}{content}", line_ending(content)))
}

// ============================================================================
// Structured-data flags
// ============================================================================

/// What the schema rewrite did for one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// The runtime conditional became a static include.
    Included,
    /// The conditional (or an earlier static include) was removed.
    Removed,
    /// The static include from an earlier build is already in place.
    AlreadyIncluded,
    /// The flag is set but the template has neither form of the include.
    Missing,
    /// Flag off and nothing to remove.
    Absent,
}

fn conditional_include(name: &str) -> Option<Regex> {
    let name = regex::escape(name);
    Regex::new(&format!(
        r#"if\s*\(\s*\$data\[\s*["']{name}["']\s*\]\s*\)\s*include_once\s*["']{name}\.php["']\s*;"#
    ))
    .ok()
}

fn static_include(name: &str) -> Option<Regex> {
    let name = regex::escape(name);
    Regex::new(&format!(r#"^include_once\s*["']{name}\.php["']\s*;$"#)).ok()
}

/// Turn `if ($data['<name>']) include_once '<name>.php';` lines into fixed
/// build-time decisions.
///
/// With the flag set the line becomes an unconditional include; otherwise
/// the line is dropped, together with any static include an earlier build
/// left behind. Returns the new content when anything changed.
pub fn rewrite_schema_flags(content: &str, flags: &[(&str, bool)]) -> (Option<String>, Vec<SchemaOutcome>) {
    let mut lines: Vec<String> = LINE_BREAK.split(content).map(str::to_string).collect();
    let mut changed = false;
    let mut outcomes = Vec::with_capacity(flags.len());

    for &(name, enabled) in flags {
        let (Some(conditional), Some(fixed)) = (conditional_include(name), static_include(name))
        else {
            outcomes.push(SchemaOutcome::Absent);
            continue;
        };
        let mut outcome = if enabled {
            SchemaOutcome::Missing
        } else {
            SchemaOutcome::Absent
        };
        let mut kept = Vec::with_capacity(lines.len());
        for line in lines {
            let trimmed = line.trim();
            if conditional.is_match(trimmed) {
                changed = true;
                if enabled {
                    kept.push(format!("{}include_once '{}.php';", indentation(&line), name));
                    outcome = SchemaOutcome::Included;
                } else {
                    outcome = SchemaOutcome::Removed;
                }
            } else if fixed.is_match(trimmed) {
                if enabled {
                    if outcome == SchemaOutcome::Missing {
                        outcome = SchemaOutcome::AlreadyIncluded;
                    }
                    kept.push(line);
                } else {
                    changed = true;
                    outcome = SchemaOutcome::Removed;
                }
            } else {
                kept.push(line);
            }
        }
        lines = kept;
        outcomes.push(outcome);
    }

    let updated = changed.then(|| lines.join(line_ending(content)));
    (updated, outcomes)
}

// ============================================================================
// Image attributes
// ============================================================================

/// Insert ` attr` before the end of a tag, keeping a self-closing slash last.
fn insert_attribute(tag: &str, attribute: &str) -> String {
    let body = &tag[..tag.len() - 1];
    match body.strip_suffix('/') {
        Some(inner) => format!("{} {}/>", inner.trim_end(), attribute),
        None => format!("{} {}>", body, attribute),
    }
}

/// Alt text from an image path: file stem with digit, dash and underscore
/// runs turned into spaces, first letter capitalised, `Image` if nothing is
/// left.
pub fn alt_from_src(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = ALT_NOISE.replace_all(&stem, " ");
    let cleaned = cleaned.trim();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Image".to_string(),
    }
}

/// Add alt text to `<img>` tags that lack it or carry an empty one.
///
/// Tags containing PHP are skipped; their attributes are only known at
/// request time.
pub fn add_missing_alt_attributes(html: &str) -> String {
    IMG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        let attributes = &caps[1];
        if attributes.contains("<?") {
            return tag.to_string();
        }
        let alt = SRC_ATTR
            .captures(attributes)
            .map(|src| alt_from_src(&src[1]))
            .unwrap_or_else(|| "Image".to_string());
        let attribute = format!("alt=\"{}\"", escape_attr(&alt));
        if !ALT_ATTR.is_match(attributes) {
            insert_attribute(tag, &attribute)
        } else if EMPTY_ALT.is_match(attributes) {
            EMPTY_ALT
                .replacen(tag, 1, NoExpand(&format!(" {attribute}")))
                .into_owned()
        } else {
            tag.to_string()
        }
    })
    .into_owned()
}

/// `src` with `-<width>` inserted before the extension, if it has one.
fn variant_path(src: &str, width: u32) -> Option<String> {
    let name_start = src.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = src[name_start..].rfind('.').map(|i| name_start + i)?;
    if dot == name_start {
        return None;
    }
    Some(format!("{}-{}{}", &src[..dot], width, &src[dot..]))
}

/// Build a `srcset` value from the variants of `src` that exist under
/// `site_root`, or `None` if there are none.
pub fn srcset_for(src: &str, site_root: &Path) -> Option<String> {
    let entries: Vec<String> = SRCSET_WIDTHS
        .iter()
        .filter_map(|&width| {
            let variant = variant_path(src, width)?;
            let on_disk = variant.trim_start_matches("./").trim_start_matches('/');
            site_root
                .join(on_disk)
                .is_file()
                .then(|| format!("{variant} {width}w"))
        })
        .collect();
    (!entries.is_empty()).then(|| entries.join(", "))
}

/// Add `srcset`/`sizes` to images whose resized siblings exist on disk.
pub fn add_responsive_srcset(html: &str, site_root: &Path) -> String {
    IMG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        let attributes = &caps[1];
        if attributes.contains("<?") || SRCSET_ATTR.is_match(attributes) {
            return tag.to_string();
        }
        let Some(src) = SRC_ATTR.captures(attributes) else {
            return tag.to_string();
        };
        match srcset_for(&src[1], site_root) {
            Some(srcset) => insert_attribute(
                tag,
                &format!("srcset=\"{}\" sizes=\"{}\"", escape_attr(&srcset), SRCSET_SIZES),
            ),
            None => tag.to_string(),
        }
    })
    .into_owned()
}

// ============================================================================
// File-level passes over header.php
// ============================================================================

/// Read `root/header.php`, transform it, and write it back if it changed.
///
/// A missing or unreadable header skips the pass.
fn rewrite_header<F>(root: &Path, transform: F) -> bool
where
    F: FnOnce(&str) -> Option<String>,
{
    let path = root.join(HEADER_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!("no {} in {}, skipping", HEADER_FILE, root.display());
        return false;
    };
    let Some(updated) = transform(&content).filter(|u| *u != content) else {
        return false;
    };
    match fs::write(&path, updated) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not write {}: {}", path.display(), e);
            false
        }
    }
}

/// Apply [`upsert_header_meta`] to the domain's header.
pub fn apply_static_header_data(root: &Path, data: &DataMap) -> bool {
    rewrite_header(root, |content| Some(upsert_header_meta(content, data)))
}

/// Apply [`upsert_canonical`] to the domain's header.
pub fn apply_canonical_link(root: &Path, project: &Project) -> bool {
    let href = normalize_canonical(&project.canonical, &project.domain);
    rewrite_header(root, |content| {
        (!content.is_empty()).then(|| upsert_canonical(content, &href))
    })
}

/// Apply [`rewrite_schema_flags`] to the domain's header.
pub fn apply_schema_flags(root: &Path, project: &Project) -> Vec<SchemaOutcome> {
    let flags = [("shema1", project.schema1), ("shema2", project.schema2)];
    let mut outcomes = Vec::new();
    rewrite_header(root, |content| {
        let (updated, result) = rewrite_schema_flags(content, &flags);
        outcomes = result;
        updated
    });
    for (&(name, _), outcome) in flags.iter().zip(&outcomes) {
        if *outcome == SchemaOutcome::Missing {
            warn!(
                "{} is enabled but {} in {} has no include for it; rebuild with --clean",
                name,
                HEADER_FILE,
                root.display()
            );
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data(pairs: &[(&str, &str)]) -> DataMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
            .collect()
    }

    const HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
    <?php
    if ($data['shema1']) include_once 'shema1.php';
    if ($data['shema2']) include_once 'shema2.php';
    ?>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title><?php echo $data['title']; ?></title>
    <meta name="description" content="<?php echo $data['description'] ?>">
    <link rel="icon" href="/favicon.ico" type="image/x-icon">
</head>
<body>"#;

    // =========================================================================
    // Meta / title / favicon
    // =========================================================================

    #[test]
    fn upsert_replaces_title_and_description() {
        let out = upsert_header_meta(HEADER, &data(&[("title", "Ex"), ("description", "D")]));
        assert!(out.contains("<title>Ex</title>"));
        assert!(out.contains(r#"    <meta name="description" content="D">"#));
        assert_eq!(out.matches("name=\"description\"").count(), 1);
    }

    #[test]
    fn line_passes_keep_crlf() {
        let crlf = HEADER.replace('\n', "\r\n");
        let out = upsert_header_meta(&crlf, &data(&[("description", "D")]));
        let out = upsert_canonical(&out, "https://x/");
        let (out, _) = rewrite_schema_flags(&out, &[("shema1", true), ("shema2", false)]);
        let out = out.unwrap();
        assert!(out.contains("<meta name=\"description\" content=\"D\">\r\n"));
        assert!(out.contains("initial-scale=1.0\">\r\n    <link rel=\"canonical\""));
        assert!(out.contains("include_once 'shema1.php';\r\n"));
        assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
    }

    #[test]
    fn upsert_escapes_values() {
        let out = upsert_header_meta(HEADER, &data(&[("title", "A & B <c>")]));
        assert!(out.contains("<title>A &amp; B &lt;c&gt;</title>"));
    }

    #[test]
    fn upsert_without_values_is_identity() {
        assert_eq!(upsert_header_meta(HEADER, &DataMap::new()), HEADER);
    }

    #[test]
    fn favicon_replaces_existing() {
        let out = upsert_header_meta(HEADER, &data(&[("favicon", "/img/fav.png")]));
        assert!(out.contains(r#"<link rel="icon" href="/img/fav.png" type="image/x-icon">"#));
        assert!(!out.contains("/favicon.ico"));
    }

    #[test]
    fn favicon_inserted_after_head() {
        let out = upsert_header_meta(
            "<header></header><head><title>x</title></head>",
            &data(&[("favicon", "/f.ico")]),
        );
        assert_eq!(
            out,
            "<header></header><head>\n    <link rel=\"icon\" href=\"/f.ico\" type=\"image/x-icon\"><title>x</title></head>"
        );
    }

    #[test]
    fn favicon_prepended_without_head() {
        let out = upsert_header_meta("<p>x</p>", &data(&[("favicon", "/f.ico")]));
        assert!(out.starts_with("<link rel=\"icon\" href=\"/f.ico\" type=\"image/x-icon\">\n<p>"));
    }

    #[test]
    fn upsert_is_idempotent() {
        let d = data(&[("title", "Ex"), ("description", "D"), ("favicon", "/f.ico")]);
        let once = upsert_header_meta(HEADER, &d);
        assert_eq!(upsert_header_meta(&once, &d), once);
    }

    // =========================================================================
    // Canonical
    // =========================================================================

    #[test]
    fn canonical_defaults_to_domain() {
        assert_eq!(normalize_canonical("", "example.com"), "https://example.com/");
    }

    #[test]
    fn canonical_path_joins_domain() {
        assert_eq!(
            normalize_canonical("/about", "example.com"),
            "https://example.com/about"
        );
        assert_eq!(
            normalize_canonical("blog/post", "example.com/"),
            "https://example.com/blog/post"
        );
    }

    #[test]
    fn canonical_bare_host_and_full_url() {
        assert_eq!(normalize_canonical("other.org", "example.com"), "https://other.org/");
        assert_eq!(
            normalize_canonical("HTTP://other.org/x", "example.com"),
            "HTTP://other.org/x"
        );
    }

    #[test]
    fn canonical_inserted_after_viewport() {
        let out = upsert_canonical(HEADER, "https://example.com/");
        assert_eq!(
            out.matches(r#"<link rel="canonical" href="https://example.com/">"#)
                .count(),
            1
        );
        let viewport = out.find("viewport").unwrap();
        let canonical = out.find("canonical").unwrap();
        let title = out.find("<title>").unwrap();
        assert!(viewport < canonical && canonical < title);
    }

    #[test]
    fn canonical_replaced_in_place() {
        let once = upsert_canonical(HEADER, "https://a.com/");
        let twice = upsert_canonical(&once, "https://b.com/");
        assert!(!twice.contains("https://a.com/"));
        assert_eq!(twice.matches("rel=\"canonical\"").count(), 1);
    }

    #[test]
    fn canonical_fallbacks() {
        assert_eq!(
            upsert_canonical("<title>t</title>", "https://x/"),
            "<title>t</title>\n    <link rel=\"canonical\" href=\"https://x/\">"
        );
        assert_eq!(
            upsert_canonical("<head></head>", "https://x/"),
            "<head>\n    <link rel=\"canonical\" href=\"https://x/\"></head>"
        );
        assert_eq!(
            upsert_canonical("body", "https://x/"),
            "<link rel=\"canonical\" href=\"https://x/\">\nbody"
        );
    }

    // =========================================================================
    // Schema flags
    // =========================================================================

    #[test]
    fn schema_flags_rewrite_and_remove() {
        let (out, outcomes) = rewrite_schema_flags(HEADER, &[("shema1", true), ("shema2", false)]);
        let out = out.unwrap();
        assert!(out.contains("    include_once 'shema1.php';"));
        assert!(!out.contains("shema2"));
        assert!(!out.contains("$data['shema1']"));
        assert_eq!(outcomes, vec![SchemaOutcome::Included, SchemaOutcome::Removed]);
        assert_eq!(out.lines().count(), HEADER.lines().count() - 1);
    }

    #[test]
    fn schema_flags_second_run_is_stable() {
        let flags = [("shema1", true), ("shema2", false)];
        let (once, _) = rewrite_schema_flags(HEADER, &flags);
        let once = once.unwrap();
        let (twice, outcomes) = rewrite_schema_flags(&once, &flags);
        assert!(twice.is_none());
        assert_eq!(outcomes, vec![SchemaOutcome::AlreadyIncluded, SchemaOutcome::Absent]);
    }

    #[test]
    fn schema_flag_turned_off_removes_static_include() {
        let (once, _) = rewrite_schema_flags(HEADER, &[("shema1", true), ("shema2", true)]);
        let (twice, outcomes) =
            rewrite_schema_flags(&once.unwrap(), &[("shema1", false), ("shema2", true)]);
        let twice = twice.unwrap();
        assert!(!twice.contains("shema1"));
        assert!(twice.contains("include_once 'shema2.php';"));
        assert_eq!(outcomes[0], SchemaOutcome::Removed);
    }

    #[test]
    fn schema_flag_on_without_include_reports_missing() {
        let (out, outcomes) = rewrite_schema_flags("<head></head>", &[("shema1", true)]);
        assert!(out.is_none());
        assert_eq!(outcomes, vec![SchemaOutcome::Missing]);
    }

    // =========================================================================
    // Alt text
    // =========================================================================

    #[test]
    fn alt_from_filename() {
        assert_eq!(alt_from_src("./img/hero-banner_02.webp"), "Hero banner");
        assert_eq!(alt_from_src("/img/123.png"), "Image");
        assert_eq!(alt_from_src("photo.jpg?v=2"), "Photo");
    }

    #[test]
    fn missing_alt_added() {
        assert_eq!(
            add_missing_alt_attributes(r#"<img src="img/sunset-1.jpg">"#),
            r#"<img src="img/sunset-1.jpg" alt="Sunset">"#
        );
    }

    #[test]
    fn missing_alt_without_src_defaults() {
        assert_eq!(add_missing_alt_attributes("<img class=\"x\">"), "<img class=\"x\" alt=\"Image\">");
    }

    #[test]
    fn empty_alt_regenerated() {
        assert_eq!(
            add_missing_alt_attributes(r#"<img alt="" src="a/cat_photo.png">"#),
            r#"<img alt="Cat photo" src="a/cat_photo.png">"#
        );
    }

    #[test]
    fn existing_alt_untouched_and_idempotent() {
        let html = r#"<img src="a.png" alt="Kept"><img src="b.png" />"#;
        let once = add_missing_alt_attributes(html);
        assert_eq!(once, r#"<img src="a.png" alt="Kept"><img src="b.png" alt="B"/>"#);
        assert_eq!(add_missing_alt_attributes(&once), once);
    }

    #[test]
    fn php_inside_img_skipped() {
        let html = "<img <?php echo $data['logo']; ?> alt=\"Logo\">";
        assert_eq!(add_missing_alt_attributes(html), html);
    }

    // =========================================================================
    // Srcset
    // =========================================================================

    #[test]
    fn variant_paths() {
        assert_eq!(variant_path("./img/a.webp", 600).as_deref(), Some("./img/a-600.webp"));
        assert_eq!(variant_path("img.d/a", 600), None);
        assert_eq!(variant_path(".hidden", 600), None);
    }

    #[test]
    fn srcset_lists_existing_variants() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("img")).unwrap();
        fs::write(tmp.path().join("img/a-600.webp"), b"").unwrap();
        fs::write(tmp.path().join("img/a-1920.webp"), b"").unwrap();

        let out = add_responsive_srcset(r#"<img src="./img/a.webp" alt="A">"#, tmp.path());
        assert_eq!(
            out,
            format!(
                r#"<img src="./img/a.webp" alt="A" srcset="./img/a-600.webp 600w, ./img/a-1920.webp 1920w" sizes="{SRCSET_SIZES}">"#
            )
        );
        assert_eq!(add_responsive_srcset(&out, tmp.path()), out);
    }

    #[test]
    fn srcset_noop_without_variants() {
        let tmp = TempDir::new().unwrap();
        let html = r#"<img src="/img/none.webp">"#;
        assert_eq!(add_responsive_srcset(html, tmp.path()), html);
    }

    // =========================================================================
    // File passes
    // =========================================================================

    #[test]
    fn header_passes_skip_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(!apply_static_header_data(tmp.path(), &data(&[("title", "x")])));
        assert!(!apply_canonical_link(tmp.path(), &Project::default()));
    }

    #[test]
    fn header_passes_rewrite_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(HEADER_FILE), HEADER).unwrap();
        let project = Project {
            domain: "example.com".into(),
            schema1: true,
            ..Default::default()
        };
        assert!(apply_static_header_data(tmp.path(), &data(&[("title", "Ex")])));
        assert!(apply_canonical_link(tmp.path(), &project));
        assert!(!apply_canonical_link(tmp.path(), &project));
        let outcomes = apply_schema_flags(tmp.path(), &project);
        assert_eq!(outcomes, vec![SchemaOutcome::Included, SchemaOutcome::Removed]);

        let header = fs::read_to_string(tmp.path().join(HEADER_FILE)).unwrap();
        assert!(header.contains("<title>Ex</title>"));
        assert!(header.contains(r#"<link rel="canonical" href="https://example.com/">"#));
        assert!(header.contains("include_once 'shema1.php';"));
    }
}
