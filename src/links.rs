//! Outbound link encryption.
//!
//! Partner URLs configured as `btn_link<N>` never appear in page source.
//! Each is replaced by `./encrypted.php?key=<fingerprint>`, and a generated
//! `encrypted.php` maps fingerprints back to URLs with a 302 redirect.
//!
//! ## Fingerprints
//!
//! A fingerprint is the first 16 hex characters of the SHA-256 digest of the
//! literal URL string. The same URL always yields the same fingerprint, so
//! rebuilding a site keeps previously published links valid.
//!
//! ## Button Classes
//!
//! Besides placeholder substitution, any `<a>` whose `class` contains the
//! token `btn-link<N>` has its `href` forced to the encrypted value of
//! `btn_link<N>`. This covers content blocks written by hand in the admin
//! editor, which never went through a template.

use crate::config::DataMap;
use crate::pattern::is_markup_file;
use log::{debug, warn};
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

/// File name of the generated redirector.
pub const REDIRECT_FILE: &str = "encrypted.php";

/// Prefix every encrypted link starts with.
pub const REDIRECT_PREFIX: &str = "./encrypted.php?key=";

static LINK_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^btn_link(\d+)$").unwrap());

/// An opening `<a>` tag. PHP blocks inside the tag are taken whole, so a
/// `?>` never ends the match.
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a(\s(?:<\?.*?\?>|[^>])*)>").unwrap());

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)(\s)href\s*=\s*(?:"(?:<\?.*?\?>|[^"])*"|'(?:<\?.*?\?>|[^'])*'|[^\s"'>]+)"#,
    )
    .unwrap()
});

/// First 16 hex characters of SHA-256 over the URL.
pub fn fingerprint(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(16);
    hex
}

/// Whether a link already points at the redirector.
pub fn is_encrypted(url: &str) -> bool {
    url.starts_with("./encrypted.php") || url.starts_with("/encrypted.php")
}

/// The `N` of a `btn_link<N>` key.
fn link_number(key: &str) -> Option<&str> {
    LINK_KEY
        .captures(key)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Fingerprint-to-URL pairs, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMap {
    entries: Vec<(String, String)>,
}

impl LinkMap {
    pub fn insert(&mut self, hash: String, url: String) {
        if let Some(entry) = self.entries.iter_mut().find(|(h, _)| *h == hash) {
            entry.1 = url;
        } else {
            self.entries.push((hash, url));
        }
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _)| h == hash)
            .map(|(_, url)| url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, u)| (h.as_str(), u.as_str()))
    }
}

/// Replace every plain `btn_link<N>` URL with its redirector link.
///
/// Returns the rewritten data and the fingerprint map. Empty values and
/// values already pointing at the redirector are left untouched.
pub fn encrypt_links(data: &DataMap) -> (DataMap, LinkMap) {
    let mut updated = data.clone();
    let mut links = LinkMap::default();
    for (key, value) in data {
        if link_number(key).is_none() {
            continue;
        }
        let Some(url) = value.as_str().filter(|u| !u.is_empty()) else {
            continue;
        };
        if is_encrypted(url) {
            continue;
        }
        let hash = fingerprint(url);
        updated.insert(
            key.clone(),
            toml::Value::String(format!("{REDIRECT_PREFIX}{hash}")),
        );
        links.insert(hash, url.to_string());
    }
    (updated, links)
}

fn php_single_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Source of the redirector script for a link map.
///
/// At request time it reads `key` from the query string and answers with a
/// 302 to the mapped URL, or to `/` when the key is unknown.
pub fn render_redirect_script(links: &LinkMap) -> String {
    let mut out = String::from(
        "<?php\n// Auto-generated file: encrypted link mappings\n// Do not edit manually - this file is regenerated during build\n\n$links = [",
    );
    for (hash, url) in links.iter() {
        out.push_str(&format!(
            "\n    '{}' => '{}',",
            php_single_quoted(hash),
            php_single_quoted(url)
        ));
    }
    out.push_str(
        "\n];\n\n$key = $_GET['key'] ?? '';\n\nif (isset($links[$key])) {\n    header('Location: ' . $links[$key], true, 302);\n    exit;\n}\n\n// If link not found - redirect to home\nheader('Location: /', true, 302);\nexit;\n",
    );
    out
}

/// Encrypt button links and write `encrypted.php` into `root`.
///
/// When there is nothing to encrypt the data is returned unchanged and no
/// file is written.
pub fn generate_encrypted_links_file(root: &Path, data: &DataMap) -> (DataMap, LinkMap) {
    let (updated, links) = encrypt_links(data);
    if links.is_empty() {
        return (updated, links);
    }
    let path = root.join(REDIRECT_FILE);
    match fs::write(&path, render_redirect_script(&links)) {
        Ok(()) => debug!("wrote {} ({} links)", path.display(), links.len()),
        Err(e) => warn!("could not write {}: {}", path.display(), e),
    }
    (updated, links)
}

/// `btn-link<N>` class to link value, for every non-empty `btn_link<N>`.
fn class_mappings(data: &DataMap) -> Vec<(String, String)> {
    data.iter()
        .filter_map(|(key, value)| {
            let n = link_number(key)?;
            let url = value.as_str().filter(|u| !u.is_empty())?;
            Some((format!("btn-link{n}"), url.to_string()))
        })
        .collect()
}

/// The mapped link for an anchor's attributes, if its class list holds a
/// `btn-link<N>` token. Later mappings win when several match.
fn anchor_link<'a>(attrs: &str, mappings: &'a [(String, String)]) -> Option<&'a str> {
    let caps = CLASS_ATTR.captures(attrs)?;
    let classes = caps.get(1).or_else(|| caps.get(2))?.as_str();
    mappings
        .iter()
        .rev()
        .find(|(class, _)| {
            classes
                .split_whitespace()
                .any(|token| token.eq_ignore_ascii_case(class))
        })
        .map(|(_, url)| url.as_str())
}

/// Force the `href` of every anchor carrying a `btn-link<N>` class.
///
/// Class tokens match whole: `btn-link1` leaves `btn-link10` and
/// `nav-btn-link1` alone. An existing `href` is replaced even when its value
/// is a PHP echo.
pub fn inject_encrypted_links_to_classes(content: &str, data: &DataMap) -> String {
    let mappings = class_mappings(data);
    if mappings.is_empty() {
        return content.to_string();
    }
    ANCHOR
        .replace_all(content, |caps: &Captures| {
            let attrs = &caps[1];
            let Some(url) = anchor_link(attrs, &mappings) else {
                return caps[0].to_string();
            };
            let value = crate::html::escape_attr(url);
            if HREF_ATTR.is_match(attrs) {
                let attrs = HREF_ATTR.replacen(attrs, 1, |h: &Captures| {
                    format!("{}href=\"{}\"", &h[1], value)
                });
                format!("<a{attrs}>")
            } else {
                format!("<a{attrs} href=\"{value}\">")
            }
        })
        .into_owned()
}

/// Apply [`inject_encrypted_links_to_classes`] to every markup file under
/// `dir`, rewriting only files whose content changed.
///
/// Returns the number of files rewritten.
pub fn process_button_links_by_class(dir: &Path, data: &DataMap) -> usize {
    if class_mappings(data).is_empty() || !dir.is_dir() {
        return 0;
    }
    let mut rewritten = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_markup_file(path) {
            continue;
        }
        let Ok(contents) = fs::read_to_string(path) else {
            debug!("skipping unreadable {}", path.display());
            continue;
        };
        let updated = inject_encrypted_links_to_classes(&contents, data);
        if updated != contents {
            match fs::write(path, &updated) {
                Ok(()) => rewritten += 1,
                Err(e) => warn!("could not write {}: {}", path.display(), e),
            }
        }
    }
    rewritten
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

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("https://partner.example/x");
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, fingerprint("https://partner.example/x"));
        assert_ne!(a, fingerprint("https://partner.example/y"));
    }

    #[test]
    fn fingerprint_matches_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(fingerprint("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn encrypt_rewrites_only_button_links() {
        let d = data(&[
            ("title", "Ex"),
            ("btn_link1", "https://a.example/"),
            ("btn_link2", ""),
            ("btn_text1", "Go"),
        ]);
        let (updated, links) = encrypt_links(&d);
        let hash = fingerprint("https://a.example/");
        assert_eq!(links.len(), 1);
        assert_eq!(links.get(&hash), Some("https://a.example/"));
        assert_eq!(
            updated["btn_link1"].as_str().unwrap(),
            format!("./encrypted.php?key={hash}")
        );
        assert_eq!(updated["btn_link2"].as_str(), Some(""));
        assert_eq!(updated["title"].as_str(), Some("Ex"));
    }

    #[test]
    fn already_encrypted_links_skipped() {
        let d = data(&[("btn_link1", "./encrypted.php?key=abc")]);
        let (updated, links) = encrypt_links(&d);
        assert!(links.is_empty());
        assert_eq!(updated, d);
    }

    #[test]
    fn same_url_twice_yields_one_entry() {
        let d = data(&[
            ("btn_link1", "https://same.example/"),
            ("btn_link2", "https://same.example/"),
        ]);
        let (updated, links) = encrypt_links(&d);
        assert_eq!(links.len(), 1);
        assert_eq!(updated["btn_link1"], updated["btn_link2"]);
    }

    #[test]
    fn no_links_writes_no_file() {
        let tmp = TempDir::new().unwrap();
        let d = data(&[("title", "Ex")]);
        let (updated, _) = generate_encrypted_links_file(tmp.path(), &d);
        assert_eq!(updated, d);
        assert!(!tmp.path().join(REDIRECT_FILE).exists());
    }

    #[test]
    fn redirect_file_written() {
        let tmp = TempDir::new().unwrap();
        let d = data(&[("btn_link1", "https://partner.example/x")]);
        generate_encrypted_links_file(tmp.path(), &d);
        let script = fs::read_to_string(tmp.path().join(REDIRECT_FILE)).unwrap();
        let hash = fingerprint("https://partner.example/x");
        assert!(script.contains(&format!("'{hash}' => 'https://partner.example/x',")));
        assert!(script.contains("header('Location: ' . $links[$key], true, 302);"));
        assert!(script.contains("header('Location: /', true, 302);"));
    }

    #[test]
    fn redirect_script_escapes_quotes() {
        let mut links = LinkMap::default();
        links.insert("h".into(), "https://x.example/?q=it's".into());
        assert!(render_redirect_script(&links).contains(r"'https://x.example/?q=it\'s'"));
    }

    #[test]
    fn inject_replaces_existing_href() {
        let d = data(&[("btn_link1", "./encrypted.php?key=aaaa")]);
        let html = r#"<a class="btn btn-link1" href="https://leak.example/">Go</a>"#;
        assert_eq!(
            inject_encrypted_links_to_classes(html, &d),
            r#"<a class="btn btn-link1" href="./encrypted.php?key=aaaa">Go</a>"#
        );
    }

    #[test]
    fn inject_adds_missing_href() {
        let d = data(&[("btn_link2", "./encrypted.php?key=bbbb")]);
        let html = "<a class='btn-link2' target=\"_blank\">Go</a>";
        assert_eq!(
            inject_encrypted_links_to_classes(html, &d),
            "<a class='btn-link2' target=\"_blank\" href=\"./encrypted.php?key=bbbb\">Go</a>"
        );
    }

    #[test]
    fn inject_matches_whole_class_token() {
        let d = data(&[("btn_link1", "./encrypted.php?key=one")]);
        let html = r##"<a class="btn-link10" href="#">x</a>"##;
        assert_eq!(inject_encrypted_links_to_classes(html, &d), html);
    }

    #[test]
    fn inject_skips_prefixed_and_suffixed_classes() {
        let d = data(&[("btn_link1", "./encrypted.php?key=one")]);
        for html in [
            r##"<a class="nav-btn-link1" href="#">x</a>"##,
            r##"<a class="btn-link1-alt" href="#">x</a>"##,
        ] {
            assert_eq!(inject_encrypted_links_to_classes(html, &d), html);
        }
    }

    #[test]
    fn inject_replaces_php_echo_href_whole() {
        let d = data(&[("btn_link1", "./encrypted.php?key=k")]);
        let html = r#"<a class="btn-link1" href="<?php echo $data['btn_link1']; ?>">Go</a>"#;
        assert_eq!(
            inject_encrypted_links_to_classes(html, &d),
            r#"<a class="btn-link1" href="./encrypted.php?key=k">Go</a>"#
        );
    }

    #[test]
    fn inject_keeps_php_in_other_attributes() {
        let d = data(&[("btn_link1", "./encrypted.php?key=k")]);
        let html = r#"<a title="<?= $data['btn_text1'] ?>" class="btn btn-link1">Go</a>"#;
        assert_eq!(
            inject_encrypted_links_to_classes(html, &d),
            r#"<a title="<?= $data['btn_text1'] ?>" class="btn btn-link1" href="./encrypted.php?key=k">Go</a>"#
        );
    }

    #[test]
    fn inject_ignores_other_anchors() {
        let d = data(&[("btn_link1", "./encrypted.php?key=one")]);
        let html = r#"<a class="nav" href="/about">About</a>"#;
        assert_eq!(inject_encrypted_links_to_classes(html, &d), html);
    }

    #[test]
    fn inject_is_idempotent() {
        let d = data(&[("btn_link1", "./encrypted.php?key=one")]);
        let html = r#"<a class="btn-link1">x</a>"#;
        let once = inject_encrypted_links_to_classes(html, &d);
        assert_eq!(inject_encrypted_links_to_classes(&once, &d), once);
    }

    #[test]
    fn process_tree_rewrites_changed_markup_only() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("index.php"), r#"<a class="btn-link1">x</a>"#).unwrap();
        fs::write(root.join("data/content-1.html"), r#"<a class="btn-link1" href="x">y</a>"#)
            .unwrap();
        fs::write(root.join("plain.html"), "<p>nothing</p>").unwrap();
        fs::write(root.join("style.css"), r#"<a class="btn-link1">"#).unwrap();

        let d = data(&[("btn_link1", "./encrypted.php?key=k")]);
        assert_eq!(process_button_links_by_class(root, &d), 2);
        assert!(
            fs::read_to_string(root.join("data/content-1.html"))
                .unwrap()
                .contains(r#"href="./encrypted.php?key=k""#)
        );
        assert_eq!(
            fs::read_to_string(root.join("style.css")).unwrap(),
            r#"<a class="btn-link1">"#
        );
    }
}
