//! Shortcode expansion.
//!
//! Content may contain bracketed tokens such as `[content id="3"]`. Each token
//! whose tag is registered is replaced by its handler's output; every other
//! bracketed run is left exactly as written, so authors can keep literal
//! square brackets in their copy.
//!
//! Expansion is a single left-to-right pass. Handler output is inserted as is
//! and never rescanned, so a handler that returns `[content id="1"]` produces
//! that text literally.
//!
//! ## Attribute Grammar
//!
//! ```text
//! [tag key="value" key2='value 2' key3=bare]
//! ```
//!
//! Quoted values may hold spaces; bare values end at the first whitespace.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\w+)([^\]]*)\]").unwrap());

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:"([^"']*)"|'([^"']*)'|(\S+))"#).unwrap()
});

/// Handler signature: parsed attributes plus the file being processed.
pub type ShortcodeFn = Box<dyn Fn(&ShortcodeArgs, Option<&Path>) -> String + Send + Sync>;

/// Registry of named shortcode handlers.
///
/// Built once per build and shared by reference; registering a tag twice
/// keeps the last handler.
#[derive(Default)]
pub struct Shortcodes(HashMap<String, ShortcodeFn>);

impl Shortcodes {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn register<F>(&mut self, tag: &str, handler: F)
    where
        F: Fn(&ShortcodeArgs, Option<&Path>) -> String + Send + Sync + 'static,
    {
        self.0.insert(tag.to_string(), Box::new(handler));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.0.keys().map(|k| k.as_str()).collect();
        tags.sort_unstable();
        tags
    }

    fn get(&self, tag: &str) -> Option<&ShortcodeFn> {
        self.0.get(tag)
    }
}

impl std::fmt::Debug for Shortcodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Shortcodes").field(&self.tags()).finish()
    }
}

/// Parsed attributes of one shortcode invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortcodeArgs(HashMap<String, String>);

impl ShortcodeArgs {
    /// Get an attribute as a raw string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse the text between the tag name and the closing bracket.
pub fn parse_attributes(input: &str) -> ShortcodeArgs {
    let attrs = ATTRIBUTE
        .captures_iter(input)
        .filter_map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
            Some((caps[1].to_string(), value.as_str().to_string()))
        })
        .collect();
    ShortcodeArgs(attrs)
}

/// Expands shortcodes for one file at a time.
///
/// The current file is visible to handlers while that file's content is
/// processed; callers set it before each file.
pub struct ShortcodeProcessor<'a> {
    shortcodes: &'a Shortcodes,
    current_file: Option<PathBuf>,
}

impl<'a> ShortcodeProcessor<'a> {
    pub fn new(shortcodes: &'a Shortcodes) -> Self {
        Self {
            shortcodes,
            current_file: None,
        }
    }

    pub fn set_current_file(&mut self, file: &Path) {
        self.current_file = Some(file.to_path_buf());
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    /// Expand every registered shortcode in `content`.
    pub fn process(&self, content: &str) -> String {
        if self.shortcodes.is_empty() {
            return content.to_string();
        }
        TOKEN
            .replace_all(content, |caps: &Captures| match self.shortcodes.get(&caps[1]) {
                Some(handler) => {
                    let args = parse_attributes(caps[2].trim());
                    handler(&args, self.current_file())
                }
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
