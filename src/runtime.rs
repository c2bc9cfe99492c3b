//! Request-time content lookup and response transforms.
//!
//! Built pages pull admin-edited content blocks in when they are served. The
//! same cleanup the build applies to static files (alt text, responsive
//! `srcset`, button links) is applied to that content as an explicit step
//! after it is loaded, rather than as a side effect of rendering.

use crate::config::DataMap;
use crate::content::DATA_SUBDIR;
use crate::html::{add_missing_alt_attributes, add_responsive_srcset, escape_attr};
use crate::links::inject_encrypted_links_to_classes;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Post-render transform for a page or fragment.
///
/// Alt text first, then `srcset` (resolved under `site_root`), then button
/// links when project data is available. Running it twice changes nothing.
pub fn transform_response(html: &str, site_root: &Path, data: Option<&DataMap>) -> String {
    let html = add_missing_alt_attributes(html);
    let html = add_responsive_srcset(&html, site_root);
    match data {
        Some(data) => inject_encrypted_links_to_classes(&html, data),
        None => html,
    }
}

/// Loads content fragments from a plugin data directory.
#[derive(Debug, Clone)]
pub struct ContentRuntime {
    data_dir: PathBuf,
    site_root: PathBuf,
    data: Option<DataMap>,
}

impl ContentRuntime {
    pub fn new(data_dir: impl Into<PathBuf>, site_root: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            site_root: site_root.into(),
            data: None,
        }
    }

    /// For a plugin installed at `<site>/plugins/<name>`: data lives in the
    /// plugin's `data/` and images resolve two levels up.
    pub fn for_plugin(plugin_dir: &Path) -> Self {
        let site_root = plugin_dir
            .parent()
            .and_then(Path::parent)
            .unwrap_or(plugin_dir);
        Self::new(plugin_dir.join(DATA_SUBDIR), site_root)
    }

    /// Also force button links from `data` into loaded content.
    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = Some(data);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load `<key>.html` and run [`transform_response`] over it.
    ///
    /// Only the last path component of `key` is used. A missing or
    /// unreadable file yields an HTML comment instead of failing the page.
    pub fn load_content(&self, key: &str) -> String {
        let safe = Path::new(key)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = self.data_dir.join(format!("{safe}.html"));
        if safe.is_empty() || !path.is_file() {
            debug!("content not found: {}", path.display());
            return format!("<!-- content not found: {} -->", escape_attr(&safe));
        }
        match fs::read_to_string(&path) {
            Ok(html) => transform_response(&html, &self.site_root, self.data.as_ref()),
            Err(e) => {
                debug!("content read error {}: {}", path.display(), e);
                format!("<!-- content read error: {} -->", escape_attr(&safe))
            }
        }
    }
}
