//! Shared test utilities for the sitepress test suite.
//!
//! The `fixtures/` tree is a small working site: a `sitepress.toml`, one
//! theme and one plugin with a content block.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let config = fixture_config();
//! let plugins = load_plugins(&tmp.path().join("plugins")).unwrap();
//! let report = generate(&config, tmp.path(), &plugins, false).unwrap();
//! let header = read_built(&tmp, "example.com", "header.php");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::{Config, parse_config};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// The parsed `fixtures/sitepress.toml`.
pub fn fixture_config() -> Config {
    parse_config(include_str!("../fixtures/sitepress.toml")).unwrap()
}

/// Read a file from a built domain. Panics with the path on failure.
pub fn read_built(tmp: &TempDir, domain: &str, relative: &str) -> String {
    let path = tmp.path().join("build").join(domain).join(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("could not read {}: {}", path.display(), e))
}
