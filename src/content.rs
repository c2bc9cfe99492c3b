//! Numbered content blocks.
//!
//! A content block is an HTML fragment stored as `content-<id>.html` in a
//! plugin's `data/` directory and referenced from templates as
//! `[content id="<id>"]`. Blocks are created with the next free id, edited in
//! place, and never deleted automatically.

use crate::config::{Config, is_safe_domain};
use crate::generate::PLUGINS_SUBDIR;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Block directory inside a plugin.
pub const DATA_SUBDIR: &str = "data";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data directory does not exist: {}", .0.display())]
    MissingDir(PathBuf),
    #[error("Content block {0} not found")]
    NotFound(u32),
    #[error("Unsafe domain name '{0}'")]
    UnsafeDomain(String),
}

/// File name of the block with the given id.
pub fn block_file_name(id: u32) -> String {
    format!("content-{id}.html")
}

/// Block id encoded in a file name, if it is one.
pub fn parse_block_file_name(name: &str) -> Option<u32> {
    name.strip_prefix("content-")?
        .strip_suffix(".html")?
        .parse()
        .ok()
}

/// Content blocks of one plugin data directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store of a plugin's blocks.
    ///
    /// With a domain this is the copy served by `<build_dir>/<domain>`, which
    /// is what the site reads and what rebuilds leave alone. Without one it
    /// is the source plugin under `plugins_dir`, seeding domains built later.
    pub fn for_plugin(
        config: &Config,
        base: &Path,
        plugin: &str,
        domain: Option<&str>,
    ) -> Result<Self, ContentError> {
        let plugins = match domain {
            Some(domain) if !is_safe_domain(domain) => {
                return Err(ContentError::UnsafeDomain(domain.to_string()));
            }
            Some(domain) => base
                .join(&config.build_dir)
                .join(domain)
                .join(PLUGINS_SUBDIR),
            None => base.join(&config.plugins_dir),
        };
        Ok(Self::new(plugins.join(plugin).join(DATA_SUBDIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: u32) -> PathBuf {
        self.dir.join(block_file_name(id))
    }

    /// Ids of all stored blocks, ascending. A missing directory holds none.
    pub fn list(&self) -> Result<Vec<u32>, ContentError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<u32> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| parse_block_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Highest existing id plus one, or 1 for an empty store.
    pub fn next_id(&self) -> Result<u32, ContentError> {
        Ok(self.list()?.last().map_or(1, |max| max + 1))
    }

    /// Create an empty block under the next id.
    pub fn create(&self) -> Result<u32, ContentError> {
        fs::create_dir_all(&self.dir)?;
        let id = self.next_id()?;
        fs::write(self.path(id), "")?;
        Ok(id)
    }

    /// Overwrite (or create) a block.
    pub fn save(&self, id: u32, html: &str) -> Result<PathBuf, ContentError> {
        if !self.dir.is_dir() {
            return Err(ContentError::MissingDir(self.dir.clone()));
        }
        let path = self.path(id);
        fs::write(&path, html)?;
        Ok(path)
    }

    pub fn load(&self, id: u32) -> Result<String, ContentError> {
        let path = self.path(id);
        if !path.is_file() {
            return Err(ContentError::NotFound(id));
        }
        Ok(fs::read_to_string(path)?)
    }
}
