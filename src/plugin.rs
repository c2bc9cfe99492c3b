//! Plugin discovery and the shortcode/function registry.
//!
//! Every directory under the plugin root that holds a `plugin.toml` is a
//! plugin. The descriptor binds shortcode tags and runtime function names to
//! handlers built into this crate:
//!
//! ```toml
//! name = "tinymce"
//!
//! [shortcodes]
//! content = "content_include"
//!
//! [functions]
//! loadTinyContent = "load_content"
//! ```
//!
//! | Handler | Kind | Effect |
//! |---------|------|--------|
//! | `content_include` | shortcode | PHP include that loads the block when the page is served |
//! | `content_inline` | shortcode | block HTML pasted in at build time |
//! | `load_content` | function | reads `data/<key>.html` from the plugin |
//!
//! All descriptors are read and checked before anything is registered, so a
//! typo in a handler name fails the run before any output is written. The
//! resulting [`PluginRegistry`] is immutable and passed by reference.

use crate::content::DATA_SUBDIR;
use crate::runtime::ContentRuntime;
use crate::shortcode::{ShortcodeArgs, Shortcodes};
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Descriptor file looked for in each plugin directory.
pub const DESCRIPTOR_FILE: &str = "plugin.toml";

/// Runtime function called when a plugin declares none.
pub const DEFAULT_CONTENT_FUNCTION: &str = "loadTinyContent";

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid plugin descriptor {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Plugin '{plugin}': unknown handler '{handler}' for '{name}'")]
    UnknownHandler {
        plugin: String,
        name: String,
        handler: String,
    },
}

/// Contents of a `plugin.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginDescriptor {
    /// Defaults to the directory name.
    pub name: Option<String>,
    /// Shortcode tag to handler name.
    pub shortcodes: BTreeMap<String, String>,
    /// Runtime function name to handler name.
    pub functions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcodeHandler {
    ContentInclude,
    ContentInline,
}

impl ShortcodeHandler {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "content_include" => Some(Self::ContentInclude),
            "content_inline" => Some(Self::ContentInline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionHandler {
    LoadContent,
}

impl FunctionHandler {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "load_content" => Some(Self::LoadContent),
            _ => None,
        }
    }
}

/// A runtime function: one string argument in, HTML out.
pub type RuntimeFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A plugin after its descriptor was validated.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPlugin {
    pub name: String,
    /// Source directory, copied into every build under `plugins/<dir name>`.
    pub dir: PathBuf,
    pub shortcodes: Vec<(String, ShortcodeHandler)>,
    pub functions: Vec<(String, FunctionHandler)>,
}

impl LoadedPlugin {
    /// Directory name, which is also the install path inside a build.
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// The plugin's content lookup function, as called from generated PHP.
    pub fn content_function(&self) -> &str {
        self.functions
            .iter()
            .find(|(_, handler)| *handler == FunctionHandler::LoadContent)
            .map(|(name, _)| name.as_str())
            .unwrap_or(DEFAULT_CONTENT_FUNCTION)
    }
}

/// Everything plugins contribute to a build.
#[derive(Default)]
pub struct PluginRegistry {
    shortcodes: Shortcodes,
    functions: HashMap<String, RuntimeFn>,
    plugins: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    pub fn shortcodes(&self) -> &Shortcodes {
        &self.shortcodes
    }

    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Registered runtime function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call a runtime function by name, `None` if nothing registered it.
    pub fn call_function(&self, name: &str, arg: &str) -> Option<String> {
        self.functions.get(name).map(|f| f(arg))
    }

    fn register(&mut self, plugin: LoadedPlugin) {
        for (tag, handler) in &plugin.shortcodes {
            debug!("plugin {}: shortcode [{}] -> {:?}", plugin.name, tag, handler);
            match handler {
                ShortcodeHandler::ContentInclude => {
                    let dir_name = plugin.dir_name();
                    let function = plugin.content_function().to_string();
                    self.shortcodes.register(tag, move |args, _file| {
                        content_include(args, &dir_name, &function)
                    });
                }
                ShortcodeHandler::ContentInline => {
                    let data_dir = plugin.dir.join(DATA_SUBDIR);
                    self.shortcodes.register(tag, move |args, file| {
                        content_inline(args, &data_dir, file)
                    });
                }
            }
        }
        for (name, handler) in &plugin.functions {
            debug!("plugin {}: function {} -> {:?}", plugin.name, name, handler);
            match handler {
                FunctionHandler::LoadContent => {
                    let runtime = ContentRuntime::for_plugin(&plugin.dir);
                    self.functions
                        .insert(name.clone(), Box::new(move |key| runtime.load_content(key)));
                }
            }
        }
        self.plugins.push(plugin);
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("shortcodes", &self.shortcodes)
            .field("functions", &self.function_names())
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Read and check one descriptor.
pub fn load_descriptor(dir: &Path) -> Result<LoadedPlugin, PluginError> {
    let path = dir.join(DESCRIPTOR_FILE);
    let text = fs::read_to_string(&path)?;
    let descriptor: PluginDescriptor =
        toml::from_str(&text).map_err(|source| PluginError::Descriptor {
            path: path.clone(),
            source,
        })?;
    let name = descriptor.name.clone().unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let unknown = |entry: &str, handler: &str| PluginError::UnknownHandler {
        plugin: name.clone(),
        name: entry.to_string(),
        handler: handler.to_string(),
    };
    let mut shortcodes = Vec::new();
    for (tag, handler) in &descriptor.shortcodes {
        let parsed = ShortcodeHandler::from_name(handler).ok_or_else(|| unknown(tag, handler))?;
        shortcodes.push((tag.clone(), parsed));
    }
    let mut functions = Vec::new();
    for (function, handler) in &descriptor.functions {
        let parsed =
            FunctionHandler::from_name(handler).ok_or_else(|| unknown(function, handler))?;
        functions.push((function.clone(), parsed));
    }

    Ok(LoadedPlugin {
        name,
        dir: dir.to_path_buf(),
        shortcodes,
        functions,
    })
}

/// Discover every plugin under `dir`, in directory-name order.
///
/// A missing plugin root yields an empty registry. Directories without a
/// descriptor are not plugins and are ignored.
pub fn load_plugins(dir: &Path) -> Result<PluginRegistry, PluginError> {
    let mut registry = PluginRegistry::default();
    if !dir.is_dir() {
        debug!("no plugin directory at {}", dir.display());
        return Ok(registry);
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(DESCRIPTOR_FILE).is_file())
        .collect();
    candidates.sort();

    let loaded = candidates
        .iter()
        .map(|path| load_descriptor(path))
        .collect::<Result<Vec<_>, _>>()?;
    for plugin in loaded {
        registry.register(plugin);
    }
    Ok(registry)
}

// ============================================================================
// Built-in handlers
// ============================================================================

/// Digits of the `id` attribute, or the comment to emit instead.
fn content_id(args: &ShortcodeArgs) -> Result<String, &'static str> {
    let raw = args
        .get_str("id")
        .ok_or("<!-- content missing id attribute -->")?;
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err("<!-- content invalid id -->");
    }
    Ok(digits)
}

/// PHP that loads the plugin runtime and echoes the block when served.
fn content_include(args: &ShortcodeArgs, plugin_dir: &str, function: &str) -> String {
    match content_id(args) {
        Ok(id) => format!(
            "<?php\n\t$__rt = __DIR__ . '/plugins/{plugin_dir}/runtime.php';\n\tif (file_exists($__rt)) {{ require_once $__rt; }}\n\techo {function}('content-{id}');\n?>"
        ),
        Err(comment) => comment.to_string(),
    }
}

/// Block HTML inserted directly, with image paths resolved next to the file
/// being processed.
fn content_inline(args: &ShortcodeArgs, data_dir: &Path, file: Option<&Path>) -> String {
    let id = match content_id(args) {
        Ok(id) => id,
        Err(comment) => return comment.to_string(),
    };
    let site_root = file.and_then(Path::parent).unwrap_or(data_dir);
    ContentRuntime::new(data_dir, site_root).load_content(&format!("content-{id}"))
}
