//! # Sitepress
//!
//! A theme-based templater for multi-domain landing sites. One config file
//! lists the sites; each site gets a copy of its theme under
//! `build/<domain>/` with project data substituted into the PHP templates.
//!
//! # Architecture: Per-Project Pipeline
//!
//! Every project goes through the same sequence of whole-file text passes:
//!
//! ```text
//! theme/  ──copy──▶  build/<domain>/  ──tokens, styles──▶  ──data passes──▶  served site
//!                                                              │
//!                           link encryption, header upserts, placeholders,
//!                           shortcodes, image attributes, button links
//! ```
//!
//! Build output is additive: files already in the output are never replaced
//! by the copy, and every text pass is safe to repeat. Rebuilding without
//! `--clean` therefore converges instead of piling up duplicate tags.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `sitepress.toml` loading and validation, project data and style rules |
//! | [`generate`] | Build orchestration, per-project steps, admin key provisioning |
//! | [`theme`] | Non-destructive directory copy |
//! | [`styles`] | Generated CSS rules, appended once per stylesheet |
//! | [`links`] | `btn_link*` fingerprinting, redirect script, button href injection |
//! | [`html`] | Header meta/canonical/schema upserts, alt and srcset injection |
//! | [`placeholder`] | `<?= $data['key'] ?>` substitution |
//! | [`shortcode`] | `[tag attr="v"]` parsing and single-pass expansion |
//! | [`pattern`] | Glob filter selecting files for substitution |
//! | [`plugin`] | `plugin.toml` discovery and the immutable handler registry |
//! | [`runtime`] | Content lookup and the post-render response transform |
//! | [`content`] | Numbered content blocks in a plugin's data directory |
//! | [`types`] | Build reports |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Plugin Registry
//!
//! Plugins are declared, not executed. A `plugin.toml` maps shortcode tags
//! and function names to handlers compiled into this crate; the descriptors
//! are validated up front and folded into a [`plugin::PluginRegistry`] that
//! is passed by reference to whatever expands shortcodes.
//!
//! ## Build-Time Decisions Stay in the Build Copy
//!
//! Structured-data flags are resolved by rewriting the per-domain copy of
//! `header.php`, never the theme itself, so projects sharing a theme cannot
//! overwrite each other's choices.
//!
//! ## Response Transforms Are a Step, Not a Hook
//!
//! Alt text, `srcset` and button links are applied to content loaded at
//! request time by calling [`runtime::transform_response`] after rendering,
//! the same functions the build runs over static files.

pub mod config;
pub mod content;
pub mod generate;
pub mod html;
pub mod links;
pub mod output;
pub mod pattern;
pub mod placeholder;
pub mod plugin;
pub mod runtime;
pub mod shortcode;
pub mod styles;
pub mod theme;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
