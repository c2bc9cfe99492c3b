//! Generated CSS rules.
//!
//! Style rules from the project config are rendered to one line each and
//! appended to their target stylesheets. A line already present in the file
//! is never appended again, so repeated builds leave the stylesheet stable.

use crate::config::StyleRule;
use crate::generate::{GenerateError, ensure_dir};
use log::warn;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

const NEW_FILE_HEADER: &str = "/* Generated styles */\n\n";
const BLOCK_HEADER: &str = "\n/* Generated dynamic styles */\n";

/// Rendered lines grouped by target file, in first-seen order.
pub fn group_by_file(rules: &[StyleRule]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for rule in rules {
        let Some(line) = rule.render() else {
            continue;
        };
        match groups.iter_mut().find(|(file, _)| *file == rule.file) {
            Some((_, lines)) => {
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
            None => groups.push((rule.file.clone(), vec![line])),
        }
    }
    groups
}

/// Append every rule not yet present to its stylesheet under `root`.
///
/// Missing stylesheets are created with a short header. Returns the number
/// of lines written.
pub fn write_styles(root: &Path, rules: &[StyleRule]) -> Result<usize, GenerateError> {
    let mut written = 0;
    for (relative, lines) in group_by_file(rules) {
        let path = root.join(&relative);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        if !path.exists() {
            if let Err(e) = fs::write(&path, NEW_FILE_HEADER) {
                warn!("could not create {}: {}", path.display(), e);
                continue;
            }
        }
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let fresh: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|line| !existing.contains(line))
            .collect();
        if fresh.is_empty() {
            continue;
        }
        let block = format!("{}{}\n", BLOCK_HEADER, fresh.join("\n"));
        let appended = OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(block.as_bytes()));
        match appended {
            Ok(()) => written += fresh.len(),
            Err(e) => warn!("could not append to {}: {}", path.display(), e),
        }
    }
    Ok(written)
}
