//! Template placeholder substitution.
//!
//! Theme files echo project data through PHP tags:
//!
//! ```text
//! <?php echo $data['title']; ?>
//! <?= $data["title"] ?>
//! ```
//!
//! At build time every such tag whose key holds a scalar value is replaced by
//! the literal value, so the served page no longer depends on `$data`. Tags
//! for unknown or non-scalar keys are left byte-for-byte as written.

use crate::config::{DataMap, scalar_to_string};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static DATA_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<\?(?:php\s+echo|=)\s*\$data\[\s*(?:'([^'"]+)'|"([^'"]+)")\s*\]\s*;?\s*\?>"#,
    )
    .unwrap()
});

/// Replace every data echo tag in `content` with its value from `data`.
///
/// Values are inserted verbatim, without escaping.
pub fn replace_data_placeholders(content: &str, data: &DataMap) -> String {
    DATA_TAG
        .replace_all(content, |caps: &Captures| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            data.get(key)
                .and_then(scalar_to_string)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
