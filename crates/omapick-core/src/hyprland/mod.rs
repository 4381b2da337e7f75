//! Hyprland window-rule compatibility.
//!
//! Hyprland 0.53 dropped `windowrulev2` and the comma-separated rule syntax.
//! Older themes still ship it, so applying one of them can break the
//! compositor config. [`patch_window_rules`] rewrites such lines:
//!
//! ```text
//! windowrulev2 = float, class:^(pavucontrol)$
//! windowrule = float class:pavucontrol
//! ```

use std::path::Path;

use crate::error::Result;

const RULE_KEYWORDS: &[&str] = &["windowrulev2", "windowrule"];
const ANCHORED_FIELDS: &[&str] = &["class:", "title:"];

/// Rewrite deprecated window rules in a `hyprland.conf`.
///
/// Returns `None` when nothing needs to change. Lines other than window
/// rules are kept verbatim.
#[must_use]
pub fn patch_window_rules(text: &str) -> Option<String> {
    let mut changed = false;
    let lines: Vec<String> = text
        .lines()
        .map(|line| match rewrite_rule(line.trim()) {
            Some(rewritten) => {
                changed |= rewritten != line.trim();
                rewritten
            }
            None => line.to_string(),
        })
        .collect();

    changed.then(|| {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    })
}

/// Patch `path` in place. A missing file is left alone.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or written.
pub async fn patch_file(path: &Path) -> Result<bool> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let Some(patched) = patch_window_rules(&text) else {
        return Ok(false);
    };
    tokio::fs::write(path, patched).await?;
    tracing::info!("Patched deprecated window rules in {}", path.display());
    Ok(true)
}

fn rewrite_rule(line: &str) -> Option<String> {
    let (keyword, rest) = line.split_once('=')?;
    let keyword = keyword.trim_end();
    if !RULE_KEYWORDS.contains(&keyword) {
        return None;
    }
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let fields: Vec<String> = rest.split(',').map(|f| strip_anchors(f.trim())).collect();
    Some(format!("windowrule = {}", fields.join(" ")))
}

/// `class:^(firefox)$` becomes `class:firefox`.
fn strip_anchors(field: &str) -> String {
    for prefix in ANCHORED_FIELDS {
        if let Some(inner) = field
            .strip_prefix(prefix)
            .and_then(|value| value.strip_prefix("^("))
            .and_then(|value| value.strip_suffix(")$"))
        {
            if !inner.is_empty() {
                return format!("{prefix}{inner}");
            }
        }
    }
    field.to_string()
}
