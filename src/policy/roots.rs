use std::path::{Path, PathBuf};

use crate::policy::{CommandContext, PolicyCheck, PolicyDecision};

/// Requires an allowlisted root somewhere in the command text whenever any
/// word names a path that exists right now.
///
/// Words are probed as-is: no `~` or variable expansion, relative words are
/// resolved against the current directory. The root test is a substring test
/// on the raw command, so one allowed root anywhere satisfies every path.
pub struct AllowedRootsCheck {
    roots: Vec<String>,
}

impl AllowedRootsCheck {
    /// Build from already-expanded, absolute root strings.
    pub fn new(roots: Vec<String>) -> Self {
        Self { roots }
    }

    fn mentions_root(&self, raw: &str) -> bool {
        self.roots.iter().any(|root| raw.contains(root.as_str()))
    }
}

impl PolicyCheck for AllowedRootsCheck {
    fn check(&self, ctx: &CommandContext) -> Option<PolicyDecision> {
        let existing = ctx.words.iter().find(|w| Path::new(**w).exists())?;
        if self.mentions_root(ctx.raw) {
            return None;
        }
        log::debug!("existing path {existing:?} without an allowed root");
        Some(PolicyDecision::deny("path outside allowlist"))
    }
}

/// Expand `~` and `$VAR` in a configured root and make it absolute.
///
/// Expansion failures (unset variables) keep the raw text.
pub fn expand_root(root: &str) -> String {
    let expanded = match shellexpand::full(root) {
        Ok(s) => s.into_owned(),
        Err(e) => {
            log::warn!("cannot expand allowed root {root:?}: {e}");
            root.to_string()
        }
    };
    let path = PathBuf::from(&expanded);
    if path.is_absolute() {
        return expanded;
    }
    match std::path::absolute(&path) {
        Ok(abs) => abs.to_string_lossy().into_owned(),
        Err(_) => expanded,
    }
}
