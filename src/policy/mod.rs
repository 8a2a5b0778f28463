//! Command safety policy: denylisted programs and allowlisted filesystem roots.
//!
//! [`SubstringPolicy`] is a text heuristic, not a shell parser. It splits on
//! whitespace and tests roots by substring, so it both over-rejects (any word
//! that happens to exist on disk triggers the root check) and under-rejects
//! (one allowed root anywhere in the command covers every path in it).

/// Whitespace view of a candidate command.
pub mod context;
/// Decision and reason types.
pub mod decision;
/// Program-name denylist.
pub mod deny;
/// Allowlisted-root check.
pub mod roots;

pub use context::CommandContext;
pub use decision::{Decision, PolicyDecision};
pub use deny::DenyProgramCheck;
pub use roots::AllowedRootsCheck;

use std::path::PathBuf;

use crate::config::PolicyConfig;

/// One step of policy validation.
///
/// Returns `Some` to end validation with that decision, `None` to pass the
/// command on to the next check.
pub trait PolicyCheck: Send + Sync {
    fn check(&self, ctx: &CommandContext) -> Option<PolicyDecision>;
}

/// Denylist-then-roots policy over the raw command text.
pub struct SubstringPolicy {
    checks: Vec<Box<dyn PolicyCheck>>,
    roots: Vec<String>,
}

impl SubstringPolicy {
    /// Build from explicit lists. Roots are used exactly as given.
    pub fn new<S: AsRef<str>>(deny: &[S], roots: Vec<String>) -> Self {
        let checks: Vec<Box<dyn PolicyCheck>> = vec![
            Box::new(DenyProgramCheck::new(deny)),
            Box::new(AllowedRootsCheck::new(roots.clone())),
        ];
        Self { checks, roots }
    }

    /// Build from configuration, expanding `~`/`$VAR` in the roots.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let roots = config
            .allowed_roots
            .iter()
            .map(|r| roots::expand_root(r))
            .collect();
        Self::new(config.deny.as_slice(), roots)
    }

    /// The effective allowlisted roots.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Decide whether `command` may run.
    pub fn validate(&self, command: &str) -> PolicyDecision {
        let ctx = CommandContext::from_command(command);
        for check in &self.checks {
            if let Some(decision) = check.check(&ctx) {
                return decision;
            }
        }
        PolicyDecision::allow("command safe")
    }

    /// Create every allowlisted root that does not exist yet.
    pub fn ensure_roots(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for root in &self.roots {
            let path = PathBuf::from(root);
            if !path.is_dir() {
                std::fs::create_dir_all(&path)?;
                log::info!("created allowed root {}", path.display());
                created.push(path);
            }
        }
        Ok(created)
    }
}
