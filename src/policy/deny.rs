use crate::policy::{CommandContext, PolicyCheck, PolicyDecision};

/// Denies a command whose program name is on the denylist.
///
/// Only the program name is looked at; arguments never rescue a denied program.
pub struct DenyProgramCheck {
    names: Vec<String>,
}

impl DenyProgramCheck {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

impl PolicyCheck for DenyProgramCheck {
    fn check(&self, ctx: &CommandContext) -> Option<PolicyDecision> {
        if ctx.program.is_empty() || !self.names.contains(&ctx.program) {
            return None;
        }
        let shown = ctx.words.first().copied().unwrap_or_default();
        Some(PolicyDecision::deny(format!("forbidden program: {shown}")))
    }
}
