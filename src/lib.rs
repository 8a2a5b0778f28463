//! shellgate: resolve free-form instructions to shell commands and run them
//! only when a safety policy allows.
//!
//! An instruction goes through three steps. The [`resolve::Resolver`] maps it
//! to a command using ordered local prefix rules, falling back to an external
//! translator. The [`policy::SubstringPolicy`] allows or denies the command.
//! The [`exec::Executor`] runs allowed commands through the host shell.
//! [`pipeline::Gatekeeper`] ties them together.
//!
//! # Architecture
//!
//! - **[`resolve`]**: Local rules and the translator capability.
//! - **[`policy`]**: Denylisted programs and allowlisted roots.
//! - **[`exec`]**: Shell runner and output normalization.
//! - **[`pipeline`]**: Per-instruction outcome.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]**: simplelog setup and decision records.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Command execution behind the policy.
pub mod exec;
/// Logger setup and decision logging.
pub mod logging;
/// The gatekeeper pipeline and per-instruction outcome.
pub mod pipeline;
/// Safety policy over raw command text.
pub mod policy;
/// Instruction-to-command resolution.
pub mod resolve;

use policy::PolicyDecision;

/// Validate a command against the default configuration's policy.
///
/// This is the main entry point for tests and simple usage.
/// For CLI usage with a user config, build a [`pipeline::Gatekeeper`] directly.
pub fn validate(command: &str) -> PolicyDecision {
    let config = config::Config::default_config();
    policy::SubstringPolicy::from_config(&config.policy).validate(command)
}

/// Resolve an instruction with the default configuration's rules.
pub fn resolve(instruction: &str) -> String {
    let config = config::Config::default_config();
    resolve::Resolver::from_config(&config).resolve(instruction)
}
