use serde::Serialize;

use crate::config::Config;
use crate::exec::{ExecError, Executor};
use crate::policy::SubstringPolicy;
use crate::resolve::Resolver;

/// What happened to one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to execute: resolution came back empty.
    Unresolved,
    /// The policy refused the command; nothing was run.
    Denied { command: String, reason: String },
    /// The command ran and failed, or could not be started.
    Failed { command: String, message: String },
    /// The command ran and exited successfully.
    Succeeded { command: String, output: String },
}

impl Outcome {
    /// The resolved command, if resolution produced one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Outcome::Unresolved => None,
            Outcome::Denied { command, .. }
            | Outcome::Failed { command, .. }
            | Outcome::Succeeded { command, .. } => Some(command),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }
}

/// Resolve, validate and run instructions one at a time.
pub struct Gatekeeper {
    resolver: Resolver,
    executor: Executor,
}

impl Gatekeeper {
    pub fn new(resolver: Resolver, executor: Executor) -> Self {
        Self { resolver, executor }
    }

    /// Build the full pipeline from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Resolver::from_config(config),
            Executor::new(SubstringPolicy::from_config(&config.policy)),
        )
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn policy(&self) -> &SubstringPolicy {
        self.executor.policy()
    }

    /// Resolve an instruction without running anything.
    pub fn resolve(&self, instruction: &str) -> String {
        self.resolver.resolve(instruction)
    }

    /// Handle one instruction end to end.
    pub fn handle(&self, instruction: &str) -> Outcome {
        let command = self.resolver.resolve(instruction);
        if command.is_empty() {
            log::info!("nothing to execute for {:?}", instruction.trim());
            return Outcome::Unresolved;
        }
        self.run(command)
    }

    /// Validate and run an already-resolved command.
    pub fn run(&self, command: String) -> Outcome {
        match self.executor.execute(&command) {
            Ok(output) => Outcome::Succeeded { command, output },
            Err(ExecError::NoCommand) => Outcome::Unresolved,
            Err(ExecError::Denied { reason }) => Outcome::Denied { command, reason },
            Err(e) => Outcome::Failed {
                command,
                message: e.to_string(),
            },
        }
    }
}
