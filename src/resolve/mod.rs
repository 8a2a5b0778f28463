//! Instruction resolution: local prefix rules first, then the translator.

/// External translation backend.
pub mod translator;

pub use translator::{CliTranslator, TranslateError, Translator};

use std::time::Duration;

use crate::config::{Config, RuleConfig};

/// A local rule: trigger phrase and the command template it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub trigger: String,
    pub template: String,
}

impl Rule {
    pub fn new(trigger: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            template: template.into(),
        }
    }

    /// Expand this rule against a trimmed instruction, if the trigger is its prefix.
    fn apply(&self, instruction: &str) -> Option<String> {
        let rest = instruction.strip_prefix(self.trigger.as_str())?.trim();
        if rest.is_empty() {
            Some(self.template.clone())
        } else {
            Some(format!("{} {}", self.template, rest))
        }
    }
}

impl From<&RuleConfig> for Rule {
    fn from(rule: &RuleConfig) -> Self {
        Rule::new(rule.trigger.trim(), rule.host_template().trim())
    }
}

/// Maps instructions to candidate commands.
pub struct Resolver {
    rules: Vec<Rule>,
    translator: Option<Box<dyn Translator>>,
    timeout: Duration,
}

impl Resolver {
    /// Rules keep their order; blank triggers or templates are dropped.
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|r| {
                let usable = !r.trigger.is_empty() && !r.template.is_empty();
                if !usable {
                    log::warn!("ignoring rule with blank trigger or template: {r:?}");
                }
                usable
            })
            .collect();
        Self {
            rules,
            translator: None,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Enable the translator fallback.
    pub fn with_translator(mut self, translator: Box<dyn Translator>, timeout: Duration) -> Self {
        self.translator = Some(translator);
        self.timeout = timeout;
        self
    }

    /// Build from configuration; the CLI translator is attached only when enabled.
    pub fn from_config(config: &Config) -> Self {
        let resolver = Self::new(config.rules.iter().map(Rule::from).collect());
        if !config.translator.enabled {
            return resolver;
        }
        resolver.with_translator(
            Box::new(CliTranslator::from_config(&config.translator)),
            Duration::from_secs(config.translator.timeout_secs),
        )
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Resolve an instruction to a command. An empty string means there is
    /// nothing to execute.
    pub fn resolve(&self, instruction: &str) -> String {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return String::new();
        }

        if let Some(command) = self.rules.iter().find_map(|r| r.apply(instruction)) {
            log::debug!("local rule resolved {instruction:?} to {command:?}");
            return command;
        }

        let Some(translator) = &self.translator else {
            log::info!("no local rule matched and translator disabled, passing input through");
            return instruction.to_string();
        };

        match translator.translate(instruction, self.timeout) {
            Ok(command) => command,
            Err(e) => {
                log::error!("could not translate {instruction:?}: {e}");
                String::new()
            }
        }
    }
}
