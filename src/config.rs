use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Translator timeout used when the configured value is unusable.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Errors raised while reading a user overlay. Never surfaced to callers of
/// [`Config::load`]; they are logged and the defaults are kept.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Program to invoke; split with shlex, so it may carry leading args.
    #[serde(default)]
    pub program: String,
    /// Flag asking the backend for a bare shell command.
    #[serde(default)]
    pub mode_flag: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            program: String::new(),
            mode_flag: String::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub allowed_roots: Vec<String>,
}

/// One local resolution rule: a trigger phrase and the command it maps to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuleConfig {
    pub trigger: String,
    pub template: String,
    /// Template used instead of `template` on Windows hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<String>,
}

impl RuleConfig {
    /// The template for the host platform.
    pub fn host_template(&self) -> &str {
        match &self.windows {
            Some(w) if cfg!(windows) => w,
            _ => &self.template,
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    translator: TranslatorOverlay,
    #[serde(default)]
    policy: PolicyOverlay,
    #[serde(default)]
    replace_rules: bool,
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TranslatorOverlay {
    enabled: Option<bool>,
    timeout_secs: Option<u64>,
    program: Option<String>,
    mode_flag: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PolicyOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    deny: Vec<String>,
    #[serde(default)]
    allowed_roots: Vec<String>,
    #[serde(default)]
    remove_deny: Vec<String>,
    #[serde(default)]
    remove_allowed_roots: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Default overlay location: `~/.config/shellgate/config.toml`.
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde("~/.config/shellgate/config.toml").into_owned())
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the user overlay at `path` (or [`Config::default_path`]) if it exists
    ///
    /// A missing or malformed overlay is logged and the defaults are used.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::default_config();
        match Self::read_overlay(&path) {
            Ok(Some(overlay)) => {
                log::debug!("applying config overlay from {}", path.display());
                config.apply_overlay(overlay);
            }
            Ok(None) => log::info!("no config at {}, using defaults", path.display()),
            Err(e) => log::warn!("{e}; using default configuration"),
        }
        config.sanitize();
        config
    }

    /// Read and parse an overlay file. `Ok(None)` when the file does not exist.
    fn read_overlay(path: &Path) -> Result<Option<ConfigOverlay>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Translator: scalar overrides
        let t = overlay.translator;
        if let Some(v) = t.enabled {
            self.translator.enabled = v;
        }
        if let Some(v) = t.timeout_secs {
            self.translator.timeout_secs = v;
        }
        if let Some(v) = t.program {
            self.translator.program = v;
        }
        if let Some(v) = t.mode_flag {
            self.translator.mode_flag = v;
        }

        // Policy
        let p = overlay.policy;
        merge_list(&mut self.policy.deny, p.deny, &p.remove_deny, p.replace);
        merge_list(
            &mut self.policy.allowed_roots,
            p.allowed_roots,
            &p.remove_allowed_roots,
            p.replace,
        );

        // Rules: user rules come after the defaults, so defaults keep priority
        if overlay.replace_rules {
            self.rules = overlay.rules;
        } else {
            for rule in overlay.rules {
                if !self.rules.contains(&rule) {
                    self.rules.push(rule);
                }
            }
        }
    }

    /// Replace values that would make the gatekeeper misbehave.
    fn sanitize(&mut self) {
        if self.translator.timeout_secs == 0 {
            log::warn!(
                "translator.timeout_secs = 0 is not usable, falling back to {DEFAULT_TIMEOUT_SECS}s"
            );
            self.translator.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
    }

    /// Serialize the merged configuration (for `--dump-config`).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
