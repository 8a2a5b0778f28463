use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::policy::PolicyDecision;

/// Target used for per-command policy decisions.
pub const DECISION_TARGET: &str = "shellgate::decision";

/// Default log file: ~/.local/share/shellgate/shellgate.log.
pub fn default_log_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(Path::new(&home).join(".local/share/shellgate/shellgate.log"))
}

/// Install the global logger: warnings (or `term_level`) to stderr and, when
/// `file` can be opened, everything at info and above appended to it.
///
/// Best-effort: a log file that cannot be opened only drops the file sink,
/// and a second call is ignored.
pub fn init(term_level: LevelFilter, file: Option<&Path>) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let mut file_error = None;
    if let Some(path) = file {
        match open_log_file(path) {
            Ok(f) => loggers.push(WriteLogger::new(LevelFilter::Info, config, f)),
            Err(e) => file_error = Some(e),
        }
    }

    if CombinedLogger::init(loggers).is_err() {
        return;
    }
    if let (Some(path), Some(e)) = (file, file_error) {
        log::warn!("cannot open log file {}: {e}", path.display());
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

/// Log one policy decision as a single line.
pub fn log_decision(command: &str, decision: &PolicyDecision) {
    log::info!(target: DECISION_TARGET, "{}", decision_line(command, decision));
}

/// `<decision>\t<command>\t<reason>`, with the command truncated to 200 chars
/// and newlines flattened.
fn decision_line(command: &str, decision: &PolicyDecision) -> String {
    let cmd_truncated: String = command.replace('\n', "; ").chars().take(200).collect();
    let reason_oneline = decision.reason.replace('\n', "; ");
    format!(
        "{}\t{}\t{}",
        decision.decision.label(),
        cmd_truncated,
        reason_oneline
    )
}
