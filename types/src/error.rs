use thiserror::Error;

/// Errors produced while loading the hosts table, the run configuration,
/// or the tuning file. These are bootstrap-time failures: the daemon
/// reports them and exits non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hosts file line {line}: {reason}")]
    Hosts { line: usize, reason: String },

    #[error("hosts file: duplicate process id {0}")]
    DuplicateHost(u64),

    #[error("hosts file: process id {0} not listed")]
    UnknownProcess(u64),

    #[error("config file: {0}")]
    Config(String),

    #[error("tuning file: {0}")]
    Tuning(#[from] toml::de::Error),
}
