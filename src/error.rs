//! Top-level error types for threadbridge.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Worktree(#[from] WorktreeError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// AI CLI child-process lifecycle and protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn AI CLI process: {0}")]
    Spawn(String),

    #[error("AI CLI process {pid} did not exit within {timeout_secs}s of SIGTERM")]
    ShutdownTimeout { pid: u32, timeout_secs: u64 },

    #[error("failed to write to AI CLI stdin: {0}")]
    StdinWrite(String),

    #[error("malformed event line from AI CLI: {0}")]
    MalformedEvent(String),

    #[error("AI CLI process exited unexpectedly: {0}")]
    UnexpectedExit(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Session store persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read session store at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session store document: {0}")]
    Parse(String),

    #[error("failed to atomically write session store: {0}")]
    Write(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Session lifecycle and registry errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {0} already exists")]
    AlreadyExists(String),

    #[error("invalid state transition for session {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: crate::SessionState,
        to: crate::SessionState,
    },

    #[error("session {0} has no running AI CLI process")]
    NoProcess(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Worktree manager errors.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    #[error("branch name {0:?} is not a valid worktree branch name")]
    InvalidBranchName(String),

    #[error("git command failed: {0}")]
    GitCommand(String),

    #[error("worktree at {0} is shared by another active session")]
    Shared(String),

    #[error("worktree for session {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Command parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("invalid arguments for command {command}: {reason}")]
    InvalidArgs { command: String, reason: String },
}

/// Auto-update coordinator errors.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to check update registry: {0}")]
    RegistryCheck(String),

    #[error("invalid version string: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("update already in progress")]
    AlreadyInProgress,
}

/// Platform adapter errors (transport-level failures surfaced from adapters).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform {0} not registered")]
    NotRegistered(String),

    #[error("platform request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
