//! Configuration loading and validation.

use crate::error::{ConfigError, Result};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// threadbridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base data directory (`~/.threadbridge` by default).
    pub data_dir: PathBuf,

    /// AI CLI process wrapper settings.
    pub ai_cli: AiCliConfig,

    /// Session lifecycle timing.
    pub session: SessionConfig,

    /// Cleanup scheduler settings.
    pub cleanup: CleanupConfig,

    /// Auto-update coordinator settings.
    pub update: UpdateConfig,
}

/// AI CLI process wrapper configuration.
#[derive(Debug, Clone)]
pub struct AiCliConfig {
    /// Path or bare name of the AI CLI executable.
    pub command: String,
    /// Extra arguments appended after the fixed flag set.
    pub extra_args: Vec<String>,
    /// `--dangerously-skip-permissions`.
    pub skip_permissions: bool,
    /// Optional `--append-system-prompt`.
    pub system_prompt_append: Option<String>,
    /// Grace period between SIGTERM and SIGKILL when killing the child.
    pub shutdown_grace: std::time::Duration,
}

impl Default for AiCliConfig {
    fn default() -> Self {
        Self {
            command: std::env::var("THREADBRIDGE_AI_CLI").unwrap_or_else(|_| "ai-cli".into()),
            extra_args: Vec::new(),
            skip_permissions: false,
            system_prompt_append: None,
            shutdown_grace: std::time::Duration::from_secs(3),
        }
    }
}

/// Session lifecycle timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Idle timeout before a session is killed (resume still possible).
    pub idle_timeout: std::time::Duration,
    /// How long before the idle timeout a warning is posted.
    pub idle_warning_lead: std::time::Duration,
    /// Interval of the global idle-check monitor.
    pub idle_check_interval: std::time::Duration,
    /// Resume failures before a session is soft-deleted instead of retried.
    pub max_resume_fail_count: u32,
    /// Default timeout for a permission-approval prompt (`None` = no timeout).
    pub approval_timeout: Option<std::time::Duration>,
    /// Timeout for the context prompt before it auto-skips.
    pub context_prompt_timeout: std::time::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: std::time::Duration::from_secs(30 * 60),
            idle_warning_lead: std::time::Duration::from_secs(5 * 60),
            idle_check_interval: std::time::Duration::from_secs(60),
            max_resume_fail_count: 3,
            approval_timeout: None,
            context_prompt_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Cleanup scheduler configuration.
#[derive(Debug, Clone, Copy)]
pub struct CleanupConfig {
    /// How often the scheduler runs.
    pub interval: std::time::Duration,
    /// Thread-log retention window.
    pub log_retention: std::time::Duration,
    /// Whether log retention cleanup is enabled at all.
    pub log_retention_enabled: bool,
    /// Minimum age of an orphaned worktree before it becomes eligible for removal.
    pub worktree_max_age: std::time::Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(60 * 60),
            log_retention: std::time::Duration::from_secs(30 * 24 * 60 * 60),
            log_retention_enabled: true,
            worktree_max_age: std::time::Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Auto-update coordinator configuration.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// URL of the version registry, returning `{"version": "..."}`.
    pub registry_url: String,
    /// How often to poll the registry.
    pub check_interval: std::time::Duration,
    /// Installation timing policy.
    pub mode: crate::update::UpdateMode,
    /// Exit code the supervising launcher watches for.
    pub restart_exit_code: i32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            registry_url: std::env::var("THREADBRIDGE_UPDATE_REGISTRY")
                .unwrap_or_else(|_| "https://registry.invalid/threadbridge/version".into()),
            check_interval: std::time::Duration::from_secs(60 * 60),
            mode: crate::update::UpdateMode::Quiet {
                quiet_timeout: std::time::Duration::from_secs(10 * 60),
            },
            restart_exit_code: 42,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Config-file parsing is out of scope for this crate; callers that need
    /// a file-backed config should parse it themselves and construct `Config`
    /// directly.
    pub fn load() -> Result<Self> {
        let data_dir = std::env::var_os("THREADBRIDGE_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".threadbridge")))
            .unwrap_or_else(|| PathBuf::from("./data"));

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

        let ai_cli = AiCliConfig::default();
        if ai_cli.command.trim().is_empty() {
            return Err(ConfigError::Invalid("AI CLI command must not be empty".into()).into());
        }

        Ok(Self {
            data_dir,
            ai_cli,
            session: SessionConfig::default(),
            cleanup: CleanupConfig::default(),
            update: UpdateConfig::default(),
        })
    }

    /// Load from a specific config file path.
    pub fn load_from_path(_path: &Path) -> Result<Self> {
        // Config file parsing is out of scope; callers load env-only config.
        Self::load()
    }

    /// Path to the session store file.
    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir.join("sessions.json")
    }

    /// Path to the auto-update coordinator's state file.
    pub fn update_state_path(&self) -> PathBuf {
        self.data_dir.join("update-state.json")
    }

    /// Root directory under which all worktrees are created.
    pub fn worktree_root(&self) -> PathBuf {
        self.data_dir.join("worktrees")
    }

    /// Directory where per-thread logs live.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}
