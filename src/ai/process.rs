//! The AI CLI process wrapper (§4.1): spawn, converse, stream events.

use crate::ai::protocol::{self, AiEvent};
use crate::config::AiCliConfig;
use crate::error::{ProcessError, Result};
use crate::process::spawner::{ProcessSpawner, SpawnSpec, SpawnedChild};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Auxiliary status written by the AI CLI on a tick. Readers never block on
/// it; absence is treated as "no data" (§4.1).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StatusFile {
    pub model: Option<String>,
    pub total_cost_usd: Option<f64>,
    pub tokens_used: Option<u64>,
}

/// A running (or not-yet-started) AI CLI child process for one session.
pub struct AiProcess {
    spawner: Arc<dyn ProcessSpawner>,
    config: AiCliConfig,
    session_uuid: uuid::Uuid,
    working_dir: std::path::PathBuf,
    mcp_config: Option<String>,
    child: Mutex<Option<SpawnedChild>>,
    permanently_failed: std::sync::atomic::AtomicBool,
}

impl AiProcess {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        config: AiCliConfig,
        session_uuid: uuid::Uuid,
        working_dir: std::path::PathBuf,
        mcp_config: Option<String>,
    ) -> Self {
        Self {
            spawner,
            config,
            session_uuid,
            working_dir,
            mcp_config,
            child: Mutex::new(None),
            permanently_failed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn is_permanently_failed(&self) -> bool {
        self.permanently_failed.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn build_args(&self, resume: bool) -> Vec<String> {
        let mut args = vec![
            "--input-format".into(),
            "stream-json".into(),
            "--output-format".into(),
            "stream-json".into(),
            "--verbose".into(),
            "--session-id".into(),
            self.session_uuid.to_string(),
        ];
        if resume {
            args.push("--resume".into());
            args.push(self.session_uuid.to_string());
        }
        if self.config.skip_permissions {
            args.push("--dangerously-skip-permissions".into());
        }
        if let Some(mcp) = &self.mcp_config {
            args.push("--mcp-config".into());
            args.push(mcp.clone());
        }
        if let Some(prompt) = &self.config.system_prompt_append {
            args.push("--append-system-prompt".into());
            args.push(prompt.clone());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    /// Start the child. Fails if already running. On spawn error, the
    /// session records this as a permanent failure (§4.1).
    pub async fn start(&self, resume: bool) -> Result<mpsc::Receiver<AiEvent>> {
        {
            let mut guard = self.child.lock().await;
            if guard.as_mut().and_then(|c| c.try_wait()).is_none() && guard.is_some() {
                return Err(ProcessError::Spawn("AI CLI process already running".into()).into());
            }
        }

        let spec = SpawnSpec {
            command: self.config.command.clone(),
            args: self.build_args(resume),
            working_dir: self.working_dir.clone(),
            env: HashMap::new(),
        };

        let mut spawned = self.spawner.spawn(&spec).await.inspect_err(|_| {
            self.permanently_failed
                .store(true, std::sync::atomic::Ordering::Relaxed);
        })?;

        let stdout = spawned.stdout.take().ok_or_else(|| {
            ProcessError::Spawn("spawned AI CLI process has no stdout pipe".into())
        })?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match AiEvent::parse_line(&line) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "malformed AI CLI event line, skipping");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "error reading AI CLI stdout, stopping reader");
                        break;
                    }
                }
            }
            debug!("AI CLI stdout reader task ending");
        });

        *self.child.lock().await = Some(spawned);
        Ok(rx)
    }

    /// Write `{type:"user", message:{role:"user", content}}` + newline to stdin.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        self.write_line(&protocol::user_message_line(content)).await
    }

    /// Write a compound tool-result message to stdin.
    pub async fn send_tool_result(&self, tool_use_id: &str, content: &serde_json::Value) -> Result<()> {
        self.write_line(&protocol::tool_result_line(tool_use_id, content))
            .await
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut guard = self.child.lock().await;
        let child = guard
            .as_mut()
            .ok_or_else(|| ProcessError::StdinWrite("AI CLI process is not running".into()))?;
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| ProcessError::StdinWrite("AI CLI stdin already closed".into()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ProcessError::StdinWrite(e.to_string()))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| ProcessError::StdinWrite(e.to_string()))?;
        Ok(())
    }

    /// Send SIGINT. Returns `false` if not running.
    pub async fn interrupt(&self) -> bool {
        match self.child.lock().await.as_ref() {
            Some(child) => child.interrupt(),
            None => false,
        }
    }

    /// SIGTERM, wait for exit (SIGKILL after the configured grace period).
    /// Idempotent.
    pub async fn kill(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            child.kill(self.config.shutdown_grace).await;
        }
        *guard = None;
    }

    /// Check whether the child has exited, without blocking.
    pub async fn try_wait(&self) -> Option<std::process::ExitStatus> {
        self.child.lock().await.as_mut().and_then(|c| c.try_wait())
    }

    /// Collect captured stderr (for permanent-failure diagnosis). Consumes
    /// the child's stderr-capture task.
    pub async fn stderr_output(&self) -> String {
        match self.child.lock().await.as_mut() {
            Some(child) => child.stderr_output().await,
            None => String::new(),
        }
    }

    pub async fn check_permanent_failure(&self) -> bool {
        let stderr = self.stderr_output().await;
        if protocol::is_permanent_failure(&stderr) {
            self.permanently_failed
                .store(true, std::sync::atomic::Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Read the auxiliary status file. Absence or parse failure is treated as
/// "no data", never an error — callers do not block on it.
pub async fn read_status_file(path: &Path) -> Option<StatusFile> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_includes_resume_flag_only_when_resuming() {
        let config = AiCliConfig {
            command: "ai-cli".into(),
            extra_args: Vec::new(),
            skip_permissions: true,
            system_prompt_append: Some("be terse".into()),
            shutdown_grace: std::time::Duration::from_secs(3),
        };
        let process = AiProcess::new(
            Arc::new(crate::process::spawner::TokioSpawner),
            config,
            uuid::Uuid::nil(),
            std::path::PathBuf::from("/tmp"),
            Some("/tmp/mcp.json".into()),
        );

        let fresh = process.build_args(false);
        assert!(!fresh.contains(&"--resume".to_string()));

        let resumed = process.build_args(true);
        assert!(resumed.contains(&"--resume".to_string()));
        assert!(resumed.contains(&"--dangerously-skip-permissions".to_string()));
        assert!(resumed.contains(&"--append-system-prompt".to_string()));
    }
}
