//! Injected process-spawning boundary.
//!
//! Production code spawns real subprocesses via [`TokioSpawner`]; tests
//! substitute a fake implementing [`ProcessSpawner`] that returns a canned
//! child, so session-startup and AI-CLI-wrapper tests never fork real
//! processes.

use crate::error::{ProcessError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;

/// Maximum bytes retained from a child's stderr stream.
pub const MAX_STDERR_BYTES: usize = 64 * 1024;

/// A process to launch: command, arguments, working directory, extra env.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
}

/// A spawned child process with piped stdio and background stderr capture.
pub struct SpawnedChild {
    child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    stderr_task: JoinHandle<String>,
}

impl SpawnedChild {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Send SIGTERM, wait up to `grace`, then SIGKILL if still running.
    pub async fn kill(&mut self, grace: std::time::Duration) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            // SAFETY: `pid` is the PID of a child this struct owns; sending
            // SIGTERM to it is always safe.
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(_) => (),
            Err(_) => {
                let _ = self.child.kill().await;
            }
        }
    }

    /// Send SIGINT (used for the AI CLI's `interrupt` operation).
    #[cfg(unix)]
    pub fn interrupt(&self) -> bool {
        match self.child.id() {
            Some(pid) => {
                // SAFETY: see `kill`.
                unsafe {
                    libc::kill(pid as i32, libc::SIGINT);
                }
                true
            }
            None => false,
        }
    }

    #[cfg(not(unix))]
    pub fn interrupt(&self) -> bool {
        false
    }

    pub fn try_wait(&mut self) -> Option<std::process::ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }

    /// Collect captured stderr. Consumes the background capture task.
    pub async fn stderr_output(&mut self) -> String {
        (&mut self.stderr_task).await.unwrap_or_default()
    }
}

/// Boundary for starting subprocesses. Production uses [`TokioSpawner`];
/// tests provide a fake that returns a pre-scripted [`SpawnedChild`]-like
/// double instead of forking a real process.
#[async_trait::async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<SpawnedChild>;
}

/// Spawns real OS subprocesses via `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

#[async_trait::async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<SpawnedChild> {
        spawn_piped(spec).await
    }
}

async fn spawn_piped(spec: &SpawnSpec) -> Result<SpawnedChild> {
    if spec.command.trim().is_empty() {
        return Err(ProcessError::Spawn("command is empty".into()).into());
    }

    let mut cmd = tokio::process::Command::new(&spec.command);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::Spawn(format!("{}: {e}", spec.command)))?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stderr_task = tokio::spawn(async move {
        let Some(stderr) = stderr else {
            return String::new();
        };
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::with_capacity(4096);
        loop {
            let mut chunk = [0u8; 4096];
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    let remaining = MAX_STDERR_BYTES.saturating_sub(buf.len());
                    if remaining == 0 {
                        continue;
                    }
                    buf.extend_from_slice(&chunk[..n.min(remaining)]);
                }
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    });

    Ok(SpawnedChild {
        child,
        stdin,
        stdout,
        stderr_task,
    })
}

/// Builds a [`SpawnSpec`] for launching the AI CLI. Kept separate from
/// [`ProcessSpawner`] so the flag-construction logic (see
/// [`crate::ai::process`]) is testable without touching `Path`.
pub fn working_dir_exists(path: &Path) -> bool {
    path.is_dir()
}
