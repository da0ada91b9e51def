//! External process execution
//!
//! All tool invocations go through [`ExternalProcess`] so adapters can be
//! driven by scripted fakes in tests and the timeout stays injectable.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

#[async_trait]
pub trait ExternalProcess: Send + Sync {
    /// Run `program` to completion, killing it if `timeout` elapses first.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Runs processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ExternalProcess for TokioProcessRunner {
    #[tracing::instrument(skip(self, args), fields(
        process.executable.name = %program,
        process.args_count = args.len(),
        timeout_secs = timeout.as_secs()
    ))]
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();

        // kill_on_drop reaps the child when the timeout drops the future.
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ProcessError::Spawn {
                    program: program.to_string(),
                    source,
                })
            }
            Err(_) => {
                tracing::warn!(
                    duration_ms = start.elapsed().as_millis(),
                    "Process killed after timeout"
                );
                return Err(ProcessError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
        };

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            status = ?output.status.code(),
            "Process finished"
        );

        Ok(ProcessOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Reject tool paths that could smuggle shell syntax into a command line.
pub fn validate_tool_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("tool path must not be empty".to_string());
    }
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("tool path contains dangerous characters: {}", path));
    }
    Ok(())
}
