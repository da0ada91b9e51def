//! Re-encoding to browser-playable H.264/AAC MP4

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use timeline_core::ProcessingConfig;

use crate::derivative::transcoded_name;
use crate::error::{ToolError, ToolKind};
use crate::process::ExternalProcess;

#[derive(Clone)]
pub struct TranscodeAdapter {
    runner: Arc<dyn ExternalProcess>,
    ffmpeg_path: String,
    timeout: Duration,
}

impl TranscodeAdapter {
    pub fn new(runner: Arc<dyn ExternalProcess>, config: &ProcessingConfig) -> Self {
        Self {
            runner,
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: config.transcode_timeout,
        }
    }

    /// Write `{stem}_web.mp4` next to `input`. The input is left untouched.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        ffmpeg.operation = "transcode"
    ))]
    pub async fn transcode(&self, input: &Path) -> Result<PathBuf, ToolError> {
        let output = derived_path(input, transcoded_name);
        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        run_ffmpeg(
            self.runner.as_ref(),
            &self.ffmpeg_path,
            ToolKind::Transcode,
            &args,
            &output,
            self.timeout,
        )
        .await?;
        Ok(output)
    }
}

/// Sibling path whose file name is derived from `input`'s.
pub(crate) fn derived_path(input: &Path, derive: fn(&str) -> String) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(derive(&name))
}

/// Run one ffmpeg step that must produce `output`.
///
/// On any failure the (possibly partial) output is removed so no caller
/// ever picks it up.
pub(crate) async fn run_ffmpeg(
    runner: &dyn ExternalProcess,
    ffmpeg_path: &str,
    tool: ToolKind,
    args: &[String],
    output: &Path,
    timeout: Duration,
) -> Result<(), ToolError> {
    let start = Instant::now();

    let result = match runner.run(ffmpeg_path, args, timeout).await {
        Ok(out) if out.success() => {
            if tokio::fs::try_exists(output).await.unwrap_or(false) {
                Ok(())
            } else {
                Err(ToolError::MissingOutput {
                    tool,
                    path: output.to_path_buf(),
                })
            }
        }
        Ok(out) => Err(ToolError::NonZeroExit {
            tool,
            code: out.status_code,
            stderr: last_lines(&out.stderr, 5),
        }),
        Err(e) => Err(ToolError::from_process(tool, e)),
    };

    match &result {
        Ok(()) => tracing::info!(
            output = %output.display(),
            duration_ms = start.elapsed().as_millis(),
            "{} completed",
            tool
        ),
        Err(e) => {
            tracing::warn!(
                error = %e,
                duration_ms = start.elapsed().as_millis(),
                "{} failed",
                tool
            );
            if let Err(rm) = tokio::fs::remove_file(output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %output.display(),
                        error = %rm,
                        "Failed to remove partial output"
                    );
                }
            }
        }
    }

    result
}

/// ffmpeg prints its banner first; the cause is at the end.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
