//! Rotation correction for videos carrying a rotate tag

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use timeline_core::ProcessingConfig;

use crate::derivative::fixed_name;
use crate::error::{ToolError, ToolKind};
use crate::probe::ProbeAdapter;
use crate::process::ExternalProcess;
use crate::transcode::{derived_path, run_ffmpeg};

#[derive(Clone)]
pub struct OrientationAdapter {
    probe: ProbeAdapter,
    runner: Arc<dyn ExternalProcess>,
    ffmpeg_path: String,
    timeout: Duration,
}

impl OrientationAdapter {
    pub fn new(runner: Arc<dyn ExternalProcess>, config: &ProcessingConfig) -> Self {
        Self {
            probe: ProbeAdapter::new(runner.clone(), config),
            runner,
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: config.orientation_timeout,
        }
    }

    /// Returns `input` itself when there is nothing to correct, otherwise the
    /// path of a new `{stem}_fixed.mp4`.
    ///
    /// A rotation probe that fails does not rule a tag out, so the correction
    /// is attempted anyway.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "fix_orientation"))]
    pub async fn fix_orientation(&self, input: &Path) -> Result<PathBuf, ToolError> {
        match self.probe.probe_rotation(input).await {
            Ok(rotation) if !rotation.needs_correction() => {
                tracing::debug!(?rotation, "No rotation correction needed");
                return Ok(input.to_path_buf());
            }
            Ok(rotation) => {
                tracing::info!(?rotation, "Rotation tag found, correcting");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rotation probe failed, attempting correction anyway");
            }
        }

        let output = derived_path(input, fixed_name);
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
            "copy".to_string(),
            "-vf".to_string(),
            "rotate=PI".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        run_ffmpeg(
            self.runner.as_ref(),
            &self.ffmpeg_path,
            ToolKind::Orientation,
            &args,
            &output,
            self.timeout,
        )
        .await?;
        Ok(output)
    }
}
