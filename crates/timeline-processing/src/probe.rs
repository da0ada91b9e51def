//! Codec and rotation inspection with ffprobe

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use timeline_core::ProcessingConfig;

use crate::error::{ToolError, ToolKind};
use crate::process::ExternalProcess;

/// Outcome of a codec probe. Every failure collapses into `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecResult {
    Codec(String),
    Unknown,
}

impl CodecResult {
    pub fn codec(&self) -> Option<&str> {
        match self {
            CodecResult::Codec(c) => Some(c),
            CodecResult::Unknown => None,
        }
    }
}

/// Rotation tag of the first video stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    Absent,
    Degrees(i32),
    /// A tag that is present but not an integer
    Unparsed(String),
}

impl Rotation {
    /// Only an absent tag or one reading zero rules the correction out.
    pub fn needs_correction(&self) -> bool {
        match self {
            Rotation::Absent => false,
            Rotation::Degrees(d) => *d != 0,
            Rotation::Unparsed(_) => true,
        }
    }
}

#[derive(Clone)]
pub struct ProbeAdapter {
    runner: Arc<dyn ExternalProcess>,
    ffprobe_path: String,
    timeout: Duration,
    rotation_timeout: Duration,
}

impl ProbeAdapter {
    pub fn new(runner: Arc<dyn ExternalProcess>, config: &ProcessingConfig) -> Self {
        Self {
            runner,
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: config.probe_timeout,
            rotation_timeout: config.rotation_probe_timeout,
        }
    }

    /// Codec of the first video stream. Read-only and never fatal.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        ffmpeg.operation = "probe_codec"
    ))]
    pub async fn probe(&self, path: &Path) -> CodecResult {
        let start = Instant::now();
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_entries".to_string(),
            "stream=codec_name".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().into_owned(),
        ];

        let output = match self.runner.run(&self.ffprobe_path, &args, self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Codec probe failed, treating codec as unknown");
                return CodecResult::Unknown;
            }
        };

        if !output.success() {
            tracing::warn!(
                status = ?output.status_code,
                stderr = %output.stderr.trim(),
                "Codec probe exited unsuccessfully, treating codec as unknown"
            );
            return CodecResult::Unknown;
        }

        match parse_codec(&output.stdout) {
            Some(codec) => {
                tracing::info!(
                    codec = %codec,
                    duration_ms = start.elapsed().as_millis(),
                    "Codec probe completed"
                );
                CodecResult::Codec(codec)
            }
            None => {
                tracing::warn!(stdout = %output.stdout.trim(), "Malformed codec probe output");
                CodecResult::Unknown
            }
        }
    }

    /// Rotation tag of the first video stream.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        ffmpeg.operation = "probe_rotation"
    ))]
    pub async fn probe_rotation(&self, path: &Path) -> Result<Rotation, ToolError> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_entries".to_string(),
            "stream_tags=rotate".to_string(),
            "-of".to_string(),
            "csv=p=0".to_string(),
            path.to_string_lossy().into_owned(),
        ];

        let output = self
            .runner
            .run(&self.ffprobe_path, &args, self.rotation_timeout)
            .await
            .map_err(|e| ToolError::from_process(ToolKind::Probe, e))?;

        if !output.success() {
            return Err(ToolError::NonZeroExit {
                tool: ToolKind::Probe,
                code: output.status_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(parse_rotation(&output.stdout))
    }
}

/// A well-formed codec answer is exactly one non-empty token of
/// lowercase letters, digits and underscores.
fn parse_codec(stdout: &str) -> Option<String> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let token = lines.next()?.to_lowercase();
    if lines.next().is_some() {
        return None;
    }
    token
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        .then_some(token)
}

/// Empty output is no tag. A non-integer tag is kept as `Unparsed` unless
/// it still reads as zero (`0.0`).
fn parse_rotation(stdout: &str) -> Rotation {
    let raw = stdout.trim();
    if raw.is_empty() {
        return Rotation::Absent;
    }
    if let Ok(degrees) = raw.parse::<i32>() {
        return Rotation::Degrees(degrees);
    }
    match raw.parse::<f64>() {
        Ok(degrees) if degrees == 0.0 => Rotation::Degrees(0),
        _ => Rotation::Unparsed(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMediaTools, ToolScript};

    fn adapter(tools: FakeMediaTools) -> (ProbeAdapter, Arc<FakeMediaTools>) {
        let tools = Arc::new(tools);
        let probe = ProbeAdapter::new(tools.clone(), &ProcessingConfig::default());
        (probe, tools)
    }

    #[test]
    fn test_parse_codec() {
        assert_eq!(parse_codec("h264\n"), Some("h264".to_string()));
        assert_eq!(parse_codec("  HEVC  \n\n"), Some("hevc".to_string()));
        assert_eq!(parse_codec(""), None);
        assert_eq!(parse_codec("h264\naac\n"), None);
        assert_eq!(parse_codec("not a codec"), None);
    }

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation(""), Rotation::Absent);
        assert_eq!(parse_rotation("0\n"), Rotation::Degrees(0));
        assert_eq!(parse_rotation("-90\n"), Rotation::Degrees(-90));
        assert_eq!(parse_rotation("  \n"), Rotation::Absent);
        assert_eq!(parse_rotation("0.0\n"), Rotation::Degrees(0));
        assert_eq!(
            parse_rotation("90.0\n"),
            Rotation::Unparsed("90.0".to_string())
        );
        assert_eq!(parse_rotation("N/A"), Rotation::Unparsed("N/A".to_string()));
        assert_eq!(
            parse_rotation("90\n180\n"),
            Rotation::Unparsed("90\n180".to_string())
        );
        assert!(!Rotation::Degrees(0).needs_correction());
        assert!(Rotation::Degrees(360).needs_correction());
        assert!(Rotation::Degrees(180).needs_correction());
        assert!(Rotation::Unparsed("N/A".to_string()).needs_correction());
        assert!(!Rotation::Absent.needs_correction());
    }

    #[tokio::test]
    async fn test_probe_reports_codec() {
        let (probe, tools) = adapter(FakeMediaTools::new().codec("hevc"));
        let result = probe.probe(Path::new("/tmp/clip.mov")).await;
        assert_eq!(result, CodecResult::Codec("hevc".to_string()));
        assert_eq!(tools.calls_to("ffprobe").len(), 1);
        assert_eq!(tools.calls()[0].timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_failures_are_unknown() {
        for script in [ToolScript::Fail, ToolScript::Timeout, ToolScript::SpawnError] {
            let (probe, _) = adapter(FakeMediaTools::new().codec_script(script));
            assert_eq!(
                probe.probe(Path::new("/tmp/clip.mov")).await,
                CodecResult::Unknown
            );
        }
    }

    #[tokio::test]
    async fn test_probe_malformed_output_is_unknown() {
        let (probe, _) = adapter(FakeMediaTools::new().codec("h264\nh265"));
        assert_eq!(
            probe.probe(Path::new("/tmp/clip.mov")).await,
            CodecResult::Unknown
        );
    }

    #[tokio::test]
    async fn test_probe_rotation_uses_its_own_timeout() {
        let (probe, tools) = adapter(FakeMediaTools::new().rotation("90"));
        let rotation = probe
            .probe_rotation(Path::new("/tmp/clip_web.mp4"))
            .await
            .unwrap();
        assert_eq!(rotation, Rotation::Degrees(90));
        assert_eq!(tools.calls()[0].timeout, Duration::from_secs(10));
    }
}
