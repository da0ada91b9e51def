//! Upload pipeline
//!
//! persist -> (video only) probe -> transcode -> fix orientation -> describe.
//! Each tool step falls back to the previous file on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use timeline_core::models::FileDescriptor;
use timeline_core::ProcessingConfig;
use timeline_storage::LocalStorage;

use crate::derivative::DerivativeChain;
use crate::error::PipelineError;
use crate::orientation::OrientationAdapter;
use crate::probe::{CodecResult, ProbeAdapter};
use crate::process::ExternalProcess;
use crate::transcode::TranscodeAdapter;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file as received from the client
#[derive(Debug, Clone)]
pub struct IncomingUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub descriptor: FileDescriptor,
    pub chain: DerivativeChain,
    /// Probe result, `None` for non-video uploads
    pub codec: Option<CodecResult>,
}

#[derive(Clone)]
pub struct UploadPipeline {
    storage: LocalStorage,
    probe: ProbeAdapter,
    transcoder: TranscodeAdapter,
    orientation: OrientationAdapter,
    config: ProcessingConfig,
}

impl UploadPipeline {
    pub fn new(
        storage: LocalStorage,
        runner: Arc<dyn ExternalProcess>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            probe: ProbeAdapter::new(runner.clone(), &config),
            transcoder: TranscodeAdapter::new(runner.clone(), &config),
            orientation: OrientationAdapter::new(runner, &config),
            storage,
            config,
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.config.max_upload_size_bytes
    }

    /// Persist an upload and produce the servable file for it.
    ///
    /// Only validation and the initial write can fail; tool failures fall
    /// back to the last good file.
    #[tracing::instrument(skip(self, upload), fields(
        file_name = upload.file_name.as_deref().unwrap_or(""),
        content_type = upload.content_type.as_deref().unwrap_or(""),
        size_bytes = upload.data.len()
    ))]
    pub async fn process_upload(
        &self,
        upload: IncomingUpload,
    ) -> Result<UploadOutcome, PipelineError> {
        let start = Instant::now();

        if upload.data.is_empty() {
            return Err(PipelineError::EmptyUpload);
        }
        if upload.data.len() > self.config.max_upload_size_bytes {
            return Err(PipelineError::TooLarge {
                size: upload.data.len(),
                limit: self.config.max_upload_size_bytes,
            });
        }

        let content_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let original_name = upload
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "file".to_string());

        let stored = self.storage.persist(&original_name, &upload.data).await?;
        let mut chain = DerivativeChain::from_original(&stored.name);
        let mut codec = None;

        let current = if is_video(&content_type) {
            let (path, probed) = self.derive_video(&stored.path, &mut chain).await;
            codec = Some(probed);
            path
        } else {
            stored.path.clone()
        };

        let name = file_name_of(&current).unwrap_or_else(|| stored.name.clone());
        let size = self.storage.size(&name).await?;
        let descriptor = FileDescriptor {
            url: self.storage.url_for(&name),
            size,
            content_type,
        };

        tracing::info!(
            url = %descriptor.url,
            served = ?chain.servable_link(),
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Upload processed"
        );

        Ok(UploadOutcome {
            descriptor,
            chain,
            codec,
        })
    }

    /// Run the video steps, returning the current file and the probe result.
    async fn derive_video(
        &self,
        original: &Path,
        chain: &mut DerivativeChain,
    ) -> (PathBuf, CodecResult) {
        let probed = self.probe.probe(original).await;

        let needs_transcode = match &probed {
            CodecResult::Codec(c) if self.config.is_compatible_codec(c) => {
                tracing::debug!(codec = %c, "Codec already compatible");
                false
            }
            CodecResult::Codec(c) if self.config.needs_transcode(c) => true,
            CodecResult::Codec(c) => {
                tracing::info!(codec = %c, "Codec not in transcode set, serving as uploaded");
                false
            }
            CodecResult::Unknown => {
                tracing::info!("Codec unknown, serving as uploaded");
                false
            }
        };
        if !needs_transcode {
            return (original.to_path_buf(), probed);
        }

        let transcoded = match self.transcoder.transcode(original).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Serving original upload after transcode failure");
                return (original.to_path_buf(), probed);
            }
        };
        chain.transcoded = file_name_of(&transcoded);

        match self.orientation.fix_orientation(&transcoded).await {
            Ok(fixed) if fixed != transcoded => {
                chain.orientation_fixed = file_name_of(&fixed);
                (fixed, probed)
            }
            Ok(_) => (transcoded, probed),
            Err(e) => {
                tracing::warn!(error = %e, "Serving transcoded file after orientation failure");
                (transcoded, probed)
            }
        }
    }
}

fn is_video(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("video/")
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
