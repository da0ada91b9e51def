//! Cleanup of a logical upload and every derivative sharing its base name

use std::sync::Arc;

use serde::Serialize;
use timeline_core::constants::DERIVATIVE_EXTENSION;
use timeline_core::MediaRecordStore;
use timeline_storage::LocalStorage;

use crate::derivative::{
    base_name, file_stem, transcoded_fixed_name, transcoded_name, DerivativeChain,
};
use crate::error::RegistryError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub base: String,
    pub files_removed: usize,
    pub records_removed: u64,
    pub removed: Vec<String>,
}

#[derive(Clone)]
pub struct DerivativeRegistry {
    storage: LocalStorage,
    records: Arc<dyn MediaRecordStore>,
}

impl DerivativeRegistry {
    pub fn new(storage: LocalStorage, records: Arc<dyn MediaRecordStore>) -> Self {
        Self { storage, records }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Which links of `served`'s chain exist on disk.
    pub async fn chain_for(&self, served: &str) -> Result<DerivativeChain, RegistryError> {
        check_name(served)?;
        let base = base_name(served).to_string();

        let original = self
            .storage
            .list_names()
            .await?
            .into_iter()
            .find(|name| file_stem(name) == base);
        let transcoded = self.present(transcoded_name(&base)).await?;
        let orientation_fixed = self.present(transcoded_fixed_name(&base)).await?;

        Ok(DerivativeChain {
            base,
            original,
            transcoded,
            orientation_fixed,
        })
    }

    /// Remove the served file, every sibling in its derivative chain, and all
    /// records pointing at any of them. Missing files are skipped, so calling
    /// this again is harmless.
    #[tracing::instrument(skip(self))]
    pub async fn delete_logical_file(&self, served: &str) -> Result<DeletionReport, RegistryError> {
        check_name(served)?;
        let base = base_name(served).to_string();

        let mut candidates = vec![
            served.to_string(),
            format!("{}.{}", base, DERIVATIVE_EXTENSION),
            transcoded_name(&base),
            transcoded_fixed_name(&base),
        ];
        // the original may have any container extension
        for name in self.storage.list_names().await? {
            if file_stem(&name) == base {
                candidates.push(name);
            }
        }
        let mut seen = std::collections::HashSet::new();
        candidates.retain(|name| seen.insert(name.clone()));

        let mut removed = Vec::new();
        for name in &candidates {
            if self.storage.remove_if_present(name).await? {
                removed.push(name.clone());
            }
        }

        let urls: Vec<String> = candidates
            .iter()
            .map(|name| self.storage.url_for(name))
            .collect();
        let records_removed = self.records.delete_by_urls(&urls).await?;

        tracing::info!(
            base = %base,
            files_removed = removed.len(),
            records_removed,
            "Deleted logical file"
        );

        Ok(DeletionReport {
            base,
            files_removed: removed.len(),
            records_removed,
            removed,
        })
    }

    /// Delete a media record and its files. `None` if the record is unknown.
    pub async fn delete_record(&self, record_id: i64) -> Result<Option<DeletionReport>, RegistryError> {
        let Some(record) = self.records.find_by_id(record_id).await? else {
            return Ok(None);
        };

        match self.storage.name_from_url(&record.file_url) {
            Some(name) if check_name(name).is_ok() => {
                let mut report = self.delete_logical_file(name).await?;
                // a record whose URL drifted from the chain naming still goes
                if self.records.delete_by_id(record_id).await? {
                    report.records_removed += 1;
                }
                Ok(Some(report))
            }
            _ => {
                tracing::warn!(
                    record_id,
                    file_url = %record.file_url,
                    "Media record URL does not name a stored file, removing record only"
                );
                let removed = self.records.delete_by_id(record_id).await?;
                Ok(Some(DeletionReport {
                    records_removed: u64::from(removed),
                    ..Default::default()
                }))
            }
        }
    }

    async fn present(&self, name: String) -> Result<Option<String>, RegistryError> {
        Ok(self.storage.exists(&name).await?.then_some(name))
    }
}

fn check_name(served: &str) -> Result<(), RegistryError> {
    if served.is_empty() || served.contains('/') || served.contains('\\') || served.contains("..") {
        return Err(RegistryError::InvalidName(served.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRecords;
    use tempfile::{tempdir, TempDir};
    use timeline_core::NewMediaRecord;

    async fn registry() -> (DerivativeRegistry, Arc<InMemoryRecords>, TempDir) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads").await.unwrap();
        let records = Arc::new(InMemoryRecords::new());
        (DerivativeRegistry::new(storage, records.clone()), records, dir)
    }

    fn touch(dir: &TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
    }

    async fn record(records: &InMemoryRecords, url: &str) -> i64 {
        records
            .insert(NewMediaRecord {
                instance_id: 1,
                file_url: url.to_string(),
                file_type: "video/mp4".to_string(),
                file_name: None,
                file_size: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_delete_fixed_removes_whole_chain() {
        let (registry, records, dir) = registry().await;
        touch(&dir, &["clip.mp4", "clip_web.mp4", "clip_web_fixed.mp4", "other.mp4"]);
        record(&records, "/uploads/clip_web_fixed.mp4").await;
        record(&records, "/uploads/other.mp4").await;

        let report = registry.delete_logical_file("clip_web_fixed.mp4").await.unwrap();
        assert_eq!(report.base, "clip");
        assert_eq!(report.files_removed, 3);
        assert_eq!(report.records_removed, 1);
        assert!(dir.path().join("other.mp4").exists());
        assert_eq!(records.urls(), vec!["/uploads/other.mp4"]);

        let again = registry.delete_logical_file("clip_web_fixed.mp4").await.unwrap();
        assert_eq!(again.files_removed, 0);
        assert_eq!(again.records_removed, 0);
    }

    #[tokio::test]
    async fn test_delete_finds_original_with_other_extension() {
        let (registry, _records, dir) = registry().await;
        touch(&dir, &["u1_clip.mov", "u1_clip_web.mp4", "u1_clip.mov.bak"]);

        let report = registry.delete_logical_file("u1_clip_web.mp4").await.unwrap();
        assert_eq!(report.files_removed, 2);
        assert!(!dir.path().join("u1_clip.mov").exists());
        // stem "u1_clip.mov" does not match the base
        assert!(dir.path().join("u1_clip.mov.bak").exists());
    }

    #[tokio::test]
    async fn test_delete_non_video_removes_only_itself() {
        let (registry, _records, dir) = registry().await;
        touch(&dir, &["u2_photo.jpg", "u3_photo.jpg"]);

        let report = registry.delete_logical_file("u2_photo.jpg").await.unwrap();
        assert_eq!(report.removed, vec!["u2_photo.jpg"]);
        assert!(dir.path().join("u3_photo.jpg").exists());
    }

    #[tokio::test]
    async fn test_delete_rejects_paths() {
        let (registry, _records, _dir) = registry().await;
        for bad in ["../clip.mp4", "sub/clip.mp4", ""] {
            assert!(matches!(
                registry.delete_logical_file(bad).await,
                Err(RegistryError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_chain_for_reports_present_links() {
        let (registry, _records, dir) = registry().await;
        touch(&dir, &["u4_clip.mov", "u4_clip_web.mp4"]);

        let chain = registry.chain_for("u4_clip_web.mp4").await.unwrap();
        assert_eq!(chain.original.as_deref(), Some("u4_clip.mov"));
        assert_eq!(chain.transcoded.as_deref(), Some("u4_clip_web.mp4"));
        assert!(chain.orientation_fixed.is_none());
    }

    #[tokio::test]
    async fn test_delete_record_by_id() {
        let (registry, records, dir) = registry().await;
        touch(&dir, &["u5_clip.mov", "u5_clip_web.mp4"]);
        let id = record(&records, "/uploads/u5_clip_web.mp4").await;

        let report = registry.delete_record(id).await.unwrap().unwrap();
        assert_eq!(report.files_removed, 2);
        assert_eq!(report.records_removed, 1);
        assert!(records.all().is_empty());
        assert!(registry.delete_record(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_then_delete_leaves_nothing_behind() {
        use crate::testing::FakeMediaTools;
        use crate::upload::{IncomingUpload, UploadPipeline};
        use timeline_core::ProcessingConfig;

        let (registry, records, dir) = registry().await;
        touch(&dir, &["unrelated.mp4"]);
        let pipeline = UploadPipeline::new(
            registry.storage().clone(),
            Arc::new(FakeMediaTools::new().codec("hevc").rotation("90")),
            ProcessingConfig::default(),
        );
        let outcome = pipeline
            .process_upload(IncomingUpload {
                file_name: Some("clip.mov".to_string()),
                content_type: Some("video/quicktime".to_string()),
                data: b"video".to_vec(),
            })
            .await
            .unwrap();
        record(&records, &outcome.descriptor.url).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);

        let report = registry
            .delete_logical_file(outcome.descriptor.file_name())
            .await
            .unwrap();
        assert_eq!(report.files_removed, 3);
        assert_eq!(report.records_removed, 1);

        let left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec!["unrelated.mp4"]);
    }
}
