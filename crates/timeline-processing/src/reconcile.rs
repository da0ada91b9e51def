//! Bringing persisted media URLs in line with the derivatives on disk
//!
//! Used by operators after transcoding or fixing videos offline.

use std::sync::Arc;

use serde::Serialize;
use timeline_core::constants::DERIVATIVE_EXTENSION;
use timeline_core::MediaRecordStore;
use timeline_storage::LocalStorage;

use crate::derivative::{
    base_name, file_stem, link_of, transcoded_fixed_name, transcoded_name, ChainLink,
};
use crate::error::RegistryError;

/// Which derivative records should point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepointTarget {
    Transcoded,
    OrientationFixed,
}

impl RepointTarget {
    fn link(&self) -> ChainLink {
        match self {
            RepointTarget::Transcoded => ChainLink::Transcoded,
            RepointTarget::OrientationFixed => ChainLink::OrientationFixed,
        }
    }

    fn file_name(&self, base: &str) -> String {
        match self {
            RepointTarget::Transcoded => transcoded_name(base),
            RepointTarget::OrientationFixed => transcoded_fixed_name(base),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepointedRecord {
    pub id: i64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepointReport {
    pub examined: usize,
    pub updated: Vec<RepointedRecord>,
    /// Records whose target derivative does not exist
    pub missing: Vec<String>,
    /// Records already at or past the target
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// One original `.mp4` and its derivatives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainListing {
    pub original: FileEntry,
    pub transcoded: Option<FileEntry>,
    pub orientation_fixed: Option<FileEntry>,
}

#[derive(Clone)]
pub struct Reconciler {
    storage: LocalStorage,
    records: Arc<dyn MediaRecordStore>,
}

impl Reconciler {
    pub fn new(storage: LocalStorage, records: Arc<dyn MediaRecordStore>) -> Self {
        Self { storage, records }
    }

    /// Every original `.mp4` in the upload directory with its derivatives.
    pub async fn list_chains(&self) -> Result<Vec<ChainListing>, RegistryError> {
        let mut listings = Vec::new();
        for name in self.storage.list_names().await? {
            let is_mp4 = name
                .rsplit_once('.')
                .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(DERIVATIVE_EXTENSION));
            if !is_mp4 || link_of(&name) != ChainLink::Original {
                continue;
            }
            let base = file_stem(&name);
            listings.push(ChainListing {
                original: self.entry(&name).await?,
                transcoded: self.optional_entry(&transcoded_name(base)).await?,
                orientation_fixed: self.optional_entry(&transcoded_fixed_name(base)).await?,
            });
        }
        Ok(listings)
    }

    /// Point every video record at its `target` derivative where that file
    /// exists. Records already at or downstream of the target are left alone.
    #[tracing::instrument(skip(self))]
    pub async fn repoint(&self, target: RepointTarget) -> Result<RepointReport, RegistryError> {
        let records = self.records.list_video_records().await?;
        let mut report = RepointReport {
            examined: records.len(),
            ..Default::default()
        };

        for record in records {
            let Some(current) = self.storage.name_from_url(&record.file_url) else {
                report.missing.push(record.file_url.clone());
                continue;
            };
            if link_of(current) >= target.link() {
                report.unchanged += 1;
                continue;
            }

            let wanted = target.file_name(base_name(current));
            if !self.storage.exists(&wanted).await? {
                tracing::debug!(record_id = record.id, wanted = %wanted, "Derivative not found");
                report.missing.push(wanted);
                continue;
            }

            let new_url = self.storage.url_for(&wanted);
            if self.records.update_url(record.id, &new_url).await? {
                tracing::info!(
                    record_id = record.id,
                    from = %record.file_url,
                    to = %new_url,
                    "Repointed media record"
                );
                report.updated.push(RepointedRecord {
                    id: record.id,
                    from: record.file_url.clone(),
                    to: new_url,
                });
            }
        }

        Ok(report)
    }

    async fn entry(&self, name: &str) -> Result<FileEntry, RegistryError> {
        Ok(FileEntry {
            name: name.to_string(),
            size: self.storage.size(name).await?,
        })
    }

    async fn optional_entry(&self, name: &str) -> Result<Option<FileEntry>, RegistryError> {
        if self.storage.exists(name).await? {
            self.entry(name).await.map(Some)
        } else {
            Ok(None)
        }
    }
}
