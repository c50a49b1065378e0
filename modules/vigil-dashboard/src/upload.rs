//! Upload tracking.
//!
//! Lifecycle: `Queued -> Uploading -> Processing -> Completed`, with any
//! non-terminal state able to drop to `Failed`. An item enters `Processing`
//! only at 100% progress. An archive stays one item until the server reports
//! its inner files. Completion binds the item to exactly one session.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use vigil_common::types::{UploadRecord, UploadStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload not found: {0}")]
    NotFound(String),

    #[error("Upload {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: UploadStatus,
        to: UploadStatus,
    },

    #[error("Upload {id} is at {progress}%; processing starts at 100%")]
    Incomplete { id: String, progress: u8 },

    #[error("Upload {0} is not an archive")]
    NotAnArchive(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    /// MIME type as reported at selection time.
    pub kind: String,
    pub status: UploadStatus,
    pub progress: u8,
    pub is_archive: bool,
    pub entries: Vec<ArchiveEntry>,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

fn looks_like_archive(name: &str, kind: &str) -> bool {
    let kind = kind.to_ascii_lowercase();
    name.to_ascii_lowercase().ends_with(".zip")
        || kind == "application/zip"
        || kind == "application/x-zip-compressed"
}

impl UploadItem {
    fn from_record(record: &UploadRecord) -> Self {
        let progress = match record.status {
            UploadStatus::Processing | UploadStatus::Completed => 100,
            UploadStatus::Queued | UploadStatus::Uploading | UploadStatus::Failed => 0,
        };
        Self {
            id: record.id.clone(),
            name: record.filename.clone(),
            size: record.size,
            kind: String::new(),
            status: record.status,
            progress,
            is_archive: looks_like_archive(&record.filename, ""),
            entries: Vec::new(),
            session_id: record.session_id.clone(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    items: Vec<UploadItem>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly selected file. Returns its id.
    pub fn add(&mut self, name: impl Into<String>, size: u64, kind: impl Into<String>) -> String {
        let name = name.into();
        let kind = kind.into();
        let id = Uuid::new_v4().to_string();
        tracing::debug!(upload_id = %id, name = %name, size, "Upload queued");
        self.items.push(UploadItem {
            id: id.clone(),
            is_archive: looks_like_archive(&name, &kind),
            name,
            size,
            kind,
            status: UploadStatus::Queued,
            progress: 0,
            entries: Vec::new(),
            session_id: None,
            error: None,
        });
        id
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&UploadItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut UploadItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }

    fn transition(item: &mut UploadItem, from: UploadStatus, to: UploadStatus) -> Result<()> {
        if item.status != from {
            return Err(UploadError::InvalidTransition {
                id: item.id.clone(),
                from: item.status,
                to,
            });
        }
        item.status = to;
        Ok(())
    }

    pub fn start(&mut self, id: &str) -> Result<()> {
        let item = self.get_mut(id)?;
        Self::transition(item, UploadStatus::Queued, UploadStatus::Uploading)
    }

    /// Report transfer progress. Values above 100 clamp; progress never goes backwards.
    pub fn set_progress(&mut self, id: &str, percent: u8) -> Result<u8> {
        let item = self.get_mut(id)?;
        if item.status != UploadStatus::Uploading {
            return Err(UploadError::InvalidTransition {
                id: item.id.clone(),
                from: item.status,
                to: UploadStatus::Uploading,
            });
        }
        item.progress = item.progress.max(percent.min(100));
        Ok(item.progress)
    }

    pub fn begin_processing(&mut self, id: &str) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status == UploadStatus::Uploading && item.progress < 100 {
            return Err(UploadError::Incomplete {
                id: item.id.clone(),
                progress: item.progress,
            });
        }
        Self::transition(item, UploadStatus::Uploading, UploadStatus::Processing)
    }

    /// Attach the inner files the server found after unpacking an archive.
    pub fn attach_entries(&mut self, id: &str, entries: Vec<ArchiveEntry>) -> Result<()> {
        let item = self.get_mut(id)?;
        if !item.is_archive {
            return Err(UploadError::NotAnArchive(item.id.clone()));
        }
        if !matches!(
            item.status,
            UploadStatus::Processing | UploadStatus::Completed
        ) {
            return Err(UploadError::InvalidTransition {
                id: item.id.clone(),
                from: item.status,
                to: UploadStatus::Processing,
            });
        }
        item.entries = entries;
        Ok(())
    }

    /// Finish processing and bind the upload to its analysis session.
    pub fn complete(&mut self, id: &str, session_id: impl Into<String>) -> Result<()> {
        let item = self.get_mut(id)?;
        Self::transition(item, UploadStatus::Processing, UploadStatus::Completed)?;
        let session_id = session_id.into();
        tracing::info!(upload_id = %item.id, session_id = %session_id, "Upload completed");
        item.session_id = Some(session_id);
        Ok(())
    }

    pub fn fail(&mut self, id: &str, reason: impl Into<String>) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status.is_terminal() {
            return Err(UploadError::InvalidTransition {
                id: item.id.clone(),
                from: item.status,
                to: UploadStatus::Failed,
            });
        }
        let reason = reason.into();
        tracing::warn!(upload_id = %item.id, reason = %reason, "Upload failed");
        item.status = UploadStatus::Failed;
        item.error = Some(reason);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<UploadItem> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;
        Ok(self.items.remove(pos))
    }

    /// Fold in the server's upload history. Server state wins for ids it
    /// knows; local items it doesn't know yet are kept. A completed item's
    /// session never changes.
    pub fn sync_history(&mut self, records: &[UploadRecord]) {
        for record in records {
            match self.items.iter().position(|i| i.id == record.id) {
                Some(pos) => {
                    let item = &mut self.items[pos];
                    if item.status == UploadStatus::Completed {
                        if item.session_id != record.session_id {
                            tracing::warn!(
                                upload_id = %item.id,
                                "Ignoring session change for completed upload"
                            );
                        }
                        continue;
                    }
                    let entries = std::mem::take(&mut item.entries);
                    let kind = std::mem::take(&mut item.kind);
                    *item = UploadItem::from_record(record);
                    // Inner files exist only once unpacking has started.
                    if matches!(
                        item.status,
                        UploadStatus::Processing | UploadStatus::Completed
                    ) {
                        item.entries = entries;
                    }
                    item.kind = kind;
                }
                None => self.items.push(UploadItem::from_record(record)),
            }
        }
    }

    pub fn count(&self, status: UploadStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded(tracker: &mut UploadTracker, name: &str) -> String {
        let id = tracker.add(name, 1024, "application/zip");
        tracker.start(&id).unwrap();
        tracker.set_progress(&id, 100).unwrap();
        id
    }

    #[test]
    fn happy_path_binds_session() {
        let mut tracker = UploadTracker::new();
        let id = uploaded(&mut tracker, "faers_q1.zip");
        tracker.begin_processing(&id).unwrap();
        tracker.complete(&id, "sess-42").unwrap();

        let item = tracker.get(&id).unwrap();
        assert_eq!(item.status, UploadStatus::Completed);
        assert_eq!(item.session_id.as_deref(), Some("sess-42"));
    }

    #[test]
    fn processing_requires_full_progress() {
        let mut tracker = UploadTracker::new();
        let id = tracker.add("cases.csv", 10, "text/csv");
        tracker.start(&id).unwrap();
        tracker.set_progress(&id, 60).unwrap();

        assert_eq!(
            tracker.begin_processing(&id),
            Err(UploadError::Incomplete {
                id: id.clone(),
                progress: 60
            })
        );
        assert_eq!(tracker.get(&id).unwrap().status, UploadStatus::Uploading);
    }

    #[test]
    fn cannot_skip_uploading() {
        let mut tracker = UploadTracker::new();
        let id = tracker.add("cases.csv", 10, "text/csv");
        assert!(matches!(
            tracker.begin_processing(&id),
            Err(UploadError::InvalidTransition { .. })
        ));
        assert!(tracker.set_progress(&id, 50).is_err());
    }

    #[test]
    fn progress_clamps_and_never_regresses() {
        let mut tracker = UploadTracker::new();
        let id = tracker.add("cases.csv", 10, "text/csv");
        tracker.start(&id).unwrap();

        assert_eq!(tracker.set_progress(&id, 70).unwrap(), 70);
        assert_eq!(tracker.set_progress(&id, 40).unwrap(), 70);
        assert_eq!(tracker.set_progress(&id, 250).unwrap(), 100);
    }

    #[test]
    fn completed_is_final() {
        let mut tracker = UploadTracker::new();
        let id = uploaded(&mut tracker, "faers_q1.zip");
        tracker.begin_processing(&id).unwrap();
        tracker.complete(&id, "sess-1").unwrap();

        assert!(tracker.fail(&id, "late error").is_err());
        assert!(tracker.complete(&id, "sess-2").is_err());
        assert_eq!(
            tracker.get(&id).unwrap().session_id.as_deref(),
            Some("sess-1")
        );
    }

    #[test]
    fn any_live_state_can_fail() {
        let mut tracker = UploadTracker::new();
        let queued = tracker.add("a.csv", 1, "text/csv");
        let processing = uploaded(&mut tracker, "b.zip");
        tracker.begin_processing(&processing).unwrap();

        tracker.fail(&queued, "cancelled").unwrap();
        tracker.fail(&processing, "bad archive").unwrap();
        assert_eq!(tracker.count(UploadStatus::Failed), 2);
        assert!(tracker.fail(&queued, "again").is_err());
    }

    #[test]
    fn archive_entries_only_after_unpacking() {
        let mut tracker = UploadTracker::new();
        let id = uploaded(&mut tracker, "faers_q1.zip");
        let entries = vec![
            ArchiveEntry {
                name: "DEMO24Q1.txt".to_string(),
                size: 512,
            },
            ArchiveEntry {
                name: "REAC24Q1.txt".to_string(),
                size: 256,
            },
        ];

        assert!(tracker.attach_entries(&id, entries.clone()).is_err());
        assert!(tracker.get(&id).unwrap().entries.is_empty());

        tracker.begin_processing(&id).unwrap();
        tracker.attach_entries(&id, entries).unwrap();
        assert_eq!(tracker.items().len(), 1);
        assert_eq!(tracker.get(&id).unwrap().entries.len(), 2);
    }

    #[test]
    fn history_rollback_drops_unpacked_entries() {
        let mut tracker = UploadTracker::new();
        let id = uploaded(&mut tracker, "faers_q1.zip");
        tracker.begin_processing(&id).unwrap();
        tracker
            .attach_entries(
                &id,
                vec![ArchiveEntry {
                    name: "DEMO24Q1.txt".to_string(),
                    size: 512,
                }],
            )
            .unwrap();

        let record = |status| UploadRecord {
            id: id.clone(),
            filename: "faers_q1.zip".to_string(),
            status,
            size: 1024,
            created_at: None,
            case_count: 0,
            session_id: None,
        };

        tracker.sync_history(&[record(UploadStatus::Processing)]);
        assert_eq!(tracker.get(&id).unwrap().entries.len(), 1);

        tracker.sync_history(&[record(UploadStatus::Queued)]);
        let item = tracker.get(&id).unwrap();
        assert_eq!(item.status, UploadStatus::Queued);
        assert_eq!(item.progress, 0);
        assert!(item.entries.is_empty());
        assert_eq!(item.kind, "application/zip");
    }

    #[test]
    fn plain_files_reject_entries() {
        let mut tracker = UploadTracker::new();
        let id = tracker.add("cases.csv", 10, "text/csv");
        tracker.start(&id).unwrap();
        tracker.set_progress(&id, 100).unwrap();
        tracker.begin_processing(&id).unwrap();
        assert_eq!(
            tracker.attach_entries(&id, vec![]),
            Err(UploadError::NotAnArchive(id.clone()))
        );
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut tracker = UploadTracker::new();
        assert_eq!(
            tracker.remove("nope"),
            Err(UploadError::NotFound("nope".to_string()))
        );
    }
}
