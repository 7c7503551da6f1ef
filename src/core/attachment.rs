//! # Attachment Pipeline
//!
//! Per-file state for images attached to the message being composed.
//!
//! ```text
//!   add(LocalFile) ──► Pending(0) ──upload progress──► Pending(n)
//!                         │                                │
//!                         ├──upload ok──► Complete + file_id
//!                         └──upload err─► Failed ──retry(i)──► Pending(0)
//!
//!   add(RemoteUrl) ──► Pending(0) ──link loads──► Complete
//!                                  └─link fails─► Failed
//! ```
//!
//! The controller only reads `files()` and calls `clear()`. Async work
//! (uploads, link probes) is started by the host from the [`PipelineTask`]
//! returned by `add`/`retry`, and reports back by attachment id so that a
//! completion for a since-removed file is dropped instead of landing on
//! whatever now sits at its old index.

use std::fmt;
use std::path::PathBuf;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How an attachment reaches the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// Read from disk and uploaded; usable once a `file_id` is assigned.
    LocalFile,
    /// Referenced by URL; the service fetches it itself.
    RemoteUrl,
}

/// Upload/link state. Serialized as `0..=99`, `100` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending(u8),
    Complete,
    Failed,
}

impl Progress {
    pub fn as_marker(self) -> i16 {
        match self {
            Progress::Pending(p) => i16::from(p.min(99)),
            Progress::Complete => 100,
            Progress::Failed => -1,
        }
    }

    pub fn from_marker(marker: i16) -> Self {
        match marker {
            m if m < 0 => Progress::Failed,
            m if m >= 100 => Progress::Complete,
            m => Progress::Pending(m as u8),
        }
    }

    pub fn is_failed(self) -> bool {
        self == Progress::Failed
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.as_marker())
    }
}

impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i16::deserialize(deserializer).map(Progress::from_marker)
    }
}

/// Identity of an attachment for the lifetime of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub id: AttachmentId,
    pub transfer: TransferMethod,
    pub url: String,
    /// Assigned by the upload service once a local upload completes.
    pub file_id: Option<String>,
    pub progress: Progress,
    /// Source path of a local upload, kept for retries.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl AttachmentDescriptor {
    /// A local upload that is still waiting for its file id.
    pub fn is_unfinished_upload(&self) -> bool {
        self.transfer == TransferMethod::LocalFile && self.file_id.is_none()
    }

    /// Short label for lists: file name or URL tail.
    pub fn display_name(&self) -> &str {
        let trimmed = self.url.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// What the user asked to attach.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    LocalFile(PathBuf),
    RemoteUrl(String),
}

/// Async work the host must start on behalf of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineTask {
    Upload { id: AttachmentId, path: PathBuf },
    ProbeLink { id: AttachmentId, url: String },
}

/// Operations the compose box performs on its attachment list.
pub trait AttachmentPipeline {
    fn files(&self) -> &[AttachmentDescriptor];
    fn add(&mut self, source: AttachmentSource) -> PipelineTask;
    fn remove(&mut self, index: usize) -> Option<AttachmentDescriptor>;
    /// Restart a failed local upload. Returns `None` for anything else.
    fn retry(&mut self, index: usize) -> Option<PipelineTask>;
    fn on_link_load_success(&mut self, index: usize);
    fn on_link_load_error(&mut self, index: usize);
    fn clear(&mut self);
}

/// In-memory attachment list for the compose box.
#[derive(Debug, Default)]
pub struct ImageFiles {
    files: Vec<AttachmentDescriptor>,
    next_id: u64,
}

impl ImageFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn index_of(&self, id: AttachmentId) -> Option<usize> {
        self.files.iter().position(|f| f.id == id)
    }

    /// First failed local upload that still has a file to re-send.
    pub fn first_retryable(&self) -> Option<usize> {
        self.files.iter().position(|f| {
            f.progress.is_failed() && f.transfer == TransferMethod::LocalFile && f.path.is_some()
        })
    }

    pub fn on_upload_progress(&mut self, id: AttachmentId, percent: u8) {
        if let Some(file) = self.find_mut(id)
            && !matches!(file.progress, Progress::Complete)
        {
            file.progress = Progress::Pending(percent.min(99));
        }
    }

    pub fn on_upload_success(&mut self, id: AttachmentId, file_id: String) {
        match self.find_mut(id) {
            Some(file) => {
                debug!("Upload {} complete: file_id={}", id, file_id);
                file.file_id = Some(file_id);
                file.progress = Progress::Complete;
            }
            None => debug!("Dropping upload result for removed attachment {}", id),
        }
    }

    pub fn on_upload_error(&mut self, id: AttachmentId) {
        match self.find_mut(id) {
            Some(file) => {
                warn!("Upload {} failed", id);
                file.progress = Progress::Failed;
            }
            None => debug!("Dropping upload error for removed attachment {}", id),
        }
    }

    fn find_mut(&mut self, id: AttachmentId) -> Option<&mut AttachmentDescriptor> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    fn allocate_id(&mut self) -> AttachmentId {
        self.next_id += 1;
        AttachmentId(self.next_id)
    }
}

impl AttachmentPipeline for ImageFiles {
    fn files(&self) -> &[AttachmentDescriptor] {
        &self.files
    }

    fn add(&mut self, source: AttachmentSource) -> PipelineTask {
        let id = self.allocate_id();
        let (descriptor, task) = match source {
            AttachmentSource::LocalFile(path) => (
                AttachmentDescriptor {
                    id,
                    transfer: TransferMethod::LocalFile,
                    url: format!("file://{}", path.display()),
                    file_id: None,
                    progress: Progress::Pending(0),
                    path: Some(path.clone()),
                },
                PipelineTask::Upload { id, path },
            ),
            AttachmentSource::RemoteUrl(url) => (
                AttachmentDescriptor {
                    id,
                    transfer: TransferMethod::RemoteUrl,
                    url: url.clone(),
                    file_id: None,
                    progress: Progress::Pending(0),
                    path: None,
                },
                PipelineTask::ProbeLink { id, url },
            ),
        };
        debug!("Attachment {} added: {}", id, descriptor.url);
        self.files.push(descriptor);
        task
    }

    fn remove(&mut self, index: usize) -> Option<AttachmentDescriptor> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    fn retry(&mut self, index: usize) -> Option<PipelineTask> {
        let file = self.files.get_mut(index)?;
        if !file.progress.is_failed() || file.transfer != TransferMethod::LocalFile {
            return None;
        }
        let path = file.path.clone()?;
        file.progress = Progress::Pending(0);
        file.file_id = None;
        Some(PipelineTask::Upload { id: file.id, path })
    }

    fn on_link_load_success(&mut self, index: usize) {
        if let Some(file) = self.files.get_mut(index)
            && file.transfer == TransferMethod::RemoteUrl
        {
            file.progress = Progress::Complete;
        }
    }

    fn on_link_load_error(&mut self, index: usize) {
        if let Some(file) = self.files.get_mut(index)
            && file.transfer == TransferMethod::RemoteUrl
        {
            file.progress = Progress::Failed;
        }
    }

    fn clear(&mut self) {
        self.files.clear();
    }
}
