//! # Actions and Effects
//!
//! Everything that happens *to* Palaver from the outside world becomes an
//! `Action`: a probe answered, an upload finished, the chat service replied.
//! Everything Palaver needs the outside world to *do* becomes an `Effect`.
//!
//! ```text
//! Action  →  update(&mut App)  →  Vec<Effect>  →  host executes
//! ```
//!
//! `update()` lives in [`crate::core::state`]. No I/O happens there; the
//! TUI event loop spawns tasks for effects and feeds their results back
//! in as actions.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::attachment::AttachmentId;
use crate::core::controller::{ComposedMessage, Notification};

/// Results of asynchronous work, delivered back to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A backdrop availability probe finished.
    BackgroundProbed { url: String, available: bool },
    /// An avatar or gallery image finished loading (or failed to).
    ImageSettled { url: String, loaded: bool },
    /// A remote-URL attachment was probed.
    LinkProbed { id: AttachmentId, loaded: bool },
    UploadProgress { id: AttachmentId, percent: u8 },
    UploadSucceeded { id: AttachmentId, file_id: String },
    UploadFailed { id: AttachmentId, error: String },
    /// The chat service answered; `answer_id` names the placeholder entry.
    AnswerReceived {
        answer_id: String,
        content: String,
        conversation_id: Option<String>,
    },
    /// The chat service failed to answer.
    AnswerFailed { answer_id: String, error: String },
    /// A delayed scroll-to-bottom timer fired.
    DelayedScroll,
}

/// Work the host performs on the core's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver a composed message to the send handler.
    Send(ComposedMessage),
    /// Show a transient notification.
    Notify(Notification),
    /// Scroll the transcript to its maximum extent now.
    ScrollToBottom,
    /// Scroll to the bottom once `Duration` has elapsed.
    ScrollToBottomAfter(Duration),
    /// Probe the backdrop candidate.
    ProbeBackground { url: String },
    /// Load an avatar or gallery image.
    LoadImage { url: String },
    /// Probe a remote-URL attachment.
    ProbeLink { id: AttachmentId, url: String },
    /// Upload a local attachment.
    Upload { id: AttachmentId, path: PathBuf },
}
