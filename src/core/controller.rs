//! # Chat Interaction Controller
//!
//! Owns the compose box: the text buffer, IME composition tracking, the
//! attachment list, submission gating and the auto-scroll triggers.
//!
//! The controller is UI-agnostic. Handlers return [`Effect`]s instead of
//! performing I/O, so the whole flow can be driven from tests.
//!
//! ## Enter key handling
//!
//! Terminals (and browsers) only report composition status reliably on
//! key *down*, while submission happens on key *up*. The flag is therefore
//! captured on every keydown and consulted on the following keyup:
//!
//! | keydown event              | flag after   | keydown result   | keyup (Enter)  |
//! |----------------------------|--------------|------------------|----------------|
//! | Enter, composing           | `Composing`  | `Default`        | no submit      |
//! | Enter, not composing       | `Idle`       | `PreventDefault` | submit         |
//! | Shift+Enter                | `Idle`       | `Default`        | no submit      |
//! | any other key, composing   | `Composing`  | `Default`        | n/a            |
//! | any other key              | `Idle`       | `Default`        | n/a            |
//!
//! `PreventDefault` tells the input widget not to insert a newline, and the
//! buffer loses one trailing `\n` so the submitted text has no dangling
//! blank line.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::action::Effect;
use crate::core::attachment::{
    AttachmentPipeline, AttachmentSource, ImageFiles, PipelineTask, TransferMethod,
};
use crate::core::avatar::{self, AvatarResolution, AvatarRole};
use crate::core::background::BackgroundResolver;
use crate::core::config::{AvatarConfig, BackgroundConfig, VisionSettings};
use crate::core::transcript::Transcript;

pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";
pub const NOTIFICATION_DURATION_MS: u64 = 3000;
/// Delay before re-scrolling after a send, so the echoed question has landed.
pub const POST_SUBMIT_SCROLL_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// Keyboard model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
    /// True when the press belongs to an input-method composition.
    pub is_composing: bool,
}

impl KeyPress {
    pub fn enter() -> Self {
        Self {
            key: Key::Enter,
            shift: false,
            is_composing: false,
        }
    }

    pub fn shift_enter() -> Self {
        Self {
            shift: true,
            ..Self::enter()
        }
    }

    pub fn composing(mut self) -> Self {
        self.is_composing = true;
        self
    }

    fn is_bare_enter(&self) -> bool {
        self.key == Key::Enter && !self.shift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionState {
    #[default]
    Idle,
    Composing,
}

/// Whether the input widget should run its own handling for a keydown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Default,
    PreventDefault,
}

// ============================================================================
// Outbound message + notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub transfer_method: TransferMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

/// Text plus surviving attachments at the moment of submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedMessage {
    pub query: String,
    pub files: Vec<OutboundFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u64,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }
}

/// Why an attachment could not be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachRefusal {
    VisionDisabled,
    MethodNotAllowed,
    LimitReached(usize),
}

impl std::fmt::Display for AttachRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachRefusal::VisionDisabled => write!(f, "Image attachments are disabled"),
            AttachRefusal::MethodNotAllowed => write!(f, "This kind of attachment is not allowed"),
            AttachRefusal::LimitReached(n) => write!(f, "At most {n} images per message"),
        }
    }
}

// ============================================================================
// Props
// ============================================================================

/// Host-side predicate consulted before every send (rate limits and such).
pub type SendGate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Configuration the host hands the controller at construction.
#[derive(Clone)]
pub struct ChatProps {
    pub feedback_enabled: bool,
    pub hide_send_input: bool,
    pub check_can_send: Option<SendGate>,
    pub vision: VisionSettings,
    pub background: BackgroundConfig,
    pub avatar: AvatarConfig,
    /// Per-instance avatar overrides; fall back to `avatar` when unset.
    pub user_avatar: Option<String>,
    pub assistant_avatar: Option<String>,
}

impl Default for ChatProps {
    fn default() -> Self {
        Self {
            feedback_enabled: true,
            hide_send_input: false,
            check_can_send: None,
            vision: VisionSettings::default(),
            background: BackgroundConfig::default(),
            avatar: AvatarConfig::default(),
            user_avatar: None,
            assistant_avatar: None,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct ChatController<P: AttachmentPipeline = ImageFiles> {
    props: ChatProps,
    query: String,
    composition: CompositionState,
    files: P,
    background: BackgroundResolver,
    /// Last synced transcript revision; `None` before the first sync.
    seen_revision: Option<u64>,
    is_responding: bool,
    clear_query: u64,
}

impl ChatController<ImageFiles> {
    pub fn new(props: ChatProps) -> Self {
        Self::with_pipeline(props, ImageFiles::new())
    }
}

impl<P: AttachmentPipeline> ChatController<P> {
    pub fn with_pipeline(props: ChatProps, files: P) -> Self {
        let background = BackgroundResolver::new(props.background.clone());
        Self {
            props,
            query: String::new(),
            composition: CompositionState::Idle,
            files,
            background,
            seen_revision: None,
            is_responding: false,
            clear_query: 0,
        }
    }

    pub fn props(&self) -> &ChatProps {
        &self.props
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn composition(&self) -> CompositionState {
        self.composition
    }

    pub fn is_responding(&self) -> bool {
        self.is_responding
    }

    pub fn attachments(&self) -> &P {
        &self.files
    }

    pub fn attachments_mut(&mut self) -> &mut P {
        &mut self.files
    }

    pub fn background(&self) -> &BackgroundResolver {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut BackgroundResolver {
        &mut self.background
    }

    pub fn avatar(&self, role: AvatarRole) -> AvatarResolution {
        let override_source = match role {
            AvatarRole::User => self.props.user_avatar.as_deref(),
            AvatarRole::Assistant => self.props.assistant_avatar.as_deref(),
        };
        avatar::resolve(role, override_source, None, &self.props.avatar)
    }

    // ------------------------------------------------------------------
    // Props from the host
    // ------------------------------------------------------------------

    /// Feed the latest host-owned values in. Called once per event-loop turn.
    pub fn sync_props(
        &mut self,
        transcript: &Transcript,
        is_responding: bool,
        clear_query: u64,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        let revision_changed = self.seen_revision != Some(transcript.revision());
        let responding_changed = self.is_responding != is_responding;
        self.seen_revision = Some(transcript.revision());
        self.is_responding = is_responding;
        if revision_changed || responding_changed {
            effects.push(Effect::ScrollToBottom);
        }

        if clear_query != self.clear_query {
            self.clear_query = clear_query;
            if clear_query != 0 {
                debug!("Clear-query counter moved to {}, emptying buffer", clear_query);
                self.query.clear();
            }
        }

        effects
    }

    // ------------------------------------------------------------------
    // Text composition
    // ------------------------------------------------------------------

    pub fn handle_content_change(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    pub fn handle_key_down(&mut self, press: &KeyPress) -> KeyDisposition {
        self.composition = if press.is_composing {
            CompositionState::Composing
        } else {
            CompositionState::Idle
        };

        if press.is_bare_enter() && !press.is_composing {
            if self.query.ends_with('\n') {
                self.query.pop();
            }
            return KeyDisposition::PreventDefault;
        }
        KeyDisposition::Default
    }

    pub fn handle_key_up(&mut self, press: &KeyPress) -> Vec<Effect> {
        if press.is_bare_enter() && self.composition == CompositionState::Idle {
            return self.send();
        }
        Vec::new()
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Validate, assemble and hand off the current message.
    pub fn send(&mut self) -> Vec<Effect> {
        if self.query.trim().is_empty() {
            debug!("Rejected empty submission");
            return vec![Effect::Notify(Notification::error(EMPTY_MESSAGE_ERROR))];
        }
        if let Some(gate) = &self.props.check_can_send
            && !gate()
        {
            debug!("Submission blocked by send gate");
            return Vec::new();
        }

        let message = self.compose();
        info!(
            "Sending message ({} chars, {} files)",
            message.query.len(),
            message.files.len()
        );
        let mut effects = vec![Effect::Send(message)];

        let upload_in_flight = self.files.files().iter().any(|f| f.is_unfinished_upload());
        if upload_in_flight {
            debug!("Local upload still in flight, keeping compose state");
        } else {
            if !self.files.files().is_empty() {
                self.files.clear();
            }
            if !self.is_responding {
                self.query.clear();
            }
        }

        effects.push(Effect::ScrollToBottomAfter(POST_SUBMIT_SCROLL_DELAY));
        effects
    }

    /// The outbound message for the current state. Failed files are skipped.
    pub fn compose(&self) -> ComposedMessage {
        let files = self
            .files
            .files()
            .iter()
            .filter(|f| !f.progress.is_failed())
            .map(|f| OutboundFile {
                kind: "image".to_string(),
                transfer_method: f.transfer,
                url: f.url.clone(),
                upload_file_id: f.file_id.clone(),
            })
            .collect();
        ComposedMessage {
            query: self.query.clone(),
            files,
        }
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    /// A renderer reported that every image in `entry_id` has settled.
    pub fn handle_images_loaded(&mut self, entry_id: &str) -> Vec<Effect> {
        debug!("Images settled for {}, re-scrolling", entry_id);
        vec![Effect::ScrollToBottom]
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// The upload affordance is enabled only below the configured limit.
    pub fn can_add_attachment(&self) -> bool {
        self.props.vision.enabled && self.files.files().len() < self.props.vision.number_limits
    }

    pub fn add_attachment(&mut self, source: AttachmentSource) -> Result<Effect, AttachRefusal> {
        let vision = &self.props.vision;
        if !vision.enabled {
            return Err(AttachRefusal::VisionDisabled);
        }
        let method = match source {
            AttachmentSource::LocalFile(_) => TransferMethod::LocalFile,
            AttachmentSource::RemoteUrl(_) => TransferMethod::RemoteUrl,
        };
        if !vision.allows(method) {
            return Err(AttachRefusal::MethodNotAllowed);
        }
        if !self.can_add_attachment() {
            return Err(AttachRefusal::LimitReached(vision.number_limits));
        }
        Ok(task_effect(self.files.add(source)))
    }

    pub fn remove_attachment(&mut self, index: usize) -> bool {
        self.files.remove(index).is_some()
    }

    pub fn retry_attachment(&mut self, index: usize) -> Option<Effect> {
        self.files.retry(index).map(task_effect)
    }
}

fn task_effect(task: PipelineTask) -> Effect {
    match task {
        PipelineTask::Upload { id, path } => Effect::Upload { id, path },
        PipelineTask::ProbeLink { id, url } => Effect::ProbeLink { id, url },
    }
}
