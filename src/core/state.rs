//! # Application State
//!
//! Host-side state for Palaver: the transcript the controller reads, the
//! responding flag, the clear-query counter and image load bookkeeping.
//! This module contains domain logic only; presentation state lives in
//! the `tui` module.
//!
//! ```text
//! App
//! ├── transcript: Transcript        // host-owned chat history
//! ├── controller: ChatController    // compose box + resolvers
//! ├── images: ImageRegistry         // avatar + gallery load status
//! ├── gallery: GalleryTracker       // one-shot "gallery settled" signal
//! ├── is_responding: bool           // some answer is still pending
//! ├── clear_query: u64              // bumped to empty the compose box
//! ├── conversation_id: Option<..>   // continuity token from the service
//! └── delivering: bool              // false in local-only mode
//! ```
//!
//! State changes from async work only happen through `update(app, action)`.
//! Every call ends with a `sync()` so the controller sees the latest props.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::core::action::{Action, Effect};
use crate::core::attachment::AttachmentPipeline;
use crate::core::avatar::{AvatarRole, AvatarView};
use crate::core::config::ResolvedConfig;
use crate::core::controller::{ChatController, ChatProps, ComposedMessage, Notification};
use crate::core::environment::EnvironmentProbe;
use crate::core::gallery::{GalleryTracker, ImageRegistry};
use crate::core::transcript::{Feedback, Transcript, TranscriptEntry};

/// Result of handing a composed message to the host.
#[derive(Debug)]
pub struct Accepted {
    /// Placeholder entry the answer will land in; `None` in local-only mode.
    pub answer_id: Option<String>,
    pub effects: Vec<Effect>,
}

pub struct App {
    pub transcript: Transcript,
    pub controller: ChatController,
    pub images: ImageRegistry,
    gallery: GalleryTracker,
    /// True while `pending_answers` is non-empty.
    pub is_responding: bool,
    pending_answers: HashSet<String>,
    pub clear_query: u64,
    pub conversation_id: Option<String>,
    /// True when questions are delivered to a chat service.
    pub delivering: bool,
    next_question: u64,
}

impl App {
    pub fn new(props: ChatProps, delivering: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            controller: ChatController::new(props),
            images: ImageRegistry::new(),
            gallery: GalleryTracker::new(),
            is_responding: false,
            pending_answers: HashSet::new(),
            clear_query: 0,
            conversation_id: None,
            delivering,
            next_question: 0,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        let props = ChatProps {
            feedback_enabled: config.feedback_enabled,
            hide_send_input: config.hide_send_input,
            check_can_send: None,
            vision: config.vision.clone(),
            background: config.background.clone(),
            avatar: config.avatar.clone(),
            user_avatar: None,
            assistant_avatar: None,
        };
        Self::new(props, config.endpoint.is_some())
    }

    /// Mount the backdrop and start avatar loads.
    pub fn start(&mut self, env: &dyn EnvironmentProbe) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(probe) = self.controller.background_mut().mount(env) {
            effects.push(Effect::ProbeBackground { url: probe.url });
        }
        for role in [AvatarRole::User, AvatarRole::Assistant] {
            if let Some(source) = self.controller.avatar(role).source
                && self.images.request(&source)
            {
                effects.push(Effect::LoadImage { url: source });
            }
        }
        effects.extend(self.sync());
        effects
    }

    /// The terminal was resized; re-classify the device.
    pub fn resized(&mut self, env: &dyn EnvironmentProbe) -> Vec<Effect> {
        match self.controller.background_mut().on_resize(env) {
            Some(probe) => vec![Effect::ProbeBackground { url: probe.url }],
            None => Vec::new(),
        }
    }

    pub fn avatar_view(&self, role: AvatarRole) -> AvatarView {
        let mut view = AvatarView::new(self.controller.avatar(role));
        if let Some(source) = &view.resolution.source
            && self.images.is_failed(source)
        {
            view.mark_load_failed();
        }
        view
    }

    /// Host send handler: record the question and, when delivering, an
    /// empty answer placeholder that the relay result will fill in.
    pub fn accept_send(&mut self, message: &ComposedMessage) -> Accepted {
        self.next_question += 1;
        let n = self.next_question;
        let images = message.files.iter().map(|f| f.url.clone()).collect();
        self.transcript
            .push(TranscriptEntry::question(format!("q-{n}"), &message.query).with_images(images));

        let answer_id = if self.delivering {
            let id = format!("a-{n}");
            self.transcript.push(TranscriptEntry::answer(&id, ""));
            self.pending_answers.insert(id.clone());
            self.is_responding = true;
            Some(id)
        } else {
            debug!("Local-only mode, question not delivered");
            None
        };
        Accepted {
            answer_id,
            effects: self.sync(),
        }
    }

    /// Toggle a rating on the most recent answer.
    pub fn rate_last_answer(&mut self, feedback: Feedback) -> Vec<Effect> {
        if !self.controller.props().feedback_enabled {
            return Vec::new();
        }
        let Some(entry) = self.transcript.entries().iter().rev().find(|e| e.is_answer()) else {
            return Vec::new();
        };
        let next = (entry.feedback != Some(feedback)).then_some(feedback);
        let id = entry.id.clone();
        self.transcript.set_feedback(&id, next);
        self.sync()
    }

    /// Start a fresh conversation and empty the compose box.
    pub fn reset_conversation(&mut self) -> Vec<Effect> {
        info!("Starting new conversation");
        self.transcript.clear();
        self.gallery.clear();
        self.conversation_id = None;
        self.pending_answers.clear();
        self.is_responding = false;
        let avatars: Vec<String> = [AvatarRole::User, AvatarRole::Assistant]
            .into_iter()
            .filter_map(|role| self.controller.avatar(role).source)
            .collect();
        self.images.retain(|url| avatars.iter().any(|a| a == url));
        self.clear_query += 1;
        self.sync()
    }

    /// The answer `answer_id` arrived or failed; it no longer counts as pending.
    fn settle_answer(&mut self, answer_id: &str) {
        self.pending_answers.remove(answer_id);
        self.is_responding = !self.pending_answers.is_empty();
    }

    /// Push current props into the controller and start any new image loads.
    pub fn sync(&mut self) -> Vec<Effect> {
        let mut effects =
            self.controller
                .sync_props(&self.transcript, self.is_responding, self.clear_query);

        for entry in self.transcript.entries() {
            for url in &entry.images {
                if self.images.request(url) {
                    effects.push(Effect::LoadImage { url: url.clone() });
                }
            }
        }

        for entry_id in self.gallery.newly_settled(&self.transcript, &self.images) {
            effects.extend(self.controller.handle_images_loaded(&entry_id));
        }
        effects
    }
}

pub fn update(app: &mut App, action: Action) -> Vec<Effect> {
    let mut effects = Vec::new();
    match action {
        Action::BackgroundProbed { url, available } => {
            app.controller.background_mut().apply_probe(&url, available);
        }
        Action::ImageSettled { url, loaded } => {
            app.images.settle(&url, loaded);
        }
        Action::LinkProbed { id, loaded } => {
            let files = app.controller.attachments_mut();
            match files.index_of(id) {
                Some(index) if loaded => files.on_link_load_success(index),
                Some(index) => files.on_link_load_error(index),
                None => debug!("Dropping link probe for removed attachment {}", id),
            }
        }
        Action::UploadProgress { id, percent } => {
            app.controller.attachments_mut().on_upload_progress(id, percent);
        }
        Action::UploadSucceeded { id, file_id } => {
            app.controller.attachments_mut().on_upload_success(id, file_id);
        }
        Action::UploadFailed { id, error } => {
            warn!("Upload {} failed: {}", id, error);
            let files = app.controller.attachments_mut();
            if files.index_of(id).is_some() {
                files.on_upload_error(id);
                effects.push(Effect::Notify(Notification::error(format!(
                    "Upload failed: {error}"
                ))));
            }
        }
        Action::AnswerReceived {
            answer_id,
            content,
            conversation_id,
        } => {
            // A reset in the meantime removed the placeholder; drop the answer.
            if app.transcript.update_content(&answer_id, content) {
                if conversation_id.is_some() {
                    app.conversation_id = conversation_id;
                }
                app.settle_answer(&answer_id);
            } else {
                debug!("Dropping answer for vanished entry {}", answer_id);
            }
        }
        Action::AnswerFailed { answer_id, error } => {
            warn!("Answer {} failed: {}", answer_id, error);
            if app.transcript.remove(&answer_id).is_some() {
                app.settle_answer(&answer_id);
                effects.push(Effect::Notify(Notification::error(error)));
            }
        }
        Action::DelayedScroll => effects.push(Effect::ScrollToBottom),
    }
    effects.extend(app.sync());
    effects
}
