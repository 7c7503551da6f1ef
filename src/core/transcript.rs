//! # Transcript
//!
//! The ordered list of chat entries shown in the message list.
//!
//! The transcript is owned by the host (whoever talks to the assistant),
//! never by the controller. The controller only reads it and watches its
//! `revision`: any change of identity or length bumps the revision, and a
//! changed revision is what drives re-render and auto-scroll.
//!
//! ```text
//! Transcript
//! ├── entries: Vec<TranscriptEntry>   // append-only from the UI's view
//! └── revision: u64                   // bumped on push / replace / clear
//! ```

use serde::{Deserialize, Serialize};

/// Who authored an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    Question,
    /// Produced by the assistant.
    Answer,
}

/// User rating attached to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Stable, unique render key.
    pub id: String,
    pub role: Role,
    pub content: String,
    /// URLs of images sent along with a question.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl TranscriptEntry {
    pub fn question(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Question,
            content: content.into(),
            images: Vec::new(),
            feedback: None,
        }
    }

    pub fn answer(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Answer,
            content: content.into(),
            images: Vec::new(),
            feedback: None,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn is_answer(&self) -> bool {
        self.role == Role::Answer
    }
}

/// Host-owned chat history with a change counter.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id of the final entry, used to place the responding indicator.
    pub fn last_id(&self) -> Option<&str> {
        self.entries.last().map(|e| e.id.as_str())
    }

    pub fn is_last(&self, id: &str) -> bool {
        self.last_id() == Some(id)
    }

    pub fn get(&self, id: &str) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Append an entry. Duplicate ids are rejected so render keys stay unique.
    pub fn push(&mut self, entry: TranscriptEntry) -> bool {
        if self.get(&entry.id).is_some() {
            log::warn!("Ignoring transcript entry with duplicate id {}", entry.id);
            return false;
        }
        self.entries.push(entry);
        self.revision += 1;
        true
    }

    /// Replace the content of an existing entry (streamed answers).
    pub fn update_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.content = content.into();
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn set_feedback(&mut self, id: &str, feedback: Option<Feedback>) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id && e.is_answer()) {
            Some(entry) => {
                entry.feedback = feedback;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<TranscriptEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.revision += 1;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.revision += 1;
    }
}
