//! # Image Load Tracking
//!
//! Avatars and question galleries load asynchronously. [`ImageRegistry`]
//! remembers what each URL settled to, and [`GalleryTracker`] turns
//! "every image of entry X has settled" into a one-shot signal so the
//! transcript can re-scroll once the extra rows are laid out.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::core::transcript::{Role, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Loading,
    Loaded,
    Failed,
}

impl ImageStatus {
    pub fn is_settled(self) -> bool {
        self != ImageStatus::Loading
    }
}

#[derive(Debug, Default)]
pub struct ImageRegistry {
    statuses: HashMap<String, ImageStatus>,
    /// Bumped on every settle, so layouts know image rows may have changed.
    generation: u64,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `url`. Returns true the first time, when a load must be started.
    pub fn request(&mut self, url: &str) -> bool {
        if self.statuses.contains_key(url) {
            return false;
        }
        self.statuses.insert(url.to_string(), ImageStatus::Loading);
        true
    }

    /// Record a load result. Results for urls no longer tracked are dropped.
    pub fn settle(&mut self, url: &str, loaded: bool) {
        let Some(status) = self.statuses.get_mut(url) else {
            debug!("Dropping load result for untracked image {}", url);
            return;
        };
        *status = if loaded {
            ImageStatus::Loaded
        } else {
            ImageStatus::Failed
        };
        debug!("Image {} settled: {:?}", url, status);
        self.generation += 1;
    }

    /// Forget every url `keep` rejects.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        let before = self.statuses.len();
        self.statuses.retain(|url, _| keep(url));
        if self.statuses.len() != before {
            debug!("Forgot {} images", before - self.statuses.len());
            self.generation += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self, url: &str) -> Option<ImageStatus> {
        self.statuses.get(url).copied()
    }

    pub fn is_failed(&self, url: &str) -> bool {
        self.status(url) == Some(ImageStatus::Failed)
    }

    /// True once every url in `urls` has finished loading or failed.
    pub fn all_settled(&self, urls: &[String]) -> bool {
        urls.iter()
            .all(|u| self.status(u).is_some_and(ImageStatus::is_settled))
    }
}

/// Reports each question gallery exactly once, when its last image settles.
#[derive(Debug, Default)]
pub struct GalleryTracker {
    reported: HashSet<String>,
}

impl GalleryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry ids whose galleries became fully settled since the last call.
    pub fn newly_settled(&mut self, transcript: &Transcript, images: &ImageRegistry) -> Vec<String> {
        let mut settled = Vec::new();
        for entry in transcript.entries() {
            if entry.role != Role::Question || entry.images.is_empty() {
                continue;
            }
            if self.reported.contains(&entry.id) || !images.all_settled(&entry.images) {
                continue;
            }
            self.reported.insert(entry.id.clone());
            settled.push(entry.id.clone());
        }
        settled
    }

    pub fn clear(&mut self) {
        self.reported.clear();
    }
}
