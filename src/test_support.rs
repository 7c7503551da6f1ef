//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU16, Ordering};

use async_trait::async_trait;

use crate::core::controller::ChatProps;
use crate::core::environment::{EnvironmentProbe, is_narrow_columns, matches_mobile_agent};
use crate::core::state::App;

/// Deterministic environment: fixed agent, adjustable width, and a fixed
/// set of URLs that "load".
pub struct StubEnvironment {
    columns: AtomicU16,
    agent: String,
    loadable: HashSet<String>,
}

impl StubEnvironment {
    pub fn with_columns(columns: u16) -> Self {
        Self {
            columns: AtomicU16::new(columns),
            agent: String::new(),
            loadable: HashSet::new(),
        }
    }

    pub fn agent(mut self, agent: &str) -> Self {
        self.agent = agent.to_string();
        self
    }

    pub fn loadable(mut self, url: &str) -> Self {
        self.loadable.insert(url.to_string());
        self
    }

    pub fn set_columns(&self, columns: u16) {
        self.columns.store(columns, Ordering::Relaxed);
    }
}

#[async_trait]
impl EnvironmentProbe for StubEnvironment {
    fn is_narrow_viewport(&self) -> bool {
        is_narrow_columns(self.columns.load(Ordering::Relaxed))
    }

    fn matches_mobile_signature(&self) -> bool {
        matches_mobile_agent(&self.agent)
    }

    async fn probe_image_loadable(&self, url: &str) -> bool {
        self.loadable.contains(url)
    }
}

/// An app with default props that delivers to a (pretend) chat service.
pub fn test_app() -> App {
    App::new(ChatProps::default(), true)
}
