//! # Environment Probe
//!
//! The few facts about the host that the backdrop and avatar logic need:
//! viewport width, the agent string, and whether an image URL actually
//! loads. Production code binds these to the terminal, the filesystem and
//! HTTP; tests swap in a deterministic stub.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

/// Viewports narrower than this (in px-equivalent units) count as mobile.
pub const MOBILE_BREAKPOINT_PX: u32 = 768;
/// Assumed width of one terminal cell in px-equivalent units.
pub const CELL_WIDTH_PX: u32 = 8;

/// Agent-string fragments that identify a handheld device (case-insensitive).
pub const MOBILE_SIGNATURES: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "termux",
];

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn is_narrow_columns(columns: u16) -> bool {
    u32::from(columns) * CELL_WIDTH_PX < MOBILE_BREAKPOINT_PX
}

pub fn matches_mobile_agent(agent: &str) -> bool {
    let agent = agent.to_lowercase();
    MOBILE_SIGNATURES.iter().any(|sig| agent.contains(sig))
}

#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    fn is_narrow_viewport(&self) -> bool;

    fn matches_mobile_signature(&self) -> bool;

    /// Try to load `url` as an image. Never errors; failure is `false`.
    async fn probe_image_loadable(&self, url: &str) -> bool;
}

#[derive(Debug)]
pub enum ProbeError {
    Network(String),
    Io(std::io::Error),
    Unsupported(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Network(msg) => write!(f, "network error: {msg}"),
            ProbeError::Io(e) => write!(f, "I/O error: {e}"),
            ProbeError::Unsupported(url) => write!(f, "unsupported image source: {url}"),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::Network(e.to_string())
    }
}

/// Fetches raw image bytes from HTTP(S), `file://` URLs or `/`-rooted paths.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    asset_root: Option<PathBuf>,
}

impl ImageLoader {
    pub fn new(asset_root: Option<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, asset_root }
    }

    /// Map a `/`-rooted or `file://` source to a path on disk.
    pub fn local_path(&self, source: &str) -> Option<PathBuf> {
        if let Some(path) = source.strip_prefix("file://") {
            return Some(PathBuf::from(path));
        }
        if !source.starts_with('/') {
            return None;
        }
        Some(match &self.asset_root {
            Some(root) => root.join(source.trim_start_matches('/')),
            None => PathBuf::from(source),
        })
    }

    pub async fn fetch(&self, source: &str) -> Result<Vec<u8>, ProbeError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self.client.get(source).send().await?.error_for_status()?;
            return Ok(response.bytes().await?.to_vec());
        }
        match self.local_path(source) {
            Some(path) => tokio::fs::read(&path).await.map_err(ProbeError::Io),
            None => Err(ProbeError::Unsupported(source.to_string())),
        }
    }

    /// True when `source` loads and its bytes carry a known image signature.
    pub async fn is_loadable(&self, source: &str) -> bool {
        match self.fetch(source).await {
            Ok(bytes) => {
                let recognised = image::guess_format(&bytes).is_ok();
                debug!("Probe {}: {} bytes, image={}", source, bytes.len(), recognised);
                recognised
            }
            Err(e) => {
                debug!("Probe {} failed: {}", source, e);
                false
            }
        }
    }
}

/// The real terminal environment.
pub struct HostEnvironment {
    columns: AtomicU16,
    agent: String,
    loader: ImageLoader,
}

impl HostEnvironment {
    pub fn new(columns: u16, agent_override: Option<String>, asset_root: Option<PathBuf>) -> Self {
        let agent = agent_override.unwrap_or_else(detect_agent);
        debug!("Host agent string: {:?}", agent);
        Self {
            columns: AtomicU16::new(columns),
            agent,
            loader: ImageLoader::new(asset_root),
        }
    }

    /// Record the new terminal width; called from the resize handler.
    pub fn set_columns(&self, columns: u16) {
        self.columns.store(columns, Ordering::Relaxed);
    }

    pub fn columns(&self) -> u16 {
        self.columns.load(Ordering::Relaxed)
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn asset_root(&self) -> Option<&Path> {
        self.loader.asset_root.as_deref()
    }
}

/// Best-effort agent string for a terminal session.
fn detect_agent() -> String {
    if let Ok(version) = std::env::var("TERMUX_VERSION") {
        return format!("Termux/{version}");
    }
    std::env::var("TERM_PROGRAM").unwrap_or_default()
}

#[async_trait]
impl EnvironmentProbe for HostEnvironment {
    fn is_narrow_viewport(&self) -> bool {
        is_narrow_columns(self.columns())
    }

    fn matches_mobile_signature(&self) -> bool {
        matches_mobile_agent(&self.agent)
    }

    async fn probe_image_loadable(&self, url: &str) -> bool {
        self.loader.is_loadable(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn narrow_breakpoint_is_96_columns() {
        assert!(is_narrow_columns(50));
        assert!(is_narrow_columns(95));
        assert!(!is_narrow_columns(96));
        assert!(!is_narrow_columns(200));
    }

    #[test]
    fn mobile_signatures_are_case_insensitive() {
        assert!(matches_mobile_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"));
        assert!(matches_mobile_agent("Termux/0.118"));
        assert!(matches_mobile_agent("OPERA MINI"));
        assert!(!matches_mobile_agent("iTerm.app"));
        assert!(!matches_mobile_agent(""));
    }

    #[test]
    fn local_path_respects_asset_root() {
        let loader = ImageLoader::new(Some(PathBuf::from("/srv/assets")));
        assert_eq!(
            loader.local_path("/avatars/me.png"),
            Some(PathBuf::from("/srv/assets/avatars/me.png"))
        );
        assert_eq!(loader.local_path("file:///tmp/x.png"), Some(PathBuf::from("/tmp/x.png")));
        assert_eq!(loader.local_path("me.png"), None);
    }

    #[test]
    fn host_environment_tracks_resizes() {
        let env = HostEnvironment::new(120, Some("xterm".into()), None);
        assert!(!env.is_narrow_viewport());
        env.set_columns(60);
        assert!(env.is_narrow_viewport());
        assert!(!env.matches_mobile_signature());
    }

    #[tokio::test]
    async fn disk_probe_accepts_images_and_rejects_other_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("ok.png");
        let text = dir.path().join("notes.png");
        std::fs::write(&image, PNG_MAGIC).unwrap();
        std::fs::write(&text, b"just some text").unwrap();

        let loader = ImageLoader::new(None);
        assert!(loader.is_loadable(image.to_str().unwrap()).await);
        assert!(!loader.is_loadable(text.to_str().unwrap()).await);
        assert!(!loader.is_loadable("/definitely/not/here.png").await);
        assert!(!loader.is_loadable("relative.png").await);
    }
}
