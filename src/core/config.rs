//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.palaver/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! Defaults are produced by plain factory functions (`AvatarConfig::default()`
//! and friends) and handed to the controller explicitly. Nothing here is a
//! process-wide static, so tests can build any configuration they like.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::core::attachment::TransferMethod;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PalaverConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub avatar: AvatarSection,
    #[serde(default)]
    pub background: BackgroundSection,
    #[serde(default)]
    pub vision: VisionSection,
    #[serde(default)]
    pub endpoint: EndpointSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Overrides the detected agent string used for mobile detection.
    pub agent: Option<String>,
    pub feedback_enabled: Option<bool>,
    pub hide_send_input: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AvatarSection {
    pub user_avatar: Option<String>,
    pub assistant_avatar: Option<String>,
    pub user_bg_color: Option<String>,
    pub assistant_bg_color: Option<String>,
    pub user_text: Option<String>,
    pub assistant_text: Option<String>,
    pub asset_root: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BackgroundSection {
    pub image_url: Option<String>,
    pub mobile_image_url: Option<String>,
    pub opacity: Option<f32>,
    pub blur: Option<u16>,
    pub size: Option<String>,
    pub position: Option<String>,
    pub fixed: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VisionSection {
    pub enabled: Option<bool>,
    pub number_limits: Option<usize>,
    pub transfer_methods: Option<Vec<TransferMethod>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub user: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_USER_AVATAR: &str = "/avatars/user-avatar.png";
pub const DEFAULT_ASSISTANT_AVATAR: &str = "/avatars/assistant-avatar.png";
pub const DEFAULT_USER_BG_COLOR: &str = "#9BBF00";
pub const DEFAULT_ASSISTANT_BG_COLOR: &str = "#FA9D3B";
pub const DEFAULT_USER_TEXT: &str = "用";
pub const DEFAULT_ASSISTANT_TEXT: &str = "A";

pub const DEFAULT_BACKGROUND_OPACITY: f32 = 0.03;
pub const DEFAULT_NUMBER_LIMITS: usize = 3;
pub const DEFAULT_USER: &str = "palaver-user";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

/// Avatar sources, colors and fallback glyphs for both roles.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarConfig {
    pub user_avatar: String,
    pub assistant_avatar: String,
    pub user_bg_color: String,
    pub assistant_bg_color: String,
    pub user_text: String,
    pub assistant_text: String,
    /// Directory that `/`-rooted avatar paths are resolved against on disk.
    pub asset_root: Option<PathBuf>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            user_avatar: DEFAULT_USER_AVATAR.to_string(),
            assistant_avatar: DEFAULT_ASSISTANT_AVATAR.to_string(),
            user_bg_color: DEFAULT_USER_BG_COLOR.to_string(),
            assistant_bg_color: DEFAULT_ASSISTANT_BG_COLOR.to_string(),
            user_text: DEFAULT_USER_TEXT.to_string(),
            assistant_text: DEFAULT_ASSISTANT_TEXT.to_string(),
            asset_root: None,
        }
    }
}

/// Backdrop image sources and how the image layer is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundConfig {
    pub image_url: Option<String>,
    pub mobile_image_url: Option<String>,
    pub opacity: f32,
    pub blur: u16,
    pub size: String,
    pub position: String,
    pub fixed: bool,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            image_url: None,
            mobile_image_url: None,
            opacity: DEFAULT_BACKGROUND_OPACITY,
            blur: 0,
            size: "cover".to_string(),
            position: "center".to_string(),
            fixed: true,
        }
    }
}

/// Image attachment settings for the compose box.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionSettings {
    pub enabled: bool,
    pub number_limits: usize,
    pub transfer_methods: Vec<TransferMethod>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            number_limits: DEFAULT_NUMBER_LIMITS,
            transfer_methods: vec![TransferMethod::LocalFile, TransferMethod::RemoteUrl],
        }
    }
}

impl VisionSettings {
    pub fn allows(&self, method: TransferMethod) -> bool {
        self.enabled && self.transfer_methods.contains(&method)
    }
}

/// Remote chat service used by the host to deliver messages and uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub agent: Option<String>,
    pub feedback_enabled: bool,
    pub hide_send_input: bool,
    pub avatar: AvatarConfig,
    pub background: BackgroundConfig,
    pub vision: VisionSettings,
    /// `None` runs in local-only mode: questions are shown but not delivered.
    pub endpoint: Option<EndpointConfig>,
}

/// Values supplied on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub background: Option<String>,
    pub mobile_background: Option<String>,
    pub user_avatar: Option<String>,
    pub assistant_avatar: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.palaver/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".palaver").join("config.toml"))
}

/// Load config from `~/.palaver/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PalaverConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PalaverConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(PalaverConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(PalaverConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: PalaverConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &PathBuf) {
    let default_content = r##"# Palaver Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# agent = "Termux"                  # Force mobile layout detection
# feedback_enabled = true
# hide_send_input = false

# [avatar]
# user_avatar = "/avatars/user-avatar.png"         # Or PALAVER_USER_AVATAR
# assistant_avatar = "https://example.com/bot.png" # Or PALAVER_ASSISTANT_AVATAR
# user_bg_color = "#9BBF00"
# assistant_bg_color = "#FA9D3B"
# user_text = "用"
# assistant_text = "A"
# asset_root = "/home/me/.palaver"  # Where /-rooted avatar paths live

# [background]
# image_url = "https://example.com/desk.png"       # Or PALAVER_BACKGROUND_IMAGE
# mobile_image_url = "https://example.com/phone.png"
# opacity = 0.03
# blur = 0
# size = "cover"
# position = "center"
# fixed = true

# [vision]
# enabled = true
# number_limits = 3
# transfer_methods = ["local_file", "remote_url"]

# [endpoint]
# base_url = "https://chat.example.com/v1"         # Or PALAVER_API_URL
# api_key = "app-..."                              # Or PALAVER_API_KEY
# user = "palaver-user"
"##;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &PalaverConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env<F>(config: &PalaverConfig, cli: &CliOverrides, env: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    // Empty env values count as unset, matching `VAR || default` semantics.
    let env = |key: &str| env(key).filter(|v| !v.is_empty());

    let defaults = AvatarConfig::default();
    let section = &config.avatar;
    let avatar = AvatarConfig {
        user_avatar: cli
            .user_avatar
            .clone()
            .or_else(|| env("PALAVER_USER_AVATAR"))
            .or_else(|| section.user_avatar.clone())
            .unwrap_or(defaults.user_avatar),
        assistant_avatar: cli
            .assistant_avatar
            .clone()
            .or_else(|| env("PALAVER_ASSISTANT_AVATAR"))
            .or_else(|| section.assistant_avatar.clone())
            .unwrap_or(defaults.assistant_avatar),
        user_bg_color: env("PALAVER_USER_BG_COLOR")
            .or_else(|| section.user_bg_color.clone())
            .unwrap_or(defaults.user_bg_color),
        assistant_bg_color: env("PALAVER_ASSISTANT_BG_COLOR")
            .or_else(|| section.assistant_bg_color.clone())
            .unwrap_or(defaults.assistant_bg_color),
        user_text: env("PALAVER_USER_TEXT")
            .or_else(|| section.user_text.clone())
            .unwrap_or(defaults.user_text),
        assistant_text: env("PALAVER_ASSISTANT_TEXT")
            .or_else(|| section.assistant_text.clone())
            .unwrap_or(defaults.assistant_text),
        asset_root: section.asset_root.as_ref().map(PathBuf::from),
    };

    let defaults = BackgroundConfig::default();
    let section = &config.background;
    let background = BackgroundConfig {
        image_url: cli
            .background
            .clone()
            .or_else(|| env("PALAVER_BACKGROUND_IMAGE"))
            .or_else(|| section.image_url.clone()),
        mobile_image_url: cli
            .mobile_background
            .clone()
            .or_else(|| env("PALAVER_MOBILE_BACKGROUND_IMAGE"))
            .or_else(|| section.mobile_image_url.clone()),
        opacity: section
            .opacity
            .map(|o| o.clamp(0.0, 1.0))
            .unwrap_or(defaults.opacity),
        blur: section.blur.unwrap_or(defaults.blur),
        size: section.size.clone().unwrap_or(defaults.size),
        position: section.position.clone().unwrap_or(defaults.position),
        fixed: section.fixed.unwrap_or(defaults.fixed),
    };

    let defaults = VisionSettings::default();
    let vision = VisionSettings {
        enabled: config.vision.enabled.unwrap_or(defaults.enabled),
        number_limits: config
            .vision
            .number_limits
            .unwrap_or(defaults.number_limits),
        transfer_methods: config
            .vision
            .transfer_methods
            .clone()
            .unwrap_or(defaults.transfer_methods),
    };

    // Endpoint URL: CLI → env → config; absent means local-only
    let endpoint = cli
        .api_url
        .clone()
        .or_else(|| env("PALAVER_API_URL"))
        .or_else(|| config.endpoint.base_url.clone())
        .map(|base_url| EndpointConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: env("PALAVER_API_KEY").or_else(|| config.endpoint.api_key.clone()),
            user: config
                .endpoint
                .user
                .clone()
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
        });

    ResolvedConfig {
        agent: config.general.agent.clone(),
        feedback_enabled: config.general.feedback_enabled.unwrap_or(true),
        hide_send_input: config.general.hide_send_input.unwrap_or(false),
        avatar,
        background,
        vision,
        endpoint,
    }
}
