//! # Avatar Resolution
//!
//! Picks an image source or a one-character fallback glyph for each role.
//!
//! Resolution is a pure function of role, optional overrides and the
//! [`AvatarConfig`]; it never fails. A source that is not an absolute URL
//! or `/`-rooted path is discarded and the glyph is used instead.
//!
//! Load failures happen later, at display time. They are tracked in
//! [`AvatarView::load_failed`], which the widget consults to draw the glyph
//! in place of the image.

use crate::core::config::AvatarConfig;
use crate::core::transcript::Role;

/// Which side of the conversation an avatar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarRole {
    User,
    Assistant,
}

impl From<Role> for AvatarRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Question => AvatarRole::User,
            Role::Answer => AvatarRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarResolution {
    /// Image to show, or `None` when only the glyph is usable.
    pub source: Option<String>,
    /// Tile color, as configured (usually `#RRGGBB`).
    pub color: String,
    pub glyph: String,
}

/// Whether a source can be loaded at all: absolute URL or `/`-rooted path.
pub fn is_valid_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.starts_with('/')
}

pub fn resolve(
    role: AvatarRole,
    override_source: Option<&str>,
    override_color: Option<&str>,
    config: &AvatarConfig,
) -> AvatarResolution {
    let (configured_source, configured_color, glyph) = match role {
        AvatarRole::User => (&config.user_avatar, &config.user_bg_color, &config.user_text),
        AvatarRole::Assistant => (
            &config.assistant_avatar,
            &config.assistant_bg_color,
            &config.assistant_text,
        ),
    };

    let source = override_source
        .filter(|s| !s.is_empty())
        .unwrap_or(configured_source.as_str());
    let color = override_color
        .filter(|c| !c.is_empty())
        .unwrap_or(configured_color.as_str());

    AvatarResolution {
        source: is_valid_source(source).then(|| source.to_string()),
        color: color.to_string(),
        glyph: glyph.clone(),
    }
}

/// Display state for one rendered avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarView {
    pub resolution: AvatarResolution,
    pub load_failed: bool,
}

impl AvatarView {
    pub fn new(resolution: AvatarResolution) -> Self {
        Self {
            resolution,
            load_failed: false,
        }
    }

    pub fn mark_load_failed(&mut self) {
        self.load_failed = true;
    }

    /// The image to draw, if any survives validation and loading.
    pub fn image(&self) -> Option<&str> {
        if self.load_failed {
            None
        } else {
            self.resolution.source.as_deref()
        }
    }

    pub fn shows_glyph(&self) -> bool {
        self.image().is_none()
    }
}
