//! # Backdrop Resolution
//!
//! Decides what sits behind the transcript: a device-appropriate image, or
//! a fixed gradient when no image is usable.
//!
//! ```text
//!   new() ── Desktop, candidate = desktop url, available = false
//!     │
//!   mount() / on_resize() ── classify device ── re-point candidate
//!     │                                              │
//!     │                  candidate changed (or first mount)
//!     │                                              ▼
//!     │                             Some(ProbeRequest { url })  ──► host probes
//!     │                                                              │
//!   apply_probe(url, ok) ◄───────────────────────────────────────────┘
//!     │   ignored unless url == current candidate
//!     ▼
//!   style() ── Image layer if available, Gradient otherwise
//! ```
//!
//! Probing never blocks: until a probe answers, the backdrop renders with
//! the availability currently known for the candidate.

use log::debug;

use crate::core::config::BackgroundConfig;
use crate::core::environment::EnvironmentProbe;

/// Two-stop diagonal fallback, drawn at full opacity.
pub const GRADIENT_FROM: (u8, u8, u8) = (0xf5, 0xf7, 0xfa);
pub const GRADIENT_TO: (u8, u8, u8) = (0xe4, 0xed, 0xf7);
pub const GRADIENT_ANGLE_DEG: u16 = 135;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub url: String,
    pub size: String,
    pub position: String,
    pub repeat: bool,
    /// Stays put while the transcript scrolls.
    pub fixed: bool,
    pub opacity: f32,
    /// Blur radius; only present when greater than zero.
    pub blur: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientLayer {
    pub from: (u8, u8, u8),
    pub to: (u8, u8, u8),
    pub angle_deg: u16,
    pub opacity: f32,
}

impl Default for GradientLayer {
    fn default() -> Self {
        Self {
            from: GRADIENT_FROM,
            to: GRADIENT_TO,
            angle_deg: GRADIENT_ANGLE_DEG,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundStyle {
    Image(ImageLayer),
    Gradient(GradientLayer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundResolution {
    pub device: DeviceClass,
    pub candidate: Option<String>,
    pub available: bool,
    pub style: BackgroundStyle,
}

/// A probe the host must run and report back through `apply_probe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
}

pub struct BackgroundResolver {
    config: BackgroundConfig,
    device: DeviceClass,
    candidate: Option<String>,
    available: bool,
    mounted: bool,
}

impl BackgroundResolver {
    pub fn new(config: BackgroundConfig) -> Self {
        let candidate = non_empty(config.image_url.clone());
        Self {
            config,
            device: DeviceClass::Desktop,
            candidate,
            available: false,
            mounted: false,
        }
    }

    /// Subscribe to resizes and run the first detection + probe.
    pub fn mount(&mut self, env: &dyn EnvironmentProbe) -> Option<ProbeRequest> {
        self.mounted = true;
        self.detect(env);
        self.request_probe()
    }

    /// Drop the resize subscription. Later resizes and probes are ignored.
    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn on_resize(&mut self, env: &dyn EnvironmentProbe) -> Option<ProbeRequest> {
        if !self.mounted {
            return None;
        }
        let previous = self.candidate.clone();
        self.detect(env);
        if self.candidate == previous {
            return None;
        }
        self.request_probe()
    }

    /// Replace the configured URLs (prop change) and re-run detection.
    pub fn set_urls(
        &mut self,
        image_url: Option<String>,
        mobile_image_url: Option<String>,
        env: &dyn EnvironmentProbe,
    ) -> Option<ProbeRequest> {
        self.config.image_url = image_url;
        self.config.mobile_image_url = mobile_image_url;
        if !self.mounted {
            self.candidate = non_empty(self.config.image_url.clone());
            return None;
        }
        let previous = self.candidate.clone();
        self.detect(env);
        if self.candidate == previous {
            return None;
        }
        self.request_probe()
    }

    /// Commit a probe result. Returns whether it was applied.
    pub fn apply_probe(&mut self, url: &str, available: bool) -> bool {
        if !self.mounted || self.candidate.as_deref() != Some(url) {
            debug!("Dropping stale backdrop probe for {}", url);
            return false;
        }
        self.available = available;
        true
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn style(&self) -> BackgroundStyle {
        match (&self.candidate, self.available) {
            (Some(url), true) => BackgroundStyle::Image(ImageLayer {
                url: url.clone(),
                size: self.config.size.clone(),
                position: self.config.position.clone(),
                repeat: false,
                fixed: self.config.fixed,
                opacity: self.config.opacity,
                blur: (self.config.blur > 0).then_some(self.config.blur),
            }),
            _ => BackgroundStyle::Gradient(GradientLayer::default()),
        }
    }

    pub fn resolution(&self) -> BackgroundResolution {
        BackgroundResolution {
            device: self.device,
            candidate: self.candidate.clone(),
            available: self.available,
            style: self.style(),
        }
    }

    fn detect(&mut self, env: &dyn EnvironmentProbe) {
        let mobile = env.matches_mobile_signature() || env.is_narrow_viewport();
        self.device = if mobile {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        };

        let mobile_url = non_empty(self.config.mobile_image_url.clone());
        let next = match (mobile, mobile_url) {
            (true, Some(url)) => Some(url),
            _ => non_empty(self.config.image_url.clone()),
        };
        if next != self.candidate {
            debug!(
                "Backdrop candidate {:?} -> {:?} ({})",
                self.candidate,
                next,
                self.device.label()
            );
            self.candidate = next;
            // Nothing is known about the new candidate until its probe answers.
            self.available = false;
        }
    }

    fn request_probe(&mut self) -> Option<ProbeRequest> {
        match &self.candidate {
            Some(url) => Some(ProbeRequest { url: url.clone() }),
            None => {
                self.available = false;
                None
            }
        }
    }
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubEnvironment;

    fn config(desktop: Option<&str>, mobile: Option<&str>) -> BackgroundConfig {
        BackgroundConfig {
            image_url: desktop.map(String::from),
            mobile_image_url: mobile.map(String::from),
            ..BackgroundConfig::default()
        }
    }

    #[test]
    fn init_state_is_desktop_and_unavailable() {
        let resolver = BackgroundResolver::new(config(Some("https://x/d.png"), None));
        assert_eq!(resolver.device(), DeviceClass::Desktop);
        assert_eq!(resolver.candidate(), Some("https://x/d.png"));
        assert!(!resolver.is_available());
        assert!(matches!(resolver.style(), BackgroundStyle::Gradient(_)));
    }

    #[test]
    fn narrow_viewport_without_mobile_url_keeps_desktop_url() {
        let env = StubEnvironment::with_columns(50);
        let mut resolver = BackgroundResolver::new(config(Some("https://x/d.png"), None));

        let probe = resolver.mount(&env);
        assert_eq!(resolver.device(), DeviceClass::Mobile);
        assert_eq!(probe, Some(ProbeRequest { url: "https://x/d.png".into() }));

        assert!(resolver.apply_probe("https://x/d.png", false));
        match resolver.style() {
            BackgroundStyle::Gradient(g) => {
                assert_eq!(g.opacity, 1.0);
                assert_eq!(g.from, GRADIENT_FROM);
                assert_eq!(g.to, GRADIENT_TO);
            }
            other => panic!("expected gradient, got {other:?}"),
        }
    }

    #[test]
    fn mobile_agent_selects_mobile_url() {
        let env = StubEnvironment::with_columns(200).agent("Android 14");
        let mut resolver =
            BackgroundResolver::new(config(Some("https://x/d.png"), Some("https://x/m.png")));
        let probe = resolver.mount(&env);
        assert_eq!(probe, Some(ProbeRequest { url: "https://x/m.png".into() }));
    }

    #[test]
    fn available_image_builds_layer_with_defaults() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver = BackgroundResolver::new(config(Some("https://x/d.png"), None));
        resolver.mount(&env);
        resolver.apply_probe("https://x/d.png", true);

        match resolver.style() {
            BackgroundStyle::Image(layer) => {
                assert_eq!(layer.url, "https://x/d.png");
                assert_eq!(layer.opacity, 0.03);
                assert_eq!(layer.size, "cover");
                assert_eq!(layer.position, "center");
                assert!(!layer.repeat);
                assert!(layer.fixed);
                assert_eq!(layer.blur, None);
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn resolution_reflects_device_and_availability() {
        let env = StubEnvironment::with_columns(50);
        let mut resolver =
            BackgroundResolver::new(config(Some("https://x/d.png"), Some("https://x/m.png")));
        resolver.mount(&env);
        resolver.apply_probe("https://x/m.png", true);

        let resolution = resolver.resolution();
        assert_eq!(resolution.device, DeviceClass::Mobile);
        assert_eq!(resolution.candidate.as_deref(), Some("https://x/m.png"));
        assert!(resolution.available);
        assert_eq!(resolution.style, resolver.style());
    }

    #[test]
    fn blur_only_applies_when_positive() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver = BackgroundResolver::new(BackgroundConfig {
            blur: 4,
            ..config(Some("https://x/d.png"), None)
        });
        resolver.mount(&env);
        resolver.apply_probe("https://x/d.png", true);
        assert!(matches!(resolver.style(), BackgroundStyle::Image(ImageLayer { blur: Some(4), .. })));
    }

    #[test]
    fn no_urls_never_probe() {
        let env = StubEnvironment::with_columns(50);
        let mut resolver = BackgroundResolver::new(config(None, None));
        assert_eq!(resolver.mount(&env), None);
        assert!(!resolver.is_available());
        assert!(matches!(resolver.style(), BackgroundStyle::Gradient(_)));
    }

    #[test]
    fn empty_url_counts_as_missing() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver = BackgroundResolver::new(config(Some("  "), None));
        assert_eq!(resolver.mount(&env), None);
    }

    #[test]
    fn stale_probe_does_not_overwrite_new_candidate() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver =
            BackgroundResolver::new(config(Some("https://x/d.png"), Some("https://x/m.png")));
        resolver.mount(&env);

        // Shrink to mobile before the desktop probe answers.
        env.set_columns(40);
        let probe = resolver.on_resize(&env);
        assert_eq!(probe, Some(ProbeRequest { url: "https://x/m.png".into() }));

        assert!(!resolver.apply_probe("https://x/d.png", true));
        assert!(!resolver.is_available());

        assert!(resolver.apply_probe("https://x/m.png", true));
        assert!(resolver.is_available());
    }

    #[test]
    fn resize_within_same_class_does_not_reprobe() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver = BackgroundResolver::new(config(Some("https://x/d.png"), None));
        resolver.mount(&env);
        resolver.apply_probe("https://x/d.png", true);

        env.set_columns(150);
        assert_eq!(resolver.on_resize(&env), None);
        assert!(resolver.is_available());
    }

    #[test]
    fn unmount_ignores_resizes_and_probes() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver =
            BackgroundResolver::new(config(Some("https://x/d.png"), Some("https://x/m.png")));
        resolver.mount(&env);
        resolver.unmount();

        env.set_columns(40);
        assert_eq!(resolver.on_resize(&env), None);
        assert_eq!(resolver.device(), DeviceClass::Desktop);
        assert!(!resolver.apply_probe("https://x/d.png", true));
    }

    #[tokio::test]
    async fn probe_round_trip_through_environment() {
        let env = StubEnvironment::with_columns(200).loadable("https://x/d.png");
        let mut resolver = BackgroundResolver::new(config(Some("https://x/d.png"), None));
        let probe = resolver.mount(&env).unwrap();

        let available = env.probe_image_loadable(&probe.url).await;
        assert!(resolver.apply_probe(&probe.url, available));
        assert!(matches!(resolver.style(), BackgroundStyle::Image(_)));
    }

    #[test]
    fn url_prop_change_reprobes() {
        let env = StubEnvironment::with_columns(200);
        let mut resolver = BackgroundResolver::new(config(None, None));
        resolver.mount(&env);
        let probe = resolver.set_urls(Some("https://x/new.png".into()), None, &env);
        assert_eq!(probe, Some(ProbeRequest { url: "https://x/new.png".into() }));
    }
}
