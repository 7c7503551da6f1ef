//! # TitleBar Component
//!
//! One-line status strip above the transcript.
//!
//! ```text
//! Palaver [desktop] | answering… | Upload failed: HTTP 500 | ↓ New
//! ```
//!
//! Segments after the name only appear when they have something to say.
//! A toast is colored by its [`NotificationKind`].

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::core::background::DeviceClass;
use crate::core::controller::{Notification, NotificationKind};
use crate::tui::component::Component;

const SEPARATOR: &str = " | ";

/// Props only; the bar keeps no state between frames.
pub struct TitleBar {
    pub device: DeviceClass,
    pub is_responding: bool,
    /// The toast currently on screen, if any.
    pub toast: Option<Notification>,
    /// Content exists below the scroll position.
    pub has_unseen_content: bool,
}

impl TitleBar {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            device,
            is_responding: false,
            toast: None,
            has_unseen_content: false,
        }
    }

    fn toast_style(kind: NotificationKind) -> Style {
        match kind {
            NotificationKind::Error => Style::default().fg(Color::Red),
            NotificationKind::Success => Style::default().fg(Color::Green),
            NotificationKind::Info => Style::default().fg(Color::Cyan),
        }
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::raw(format!("Palaver [{}]", self.device.label()))];

        if self.is_responding {
            spans.push(Span::raw(SEPARATOR));
            spans.push(Span::styled("answering…", Style::default().fg(Color::Yellow)));
        }
        if let Some(toast) = &self.toast {
            spans.push(Span::raw(SEPARATOR));
            spans.push(Span::styled(toast.message.clone(), Self::toast_style(toast.kind)));
        }
        if self.has_unseen_content {
            spans.push(Span::raw(SEPARATOR));
            spans.push(Span::raw("↓ New"));
        }

        frame.render_widget(Line::from(spans), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(bar: &mut TitleBar) -> (String, ratatui::buffer::Buffer) {
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).unwrap();
        terminal.draw(|f| bar.render(f, f.area())).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text = buffer.content().iter().map(|c| c.symbol()).collect();
        (text, buffer)
    }

    #[test]
    fn idle_bar_shows_only_name_and_device() {
        let (text, _) = rendered(&mut TitleBar::new(DeviceClass::Mobile));
        assert!(text.contains("Palaver [mobile]"));
        assert!(!text.contains('|'));
    }

    #[test]
    fn responding_and_unseen_segments() {
        let mut bar = TitleBar::new(DeviceClass::Desktop);
        bar.is_responding = true;
        bar.has_unseen_content = true;
        let (text, _) = rendered(&mut bar);
        assert!(text.contains("answering…"));
        assert!(text.contains("↓ New"));
    }

    #[test]
    fn error_toast_is_red() {
        let mut bar = TitleBar::new(DeviceClass::Desktop);
        bar.toast = Some(Notification::error("Message cannot be empty"));
        let (text, buffer) = rendered(&mut bar);
        assert!(text.contains("Message cannot be empty"));

        let start = text.find("Message").unwrap();
        // Everything before the toast is ASCII, so byte offset == column.
        assert_eq!(buffer[(start as u16, 0)].fg, Color::Red);
    }
}
