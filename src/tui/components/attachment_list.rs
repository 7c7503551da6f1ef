//! Pending attachments, one chip per file, between transcript and input.
//!
//! ```text
//! [1 ▣ cat.png 45%] [2 ▣ dog.png ✓] [3 ✗ x.png]   ^X remove · ^T retry
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::core::attachment::{AttachmentDescriptor, Progress};
use crate::tui::component::Component;
use crate::tui::markdown::IMAGE_MARKER;

pub struct AttachmentList<'a> {
    pub files: &'a [AttachmentDescriptor],
    /// Below the configured limit, so more images may be pasted.
    pub can_add: bool,
}

impl AttachmentList<'_> {
    /// One row when there is anything to show, otherwise nothing.
    pub fn height(&self) -> u16 {
        u16::from(!self.files.is_empty())
    }

    fn chip(index: usize, file: &AttachmentDescriptor) -> Span<'static> {
        let name = file.display_name();
        match file.progress {
            Progress::Pending(p) => Span::styled(
                format!("[{} {IMAGE_MARKER} {name} {p}%]", index + 1),
                Style::default().fg(Color::Yellow),
            ),
            Progress::Complete => Span::styled(
                format!("[{} {IMAGE_MARKER} {name} ✓]", index + 1),
                Style::default().fg(Color::Green),
            ),
            Progress::Failed => Span::styled(
                format!("[{} ✗ {name}]", index + 1),
                Style::default().fg(Color::Red),
            ),
        }
    }

    pub fn line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, file) in self.files.iter().enumerate() {
            spans.push(Self::chip(i, file));
            spans.push(Span::raw(" "));
        }

        let mut hints = vec!["^X remove"];
        if self.files.iter().any(|f| f.progress.is_failed()) {
            hints.push("^T retry");
        }
        if !self.can_add {
            hints.push("limit reached");
        }
        spans.push(Span::styled(
            format!("  {}", hints.join(" · ")),
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    }
}

impl Component for AttachmentList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        if self.files.is_empty() {
            return;
        }
        frame.render_widget(self.line(), area);
    }
}
