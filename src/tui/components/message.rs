//! One transcript entry: a bordered bubble plus its avatar tile.
//!
//! ```text
//!          ╭ you ──────────────────╮ ┌──┐
//!          │ ▣ cat.png             │ │用│
//!          │ what is this?         │ └──┘
//!          ╰───────────────────────╯
//! ┌──┐ ╭ assistant ────────────╮
//! │A │ │ A cat.                │
//! └──┘ ╰───────────── ▲ liked ─╯
//! ```
//!
//! Questions sit on the right with the avatar trailing; answers sit on the
//! left with the avatar leading. The bubble takes a fixed share of the
//! list width, wider on mobile.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::avatar::AvatarView;
use crate::core::background::DeviceClass;
use crate::core::gallery::ImageRegistry;
use crate::core::transcript::{Feedback, Role, TranscriptEntry};
use crate::tui::components::avatar::{AVATAR_HEIGHT, AVATAR_WIDTH, AvatarTile};
use crate::tui::components::image_gallery::ImageGallery;
use crate::tui::markdown;

/// Borders (2) + horizontal padding (2).
const HORIZONTAL_OVERHEAD: u16 = 4;
const VERTICAL_OVERHEAD: u16 = 2;
/// Columns between avatar and bubble.
const GUTTER: u16 = 1;

/// Share of the list width a bubble may take.
pub fn bubble_percent(device: DeviceClass) -> u16 {
    match device {
        DeviceClass::Mobile => 85,
        DeviceClass::Desktop => 75,
    }
}

pub fn bubble_width(list_width: u16, device: DeviceClass) -> u16 {
    let share = (u32::from(list_width) * u32::from(bubble_percent(device)) / 100) as u16;
    share.min(list_width.saturating_sub(AVATAR_WIDTH + GUTTER))
}

pub struct MessageBubble<'a> {
    pub entry: &'a TranscriptEntry,
    pub avatar: &'a AvatarView,
    pub images: &'a ImageRegistry,
    pub device: DeviceClass,
    /// This is the last entry and the assistant is still answering.
    pub responding: bool,
    pub feedback_enabled: bool,
    pub spinner_frame: usize,
}

impl MessageBubble<'_> {
    fn body_color(&self) -> Color {
        match self.entry.role {
            Role::Question => Color::Green,
            Role::Answer => Color::Blue,
        }
    }

    fn body(&self) -> Text<'static> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        if self.entry.role == Role::Question {
            lines.extend(
                ImageGallery {
                    urls: &self.entry.images,
                    images: self.images,
                }
                .lines(),
            );
        }

        if self.entry.content.trim().is_empty() {
            if self.responding {
                lines.push(Line::styled("…", Style::default().fg(Color::DarkGray)));
            }
        } else {
            lines.extend(markdown::render(&self.entry.content, self.body_color()).lines);
        }
        Text::from(lines)
    }

    fn feedback_label(&self) -> Option<Line<'static>> {
        if !self.feedback_enabled {
            return None;
        }
        match self.entry.feedback? {
            Feedback::Like => Some(Line::styled(" ▲ liked ", Style::default().fg(Color::Green))),
            Feedback::Dislike => Some(Line::styled(" ▼ disliked ", Style::default().fg(Color::Red))),
        }
    }

    fn block(&self) -> Block<'static> {
        let (title, color) = match self.entry.role {
            Role::Question => (" you ", Color::Green),
            Role::Answer => (" assistant ", Color::Blue),
        };
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color).add_modifier(Modifier::DIM))
            .title(title)
            .padding(Padding::horizontal(1));
        if let Some(label) = self.feedback_label() {
            block = block.title_bottom(label.right_aligned());
        }
        block
    }

    /// Rows this entry occupies at `list_width`, without rendering.
    pub fn calculate_height(&self, list_width: u16) -> u16 {
        let width = bubble_width(list_width, self.device);
        let inner = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if inner == 0 {
            return AVATAR_HEIGHT;
        }
        let body = self.body();
        let rows = if body.lines.is_empty() {
            0
        } else {
            Paragraph::new(body).wrap(Wrap { trim: false }).line_count(inner) as u16
        };
        (rows + VERTICAL_OVERHEAD).max(AVATAR_HEIGHT)
    }

    /// (avatar, bubble) rectangles inside `area`.
    fn split(&self, area: Rect) -> (Rect, Rect) {
        let width = bubble_width(area.width, self.device);
        let avatar_height = AVATAR_HEIGHT.min(area.height);
        match self.entry.role {
            Role::Question => {
                let avatar_x = area.right().saturating_sub(AVATAR_WIDTH);
                let bubble_x = avatar_x.saturating_sub(GUTTER + width);
                (
                    Rect::new(avatar_x, area.y, AVATAR_WIDTH.min(area.width), avatar_height),
                    Rect::new(bubble_x, area.y, width, area.height),
                )
            }
            Role::Answer => (
                Rect::new(area.x, area.y, AVATAR_WIDTH.min(area.width), avatar_height),
                Rect::new(area.x + AVATAR_WIDTH + GUTTER, area.y, width, area.height),
            ),
        }
    }
}

impl Widget for MessageBubble<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (avatar_area, bubble_area) = self.split(area);
        let bubble_area = bubble_area.intersection(area);

        AvatarTile {
            view: self.avatar,
            responding: self.responding,
            spinner_frame: self.spinner_frame,
        }
        .render(avatar_area, buf);

        Paragraph::new(self.body())
            .wrap(Wrap { trim: false })
            .block(self.block())
            .render(bubble_area, buf);
    }
}
