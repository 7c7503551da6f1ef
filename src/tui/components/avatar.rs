//! Avatar tile: a colored two-row block beside each bubble.
//!
//! The top row shows `▣` when an image source survived resolution and
//! loading, otherwise the role glyph. The bottom row carries the responding
//! spinner for the last answer.

use std::str::FromStr;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Widget;

use crate::core::avatar::AvatarView;

pub const AVATAR_WIDTH: u16 = 4;
pub const AVATAR_HEIGHT: u16 = 2;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Parse a configured tile color. Unparseable values fall back to gray.
pub fn tile_color(configured: &str) -> Color {
    Color::from_str(configured.trim()).unwrap_or(Color::Gray)
}

pub fn spinner_glyph(frame: usize) -> &'static str {
    SPINNER[frame % SPINNER.len()]
}

pub struct AvatarTile<'a> {
    pub view: &'a AvatarView,
    pub responding: bool,
    pub spinner_frame: usize,
}

impl AvatarTile<'_> {
    fn face(&self) -> &str {
        if self.view.shows_glyph() {
            &self.view.resolution.glyph
        } else {
            "▣"
        }
    }
}

impl Widget for AvatarTile<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let tile = Style::default()
            .bg(tile_color(&self.view.resolution.color))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD);

        let top = Rect { height: 1, ..area };
        buf.set_style(top, tile);
        Line::from(self.face()).centered().style(tile).render(top, buf);

        if self.responding && area.height > 1 {
            let below = Rect {
                y: area.y + 1,
                height: 1,
                ..area
            };
            Line::from(spinner_glyph(self.spinner_frame))
                .centered()
                .style(Style::default().fg(Color::Yellow))
                .render(below, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::avatar::{AvatarRole, resolve};
    use crate::core::config::AvatarConfig;

    fn draw(tile: AvatarTile<'_>) -> Buffer {
        let area = Rect::new(0, 0, AVATAR_WIDTH, AVATAR_HEIGHT);
        let mut buf = Buffer::empty(area);
        tile.render(area, &mut buf);
        buf
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(tile_color("#9BBF00"), Color::Rgb(0x9b, 0xbf, 0x00));
        assert_eq!(tile_color("not a color"), Color::Gray);
    }

    #[test]
    fn loaded_image_shows_marker_and_failure_shows_glyph() {
        let mut view = AvatarView::new(resolve(AvatarRole::Assistant, None, None, &AvatarConfig::default()));
        let buf = draw(AvatarTile {
            view: &view,
            responding: false,
            spinner_frame: 0,
        });
        assert!(row(&buf, 0).contains('▣'));
        assert_eq!(buf[(0, 0)].bg, Color::Rgb(0xfa, 0x9d, 0x3b));

        view.mark_load_failed();
        let buf = draw(AvatarTile {
            view: &view,
            responding: false,
            spinner_frame: 0,
        });
        assert!(row(&buf, 0).contains('A'));
    }

    #[test]
    fn spinner_only_while_responding() {
        let view = AvatarView::new(resolve(AvatarRole::Assistant, None, None, &AvatarConfig::default()));
        let idle = draw(AvatarTile {
            view: &view,
            responding: false,
            spinner_frame: 0,
        });
        assert_eq!(row(&idle, 1).trim(), "");

        let busy = draw(AvatarTile {
            view: &view,
            responding: true,
            spinner_frame: 1,
        });
        assert!(row(&busy, 1).contains("⠙"));
    }
}
