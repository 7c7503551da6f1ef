//! Gallery rows shown above a question's body.
//!
//! A single "Loading…" row stands in until every image has settled; then
//! each image gets its own row. The row count change is what makes the
//! transcript re-scroll when a gallery settles.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::core::gallery::{ImageRegistry, ImageStatus};
use crate::tui::markdown::IMAGE_MARKER;

pub struct ImageGallery<'a> {
    pub urls: &'a [String],
    pub images: &'a ImageRegistry,
}

fn file_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

impl ImageGallery<'_> {
    pub fn lines(&self) -> Vec<Line<'static>> {
        if self.urls.is_empty() {
            return Vec::new();
        }
        if !self.images.all_settled(self.urls) {
            return vec![Line::from(Span::styled(
                format!("{IMAGE_MARKER} Loading…"),
                Style::default().fg(Color::DarkGray),
            ))];
        }
        self.urls
            .iter()
            .map(|url| match self.images.status(url) {
                Some(ImageStatus::Failed) => Line::from(Span::styled(
                    format!("✗ {}", file_name(url)),
                    Style::default().fg(Color::Red),
                )),
                _ => Line::from(Span::styled(
                    format!("{IMAGE_MARKER} {}", file_name(url)),
                    Style::default().fg(Color::Magenta),
                )),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn loading_placeholder_until_all_settle() {
        let urls = vec!["https://x/a.png".to_string(), "https://x/b.png".to_string()];
        let mut images = ImageRegistry::new();
        images.request(&urls[0]);
        images.request(&urls[1]);
        images.settle(&urls[0], true);

        let gallery = ImageGallery {
            urls: &urls,
            images: &images,
        };
        assert_eq!(texts(&gallery.lines()), vec!["▣ Loading…"]);

        images.settle(&urls[1], false);
        let gallery = ImageGallery {
            urls: &urls,
            images: &images,
        };
        assert_eq!(texts(&gallery.lines()), vec!["▣ a.png", "✗ b.png"]);
    }

    #[test]
    fn no_images_no_rows() {
        let images = ImageRegistry::new();
        let gallery = ImageGallery {
            urls: &[],
            images: &images,
        };
        assert!(gallery.lines().is_empty());
    }
}
