//! Markdown bodies as ratatui `Text`.
//!
//! `pulldown_cmark` drives a small renderer that keeps a stack of open
//! containers (quotes, lists, fenced code) and an inline style stack.
//! Fenced code with a known language is highlighted with `syntect`.
//! Images cannot be drawn in a cell grid, so they render as `▣ alt` markers.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME: LazyLock<Option<Theme>> = LazyLock::new(|| {
    ThemeSet::load_defaults()
        .themes
        .remove("base16-ocean.dark")
});

const TAB: &str = "    ";
pub const IMAGE_MARKER: &str = "▣";

fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn link_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)
}

/// Render a message body. `fg` is the bubble's text color.
pub fn render(content: &str, fg: Color) -> Text<'static> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(fg);
    for event in Parser::new_ext(content, options) {
        renderer.event(event);
    }
    Text::from(renderer.lines)
}

enum Container {
    Quote,
    /// `None` for bullets, otherwise the next ordinal.
    List(Option<u64>),
    Code(Option<HighlightLines<'static>>),
}

struct Renderer {
    lines: Vec<Line<'static>>,
    fg: Color,
    inline: Vec<Style>,
    containers: Vec<Container>,
    /// Destination of the open link or image.
    target: Option<String>,
    /// Set while inside an image; true once alt text was seen.
    image_alt: Option<bool>,
    pending_gap: bool,
}

impl Renderer {
    fn new(fg: Color) -> Self {
        Self {
            lines: Vec::new(),
            fg,
            inline: Vec::new(),
            containers: Vec::new(),
            target: None,
            image_alt: None,
            pending_gap: false,
        }
    }

    fn style(&self) -> Style {
        self.inline
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.fg))
    }

    fn push_inline(&mut self, overlay: Style) {
        let next = self.style().patch(overlay);
        self.inline.push(next);
    }

    /// Gutter spans for the open quotes and code fences.
    fn gutter(&self) -> Vec<Span<'static>> {
        self.containers
            .iter()
            .filter_map(|c| match c {
                Container::Quote | Container::Code(_) => Some(Span::styled("│ ", muted())),
                Container::List(_) => None,
            })
            .collect()
    }

    fn new_line(&mut self, spans: Vec<Span<'static>>) {
        let mut all = self.gutter();
        all.extend(spans);
        self.lines.push(Line::from(all));
    }

    fn append(&mut self, span: Span<'static>) {
        match self.lines.last_mut() {
            Some(line) => line.push_span(span),
            None => self.new_line(vec![span]),
        }
    }

    fn start_block(&mut self) {
        if self.pending_gap {
            self.new_line(Vec::new());
            self.pending_gap = false;
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let style = Style::default().fg(Color::White).bg(Color::DarkGray);
                self.append(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => self.append(Span::raw(" ")),
            Event::HardBreak => self.new_line(Vec::new()),
            Event::Rule => {
                self.start_block();
                self.new_line(vec![Span::styled("─".repeat(32), muted())]);
                self.pending_gap = true;
            }
            Event::TaskListMarker(done) => {
                self.append(Span::raw(if done { "☑ " } else { "☐ " }));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.start_block();
                // Inside a list item the bullet line already exists.
                if !matches!(self.containers.last(), Some(Container::List(_)))
                    || self.lines.is_empty()
                {
                    self.new_line(Vec::new());
                }
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                let style = heading(self.fg, level);
                self.new_line(vec![Span::styled(format!("{} ", "#".repeat(level as usize)), style)]);
                self.inline.push(style);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.containers.push(Container::Quote);
                self.push_inline(Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                let lang = match &kind {
                    CodeBlockKind::Fenced(lang) => lang.split_whitespace().next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };
                let mut header = vec![Span::styled("╭─", muted())];
                if !lang.is_empty() {
                    header.push(Span::styled(
                        format!(" {lang} "),
                        muted().add_modifier(Modifier::BOLD),
                    ));
                }
                self.new_line(header);
                let highlighter = SYNTAXES
                    .find_syntax_by_token(lang)
                    .filter(|_| !lang.is_empty())
                    .zip(THEME.as_ref())
                    .map(|(syntax, theme)| HighlightLines::new(syntax, theme));
                self.containers.push(Container::Code(highlighter));
            }
            Tag::List(start) => {
                if !self.containers.iter().any(|c| matches!(c, Container::List(_))) {
                    self.start_block();
                }
                self.containers.push(Container::List(start));
            }
            Tag::Item => {
                let depth = self
                    .containers
                    .iter()
                    .filter(|c| matches!(c, Container::List(_)))
                    .count()
                    .saturating_sub(1);
                let bullet = match self.containers.last_mut() {
                    Some(Container::List(Some(n))) => {
                        let label = format!("{n}. ");
                        *n += 1;
                        label
                    }
                    _ => "• ".to_string(),
                };
                self.pending_gap = false;
                self.new_line(vec![Span::styled(format!("{}{bullet}", "  ".repeat(depth)), muted())]);
            }
            Tag::Emphasis => self.push_inline(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_inline(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_inline(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.target = Some(dest_url.into_string());
                self.push_inline(link_style());
            }
            Tag::Image { dest_url, .. } => {
                self.target = Some(dest_url.into_string());
                self.image_alt = Some(false);
                self.append(Span::styled(format!("{IMAGE_MARKER} "), Style::default().fg(Color::Magenta)));
                self.push_inline(Style::default().fg(Color::Magenta));
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.pending_gap = true,
            TagEnd::Heading(_) => {
                self.inline.pop();
                self.pending_gap = true;
            }
            TagEnd::BlockQuote(_) => {
                self.inline.pop();
                self.containers.pop();
                self.pending_gap = true;
            }
            TagEnd::CodeBlock => {
                self.containers.pop();
                self.new_line(vec![Span::styled("╰─", muted())]);
                self.pending_gap = true;
            }
            TagEnd::List(_) => {
                self.containers.pop();
                self.pending_gap = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.inline.pop();
            }
            TagEnd::Link => {
                self.inline.pop();
                if let Some(url) = self.target.take() {
                    self.append(Span::styled(format!(" <{url}>"), muted()));
                }
            }
            TagEnd::Image => {
                self.inline.pop();
                let url = self.target.take();
                // An empty alt falls back to the URL.
                if self.image_alt.take() == Some(false)
                    && let Some(url) = url
                {
                    self.append(Span::styled(url, Style::default().fg(Color::Magenta)));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.replace('\t', TAB);

        if let Some(Container::Code(highlighter)) = self.containers.last_mut() {
            let mut rows = Vec::new();
            match highlighter {
                Some(h) => {
                    for line in LinesWithEndings::from(&text) {
                        let spans = match h.highlight_line(line, &SYNTAXES) {
                            Ok(ranges) => ranges
                                .into_iter()
                                .map(|(style, piece)| {
                                    let fg = style.foreground;
                                    Span::styled(
                                        piece.trim_end_matches('\n').to_string(),
                                        Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                                    )
                                })
                                .filter(|s| !s.content.is_empty())
                                .collect(),
                            Err(_) => vec![Span::raw(line.trim_end_matches('\n').to_string())],
                        };
                        rows.push(spans);
                    }
                }
                None => {
                    for line in text.lines() {
                        rows.push(vec![Span::styled(line.to_string(), Style::default().fg(Color::White))]);
                    }
                }
            }
            for spans in rows {
                self.new_line(spans);
            }
            return;
        }

        if let Some(seen) = self.image_alt.as_mut() {
            *seen = true;
        }
        let style = self.style();
        self.append(Span::styled(text, style));
    }
}

fn heading(fg: Color, level: HeadingLevel) -> Style {
    let base = Style::default().fg(fg).add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base,
        _ => base.add_modifier(Modifier::ITALIC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        let text = render("first\n\nsecond", Color::White);
        assert_eq!(plain(&text), vec!["first", "", "second"]);
    }

    #[test]
    fn heading_body_inherits_heading_style() {
        let text = render("## Title", Color::Blue);
        let line = &text.lines[0];
        assert_eq!(line.spans[0].content, "## ");
        assert_eq!(line.spans[1].content, "Title");
        assert_eq!(line.spans[1].style.fg, Some(Color::Blue));
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn nested_emphasis_composes() {
        let text = render("***both***", Color::White);
        let span = text.lines[0].spans.iter().find(|s| s.content == "both").unwrap();
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
        assert!(span.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn ordered_and_bullet_lists() {
        let text = render("1. one\n2. two\n\n- a\n- b", Color::White);
        let lines = plain(&text);
        assert!(lines.contains(&"1. one".to_string()));
        assert!(lines.contains(&"2. two".to_string()));
        assert!(lines.contains(&"• a".to_string()));
    }

    #[test]
    fn code_fence_gets_frame_and_gutter() {
        let text = render("```\nlet x = 1;\n```", Color::White);
        let lines = plain(&text);
        assert_eq!(lines.first().map(String::as_str), Some("╭─"));
        assert!(lines.contains(&"│ let x = 1;".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("╰─"));
    }

    #[test]
    fn highlighted_code_uses_rgb_colors() {
        let text = render("```rust\nfn main() {}\n```", Color::White);
        let code = &text.lines[1];
        assert!(code.spans.iter().any(|s| matches!(s.style.fg, Some(Color::Rgb(..)))));
    }

    #[test]
    fn quote_lines_carry_a_gutter() {
        let text = render("> quoted", Color::White);
        assert_eq!(plain(&text), vec!["│ quoted"]);
    }

    #[test]
    fn links_show_their_destination() {
        let text = render("[docs](https://example.com)", Color::White);
        assert_eq!(plain(&text), vec!["docs <https://example.com>"]);
    }

    #[test]
    fn images_become_markers() {
        let text = render("![a cat](https://x/cat.png)", Color::White);
        assert_eq!(plain(&text), vec!["▣ a cat"]);
        let text = render("![](https://x/cat.png)", Color::White);
        assert_eq!(plain(&text), vec!["▣ https://x/cat.png"]);
    }

    #[test]
    fn tabs_expand() {
        let text = render("```\n\tindented\n```", Color::White);
        assert!(plain(&text).contains(&"│     indented".to_string()));
    }
}
