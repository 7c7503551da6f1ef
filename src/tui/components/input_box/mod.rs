//! # InputBox Component
//!
//! The compose box. Owns the editing buffer and caret; the controller owns
//! the authoritative query and is told about every edit through
//! [`InputEvent::ContentChanged`].
//!
//! Enter never reaches this component directly. The run loop routes
//! `KeyDown`/`KeyUp` through the controller and calls [`InputBox::insert_str`]
//! when the controller leaves a Shift+Enter to default handling, or
//! [`InputBox::set_text`] when the controller rewrote the query.

mod layout;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{
    Block, BorderType, Padding, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

use layout::{MAX_VISIBLE_ROWS, Row, TEXT_INSET, VERTICAL_OVERHEAD};

pub const INPUT_HINT: &str = "Enter send · Shift+Enter newline";

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The buffer text changed.
    ContentChanged,
    /// Only the caret moved.
    CaretMoved,
}

pub struct InputBox {
    buffer: String,
    /// Byte offset into `buffer`, always on a char boundary.
    caret: usize,
    /// First visible row when the content outgrows the box.
    scroll: u16,
    /// Area width from the last render, used for vertical caret moves.
    last_width: u16,
    /// Prop: the assistant is answering.
    pub responding: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    const DEFAULT_WIDTH: u16 = 80;

    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            caret: 0,
            scroll: 0,
            last_width: Self::DEFAULT_WIDTH,
            responding: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Replace the buffer. The caret is kept while it still points inside
    /// the new text, otherwise it moves to the end.
    pub fn set_text(&mut self, text: &str) {
        if self.buffer == text {
            return;
        }
        self.buffer = text.to_string();
        if self.caret > self.buffer.len() || !self.buffer.is_char_boundary(self.caret) {
            self.caret = self.buffer.len();
        }
        if self.buffer.is_empty() {
            self.scroll = 0;
        }
    }

    pub fn insert_str(&mut self, text: &str) {
        self.buffer.insert_str(self.caret, text);
        self.caret += text.len();
    }

    /// Height for the current content, between one and `MAX_VISIBLE_ROWS` rows plus borders.
    pub fn calculate_height(&self, area_width: u16) -> u16 {
        let rows = layout::rows(&self.buffer, layout::text_width(area_width)).len() as u16;
        rows.clamp(1, MAX_VISIBLE_ROWS) + VERTICAL_OVERHEAD
    }

    fn rows(&self) -> Vec<Row> {
        layout::rows(&self.buffer, layout::text_width(self.last_width))
    }

    fn move_vertically(&mut self, down: bool) -> bool {
        let rows = self.rows();
        let current = layout::caret_row(&rows, self.caret);
        let target = if down {
            current + 1
        } else {
            match current.checked_sub(1) {
                Some(t) => t,
                None => return false,
            }
        };
        let Some(&target_row) = rows.get(target) else {
            return false;
        };
        let column = layout::caret_column(&self.buffer, rows[current], self.caret);
        self.caret = layout::offset_at_column(&self.buffer, target_row, column);
        true
    }

    /// Keep the caret row inside the visible window.
    fn follow_caret(&mut self, rows: &[Row]) {
        let caret_row = layout::caret_row(rows, self.caret) as u16;
        let max_scroll = (rows.len() as u16).saturating_sub(MAX_VISIBLE_ROWS);
        if caret_row < self.scroll {
            self.scroll = caret_row;
        } else if caret_row >= self.scroll + MAX_VISIBLE_ROWS {
            self.scroll = caret_row + 1 - MAX_VISIBLE_ROWS;
        }
        self.scroll = self.scroll.min(max_scroll);
    }

    fn render_scrollbar(&self, frame: &mut Frame, area: Rect, total_rows: u16) {
        if total_rows <= MAX_VISIBLE_ROWS {
            return;
        }
        let mut state = ScrollbarState::default()
            .content_length(usize::from(total_rows - MAX_VISIBLE_ROWS))
            .position(usize::from(self.scroll));
        let track = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(VERTICAL_OVERHEAD),
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            track,
            &mut state,
        );
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.last_width = area.width;
        let rows = self.rows();
        self.follow_caret(&rows);

        let visible: Vec<Line> = rows
            .iter()
            .skip(usize::from(self.scroll))
            .take(usize::from(MAX_VISIBLE_ROWS))
            .map(|r| Line::raw(self.buffer[r.start..r.end].to_string()))
            .collect();

        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(format!(" {INPUT_HINT} "));
        if self.responding {
            block = block.title_bottom(Line::from(" answering… ").right_aligned());
        }

        let paragraph = Paragraph::new(visible)
            .block(block.padding(Padding::horizontal(1)))
            .style(Style::default().fg(Color::Green));
        frame.render_widget(paragraph, area);
        self.render_scrollbar(frame, area, rows.len() as u16);

        let row_index = layout::caret_row(&rows, self.caret);
        let column = layout::caret_column(&self.buffer, rows[row_index], self.caret);
        let y = area.y + 1 + (row_index as u16).saturating_sub(self.scroll);
        let x = (area.x + TEXT_INSET + column).min(area.right().saturating_sub(TEXT_INSET));
        frame.set_cursor_position((x, y));
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.caret, *c);
                self.caret += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                self.insert_str(text);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => (self.caret > 0).then(|| {
                let prev = layout::prev_boundary(&self.buffer, self.caret);
                self.buffer.drain(prev..self.caret);
                self.caret = prev;
                InputEvent::ContentChanged
            }),
            TuiEvent::Delete => (self.caret < self.buffer.len()).then(|| {
                let next = layout::next_boundary(&self.buffer, self.caret);
                self.buffer.drain(self.caret..next);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorLeft => (self.caret > 0).then(|| {
                self.caret = layout::prev_boundary(&self.buffer, self.caret);
                InputEvent::CaretMoved
            }),
            TuiEvent::CursorRight => (self.caret < self.buffer.len()).then(|| {
                self.caret = layout::next_boundary(&self.buffer, self.caret);
                InputEvent::CaretMoved
            }),
            TuiEvent::CursorHome => {
                let start = self.buffer[..self.caret].rfind('\n').map_or(0, |i| i + 1);
                (self.caret != start).then(|| {
                    self.caret = start;
                    InputEvent::CaretMoved
                })
            }
            TuiEvent::CursorEnd => {
                let end = self.buffer[self.caret..]
                    .find('\n')
                    .map_or(self.buffer.len(), |i| self.caret + i);
                (self.caret != end).then(|| {
                    self.caret = end;
                    InputEvent::CaretMoved
                })
            }
            TuiEvent::CursorUp => self.move_vertically(false).then_some(InputEvent::CaretMoved),
            TuiEvent::CursorDown => self.move_vertically(true).then_some(InputEvent::CaretMoved),
            _ => None,
        }
    }
}
