//! # MessageList Component
//!
//! Scrollable view of the transcript.
//!
//! `MessageList` is rebuilt every frame around `&mut MessageListState`
//! (scroll position, layout cache) and borrowed props. Entry heights are
//! measured without rendering and cached until anything that can change a
//! height moves: transcript revision, width, device class, responding
//! state, image settles or the feedback flag.
//!
//! Auto-scroll is a sticky flag. [`MessageListState::scroll_to_bottom`]
//! sets it, scrolling up clears it, and scrolling back to the end re-pins.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::avatar::AvatarView;
use crate::core::background::DeviceClass;
use crate::core::gallery::ImageRegistry;
use crate::core::transcript::{Role, Transcript};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageBubble;
use crate::tui::event::TuiEvent;

const EMPTY_HINT: &str = "Type a message. Paste an image path or URL to attach it.";
/// Blank rows between bubbles.
const ENTRY_GAP: u16 = 1;

pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// Follow new content as it arrives.
    pub stick_to_bottom: bool,
    /// Viewport height from the last frame, for clamping between frames.
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Jump to the end and keep following. Safe to call repeatedly.
    pub fn scroll_to_bottom(&mut self) {
        self.stick_to_bottom = true;
        self.pin_to_end();
    }

    fn pin_to_end(&mut self) {
        let y = self.max_offset();
        self.scroll_state.set_offset(Position { x: 0, y });
    }

    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Re-engage auto-scroll once the user scrolls back to the end.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Content exists below the viewport and we are not following it.
    pub fn has_unseen_content(&self) -> bool {
        !self.stick_to_bottom && self.scroll_state.offset().y < self.max_offset()
    }
}

impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollToBottom => self.scroll_to_bottom(),
            _ => {}
        }
        None
    }
}

/// Everything an entry height depends on besides its own content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutKey {
    pub revision: u64,
    pub width: u16,
    pub device: DeviceClass,
    pub is_responding: bool,
    pub image_generation: u64,
    pub feedback_enabled: bool,
}

#[derive(Default)]
pub struct LayoutCache {
    pub heights: Vec<u16>,
    /// Running sums of `heights`; entry `i` ends at `prefix_heights[i]`.
    pub prefix_heights: Vec<u16>,
    key: Option<LayoutKey>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_current(&self, key: &LayoutKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    pub fn store(&mut self, key: LayoutKey, heights: Vec<u16>) {
        self.heights = heights;
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
        self.key = Some(key);
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    pub fn top_of(&self, index: usize) -> u16 {
        index
            .checked_sub(1)
            .and_then(|i| self.prefix_heights.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Entries overlapping the viewport, padded by half a screen each way.
    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let pad = viewport_height / 2;
        let from = scroll_offset.saturating_sub(pad);
        let to = scroll_offset.saturating_add(viewport_height).saturating_add(pad);

        let start = self.prefix_heights.partition_point(|&end| end <= from);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < to)
            .saturating_add(1)
            .min(self.prefix_heights.len());
        start..end
    }
}

pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub transcript: &'a Transcript,
    pub images: &'a ImageRegistry,
    pub user_avatar: &'a AvatarView,
    pub assistant_avatar: &'a AvatarView,
    pub device: DeviceClass,
    pub is_responding: bool,
    pub feedback_enabled: bool,
    pub spinner_frame: usize,
}

impl MessageList<'_> {
    fn bubble(&self, index: usize) -> MessageBubble<'_> {
        let entry = &self.transcript.entries()[index];
        let avatar = match entry.role {
            Role::Question => self.user_avatar,
            Role::Answer => self.assistant_avatar,
        };
        MessageBubble {
            entry,
            avatar,
            images: self.images,
            device: self.device,
            responding: self.is_responding && self.transcript.is_last(&entry.id),
            feedback_enabled: self.feedback_enabled,
            spinner_frame: self.spinner_frame,
        }
    }

    fn refresh_layout(&mut self, width: u16) {
        let key = LayoutKey {
            revision: self.transcript.revision(),
            width,
            device: self.device,
            is_responding: self.is_responding,
            image_generation: self.images.generation(),
            feedback_enabled: self.feedback_enabled,
        };
        if self.state.layout.is_current(&key) {
            return;
        }
        let heights = (0..self.transcript.len())
            .map(|i| self.bubble(i).calculate_height(width) + ENTRY_GAP)
            .collect();
        self.state.layout.store(key, heights);
    }
}

impl Component for MessageList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        // One column is reserved for the scrollbar.
        let content_width = area.width.saturating_sub(1);
        self.refresh_layout(content_width);

        if self.transcript.is_empty() {
            let hint = Line::styled(EMPTY_HINT, Style::default().fg(Color::DarkGray)).centered();
            let middle = Rect {
                y: area.y + area.height / 2,
                height: area.height.min(1),
                ..area
            };
            frame.render_widget(hint, middle);
            return;
        }

        self.state.viewport_height = area.height;
        if self.state.stick_to_bottom {
            self.state.pin_to_end();
        } else {
            self.state.clamp_scroll();
        }

        let total = self.state.layout.total_height();
        let offset = self.state.scroll_state.offset().y;
        let range = self.state.layout.visible_range(offset, area.height);

        let mut view = ScrollView::new(Size::new(content_width, total))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        for i in range {
            let top = self.state.layout.top_of(i);
            let height = self.state.layout.heights[i].saturating_sub(ENTRY_GAP);
            view.render_widget(self.bubble(i), Rect::new(0, top, content_width, height));
        }

        frame.render_stateful_widget(view, area, &mut self.state.scroll_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::avatar::{AvatarRole, resolve};
    use crate::core::config::AvatarConfig;
    use crate::core::transcript::TranscriptEntry;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn key(revision: u64, width: u16) -> LayoutKey {
        LayoutKey {
            revision,
            width,
            device: DeviceClass::Desktop,
            is_responding: false,
            image_generation: 0,
            feedback_enabled: true,
        }
    }

    fn avatar(role: AvatarRole) -> AvatarView {
        AvatarView::new(resolve(role, None, None, &AvatarConfig::default()))
    }

    fn long_transcript(n: usize) -> Transcript {
        let mut t = Transcript::new();
        for i in 0..n {
            t.push(TranscriptEntry::question(format!("q-{i}"), format!("question {i}")));
            t.push(TranscriptEntry::answer(format!("a-{i}"), format!("answer {i}")));
        }
        t
    }

    fn draw(state: &mut MessageListState, transcript: &Transcript, height: u16) -> String {
        let images = ImageRegistry::new();
        let user = avatar(AvatarRole::User);
        let assistant = avatar(AvatarRole::Assistant);
        let mut terminal = Terminal::new(TestBackend::new(60, height)).unwrap();
        terminal
            .draw(|f| {
                MessageList {
                    state: &mut *state,
                    transcript,
                    images: &images,
                    user_avatar: &user,
                    assistant_avatar: &assistant,
                    device: DeviceClass::Desktop,
                    is_responding: false,
                    feedback_enabled: true,
                    spinner_frame: 0,
                }
                .render(f, f.area())
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn cache_tracks_its_key() {
        let mut cache = LayoutCache::new();
        assert!(!cache.is_current(&key(1, 80)));
        cache.store(key(1, 80), vec![4, 5, 6]);
        assert!(cache.is_current(&key(1, 80)));
        assert!(!cache.is_current(&key(2, 80)));
        assert!(!cache.is_current(&key(1, 40)));
        assert_eq!(cache.prefix_heights, vec![4, 9, 15]);
        assert_eq!(cache.total_height(), 15);
        assert_eq!(cache.top_of(0), 0);
        assert_eq!(cache.top_of(2), 9);
    }

    #[test]
    fn visible_range_covers_viewport() {
        let mut cache = LayoutCache::new();
        cache.store(key(1, 80), vec![10; 10]);
        let range = cache.visible_range(50, 10);
        assert!(range.contains(&5));
        assert!(!range.contains(&0));
        assert!(range.end <= 10);
    }

    #[test]
    fn follows_bottom_by_default() {
        let transcript = long_transcript(10);
        let mut state = MessageListState::new();
        let text = draw(&mut state, &transcript, 12);
        assert!(text.contains("answer 9"));
        assert!(!text.contains("question 0"));
        assert!(!state.has_unseen_content());
    }

    #[test]
    fn scrolling_up_unpins_and_scroll_to_bottom_repins() {
        let transcript = long_transcript(10);
        let mut state = MessageListState::new();
        draw(&mut state, &transcript, 12);

        state.handle_event(&TuiEvent::ScrollPageUp);
        assert!(!state.stick_to_bottom);
        draw(&mut state, &transcript, 12);
        assert!(state.has_unseen_content());

        state.scroll_to_bottom();
        state.scroll_to_bottom();
        let text = draw(&mut state, &transcript, 12);
        assert!(state.stick_to_bottom);
        assert!(text.contains("answer 9"));
    }

    #[test]
    fn empty_transcript_shows_hint() {
        let mut state = MessageListState::new();
        let text = draw(&mut state, &Transcript::new(), 6);
        assert!(text.contains("Paste an image"));
    }
}
