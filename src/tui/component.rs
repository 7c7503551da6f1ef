use ratatui::Frame;
use ratatui::layout::Rect;

use crate::tui::event::TuiEvent;

/// Something that draws itself into a region of the frame.
///
/// Props are plain struct fields, rebuilt every frame from `App` and
/// `TuiState`. Components that keep presentation state between frames
/// (scroll offsets, layout caches, the compose buffer) borrow it mutably,
/// which is why `render` takes `&mut self`.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// Presentation state that reacts to terminal events.
pub trait EventHandler {
    /// What the handler reports back to the event loop, if anything.
    type Event;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event>;
}
