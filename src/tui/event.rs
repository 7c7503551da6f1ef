use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};

use crate::core::controller::{Key, KeyPress};

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq)]
pub enum TuiEvent {
    ForceQuit, // Ctrl+C / Ctrl+D

    // Enter goes through the controller as a down/up pair
    KeyDown(KeyPress),
    KeyUp(KeyPress),

    // Editing (handled by the input box)
    InputChar(char),
    Paste(String), // Bracketed paste - preserves newlines
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CursorHome,
    CursorEnd,

    // Transcript scrolling
    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    ScrollToBottom, // End key - also re-enables stick-to-bottom

    // Attachments and conversation
    RemoveAttachment, // Ctrl+X
    RetryAttachment,  // Ctrl+T
    NewConversation,  // Ctrl+N
    Like,             // Ctrl+L
    Dislike,          // Ctrl+K

    Resize(u16, u16),
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: std::time::Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            log::warn!("Event poll failed: {}", e);
            return None;
        }
    }
    match event::read() {
        Ok(event) => translate(event),
        Err(e) => {
            log::warn!("Event read failed: {}", e);
            None
        }
    }
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
}

fn translate(event: Event) -> Option<TuiEvent> {
    match event {
        Event::Key(key_event) => translate_key(key_event),
        Event::Mouse(mouse_event) => match mouse_event.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::ScrollDown),
            _ => None,
        },
        Event::Paste(data) => Some(TuiEvent::Paste(data)),
        Event::Resize(cols, rows) => Some(TuiEvent::Resize(cols, rows)),
        _ => None,
    }
}

fn translate_key(key_event: KeyEvent) -> Option<TuiEvent> {
    log::debug!(
        "Key event: {:?} {:?} with modifiers {:?}",
        key_event.kind,
        key_event.code,
        key_event.modifiers
    );

    if key_event.code == KeyCode::Enter {
        let press = KeyPress {
            key: Key::Enter,
            shift: key_event.modifiers.contains(KeyModifiers::SHIFT),
            // Terminals commit IME text before forwarding keys.
            is_composing: false,
        };
        return match key_event.kind {
            KeyEventKind::Release => Some(TuiEvent::KeyUp(press)),
            KeyEventKind::Press | KeyEventKind::Repeat => Some(TuiEvent::KeyDown(press)),
        };
    }

    // Only enhanced terminals send releases; nothing but Enter cares about them.
    if key_event.kind == KeyEventKind::Release {
        return None;
    }

    match (key_event.modifiers, key_event.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c' | 'd')) => Some(TuiEvent::ForceQuit),
        (KeyModifiers::CONTROL, KeyCode::Char('x')) => Some(TuiEvent::RemoveAttachment),
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => Some(TuiEvent::RetryAttachment),
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(TuiEvent::NewConversation),
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => Some(TuiEvent::Like),
        (KeyModifiers::CONTROL, KeyCode::Char('k')) => Some(TuiEvent::Dislike),
        // Ctrl+J is ASCII LF; many terminals send it for Ctrl+Enter
        (KeyModifiers::CONTROL, KeyCode::Char('j')) => Some(TuiEvent::KeyDown(KeyPress::shift_enter())),
        (KeyModifiers::CONTROL, KeyCode::Char('a')) => Some(TuiEvent::CursorHome),
        (KeyModifiers::CONTROL, KeyCode::Char('e')) => Some(TuiEvent::CursorEnd),
        (KeyModifiers::CONTROL, _) => None,
        (_, KeyCode::Char(c)) => Some(TuiEvent::InputChar(c)),
        (_, KeyCode::Backspace) => Some(TuiEvent::Backspace),
        (_, KeyCode::Delete) => Some(TuiEvent::Delete),
        (_, KeyCode::Left) => Some(TuiEvent::CursorLeft),
        (_, KeyCode::Right) => Some(TuiEvent::CursorRight),
        (_, KeyCode::Up) => Some(TuiEvent::CursorUp),
        (_, KeyCode::Down) => Some(TuiEvent::CursorDown),
        (_, KeyCode::Home) => Some(TuiEvent::CursorHome),
        (_, KeyCode::PageUp) => Some(TuiEvent::ScrollPageUp),
        (_, KeyCode::PageDown) => Some(TuiEvent::ScrollPageDown),
        (_, KeyCode::End) => Some(TuiEvent::ScrollToBottom),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn enter_press_and_release_map_to_down_and_up() {
        let down = translate(key(KeyCode::Enter, KeyModifiers::NONE, KeyEventKind::Press));
        let up = translate(key(KeyCode::Enter, KeyModifiers::NONE, KeyEventKind::Release));
        assert_eq!(down, Some(TuiEvent::KeyDown(KeyPress::enter())));
        assert_eq!(up, Some(TuiEvent::KeyUp(KeyPress::enter())));
    }

    #[test]
    fn shift_enter_carries_modifier() {
        let down = translate(key(KeyCode::Enter, KeyModifiers::SHIFT, KeyEventKind::Press));
        assert_eq!(down, Some(TuiEvent::KeyDown(KeyPress::shift_enter())));
    }

    #[test]
    fn character_releases_are_ignored() {
        let up = translate(key(KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Release));
        assert_eq!(up, None);
        let down = translate(key(KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Press));
        assert_eq!(down, Some(TuiEvent::InputChar('a')));
    }

    #[test]
    fn control_shortcuts() {
        let remove = translate(key(KeyCode::Char('x'), KeyModifiers::CONTROL, KeyEventKind::Press));
        let quit = translate(key(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press));
        assert_eq!(remove, Some(TuiEvent::RemoveAttachment));
        assert_eq!(quit, Some(TuiEvent::ForceQuit));
    }

    #[test]
    fn resize_is_forwarded() {
        assert_eq!(translate(Event::Resize(90, 30)), Some(TuiEvent::Resize(90, 30)));
    }
}
