//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates terminal events into controller calls and executes the
//! effects the core hands back.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Flow
//!
//! ```text
//! crossterm ─► TuiEvent ─► handle_event ─► Vec<Effect> ─► Executor
//!                                                            │ tokio tasks
//!      update(&mut App, Action) ◄── mpsc::Receiver<Action> ◄─┘
//! ```
//!
//! Enter reaches the controller as a key-down/key-up pair. Terminals
//! without the keyboard enhancement protocol never report releases, so a
//! key-up is synthesized right after each Enter press there.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (answer pending, toast on screen): draws every ~80ms so
//!   the spinner moves and toasts expire on time.
//! - **Idle**: sleeps up to 500ms, only redraws on events or task results.

mod component;
mod components;
mod event;
pub mod markdown;
mod paste;
mod ui;

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::future::Future;
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;

use crate::core::action::{Action, Effect};
use crate::core::config::ResolvedConfig;
use crate::core::controller::{ComposedMessage, Key, KeyDisposition, KeyPress, Notification};
use crate::core::environment::{EnvironmentProbe, HostEnvironment};
use crate::core::state::{App, update};
use crate::core::transcript::Feedback;
use crate::endpoint::{ChatRelay, HttpUploader, LocalUploader, ProgressFn, UploadTransport};
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// A notification and the moment it leaves the title bar.
pub struct Toast {
    pub notification: Notification,
    expires_at: Instant,
}

impl Toast {
    pub fn new(notification: Notification) -> Self {
        let expires_at = Instant::now() + Duration::from_millis(notification.duration_ms);
        Self {
            notification,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub toast: Option<Toast>,
    /// The terminal never reports key releases.
    pub synthesize_key_up: bool,
}

impl TuiState {
    pub fn new(synthesize_key_up: bool) -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            toast: None,
            synthesize_key_up,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Pushed unconditionally; terminals without the protocol ignore it.
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock, // blinking resets on every draw
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

// ============================================================================
// Event handling
// ============================================================================

fn key_down(app: &mut App, tui: &mut TuiState, press: &KeyPress) -> Vec<Effect> {
    let disposition = app.controller.handle_key_down(press);
    if disposition == KeyDisposition::Default && press.key == Key::Enter {
        tui.input_box.insert_str("\n");
        app.controller.handle_content_change(tui.input_box.text());
    }
    if tui.synthesize_key_up {
        app.controller.handle_key_up(press)
    } else {
        Vec::new()
    }
}

fn handle_paste(app: &mut App, tui: &mut TuiState, text: String) -> Vec<Effect> {
    if app.controller.props().vision.enabled
        && let Some(source) = paste::classify(&text)
    {
        debug!("Paste recognized as attachment: {:?}", source);
        return match app.controller.add_attachment(source) {
            Ok(effect) => vec![effect],
            Err(refusal) => vec![Effect::Notify(Notification::info(refusal.to_string()))],
        };
    }
    edit(app, tui, &TuiEvent::Paste(text));
    Vec::new()
}

/// Forward an editing event to the input box and mirror the result.
fn edit(app: &mut App, tui: &mut TuiState, event: &TuiEvent) {
    if let TuiEvent::InputChar(c) = event {
        // Any non-Enter key ends a composition.
        app.controller.handle_key_down(&KeyPress {
            key: Key::Char(*c),
            shift: false,
            is_composing: false,
        });
    }
    if let Some(InputEvent::ContentChanged) = tui.input_box.handle_event(event) {
        app.controller.handle_content_change(tui.input_box.text());
    }
}

/// Apply one terminal event. Quit and resize are handled by the loop.
fn handle_event(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> Vec<Effect> {
    let input_hidden = app.controller.props().hide_send_input;
    let effects = match event {
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown
        | TuiEvent::ScrollToBottom => {
            tui.message_list.handle_event(&event);
            Vec::new()
        }
        TuiEvent::RemoveAttachment => {
            let count = app.controller.attachments().len();
            if count > 0 {
                app.controller.remove_attachment(count - 1);
            }
            Vec::new()
        }
        TuiEvent::RetryAttachment => app
            .controller
            .attachments()
            .first_retryable()
            .and_then(|index| app.controller.retry_attachment(index))
            .into_iter()
            .collect(),
        TuiEvent::NewConversation => {
            tui.message_list = MessageListState::new();
            app.reset_conversation()
        }
        TuiEvent::Like => app.rate_last_answer(Feedback::Like),
        TuiEvent::Dislike => app.rate_last_answer(Feedback::Dislike),
        _ if input_hidden => Vec::new(),
        TuiEvent::KeyDown(press) => key_down(app, tui, &press),
        // Releases are already synthesized; a late real one would resend.
        TuiEvent::KeyUp(_) if tui.synthesize_key_up => Vec::new(),
        TuiEvent::KeyUp(press) => app.controller.handle_key_up(&press),
        TuiEvent::Paste(text) => handle_paste(app, tui, text),
        other => {
            edit(app, tui, &other);
            Vec::new()
        }
    };
    if !input_hidden {
        tui.input_box.set_text(app.controller.query());
    }
    effects
}

// ============================================================================
// Effect execution
// ============================================================================

/// Runs effects: local ones immediately, I/O on tokio tasks that report
/// back through `tx`.
struct Executor {
    tx: mpsc::Sender<Action>,
    env: Arc<HostEnvironment>,
    relay: Option<Arc<ChatRelay>>,
    uploader: Arc<dyn UploadTransport>,
}

impl Executor {
    fn new(config: &ResolvedConfig, env: Arc<HostEnvironment>, tx: mpsc::Sender<Action>) -> Self {
        let relay = config.endpoint.as_ref().map(|endpoint| {
            info!("Delivering questions to {}", endpoint.base_url);
            Arc::new(ChatRelay::new(endpoint))
        });
        let uploader: Arc<dyn UploadTransport> = match &config.endpoint {
            Some(endpoint) => Arc::new(HttpUploader::new(endpoint)),
            None => {
                info!("No chat endpoint configured, running local-only");
                Arc::new(LocalUploader)
            }
        };
        Self {
            tx,
            env,
            relay,
            uploader,
        }
    }

    fn spawn_action<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Action> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = task.await;
            if tx.send(action).is_err() {
                warn!("Failed to send {} result: receiver dropped", label);
            }
        });
    }

    fn deliver(&self, message: ComposedMessage, answer_id: String, conversation_id: Option<String>) {
        let Some(relay) = self.relay.clone() else {
            warn!("No relay for answer {}, leaving placeholder", answer_id);
            return;
        };
        self.spawn_action("answer", async move {
            match relay.deliver(&message, conversation_id.as_deref()).await {
                Ok(answer) => Action::AnswerReceived {
                    answer_id,
                    content: answer.answer,
                    conversation_id: answer.conversation_id,
                },
                Err(e) => Action::AnswerFailed {
                    answer_id,
                    error: e.to_string(),
                },
            }
        });
    }

    fn run(&self, app: &mut App, tui: &mut TuiState, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            debug!("Executing effect: {:?}", effect);
            match effect {
                Effect::Send(message) => {
                    let accepted = app.accept_send(&message);
                    if let Some(answer_id) = accepted.answer_id {
                        self.deliver(message, answer_id, app.conversation_id.clone());
                    }
                    queue.extend(accepted.effects);
                }
                Effect::Notify(notification) => tui.toast = Some(Toast::new(notification)),
                Effect::ScrollToBottom => tui.message_list.scroll_to_bottom(),
                Effect::ScrollToBottomAfter(delay) => self.spawn_action("scroll", async move {
                    tokio::time::sleep(delay).await;
                    Action::DelayedScroll
                }),
                Effect::ProbeBackground { url } => {
                    let env = self.env.clone();
                    self.spawn_action("backdrop probe", async move {
                        let available = env.probe_image_loadable(&url).await;
                        Action::BackgroundProbed { url, available }
                    });
                }
                Effect::LoadImage { url } => {
                    let env = self.env.clone();
                    self.spawn_action("image load", async move {
                        let loaded = env.loader().is_loadable(&url).await;
                        Action::ImageSettled { url, loaded }
                    });
                }
                Effect::ProbeLink { id, url } => {
                    let env = self.env.clone();
                    self.spawn_action("link probe", async move {
                        let loaded = env.loader().is_loadable(&url).await;
                        Action::LinkProbed { id, loaded }
                    });
                }
                Effect::Upload { id, path } => {
                    let uploader = self.uploader.clone();
                    let progress_tx = self.tx.clone();
                    let progress: ProgressFn = Arc::new(move |percent| {
                        let _ = progress_tx.send(Action::UploadProgress { id, percent });
                    });
                    info!("Uploading {} as attachment {}", path.display(), id);
                    self.spawn_action("upload", async move {
                        match uploader.upload(&path, progress).await {
                            Ok(file_id) => Action::UploadSucceeded { id, file_id },
                            Err(e) => Action::UploadFailed {
                                id,
                                error: e.to_string(),
                            },
                        }
                    });
                }
            }
        }
    }
}

// ============================================================================
// Main loop
// ============================================================================

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let enhanced = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    info!("Keyboard enhancement supported: {}", enhanced);
    let (columns, _) = crossterm::terminal::size()?;

    let env = Arc::new(HostEnvironment::new(
        columns,
        config.agent.clone(),
        config.avatar.asset_root.clone(),
    ));
    let (tx, rx) = mpsc::channel();
    let executor = Executor::new(&config, env.clone(), tx);

    let mut app = App::from_config(&config);
    let mut tui = TuiState::new(!enhanced);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let effects = app.start(env.as_ref());
    executor.run(&mut app, &mut tui, effects);

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        if tui.toast.as_ref().is_some_and(Toast::is_expired) {
            tui.toast = None;
            needs_redraw = true;
        }

        let animating = app.is_responding || tui.toast.is_some();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            match event {
                TuiEvent::ForceQuit => {
                    should_quit = true;
                    break;
                }
                TuiEvent::Resize(columns, rows) => {
                    debug!("Resized to {}x{}", columns, rows);
                    env.set_columns(columns);
                    let effects = app.resized(env.as_ref());
                    executor.run(&mut app, &mut tui, effects);
                }
                event => {
                    let effects = handle_event(&mut app, &mut tui, event);
                    executor.run(&mut app, &mut tui, effects);
                }
            }
        }

        if should_quit {
            break;
        }

        // Results from background tasks
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            let effects = update(&mut app, action);
            executor.run(&mut app, &mut tui, effects);
            tui.input_box.set_text(app.controller.query());
        }
    }

    info!("Shutting down");
    app.controller.background_mut().unmount();
    ratatui::restore();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attachment::{AttachmentPipeline, AttachmentSource};
    use crate::core::controller::{ChatProps, NotificationKind};
    use crate::core::transcript::TranscriptEntry;

    fn app() -> App {
        App::new(ChatProps::default(), true)
    }

    fn type_text(app: &mut App, tui: &mut TuiState, text: &str) {
        for c in text.chars() {
            handle_event(app, tui, TuiEvent::InputChar(c));
        }
    }

    fn sent(effects: &[Effect]) -> Option<&ComposedMessage> {
        effects.iter().find_map(|e| match e {
            Effect::Send(message) => Some(message),
            _ => None,
        })
    }

    #[test]
    fn typing_mirrors_into_controller() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        type_text(&mut app, &mut tui, "hi");
        assert_eq!(app.controller.query(), "hi");
        handle_event(&mut app, &mut tui, TuiEvent::Backspace);
        assert_eq!(app.controller.query(), "h");
    }

    #[test]
    fn enter_sends_and_clears_with_synthesized_release() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        type_text(&mut app, &mut tui, "hello");

        let effects = handle_event(&mut app, &mut tui, TuiEvent::KeyDown(KeyPress::enter()));
        assert_eq!(sent(&effects).map(|m| m.query.as_str()), Some("hello"));
        assert_eq!(tui.input_box.text(), "");

        // A real release arriving afterwards must not send again.
        let late = handle_event(&mut app, &mut tui, TuiEvent::KeyUp(KeyPress::enter()));
        assert!(late.is_empty());
    }

    #[test]
    fn enter_waits_for_release_on_enhanced_terminals() {
        let mut app = app();
        let mut tui = TuiState::new(false);
        type_text(&mut app, &mut tui, "hello");

        let down = handle_event(&mut app, &mut tui, TuiEvent::KeyDown(KeyPress::enter()));
        assert!(down.is_empty());
        let up = handle_event(&mut app, &mut tui, TuiEvent::KeyUp(KeyPress::enter()));
        assert!(sent(&up).is_some());
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        type_text(&mut app, &mut tui, "a");
        let effects = handle_event(&mut app, &mut tui, TuiEvent::KeyDown(KeyPress::shift_enter()));
        assert!(sent(&effects).is_none());
        type_text(&mut app, &mut tui, "b");
        assert_eq!(app.controller.query(), "a\nb");
        assert_eq!(tui.input_box.text(), "a\nb");
    }

    #[test]
    fn enter_on_empty_box_warns() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        let effects = handle_event(&mut app, &mut tui, TuiEvent::KeyDown(KeyPress::enter()));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(Notification { kind: NotificationKind::Error, .. })]
        ));
    }

    #[test]
    fn pasted_image_url_becomes_attachment() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        let effects = handle_event(
            &mut app,
            &mut tui,
            TuiEvent::Paste("https://x.test/cat.png".into()),
        );
        assert!(matches!(effects.as_slice(), [Effect::ProbeLink { .. }]));
        assert_eq!(app.controller.attachments().len(), 1);
        assert_eq!(tui.input_box.text(), "");

        handle_event(&mut app, &mut tui, TuiEvent::RemoveAttachment);
        assert_eq!(app.controller.attachments().len(), 0);
    }

    #[test]
    fn pasted_text_goes_to_input() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        handle_event(&mut app, &mut tui, TuiEvent::Paste("line one\nline two".into()));
        assert_eq!(app.controller.query(), "line one\nline two");
    }

    #[test]
    fn retry_key_skips_failed_links_and_restarts_upload() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        app.controller
            .add_attachment(AttachmentSource::RemoteUrl("https://x.test/broken.png".into()))
            .unwrap();
        let id = match app
            .controller
            .add_attachment(AttachmentSource::LocalFile("/tmp/cat.png".into()))
        {
            Ok(Effect::Upload { id, .. }) => id,
            other => panic!("expected upload, got {:?}", other),
        };
        app.controller.attachments_mut().on_link_load_error(0);
        app.controller.attachments_mut().on_upload_error(id);

        let effects = handle_event(&mut app, &mut tui, TuiEvent::RetryAttachment);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Upload { id: retried, .. }] if *retried == id
        ));
    }

    #[test]
    fn refused_attachment_shows_info_toast() {
        let mut props = ChatProps::default();
        props.vision.number_limits = 1;
        let mut app = App::new(props, true);
        let mut tui = TuiState::new(true);
        app.controller
            .add_attachment(AttachmentSource::RemoteUrl("https://x.test/a.png".into()))
            .unwrap();
        let effects = handle_event(&mut app, &mut tui, TuiEvent::Paste("https://x.test/b.png".into()));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(Notification { kind: NotificationKind::Info, .. })]
        ));
    }

    #[test]
    fn hidden_input_ignores_typing() {
        let props = ChatProps {
            hide_send_input: true,
            ..ChatProps::default()
        };
        let mut app = App::new(props, true);
        let mut tui = TuiState::new(true);
        type_text(&mut app, &mut tui, "hi");
        assert_eq!(app.controller.query(), "");
    }

    #[test]
    fn like_toggles_on_last_answer() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        app.transcript.push(TranscriptEntry::answer("a-1", "hello"));
        handle_event(&mut app, &mut tui, TuiEvent::Like);
        assert_eq!(app.transcript.entries()[0].feedback, Some(Feedback::Like));
        handle_event(&mut app, &mut tui, TuiEvent::Like);
        assert_eq!(app.transcript.entries()[0].feedback, None);
    }

    #[test]
    fn new_conversation_clears_everything() {
        let mut app = app();
        let mut tui = TuiState::new(true);
        type_text(&mut app, &mut tui, "draft");
        app.transcript.push(TranscriptEntry::answer("a-1", "hello"));
        handle_event(&mut app, &mut tui, TuiEvent::NewConversation);
        assert!(app.transcript.entries().is_empty());
        assert_eq!(tui.input_box.text(), "");
    }

    #[test]
    fn toasts_expire() {
        let mut notification = Notification::info("hi");
        notification.duration_ms = 0;
        assert!(Toast::new(notification).is_expired());
        assert!(!Toast::new(Notification::info("hi")).is_expired());
    }
}
