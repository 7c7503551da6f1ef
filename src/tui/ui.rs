//! Frame layout: title bar, transcript over the backdrop, pending
//! attachments, compose box.
//!
//! ```text
//! ┌ title ──────────────────────────────┐  1 row
//! │ backdrop + message list             │  fills
//! │ attachment chips                    │  0-1 rows
//! │ input box                           │  2-7 rows, hidden with hide_send_input
//! └─────────────────────────────────────┘
//! ```

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::attachment::AttachmentPipeline;
use crate::core::avatar::AvatarRole;
use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{AttachmentList, Backdrop, MessageList, TitleBar};

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let controller = &app.controller;
    let props = controller.props();
    let background = controller.background().resolution();
    let device = background.device;

    let mut attachments = AttachmentList {
        files: controller.attachments().files(),
        can_add: controller.can_add_attachment(),
    };
    let input_height = if props.hide_send_input {
        0
    } else {
        tui.input_box.calculate_height(frame.area().width)
    };

    let layout = Layout::vertical([
        Length(1),
        Min(0),
        Length(attachments.height()),
        Length(input_height),
    ]);
    let [title_area, main_area, attachment_area, input_area] = layout.areas(frame.area());

    frame.render_widget(Backdrop { style: &background.style }, main_area);

    let user_avatar = app.avatar_view(AvatarRole::User);
    let assistant_avatar = app.avatar_view(AvatarRole::Assistant);
    MessageList {
        state: &mut tui.message_list,
        transcript: &app.transcript,
        images: &app.images,
        user_avatar: &user_avatar,
        assistant_avatar: &assistant_avatar,
        device,
        is_responding: app.is_responding,
        feedback_enabled: props.feedback_enabled,
        spinner_frame,
    }
    .render(frame, main_area);

    // After the list, so "↓ New" reflects this frame's layout.
    TitleBar {
        device,
        is_responding: app.is_responding,
        toast: tui.toast.as_ref().map(|t| t.notification.clone()),
        has_unseen_content: tui.message_list.has_unseen_content(),
    }
    .render(frame, title_area);

    attachments.render(frame, attachment_area);

    if !props.hide_send_input {
        tui.input_box.responding = app.is_responding;
        tui.input_box.render(frame, input_area);
    }
}
