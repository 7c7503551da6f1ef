//! # TUI Components
//!
//! Stateless pieces take everything as props and are rebuilt each frame:
//! - `TitleBar`: device class, responding state, toasts, "↓ New"
//! - `MessageBubble`: one transcript entry with its avatar tile
//! - `AvatarTile`, `ImageGallery`, `AttachmentList`, `Backdrop`
//!
//! Stateful pieces keep presentation state between frames and handle events:
//! - `InputBox`: compose buffer, caret and internal scroll
//! - `MessageList` over `MessageListState`: scroll position and layout cache
//!
//! ```text
//! components/
//! ├── title_bar.rs
//! ├── message_list.rs   (scrolling, layout cache)
//! ├── message.rs        (bubble + avatar placement)
//! ├── avatar.rs
//! ├── image_gallery.rs
//! ├── attachment_list.rs
//! ├── backdrop.rs
//! └── input_box/        (buffer, caret, row layout)
//! ```

pub mod attachment_list;
pub mod avatar;
pub mod backdrop;
pub mod image_gallery;
pub mod input_box;
pub mod message;
pub mod message_list;
mod title_bar;

pub use attachment_list::AttachmentList;
pub use backdrop::Backdrop;
pub use input_box::{InputBox, InputEvent};
pub use message_list::{MessageList, MessageListState};
pub use title_bar::TitleBar;
