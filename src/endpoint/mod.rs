//! # Chat Service Endpoint
//!
//! Network side of the host: delivering questions and uploading local
//! images. The core never calls into this module; the TUI event loop runs
//! these on tokio tasks and feeds the results back as actions.

pub mod relay;
pub mod upload;

pub use relay::{ChatAnswer, ChatRelay, RelayError};
pub use upload::{HttpUploader, LocalUploader, ProgressFn, UploadError, UploadTransport};
