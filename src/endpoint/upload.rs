//! Local image uploads.
//!
//! A local attachment becomes usable once the chat service has assigned it
//! a file id. [`HttpUploader`] streams the file as multipart form data and
//! reports progress per chunk; [`LocalUploader`] stands in when no endpoint
//! is configured and just mints an id after checking the file is an image.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::core::config::EndpointConfig;

const CHUNK_SIZE: usize = 16 * 1024;

/// Receives upload progress in percent (0..=99; completion is reported separately).
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug)]
pub enum UploadError {
    Io(std::io::Error),
    /// The file exists but is not a recognised image.
    NotAnImage(String),
    Network(String),
    Api { status: u16, message: String },
    Parse(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Io(e) => write!(f, "I/O error: {e}"),
            UploadError::NotAnImage(path) => write!(f, "not an image: {path}"),
            UploadError::Network(msg) => write!(f, "network error: {msg}"),
            UploadError::Api { status, message } => {
                write!(f, "upload rejected (HTTP {status}): {message}")
            }
            UploadError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(e)
    }
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Upload the file at `path` and return the service-assigned file id.
    async fn upload(&self, path: &Path, progress: ProgressFn) -> Result<String, UploadError>;
}

/// Read `path` and confirm it holds an image. Returns the bytes and MIME type.
async fn read_image(path: &Path) -> Result<(Vec<u8>, &'static str), UploadError> {
    let bytes = tokio::fs::read(path).await?;
    let format = image::guess_format(&bytes)
        .map_err(|_| UploadError::NotAnImage(path.display().to_string()))?;
    Ok((bytes, format.to_mime_type()))
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

pub struct HttpUploader {
    base_url: String,
    api_key: Option<String>,
    user: String,
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new(endpoint: &EndpointConfig) -> Self {
        Self {
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
            user: endpoint.user.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UploadTransport for HttpUploader {
    async fn upload(&self, path: &Path, progress: ProgressFn) -> Result<String, UploadError> {
        let (bytes, mime) = read_image(path).await?;
        let total = bytes.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        info!("Uploading {} ({} bytes, {})", file_name, total, mime);

        let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0usize;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            let percent = (sent * 100 / total.max(1)).min(99) as u8;
            progress(percent);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            total as u64,
        )
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| UploadError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("user", self.user.clone());

        let mut request = self
            .client
            .post(format!("{}/files/upload", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        debug!("Upload response status: {}", response.status());
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Upload rejected: {} - {}", status, message);
            return Err(UploadError::Api { status, message });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;
        Ok(body.id)
    }
}

/// Offline stand-in: validates the file and mints a random id.
#[derive(Debug, Default)]
pub struct LocalUploader;

#[async_trait]
impl UploadTransport for LocalUploader {
    async fn upload(&self, path: &Path, progress: ProgressFn) -> Result<String, UploadError> {
        read_image(path).await?;
        progress(99);
        let id = uuid::Uuid::new_v4().to_string();
        debug!("Local upload of {} assigned {}", path.display(), id);
        Ok(id)
    }
}
