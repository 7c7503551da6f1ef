//! Recognizes pasted image references.
//!
//! Dragging a file into most terminals pastes its path, often quoted or as
//! a `file://` URL. A single-line paste that names an existing image file
//! or an http(s) URL with an image extension becomes an attachment; anything
//! else is text for the compose box.

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::core::attachment::AttachmentSource;

fn has_image_extension(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

pub fn classify(pasted: &str) -> Option<AttachmentSource> {
    let text = unquote(pasted.trim());
    if text.is_empty() || text.contains('\n') {
        return None;
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        let path = text.split(['?', '#']).next().unwrap_or(text);
        return has_image_extension(Path::new(path))
            .then(|| AttachmentSource::RemoteUrl(text.to_string()));
    }

    let path = PathBuf::from(text.strip_prefix("file://").unwrap_or(text));
    (path.is_file() && has_image_extension(&path)).then_some(AttachmentSource::LocalFile(path))
}
