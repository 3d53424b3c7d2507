use std::fs;
use std::path::Path;

use base64::Engine as _;
use tracing::debug;

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Image inlined into a document as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub mime_type: String,
    pub data_uri: String,
}

/// Read an image for inlining. Anything that cannot be embedded yields `None` so the
/// template can substitute a placeholder.
pub fn embed_image(path: Option<&Path>, max_bytes: u64) -> Option<EmbeddedImage> {
    let path = path.filter(|path| !path.as_os_str().is_empty())?;

    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|guess| guess.essence_str().to_string())
        .unwrap_or_else(|| mime::IMAGE_JPEG.essence_str().to_string());
    if !mime_type.starts_with("image/") {
        debug!(path = %path.display(), %mime_type, "skipping non-image document");
        return None;
    }

    let size = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        Ok(_) => return None,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "image not found");
            return None;
        }
    };
    if size > max_bytes {
        debug!(path = %path.display(), size, max_bytes, "image too large to embed");
        return None;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "image unreadable");
            return None;
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Some(EmbeddedImage {
        data_uri: format!("data:{mime_type};base64,{encoded}"),
        mime_type,
    })
}
