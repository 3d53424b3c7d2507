//! PDF rendering for admission records.
//!
//! Renderers are arranged as an ordered list of tiers inside a [`RenderDispatcher`]. Each
//! tier produces PDF bytes from the HTML or text layout of a record; the dispatcher writes
//! the bytes, rejects undersized output, and falls through to the next tier. The last tier
//! is accepted unconditionally.

pub mod browser;
pub mod converter;
pub mod dispatcher;
pub mod images;
pub mod synthetic;
pub mod template;

use std::path::PathBuf;

use crate::admissions::domain::AdmissionRecord;

pub use browser::BrowserRenderer;
pub use converter::ConverterRenderer;
pub use dispatcher::{RenderDispatcher, RenderReport, RenderTier};
pub use images::{embed_image, EmbeddedImage};
pub use synthetic::SyntheticPdfRenderer;
pub use template::DocumentTemplate;

/// One strategy for turning a record into PDF bytes.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, record: &AdmissionRecord) -> Result<Vec<u8>, RenderError>;

    /// HTML written next to the PDF for diagnostics when this renderer's output is kept.
    fn html_sidecar(&self, _record: &AdmissionRecord) -> Option<String> {
        None
    }
}

/// Per-call rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Go straight to the terminal tier.
    pub force_fallback: bool,
}

impl RenderOptions {
    pub fn forced() -> Self {
        Self {
            force_fallback: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("browser renderer failed: {0}")]
    Browser(String),
    #[error("html converter failed: {0}")]
    Converter(String),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{renderer} produced {bytes} bytes (minimum {minimum})")]
    Undersized {
        renderer: &'static str,
        bytes: u64,
        minimum: u64,
    },
    #[error("all PDF renderers failed; last error: {last}")]
    Exhausted { last: String },
    #[error("no renderers configured")]
    NoTiers,
}
