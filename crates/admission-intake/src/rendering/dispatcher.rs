use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::browser::BrowserRenderer;
use super::converter::ConverterRenderer;
use super::synthetic::SyntheticPdfRenderer;
use super::template::DocumentTemplate;
use super::{RenderError, RenderOptions, Renderer};
use crate::admissions::domain::AdmissionRecord;
use crate::config::RenderingConfig;

/// Smallest converter output treated as a real document. Exactly 5000 bytes is still rejected.
pub const CONVERTER_MIN_BYTES: u64 = 5_001;
/// Smallest browser output treated as a real document.
pub const BROWSER_MIN_BYTES: u64 = 1_000;

/// A renderer plus the size its output must reach to be kept.
#[derive(Clone)]
pub struct RenderTier {
    pub renderer: Arc<dyn Renderer>,
    pub min_bytes: u64,
}

impl RenderTier {
    pub fn new(renderer: Arc<dyn Renderer>, min_bytes: u64) -> Self {
        Self {
            renderer,
            min_bytes,
        }
    }

    /// A tier whose output is never size-checked. Only meaningful in last position.
    pub fn terminal(renderer: Arc<dyn Renderer>) -> Self {
        Self::new(renderer, 0)
    }
}

impl std::fmt::Debug for RenderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTier")
            .field("renderer", &self.renderer.name())
            .field("min_bytes", &self.min_bytes)
            .finish()
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub renderer: &'static str,
    pub path: PathBuf,
    pub bytes: u64,
    pub html_path: Option<PathBuf>,
}

/// Tries each tier in order until one produces an acceptable file.
#[derive(Debug, Clone)]
pub struct RenderDispatcher {
    tiers: Vec<RenderTier>,
}

impl RenderDispatcher {
    pub fn new(tiers: Vec<RenderTier>) -> Result<Self, RenderError> {
        if tiers.is_empty() {
            return Err(RenderError::NoTiers);
        }
        Ok(Self { tiers })
    }

    /// Converter, then headless browser, then the synthetic writer.
    pub fn standard(template: Arc<DocumentTemplate>, config: &RenderingConfig) -> Self {
        let tiers = vec![
            RenderTier::new(
                Arc::new(ConverterRenderer::new(template.clone())),
                CONVERTER_MIN_BYTES,
            ),
            RenderTier::new(
                Arc::new(BrowserRenderer::new(template.clone(), config)),
                BROWSER_MIN_BYTES,
            ),
            RenderTier::terminal(Arc::new(SyntheticPdfRenderer::new(template))),
        ];
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|tier| tier.renderer.name()).collect()
    }

    /// Render `record` to `destination`. Either a file exists at `destination` when this
    /// returns `Ok`, or nothing does and the last tier's failure is reported.
    pub fn render_to(
        &self,
        record: &AdmissionRecord,
        destination: &Path,
        options: RenderOptions,
    ) -> Result<RenderReport, RenderError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let start = if options.force_fallback {
            debug!(application_id = %record.application_id, "forced fallback rendering");
            self.tiers.len() - 1
        } else {
            0
        };
        let terminal = self.tiers.len() - 1;
        let mut last = String::from("no renderer attempted");

        for (index, tier) in self.tiers.iter().enumerate().skip(start) {
            let name = tier.renderer.name();
            let started = Instant::now();

            let failure = match self.attempt(tier, record, destination, index == terminal) {
                Ok(bytes) => {
                    let html_path = write_sidecar(tier.renderer.as_ref(), record, destination);
                    info!(
                        application_id = %record.application_id,
                        renderer = name,
                        bytes,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        path = %destination.display(),
                        "pdf rendered"
                    );
                    return Ok(RenderReport {
                        renderer: name,
                        path: destination.to_path_buf(),
                        bytes,
                        html_path,
                    });
                }
                Err(err) => err,
            };

            warn!(
                application_id = %record.application_id,
                renderer = name,
                error = %failure,
                "pdf renderer failed, falling through"
            );
            remove_partial(destination);
            last = failure.to_string();
        }

        Err(RenderError::Exhausted { last })
    }

    fn attempt(
        &self,
        tier: &RenderTier,
        record: &AdmissionRecord,
        destination: &Path,
        terminal: bool,
    ) -> Result<u64, RenderError> {
        let bytes = tier.renderer.render(record)?;
        fs::write(destination, &bytes).map_err(|source| RenderError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        let written = fs::metadata(destination)
            .map(|metadata| metadata.len())
            .map_err(|source| RenderError::Io {
                path: destination.to_path_buf(),
                source,
            })?;
        if !terminal && written < tier.min_bytes {
            return Err(RenderError::Undersized {
                renderer: tier.renderer.name(),
                bytes: written,
                minimum: tier.min_bytes,
            });
        }
        Ok(written)
    }
}

fn write_sidecar(
    renderer: &dyn Renderer,
    record: &AdmissionRecord,
    destination: &Path,
) -> Option<PathBuf> {
    let path = destination.with_extension("html");
    let Some(html) = renderer.html_sidecar(record) else {
        remove_stale_sidecar(&path);
        return None;
    };
    match fs::write(&path, html) {
        Ok(()) => Some(path),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not write html sidecar");
            None
        }
    }
}

/// A sidecar left by an earlier render no longer describes the PDF next to it.
fn remove_stale_sidecar(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale html sidecar"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "could not remove stale html sidecar"),
    }
}

fn remove_partial(destination: &Path) {
    match fs::remove_file(destination) {
        Ok(()) => debug!(path = %destination.display(), "removed rejected pdf"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %destination.display(), error = %err, "could not remove rejected pdf"),
    }
}
