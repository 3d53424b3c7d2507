use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use printpdf::{GeneratePdfOptions, PdfDocument, PdfSaveOptions};
use tracing::debug;

use super::template::DocumentTemplate;
use super::{RenderError, Renderer};
use crate::admissions::domain::AdmissionRecord;

/// In-process HTML to PDF conversion through printpdf's layout pipeline.
#[derive(Debug, Clone)]
pub struct ConverterRenderer {
    template: Arc<DocumentTemplate>,
}

impl ConverterRenderer {
    pub fn new(template: Arc<DocumentTemplate>) -> Self {
        Self { template }
    }
}

impl Renderer for ConverterRenderer {
    fn name(&self) -> &'static str {
        "converter"
    }

    fn render(&self, record: &AdmissionRecord) -> Result<Vec<u8>, RenderError> {
        let html = self.template.render_html(record);
        // The layout engine panics on some inputs; treat that like any other failure.
        panic::catch_unwind(AssertUnwindSafe(|| convert(&html))).unwrap_or_else(|_| {
            Err(RenderError::Converter(
                "layout engine panicked".to_string(),
            ))
        })
    }
}

fn convert(html: &str) -> Result<Vec<u8>, RenderError> {
    let mut warnings = Vec::new();
    let document = PdfDocument::from_html(
        html,
        &BTreeMap::new(),
        &BTreeMap::new(),
        &GeneratePdfOptions::default(),
        &mut warnings,
    )
    .map_err(|err| RenderError::Converter(err.to_string()))?;

    let bytes = document.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(warnings = warnings.len(), "html converter reported warnings");
    }
    Ok(bytes)
}
