use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use tracing::debug;

use super::template::DocumentTemplate;
use super::{RenderError, Renderer};
use crate::admissions::domain::AdmissionRecord;
use crate::config::RenderingConfig;

const A4_WIDTH_INCHES: f64 = 8.27;
const A4_HEIGHT_INCHES: f64 = 11.69;
const MARGIN_INCHES: f64 = 0.4;

/// Prints the HTML document through a headless Chrome launched for this call only.
///
/// The browser handle lives on the stack of [`Renderer::render`]; dropping it on any
/// return path shuts the child process down.
#[derive(Debug, Clone)]
pub struct BrowserRenderer {
    template: Arc<DocumentTemplate>,
    executable: Option<PathBuf>,
    timeout: Duration,
}

impl BrowserRenderer {
    pub fn new(template: Arc<DocumentTemplate>, config: &RenderingConfig) -> Self {
        Self {
            template,
            executable: config.chrome_executable.clone(),
            timeout: config.timeout,
        }
    }

    fn launch(&self) -> Result<Browser, RenderError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.executable.clone())
            .idle_browser_timeout(self.timeout)
            .build()
            .map_err(|err| RenderError::Browser(err.to_string()))?;
        Browser::new(options).map_err(|err| RenderError::Browser(err.to_string()))
    }
}

impl Renderer for BrowserRenderer {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn render(&self, record: &AdmissionRecord) -> Result<Vec<u8>, RenderError> {
        let html = self.template.render_html(record);
        let mut page = tempfile::Builder::new()
            .prefix("admission-")
            .suffix(".html")
            .tempfile()
            .map_err(|err| RenderError::Browser(format!("temp file: {err}")))?;
        page.write_all(html.as_bytes())
            .map_err(|err| RenderError::Browser(format!("temp file: {err}")))?;
        let url = format!("file://{}", page.path().display());

        let browser = self.launch()?;
        let tab = browser
            .new_tab()
            .map_err(|err| RenderError::Browser(err.to_string()))?;
        tab.set_default_timeout(self.timeout);
        tab.navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|err| RenderError::Browser(err.to_string()))?;

        let pdf = tab
            .print_to_pdf(Some(PrintToPdfOptions {
                print_background: Some(true),
                paper_width: Some(A4_WIDTH_INCHES),
                paper_height: Some(A4_HEIGHT_INCHES),
                margin_top: Some(MARGIN_INCHES),
                margin_bottom: Some(MARGIN_INCHES),
                margin_left: Some(MARGIN_INCHES),
                margin_right: Some(MARGIN_INCHES),
                ..Default::default()
            }))
            .map_err(|err| RenderError::Browser(err.to_string()))?;

        debug!(
            application_id = %record.application_id,
            bytes = pdf.len(),
            "browser printed pdf"
        );
        Ok(pdf)
    }
}
