use admission_intake::admissions::AdmissionRecord;
use admission_intake::config::{AppConfig, BrandingConfig, RenderingConfig};
use admission_intake::error::AppError;
use admission_intake::rendering::{
    DocumentTemplate, RenderDispatcher, RenderOptions, RenderReport,
};
use admission_intake::telemetry;
use clap::Args;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Application record exported as JSON
    #[arg(long)]
    pub(crate) record: PathBuf,
    /// Destination path for the generated PDF
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Skip the HTML based tiers and emit the synthetic PDF directly
    #[arg(long)]
    pub(crate) force_fallback: bool,
}

pub(crate) fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let options = RenderOptions {
        force_fallback: args.force_fallback || config.rendering.force_fallback,
    };
    let report = render_record(
        &args.record,
        &args.output,
        options,
        &config.branding,
        &config.rendering,
    )?;

    println!("Rendered with: {}", report.renderer);
    println!("PDF: {} ({} bytes)", report.path.display(), report.bytes);
    if let Some(html) = report.html_path {
        println!("HTML copy: {}", html.display());
    }
    Ok(())
}

pub(crate) fn render_record(
    record_path: &Path,
    output: &Path,
    options: RenderOptions,
    branding: &BrandingConfig,
    rendering: &RenderingConfig,
) -> Result<RenderReport, AppError> {
    let raw = fs::read(record_path)?;
    let record: AdmissionRecord = serde_json::from_slice(&raw)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let template = Arc::new(DocumentTemplate::new(branding.clone()));
    let dispatcher = RenderDispatcher::standard(template, rendering);
    Ok(dispatcher.render_to(&record, output, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use admission_intake::admissions::ApplicationId;
    use chrono::{TimeZone, Utc};

    fn branding() -> BrandingConfig {
        BrandingConfig {
            logo_candidates: Vec::new(),
            ..BrandingConfig::default()
        }
    }

    #[test]
    fn forced_render_writes_synthetic_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut record = AdmissionRecord::new(
            ApplicationId("HLC20250042".to_string()),
            Utc.with_ymd_and_hms(2025, 4, 2, 11, 0, 0).unwrap(),
        );
        record.applicant.candidate_name = Some("Bilal".to_string());
        let record_path = dir.path().join("record.json");
        fs::write(&record_path, serde_json::to_vec(&record).expect("json")).expect("write");
        let output = dir.path().join("out").join("HLC20250042.pdf");

        let report = render_record(
            &record_path,
            &output,
            RenderOptions::forced(),
            &branding(),
            &RenderingConfig::default(),
        )
        .expect("render succeeds");

        assert_eq!(report.renderer, "synthetic");
        assert_eq!(report.path, output);
        assert!(fs::read(&output).expect("pdf").starts_with(b"%PDF-1.4"));
        assert!(output.with_extension("html").exists());
    }

    #[test]
    fn malformed_record_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let record_path = dir.path().join("record.json");
        fs::write(&record_path, b"{ not json").expect("write");

        let err = render_record(
            &record_path,
            &dir.path().join("out.pdf"),
            RenderOptions::forced(),
            &branding(),
            &RenderingConfig::default(),
        )
        .expect_err("invalid json");

        assert!(matches!(err, AppError::Io(ref io) if io.kind() == io::ErrorKind::InvalidData));
    }
}
