use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::debug;

use super::images::{embed_image, EmbeddedImage, DEFAULT_MAX_IMAGE_BYTES};
use crate::admissions::domain::{AdmissionRecord, BoardResult, DocumentField};
use crate::config::BrandingConfig;

const MISSING: &str = "N/A";
const SIGNATURE_NOTICE: &str =
    "This is a computer-generated document and does not require a signature.";

/// Labelled value printed in a document section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub fields: Vec<Field>,
}

/// Builds the application document in its HTML and plain-text forms. Both forms come
/// from the same section list so every renderer tier prints the same fields.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    branding: BrandingConfig,
    max_image_bytes: u64,
}

impl DocumentTemplate {
    pub fn new(branding: BrandingConfig) -> Self {
        Self {
            branding,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn sections(&self, record: &AdmissionRecord) -> Vec<Section> {
        let applicant = &record.applicant;
        let personal = vec![
            field("Full Name", record.full_name()),
            field("Email", applicant.email.clone()),
            field("Guardian Name", applicant.guardian_name.clone()),
            field(
                "Date of Birth",
                applicant
                    .date_of_birth
                    .map(|date| date.format("%B %-d, %Y").to_string()),
            ),
            field("CNIC Number", applicant.cnic_number.clone()),
            field("Gender", applicant.gender.map(|g| g.label().to_string())),
            field("Domicile District", applicant.domicile_district.clone()),
            field("Contact Number", applicant.contact_number.clone()),
            field("Postal Address", applicant.postal_address.clone()),
        ];

        let mut academic = board_fields("Matriculation", applicant.matriculation.as_ref());
        academic.extend(board_fields("Intermediate", applicant.intermediate.as_ref()));
        academic.push(field(
            "Academic Qualification",
            applicant
                .academic_qualification
                .map(|q| q.label().to_string()),
        ));
        academic.push(field(
            "Other Qualification",
            applicant.other_qualification.clone(),
        ));
        academic.push(Field {
            label: "Law Test Score",
            value: format!(
                "{}/100",
                applicant
                    .law_test_score
                    .map(|score| score.to_string())
                    .unwrap_or_else(|| MISSING.to_string())
            ),
        });

        let payment = vec![field(
            "Payment Transaction",
            applicant.payment_transaction.clone(),
        )];

        let documents = DocumentField::ALL
            .into_iter()
            .map(|slot| Field {
                label: slot.label(),
                value: record
                    .documents
                    .get(slot)
                    .and_then(|path| path.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "not provided".to_string()),
            })
            .collect();

        vec![
            Section {
                title: "Personal Information",
                fields: personal,
            },
            Section {
                title: "Academic Information",
                fields: academic,
            },
            Section {
                title: "Payment Information",
                fields: payment,
            },
            Section {
                title: "Uploaded Documents",
                fields: documents,
            },
        ]
    }

    /// Plain-text layout used by the synthetic PDF writer.
    pub fn render_text(&self, record: &AdmissionRecord) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} - Admission Application",
            self.branding.institution_name
        );
        text.push('\n');
        let _ = writeln!(text, "Application ID: {}", record.application_id);
        let _ = writeln!(text, "Submitted: {}", submitted_on(record));
        let _ = writeln!(text, "Status: {}", record.status.label());

        for section in self.sections(record) {
            text.push('\n');
            let _ = writeln!(text, "{}", section.title.to_uppercase());
            for entry in section.fields {
                let _ = writeln!(text, "{}: {}", entry.label, entry.value);
            }
        }

        text.push('\n');
        let _ = writeln!(text, "{}", self.branding.portal_name);
        text.push_str(SIGNATURE_NOTICE);
        text
    }

    /// Full HTML document with inlined images, used by the browser and converter tiers.
    pub fn render_html(&self, record: &AdmissionRecord) -> String {
        let mut html = String::with_capacity(8 * 1024);
        let title = format!("Admission Application - {}", record.application_id);

        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"container\">\n",
            escape_html(&title),
            STYLESHEET
        );

        html.push_str("<div class=\"header\">\n");
        if let Some(logo) = self.logo() {
            let _ = writeln!(
                html,
                "<img src=\"{}\" alt=\"Institution logo\" class=\"logo\">",
                logo.data_uri
            );
        }
        let _ = writeln!(
            html,
            "<h1>{}</h1>\n<h2>Admission Application</h2>",
            escape_html(&self.branding.institution_name)
        );
        let _ = writeln!(
            html,
            "<div class=\"application-info\"><p>Application ID: {}</p><p>Submitted: {}</p></div>",
            escape_html(record.application_id.as_str()),
            escape_html(&submitted_on(record))
        );
        html.push_str("</div>\n");

        for section in self.sections(record) {
            let _ = writeln!(
                html,
                "<div class=\"section\">\n<div class=\"section-title\">{}</div>",
                escape_html(section.title)
            );
            if section.title == "Uploaded Documents" {
                self.write_document_images(&mut html, record);
            } else {
                html.push_str("<div class=\"field-grid\">\n");
                for entry in &section.fields {
                    let _ = writeln!(
                        html,
                        "<div class=\"field\"><span class=\"field-label\">{}:</span><div class=\"field-value\">{}</div></div>",
                        escape_html(entry.label),
                        escape_html(&entry.value)
                    );
                }
                html.push_str("</div>\n");
            }
            html.push_str("</div>\n");
        }

        let _ = write!(
            html,
            "<div class=\"footer\"><p>{}</p><p>{}</p></div>\n</div>\n</body>\n</html>\n",
            escape_html(&self.branding.portal_name),
            SIGNATURE_NOTICE
        );
        html
    }

    fn write_document_images(&self, html: &mut String, record: &AdmissionRecord) {
        html.push_str("<div class=\"image-section\">\n");
        for slot in DocumentField::ALL {
            let label = escape_html(slot.label());
            let embedded = embed_image(
                record.documents.get(slot).map(PathBuf::as_path),
                self.max_image_bytes,
            );
            match embedded {
                Some(image) => {
                    let _ = writeln!(
                        html,
                        "<div class=\"image-container\"><span class=\"image-label\">{label}</span><img src=\"{}\" alt=\"{label}\" class=\"uploaded-image\"></div>",
                        image.data_uri
                    );
                }
                None => {
                    let _ = writeln!(
                        html,
                        "<div class=\"image-container\"><span class=\"image-label\">{label}</span><div class=\"image-placeholder\">No image available</div></div>"
                    );
                }
            }
        }
        html.push_str("</div>\n");
    }

    fn logo(&self) -> Option<EmbeddedImage> {
        let found = self
            .branding
            .logo_candidates
            .iter()
            .find(|candidate| candidate.is_file());
        match found {
            Some(path) => embed_image(Some(path.as_path()), self.max_image_bytes),
            None => {
                debug!(
                    candidates = self.branding.logo_candidates.len(),
                    "logo not found, rendering without it"
                );
                None
            }
        }
    }
}

fn field(label: &'static str, value: Option<String>) -> Field {
    Field {
        label,
        value: value
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| MISSING.to_string()),
    }
}

fn board_fields(level: &'static str, result: Option<&BoardResult>) -> Vec<Field> {
    let (board, year, grade, marks) = match level {
        "Matriculation" => (
            "Matriculation Board",
            "Matriculation Year",
            "Matriculation Grade",
            "Matriculation Marks",
        ),
        _ => (
            "Intermediate Board",
            "Intermediate Year",
            "Intermediate Grade",
            "Intermediate Marks",
        ),
    };

    vec![
        field(board, result.map(|r| r.board.clone())),
        field(year, result.map(|r| r.year.to_string())),
        field(grade, result.map(|r| r.grade.clone())),
        Field {
            label: marks,
            value: format!(
                "{}/{}",
                result.map(|r| r.marks.as_str()).unwrap_or(MISSING),
                result
                    .and_then(|r| r.total_marks.as_deref())
                    .unwrap_or(MISSING)
            ),
        },
    ]
}

fn submitted_on(record: &AdmissionRecord) -> String {
    record.submission_date.format("%B %-d, %Y").to_string()
}

/// Escape text for interpolation into HTML element content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const STYLESHEET: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; background: #fff; padding: 20px; }
.container { max-width: 800px; margin: 0 auto; }
.header { text-align: center; margin-bottom: 30px; border-bottom: 3px solid #4F46E5; padding-bottom: 20px; }
.logo { max-width: 80px; height: auto; margin-bottom: 10px; }
.header h1 { color: #4F46E5; font-size: 28px; margin-bottom: 5px; }
.header h2 { color: #666; font-size: 20px; margin-bottom: 15px; }
.application-info { background: #f8f9ff; padding: 10px; border-radius: 5px; }
.application-info p { margin: 5px 0; font-weight: bold; }
.section { margin-bottom: 25px; page-break-inside: avoid; }
.section-title { background: #4F46E5; color: #fff; padding: 12px 15px; font-size: 16px; font-weight: bold; margin-bottom: 15px; }
.field-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 15px; }
.field-label { font-weight: bold; color: #555; display: block; margin-bottom: 3px; }
.field-value { padding: 5px 0; border-bottom: 1px solid #eee; }
.image-section { display: flex; justify-content: space-around; flex-wrap: wrap; }
.image-container { text-align: center; margin: 10px; }
.image-label { font-weight: bold; display: block; margin-bottom: 10px; }
.uploaded-image { max-width: 150px; max-height: 150px; border: 1px solid #ddd; border-radius: 5px; }
.image-placeholder { width: 150px; height: 150px; display: flex; align-items: center; justify-content: center; background: #f1f5f9; color: #718096; font-size: 12px; border: 1px dashed #cbd5e0; }
.footer { text-align: center; margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 12px; }
@media print { body { print-color-adjust: exact; } }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::domain::{ApplicantDetails, ApplicationId, Gender};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::fs;

    fn template() -> DocumentTemplate {
        DocumentTemplate::new(BrandingConfig {
            logo_candidates: Vec::new(),
            ..BrandingConfig::default()
        })
    }

    fn bare_record() -> AdmissionRecord {
        AdmissionRecord::new(
            ApplicationId("HLC20250007".to_string()),
            Utc.with_ymd_and_hms(2025, 7, 4, 10, 30, 0).unwrap(),
        )
    }

    #[test]
    fn bare_record_renders_placeholders_instead_of_failing() {
        let html = template().render_html(&bare_record());

        assert!(html.contains("HLC20250007"));
        assert!(html.contains("July 4, 2025"));
        assert!(html.contains("N/A"));
        assert_eq!(html.matches("No image available").count(), 3);
        assert!(!html.contains("data:image"));
    }

    #[test]
    fn nonexistent_image_paths_render_placeholder() {
        let mut record = bare_record();
        record.documents.profile_image = Some(PathBuf::from("/nonexistent/profile.png"));

        let html = template().render_html(&record);
        assert_eq!(html.matches("No image available").count(), 3);
    }

    #[test]
    fn readable_images_are_inlined() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.png");
        fs::write(&path, [1u8, 2, 3]).expect("write");
        let mut record = bare_record();
        record.documents.profile_image = Some(path);

        let html = template().render_html(&record);
        assert!(html.contains("data:image/png;base64,AQID"));
        assert_eq!(html.matches("No image available").count(), 2);
    }

    #[test]
    fn images_above_the_embed_limit_use_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.png");
        fs::write(&path, [7u8; 64]).expect("write");
        let mut record = bare_record();
        record.documents.profile_image = Some(path);

        let html = template().with_max_image_bytes(32).render_html(&record);
        assert_eq!(html.matches("No image available").count(), 3);
        assert!(!html.contains("data:image"));
    }

    #[test]
    fn applicant_values_are_escaped() {
        let mut record = bare_record();
        record.applicant = ApplicantDetails {
            candidate_name: Some("<script>".to_string()),
            gender: Some(Gender::Female),
            date_of_birth: NaiveDate::from_ymd_opt(2004, 2, 9),
            ..ApplicantDetails::default()
        };

        let html = template().render_html(&record);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("February 9, 2004"));
    }

    #[test]
    fn text_layout_lists_every_section() {
        let text = template().render_text(&bare_record());
        for heading in [
            "PERSONAL INFORMATION",
            "ACADEMIC INFORMATION",
            "PAYMENT INFORMATION",
            "UPLOADED DOCUMENTS",
        ] {
            assert!(text.contains(heading), "missing {heading}");
        }
        assert!(text.contains("Matriculation Marks: N/A/N/A"));
        assert!(text.contains("Law Test Score: N/A/100"));
        assert!(text.contains("Profile Image: not provided"));
    }

    #[test]
    fn fractional_law_test_score_is_shown_as_entered() {
        let mut record = bare_record();
        record.applicant.law_test_score = Some(85.5);
        assert!(template().render_text(&record).contains("Law Test Score: 85.5/100"));

        record.applicant.law_test_score = Some(72.0);
        assert!(template().render_html(&record).contains("72/100"));
    }

    #[test]
    fn logo_is_taken_from_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logo = dir.path().join("logo.png");
        fs::write(&logo, [9u8, 9, 9]).expect("write logo");
        let template = DocumentTemplate::new(BrandingConfig {
            logo_candidates: vec![dir.path().join("missing.png"), logo],
            ..BrandingConfig::default()
        });

        let html = template.render_html(&bare_record());
        assert!(html.contains("alt=\"Institution logo\""));
    }
}
