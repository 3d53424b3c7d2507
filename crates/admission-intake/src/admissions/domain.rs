use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// `<prefix><year><four random digits>`. Collisions are possible and left to the
    /// repository to reject.
    pub fn generate(prefix: &str, at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().as_u128() % 10_000;
        ApplicationId(format!("{prefix}{}{suffix:04}", at.year()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to embed in a file name.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status of an application. Only `Submitted` is assigned by intake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    #[default]
    Submitted,
    Approved,
    Rejected,
}

impl AdmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AdmissionStatus::Submitted => "submitted",
            AdmissionStatus::Approved => "approved",
            AdmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicQualification {
    Matriculation,
    Intermediate,
    Other,
}

impl AcademicQualification {
    pub const fn label(self) -> &'static str {
        match self {
            AcademicQualification::Matriculation => "Matriculation",
            AcademicQualification::Intermediate => "Intermediate",
            AcademicQualification::Other => "Other",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "matriculation" => Some(AcademicQualification::Matriculation),
            "intermediate" => Some(AcademicQualification::Intermediate),
            "other" => Some(AcademicQualification::Other),
            _ => None,
        }
    }
}

/// Board examination result for one level of schooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardResult {
    pub board: String,
    pub year: u16,
    pub grade: String,
    pub marks: String,
    pub total_marks: Option<String>,
}

/// Applicant-provided details. Every field is optional here; intake validation is what
/// guarantees presence, renderers never assume it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub candidate_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub guardian_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub cnic_number: Option<String>,
    pub domicile_district: Option<String>,
    pub gender: Option<Gender>,
    pub postal_address: Option<String>,
    pub contact_number: Option<String>,
    pub matriculation: Option<BoardResult>,
    pub intermediate: Option<BoardResult>,
    pub academic_qualification: Option<AcademicQualification>,
    pub other_qualification: Option<String>,
    /// Kept as entered; fractional scores such as 85.5 are valid.
    pub law_test_score: Option<f64>,
    pub payment_transaction: Option<String>,
}

/// Paths of the three uploaded supporting documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub profile_image: Option<PathBuf>,
    pub law_test_score_image: Option<PathBuf>,
    pub payment_transaction_image: Option<PathBuf>,
}

impl DocumentSet {
    pub fn get(&self, field: DocumentField) -> Option<&PathBuf> {
        match field {
            DocumentField::ProfileImage => self.profile_image.as_ref(),
            DocumentField::LawTestScoreImage => self.law_test_score_image.as_ref(),
            DocumentField::PaymentTransactionImage => self.payment_transaction_image.as_ref(),
        }
    }

    pub fn set(&mut self, field: DocumentField, path: PathBuf) {
        let slot = match field {
            DocumentField::ProfileImage => &mut self.profile_image,
            DocumentField::LawTestScoreImage => &mut self.law_test_score_image,
            DocumentField::PaymentTransactionImage => &mut self.payment_transaction_image,
        };
        *slot = Some(path);
    }

    pub fn missing(&self) -> Vec<DocumentField> {
        DocumentField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        DocumentField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field))
    }
}

/// The upload slots accepted by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentField {
    ProfileImage,
    LawTestScoreImage,
    PaymentTransactionImage,
}

impl DocumentField {
    pub const ALL: [DocumentField; 3] = [
        DocumentField::ProfileImage,
        DocumentField::LawTestScoreImage,
        DocumentField::PaymentTransactionImage,
    ];

    /// Multipart field name used by the intake form.
    pub const fn form_name(self) -> &'static str {
        match self {
            DocumentField::ProfileImage => "profileImage",
            DocumentField::LawTestScoreImage => "lawTestScoreImage",
            DocumentField::PaymentTransactionImage => "paymentTransactionImage",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentField::ProfileImage => "Profile Image",
            DocumentField::LawTestScoreImage => "Law Test Score",
            DocumentField::PaymentTransactionImage => "Payment Transaction",
        }
    }

    pub fn from_form_name(name: &str) -> Option<Self> {
        DocumentField::ALL
            .into_iter()
            .find(|field| field.form_name() == name)
    }
}

/// Stored application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub application_id: ApplicationId,
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub status: AdmissionStatus,
    #[serde(default)]
    pub applicant: ApplicantDetails,
    #[serde(default)]
    pub documents: DocumentSet,
}

impl AdmissionRecord {
    /// A record with only system fields populated.
    pub fn new(application_id: ApplicationId, submission_date: DateTime<Utc>) -> Self {
        Self {
            application_id,
            submission_date,
            status: AdmissionStatus::Submitted,
            applicant: ApplicantDetails::default(),
            documents: DocumentSet::default(),
        }
    }

    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.applicant.candidate_name, &self.applicant.surname]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Raw intake form as posted by the browser. Field names follow the form's camelCase
/// inputs; values are untyped until [`super::validation::IntakeGuard`] parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionSubmission {
    pub candidate_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub guardian_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub cnic_number: Option<String>,
    pub domicile_district: Option<String>,
    pub gender: Option<String>,
    pub postal_address: Option<String>,
    pub contact_number: Option<String>,
    pub matriculation_board: Option<String>,
    pub matriculation_year: Option<String>,
    pub matriculation_grade: Option<String>,
    pub matriculation_marks: Option<String>,
    pub matriculation_total_marks: Option<String>,
    pub intermediate_board: Option<String>,
    pub intermediate_year: Option<String>,
    pub intermediate_grade: Option<String>,
    pub intermediate_marks: Option<String>,
    pub intermediate_total_marks: Option<String>,
    pub academic_qualification: Option<String>,
    pub other_qualification: Option<String>,
    pub law_test_score: Option<String>,
    pub payment_transaction: Option<String>,
}

impl AdmissionSubmission {
    /// Build a submission from flat form fields. Unknown keys are ignored.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, serde_json::Error> {
        let map = fields
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::from_value(serde_json::Value::Object(map))
    }
}

/// Response returned to the browser after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub message: String,
    pub application_id: ApplicationId,
    pub submission_date: DateTime<Utc>,
    pub pdf_download_url: String,
    pub files: BTreeMap<String, String>,
}
