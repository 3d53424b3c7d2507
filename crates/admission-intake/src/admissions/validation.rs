use chrono::{Datelike, NaiveDate, Utc};

use super::domain::{
    AcademicQualification, AdmissionSubmission, ApplicantDetails, BoardResult, DocumentField,
    DocumentSet, Gender,
};

const EARLIEST_EXAM_YEAR: u16 = 1990;
const MAX_LAW_TEST_SCORE: u8 = 100;

/// Reasons a submitted form is rejected before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} has an invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("{field} must be between {min} and {max} (found {found})")]
    OutOfRange {
        field: &'static str,
        min: u16,
        max: u16,
        found: i64,
    },
    #[error("{} upload is required", .0.label())]
    MissingDocument(DocumentField),
}

/// Turns raw form input into typed applicant details.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    latest_exam_year: u16,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        let year = u16::try_from(Utc::now().year()).unwrap_or(u16::MAX);
        Self::with_latest_exam_year(year)
    }
}

impl IntakeGuard {
    pub fn with_latest_exam_year(latest_exam_year: u16) -> Self {
        Self {
            latest_exam_year: latest_exam_year.max(EARLIEST_EXAM_YEAR),
        }
    }

    pub fn validate(
        &self,
        submission: AdmissionSubmission,
        documents: &DocumentSet,
    ) -> Result<ApplicantDetails, SubmissionError> {
        if let Some(field) = documents.missing().into_iter().next() {
            return Err(SubmissionError::MissingDocument(field));
        }

        let candidate_name = required("candidateName", submission.candidate_name)?;
        let surname = required("surname", submission.surname)?;
        let email = required("email", submission.email)?.to_ascii_lowercase();
        if !looks_like_email(&email) {
            return Err(SubmissionError::InvalidValue {
                field: "email",
                value: email,
            });
        }
        let guardian_name = required("guardianName", submission.guardian_name)?;
        let date_of_birth = parse_date("dateOfBirth", submission.date_of_birth)?;
        let cnic_number = required("cnicNumber", submission.cnic_number)?;
        let domicile_district = required("domicileDistrict", submission.domicile_district)?;
        let gender_raw = required("gender", submission.gender)?;
        let gender = Gender::parse(&gender_raw).ok_or(SubmissionError::InvalidValue {
            field: "gender",
            value: gender_raw,
        })?;
        let postal_address = required("postalAddress", submission.postal_address)?;
        let contact_number = required("contactNumber", submission.contact_number)?;

        let matriculation = BoardResult {
            board: required("matriculationBoard", submission.matriculation_board)?,
            year: self.exam_year("matriculationYear", submission.matriculation_year)?,
            grade: required("matriculationGrade", submission.matriculation_grade)?,
            marks: required("matriculationMarks", submission.matriculation_marks)?,
            total_marks: optional(submission.matriculation_total_marks),
        };
        let intermediate = BoardResult {
            board: required("intermediateBoard", submission.intermediate_board)?,
            year: self.exam_year("intermediateYear", submission.intermediate_year)?,
            grade: required("intermediateGrade", submission.intermediate_grade)?,
            marks: required("intermediateMarks", submission.intermediate_marks)?,
            total_marks: optional(submission.intermediate_total_marks),
        };

        let qualification_raw = required("academicQualification", submission.academic_qualification)?;
        let academic_qualification = AcademicQualification::parse(&qualification_raw).ok_or(
            SubmissionError::InvalidValue {
                field: "academicQualification",
                value: qualification_raw,
            },
        )?;
        let other_qualification = optional(submission.other_qualification);
        if academic_qualification == AcademicQualification::Other && other_qualification.is_none()
        {
            return Err(SubmissionError::MissingField("otherQualification"));
        }

        let law_test_score = parse_law_test_score(submission.law_test_score)?;
        let payment_transaction = required("paymentTransaction", submission.payment_transaction)?;

        Ok(ApplicantDetails {
            candidate_name: Some(candidate_name),
            surname: Some(surname),
            email: Some(email),
            guardian_name: Some(guardian_name),
            date_of_birth: Some(date_of_birth),
            cnic_number: Some(cnic_number),
            domicile_district: Some(domicile_district),
            gender: Some(gender),
            postal_address: Some(postal_address),
            contact_number: Some(contact_number),
            matriculation: Some(matriculation),
            intermediate: Some(intermediate),
            academic_qualification: Some(academic_qualification),
            other_qualification,
            law_test_score: Some(law_test_score),
            payment_transaction: Some(payment_transaction),
        })
    }

    fn exam_year(&self, field: &'static str, raw: Option<String>) -> Result<u16, SubmissionError> {
        let raw = required(field, raw)?;
        let year: i64 = raw.parse().map_err(|_| SubmissionError::InvalidValue {
            field,
            value: raw.clone(),
        })?;
        if year < i64::from(EARLIEST_EXAM_YEAR) || year > i64::from(self.latest_exam_year) {
            return Err(SubmissionError::OutOfRange {
                field,
                min: EARLIEST_EXAM_YEAR,
                max: self.latest_exam_year,
                found: year,
            });
        }
        Ok(year as u16)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, SubmissionError> {
    optional(value).ok_or(SubmissionError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_date(field: &'static str, raw: Option<String>) -> Result<NaiveDate, SubmissionError> {
    let raw = required(field, raw)?;
    // Browsers post `YYYY-MM-DD`; some clients send a full ISO timestamp.
    let date_part = raw.split('T').next().unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| SubmissionError::InvalidValue {
        field,
        value: raw.clone(),
    })
}

fn parse_law_test_score(raw: Option<String>) -> Result<f64, SubmissionError> {
    let field = "lawTestScore";
    let raw = required(field, raw)?;
    let score: f64 = raw.parse().map_err(|_| SubmissionError::InvalidValue {
        field,
        value: raw.clone(),
    })?;
    if !score.is_finite() || score < 0.0 || score > f64::from(MAX_LAW_TEST_SCORE) {
        return Err(SubmissionError::OutOfRange {
            field,
            min: 0,
            max: u16::from(MAX_LAW_TEST_SCORE),
            found: score as i64,
        });
    }
    Ok(score)
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}
