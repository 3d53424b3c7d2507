//! Admission intake: form validation, document uploads, record storage, and the HTTP
//! routes that tie them to PDF rendering and notifications.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod uploads;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AcademicQualification, AdmissionRecord, AdmissionStatus, AdmissionSubmission,
    ApplicantDetails, ApplicationId, BoardResult, DocumentField, DocumentSet, Gender,
    SubmissionReceipt,
};
pub use repository::{AdmissionPage, AdmissionRepository, Pagination, RepositoryError};
pub use router::admission_router;
pub use service::{AdmissionService, AdmissionServiceError, ServiceSettings, SubmissionForm};
pub use uploads::{PendingUpload, UploadError, UploadStore};
pub use validation::{IntakeGuard, SubmissionError};
