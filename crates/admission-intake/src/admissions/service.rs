use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    AdmissionRecord, AdmissionStatus, AdmissionSubmission, ApplicantDetails, ApplicationId,
    DocumentField, DocumentSet, SubmissionReceipt,
};
use super::repository::{AdmissionPage, AdmissionRepository, Pagination, RepositoryError};
use super::uploads::{PendingUpload, UploadError, UploadStore};
use super::validation::{IntakeGuard, SubmissionError};
use crate::config::AppConfig;
use crate::notifications::{MailTransport, NotificationDispatcher, NotificationSettings};
use crate::rendering::{RenderDispatcher, RenderError, RenderOptions, RenderReport};

/// Attempts at drawing an unused application id before giving up.
pub const MAX_ID_ATTEMPTS: u32 = 3;
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Paths and switches the service needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub id_prefix: String,
    pub pdf_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub render_options: RenderOptions,
    pub notifications: NotificationSettings,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            id_prefix: config.branding.id_prefix.clone(),
            pdf_dir: config.storage.pdf_dir.clone(),
            upload_dir: config.storage.upload_dir.clone(),
            max_upload_bytes: config.storage.max_upload_bytes,
            render_options: RenderOptions {
                force_fallback: config.rendering.force_fallback,
            },
            notifications: NotificationSettings::from_config(&config.mail, &config.branding),
        }
    }
}

/// A multipart submission after the body has been read but before anything is stored.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub fields: BTreeMap<String, String>,
    pub uploads: Vec<PendingUpload>,
}

/// Service composing validation, storage, PDF rendering, and notifications.
pub struct AdmissionService<R, M> {
    guard: Arc<IntakeGuard>,
    repository: Arc<R>,
    notifier: Arc<NotificationDispatcher<M>>,
    renderer: Arc<RenderDispatcher>,
    uploads: Arc<UploadStore>,
    id_prefix: String,
    pdf_dir: PathBuf,
    render_options: RenderOptions,
}

impl<R, M> AdmissionService<R, M>
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    pub fn new(
        repository: Arc<R>,
        transport: Arc<M>,
        renderer: RenderDispatcher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            guard: Arc::new(IntakeGuard::default()),
            repository,
            notifier: Arc::new(NotificationDispatcher::new(
                transport,
                settings.notifications,
            )),
            renderer: Arc::new(renderer),
            uploads: Arc::new(UploadStore::new(
                settings.upload_dir,
                settings.max_upload_bytes,
            )),
            id_prefix: settings.id_prefix,
            pdf_dir: settings.pdf_dir,
            render_options: settings.render_options,
        }
    }

    pub fn with_guard(mut self, guard: IntakeGuard) -> Self {
        self.guard = Arc::new(guard);
        self
    }

    /// Store the uploads of a multipart form, then submit it. Stored files are removed
    /// again when the submission is rejected.
    pub fn submit_form(
        &self,
        form: SubmissionForm,
    ) -> Result<SubmissionReceipt, AdmissionServiceError> {
        let mut documents = DocumentSet::default();
        for upload in &form.uploads {
            if documents.get(upload.field).is_some() {
                continue;
            }
            match self.uploads.store(upload) {
                Ok(path) => documents.set(upload.field, path),
                Err(err) => {
                    self.uploads.discard(documents.paths());
                    return Err(err.into());
                }
            }
        }

        let submission = match AdmissionSubmission::from_fields(&form.fields) {
            Ok(submission) => submission,
            Err(err) => {
                self.uploads.discard(documents.paths());
                return Err(SubmissionError::InvalidValue {
                    field: "form",
                    value: err.to_string(),
                }
                .into());
            }
        };

        self.submit(submission, documents.clone()).inspect_err(|_| {
            self.uploads.discard(documents.paths());
        })
    }

    /// Validate and persist a submission, render its PDF, and notify admin and applicant.
    pub fn submit(
        &self,
        submission: AdmissionSubmission,
        documents: DocumentSet,
    ) -> Result<SubmissionReceipt, AdmissionServiceError> {
        let applicant = self.guard.validate(submission, &documents)?;
        let record = self.insert_with_fresh_id(applicant, documents)?;
        let id = record.application_id.clone();
        info!(application_id = %id, "admission stored");

        let destination = self.pdf_destination(&id);
        match self
            .renderer
            .render_to(&record, &destination, self.render_options)
        {
            Ok(report) => self.notify(&record, &report.path),
            Err(err) => {
                warn!(application_id = %id, error = %err, "pdf generation failed; it will be retried on download");
            }
        }

        let files = DocumentField::ALL
            .into_iter()
            .filter_map(|field| {
                let name = record.documents.get(field)?.file_name()?;
                Some((
                    field.form_name().to_string(),
                    name.to_string_lossy().into_owned(),
                ))
            })
            .collect();

        Ok(SubmissionReceipt {
            message: "Application submitted successfully".to_string(),
            pdf_download_url: format!("/api/admission/download-pdf/{id}"),
            application_id: id,
            submission_date: record.submission_date,
            files,
        })
    }

    pub fn get(&self, id: &ApplicationId) -> Result<AdmissionRecord, AdmissionServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Newest-first listing. Missing or zero values fall back to page 1 and the default limit.
    pub fn list(
        &self,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Result<AdmissionPage, AdmissionServiceError> {
        let page = page.filter(|page| *page > 0).unwrap_or(1);
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);

        let total = self.repository.count()?;
        let pagination = Pagination::new(page, limit, total);
        let admissions = self.repository.list(pagination.offset(), limit)?;
        Ok(AdmissionPage {
            admissions,
            pagination,
        })
    }

    /// Path of the stored PDF, rendering it first when it does not exist yet.
    pub fn pdf_path(&self, id: &ApplicationId) -> Result<PathBuf, AdmissionServiceError> {
        if !id.is_well_formed() {
            return Err(RepositoryError::NotFound.into());
        }
        let destination = self.pdf_destination(id);
        if destination.is_file() {
            return Ok(destination);
        }

        let record = self.get(id)?;
        let report = self.render_pdf(&record, &destination, self.render_options)?;
        Ok(report.path)
    }

    /// PDF bytes for download, rendered on demand.
    pub fn read_pdf(&self, id: &ApplicationId) -> Result<Vec<u8>, AdmissionServiceError> {
        let path = self.pdf_path(id)?;
        Ok(fs::read(path)?)
    }

    pub fn render_pdf(
        &self,
        record: &AdmissionRecord,
        destination: &Path,
        options: RenderOptions,
    ) -> Result<RenderReport, AdmissionServiceError> {
        Ok(self.renderer.render_to(record, destination, options)?)
    }

    pub fn pdf_destination(&self, id: &ApplicationId) -> PathBuf {
        self.pdf_dir.join(format!("{id}_application.pdf"))
    }

    fn insert_with_fresh_id(
        &self,
        applicant: ApplicantDetails,
        documents: DocumentSet,
    ) -> Result<AdmissionRecord, AdmissionServiceError> {
        let submission_date = Utc::now();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let record = AdmissionRecord {
                application_id: ApplicationId::generate(&self.id_prefix, submission_date),
                submission_date,
                status: AdmissionStatus::Submitted,
                applicant: applicant.clone(),
                documents: documents.clone(),
            };
            match self.repository.insert(record) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Conflict) => {
                    warn!(attempt, "application id already taken, drawing another");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(AdmissionServiceError::IdCollision {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    fn notify(&self, record: &AdmissionRecord, pdf_path: &Path) {
        match fs::read(pdf_path) {
            Ok(pdf) => {
                let summary = self.notifier.notify_submission(record, &pdf);
                info!(
                    application_id = %record.application_id,
                    admin = ?summary.admin,
                    applicant = ?summary.applicant,
                    "notifications dispatched"
                );
            }
            Err(err) => {
                warn!(application_id = %record.application_id, error = %err, "could not read pdf for notifications");
            }
        }
    }
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("could not allocate a unique application id after {attempts} attempts")]
    IdCollision { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}
