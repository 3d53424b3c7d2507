use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::admissions::domain::{
    AdmissionRecord, AdmissionSubmission, ApplicationId, DocumentField, DocumentSet,
};
use crate::admissions::repository::{AdmissionRepository, RepositoryError};
use crate::admissions::service::{AdmissionService, ServiceSettings};
use crate::admissions::uploads::PendingUpload;
use crate::admissions::validation::IntakeGuard;
use crate::admissions::admission_router;
use crate::config::BrandingConfig;
use crate::notifications::{MemoryOutbox, NotificationSettings};
use crate::rendering::{
    DocumentTemplate, RenderDispatcher, RenderError, RenderOptions, RenderTier, Renderer,
    SyntheticPdfRenderer,
};

pub(super) const BOUNDARY: &str = "admission-test-boundary";
pub(super) const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub(super) fn valid_fields() -> BTreeMap<String, String> {
    [
        ("candidateName", "Sana"),
        ("surname", "Memon"),
        ("email", "Sana.Memon@Example.com"),
        ("guardianName", "Abdul Memon"),
        ("dateOfBirth", "2003-05-17"),
        ("cnicNumber", "41303-1234567-8"),
        ("domicileDistrict", "Hyderabad"),
        ("gender", "female"),
        ("postalAddress", "House 12, Latifabad Unit 7"),
        ("contactNumber", "03001234567"),
        ("matriculationBoard", "BISE Hyderabad"),
        ("matriculationYear", "2019"),
        ("matriculationGrade", "A"),
        ("matriculationMarks", "950"),
        ("matriculationTotalMarks", "1100"),
        ("intermediateBoard", "BISE Hyderabad"),
        ("intermediateYear", "2021"),
        ("intermediateGrade", "A"),
        ("intermediateMarks", "880"),
        ("intermediateTotalMarks", "1100"),
        ("academicQualification", "intermediate"),
        ("lawTestScore", "72"),
        ("paymentTransaction", "TXN-889911"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

pub(super) fn submission() -> AdmissionSubmission {
    AdmissionSubmission::from_fields(&valid_fields()).expect("valid form")
}

pub(super) fn guard() -> IntakeGuard {
    IntakeGuard::with_latest_exam_year(2025)
}

/// Three small images on disk, one per document slot.
pub(super) fn documents(dir: &Path) -> DocumentSet {
    let mut documents = DocumentSet::default();
    for field in DocumentField::ALL {
        let path = dir.join(format!("{}.png", field.form_name()));
        fs::write(&path, PNG_BYTES).expect("write document");
        documents.set(field, path);
    }
    documents
}

pub(super) fn uploads() -> Vec<PendingUpload> {
    DocumentField::ALL
        .into_iter()
        .map(|field| PendingUpload {
            field,
            file_name: Some(format!("{}.png", field.form_name())),
            content_type: Some("image/png".to_string()),
            bytes: PNG_BYTES.to_vec(),
        })
        .collect()
}

pub(super) fn template() -> Arc<DocumentTemplate> {
    Arc::new(DocumentTemplate::new(BrandingConfig {
        logo_candidates: Vec::new(),
        ..BrandingConfig::default()
    }))
}

/// Chain with only the synthetic writer so tests never start a browser.
pub(super) fn synthetic_chain() -> RenderDispatcher {
    RenderDispatcher::new(vec![RenderTier::terminal(Arc::new(
        SyntheticPdfRenderer::new(template()),
    ))])
    .expect("tiers")
}

pub(super) struct FixedRenderer(pub(super) usize);

impl Renderer for FixedRenderer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn render(&self, _record: &AdmissionRecord) -> Result<Vec<u8>, RenderError> {
        Ok(vec![b'X'; self.0])
    }
}

pub(super) struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn render(&self, _record: &AdmissionRecord) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Browser("chrome not installed".to_string()))
    }
}

pub(super) struct Workspace {
    pub(super) root: tempfile::TempDir,
}

impl Workspace {
    pub(super) fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub(super) fn uploads(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub(super) fn pdfs(&self) -> PathBuf {
        self.root.path().join("pdfs")
    }

    pub(super) fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            id_prefix: "HLC".to_string(),
            pdf_dir: self.pdfs(),
            upload_dir: self.uploads(),
            max_upload_bytes: 1024 * 1024,
            render_options: RenderOptions::default(),
            notifications: NotificationSettings {
                admin_email: Some("office@example.edu".to_string()),
                from: "admissions@example.edu".to_string(),
                portal_name: "Admission Portal".to_string(),
            },
        }
    }
}

pub(super) fn build_service(
    workspace: &Workspace,
) -> (
    AdmissionService<MemoryRepository, MemoryOutbox>,
    Arc<MemoryRepository>,
    Arc<MemoryOutbox>,
) {
    build_service_with(workspace, synthetic_chain())
}

pub(super) fn build_service_with(
    workspace: &Workspace,
    renderer: RenderDispatcher,
) -> (
    AdmissionService<MemoryRepository, MemoryOutbox>,
    Arc<MemoryRepository>,
    Arc<MemoryOutbox>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let service = AdmissionService::new(
        repository.clone(),
        outbox.clone(),
        renderer,
        workspace.settings(),
    )
    .with_guard(guard());
    (service, repository, outbox)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<Vec<AdmissionRecord>>>,
}

impl AdmissionRepository for MemoryRepository {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.application_id == record.application_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| &record.application_id == id)
            .cloned())
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records = guard.clone();
        records.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").len())
    }
}

pub(super) struct ConflictRepository;

impl AdmissionRepository for ConflictRepository {
    fn insert(&self, _record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        Ok(None)
    }

    fn list(&self, _offset: usize, _limit: usize) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}

pub(super) struct UnavailableRepository;

impl AdmissionRepository for UnavailableRepository {
    fn insert(&self, _record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _offset: usize, _limit: usize) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(
    service: AdmissionService<MemoryRepository, MemoryOutbox>,
) -> axum::Router {
    admission_router(Arc::new(service))
}

/// Hand-built multipart body in the shape a browser form posts.
pub(super) fn multipart_request(
    fields: &BTreeMap<String, String>,
    files: &[(&str, &str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/admission/submit")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

pub(super) fn all_files() -> Vec<(&'static str, &'static str, &'static str, &'static [u8])> {
    DocumentField::ALL
        .into_iter()
        .map(|field| (field.form_name(), "scan.png", "image/png", PNG_BYTES))
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn files_in(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
