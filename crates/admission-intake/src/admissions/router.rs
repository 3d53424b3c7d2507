use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ApplicationId, DocumentField};
use super::repository::{AdmissionRepository, RepositoryError};
use super::service::{AdmissionService, AdmissionServiceError, SubmissionForm};
use super::uploads::{PendingUpload, UploadError};
use crate::notifications::MailTransport;

/// Three documents at the upload limit plus the text fields.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Router builder exposing the admission intake endpoints.
pub fn admission_router<R, M>(service: Arc<AdmissionService<R, M>>) -> Router
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route("/api/admission", get(list_handler::<R, M>))
        .route("/api/admission/submit", post(submit_handler::<R, M>))
        .route(
            "/api/admission/download-pdf/:application_id",
            get(download_handler::<R, M>),
        )
        .route("/api/admission/:application_id", get(status_handler::<R, M>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(service)
}

/// Query string of the listing route. Values that do not parse fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
}

impl ListParams {
    fn number(raw: Option<&str>) -> Option<usize> {
        raw.and_then(|value| value.trim().parse().ok())
    }
}

pub(crate) async fn submit_handler<R, M>(
    State(service): State<Arc<AdmissionService<R, M>>>,
    multipart: Multipart,
) -> Response
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let missing: Vec<&str> = DocumentField::ALL
        .into_iter()
        .filter(|field| !form.uploads.iter().any(|upload| upload.field == *field))
        .map(DocumentField::form_name)
        .collect();
    if !missing.is_empty() {
        let payload = json!({
            "error": "All required files must be uploaded",
            "missing": missing,
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    match tokio::task::spawn_blocking(move || service.submit_form(form)).await {
        Ok(Ok(receipt)) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Ok(Err(err)) => failure_response(err),
        Err(join) => {
            error!(error = %join, "submission task aborted");
            internal_error("Failed to submit application")
        }
    }
}

pub(crate) async fn status_handler<R, M>(
    State(service): State<Arc<AdmissionService<R, M>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn list_handler<R, M>(
    State(service): State<Arc<AdmissionService<R, M>>>,
    Query(params): Query<ListParams>,
) -> Response
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    let page = ListParams::number(params.page.as_deref());
    let limit = ListParams::number(params.limit.as_deref());
    match service.list(page, limit) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn download_handler<R, M>(
    State(service): State<Arc<AdmissionService<R, M>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: AdmissionRepository + 'static,
    M: MailTransport + 'static,
{
    let id = ApplicationId(application_id);
    let lookup = id.clone();
    match tokio::task::spawn_blocking(move || service.read_pdf(&lookup)).await {
        Ok(Ok(bytes)) => {
            let disposition = format!("attachment; filename=\"{id}_admission_application.pdf\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::APPLICATION_PDF.essence_str().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(Err(err)) => failure_response(err),
        Err(join) => {
            error!(error = %join, "pdf task aborted");
            internal_error("Failed to generate PDF")
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, String> {
    let mut fields = BTreeMap::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| format!("malformed form data: {err}"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(document) = DocumentField::from_form_name(&name) {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| format!("could not read {name}: {err}"))?;
            if bytes.is_empty() {
                continue;
            }
            uploads.push(PendingUpload {
                field: document,
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| format!("could not read {name}: {err}"))?;
            fields.insert(name, value);
        }
    }

    Ok(SubmissionForm { fields, uploads })
}

fn failure_response(err: AdmissionServiceError) -> Response {
    let (status, message) = match &err {
        AdmissionServiceError::Submission(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        AdmissionServiceError::Upload(UploadError::TooLarge { .. }) => {
            (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
        }
        AdmissionServiceError::Upload(UploadError::UnsupportedType { .. }) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AdmissionServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Application not found".to_string())
        }
        AdmissionServiceError::Repository(RepositoryError::Conflict)
        | AdmissionServiceError::IdCollision { .. } => (StatusCode::CONFLICT, err.to_string()),
        AdmissionServiceError::Render(_) => {
            error!(error = %err, "pdf generation failed");
            return internal_error("Failed to generate PDF");
        }
        AdmissionServiceError::Upload(UploadError::Io(_))
        | AdmissionServiceError::Repository(RepositoryError::Unavailable(_))
        | AdmissionServiceError::Storage(_) => {
            error!(error = %err, "admission request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    };

    (status, axum::Json(json!({ "error": message }))).into_response()
}

fn internal_error(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
