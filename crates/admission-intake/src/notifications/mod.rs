//! Outbound e-mail composed after a successful submission.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use crate::admissions::domain::AdmissionRecord;
use crate::config::{BrandingConfig, MailConfig};
use crate::rendering::template::escape_html;

/// Delivery boundary for e-mail. Production transports live outside this crate.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, message: MailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("no {0} address configured")]
    MissingRecipient(&'static str),
}

/// Addresses and naming used when composing notifications.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub admin_email: Option<String>,
    pub from: String,
    pub portal_name: String,
}

impl NotificationSettings {
    pub fn from_config(mail: &MailConfig, branding: &BrandingConfig) -> Self {
        Self {
            admin_email: mail.admin_email.clone(),
            from: mail.from.clone(),
            portal_name: branding.portal_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    pub admin: DeliveryOutcome,
    pub applicant: DeliveryOutcome,
}

/// Builds the admin notice and the applicant confirmation and hands them to a transport.
pub struct NotificationDispatcher<M> {
    transport: Arc<M>,
    settings: NotificationSettings,
}

impl<M> NotificationDispatcher<M>
where
    M: MailTransport + 'static,
{
    pub fn new(transport: Arc<M>, settings: NotificationSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn admin_message(
        &self,
        record: &AdmissionRecord,
        pdf: &[u8],
    ) -> Result<MailMessage, MailError> {
        let to = self
            .settings
            .admin_email
            .clone()
            .ok_or(MailError::MissingRecipient("admin"))?;
        let id = record.application_id.as_str();
        let applicant = &record.applicant;

        let mut body = String::new();
        let _ = write!(
            body,
            "<h2>New Admission Application Received</h2>\n<p><strong>Application ID:</strong> {}</p>\n<p><strong>Candidate Name:</strong> {}</p>\n<p><strong>Email:</strong> {}</p>\n<p><strong>Contact:</strong> {}</p>\n<p><strong>CNIC:</strong> {}</p>\n<p><strong>Submission Date:</strong> {}</p>\n",
            escape_html(id),
            escape_html(&record.full_name().unwrap_or_default()),
            escape_html(applicant.email.as_deref().unwrap_or_default()),
            escape_html(applicant.contact_number.as_deref().unwrap_or_default()),
            escape_html(applicant.cnic_number.as_deref().unwrap_or_default()),
            record.submission_date.format("%B %-d, %Y %H:%M UTC"),
        );
        if let Some(score) = applicant.law_test_score {
            let _ = writeln!(body, "<p><strong>Law Test Score:</strong> {score}/100</p>");
        }
        let _ = write!(
            body,
            "<p>Please find the complete application details in the attached PDF.</p>\n<p>{} - Admin Notification</p>\n",
            escape_html(&self.settings.portal_name)
        );

        Ok(MailMessage {
            from: self.settings.from.clone(),
            to,
            subject: format!("New Admission Application - {id}"),
            html_body: body,
            attachments: vec![pdf_attachment(format!("admission-{id}.pdf"), pdf)],
        })
    }

    pub fn confirmation_message(
        &self,
        record: &AdmissionRecord,
        pdf: &[u8],
    ) -> Result<MailMessage, MailError> {
        let to = record
            .applicant
            .email
            .clone()
            .filter(|email| !email.is_empty())
            .ok_or(MailError::MissingRecipient("applicant"))?;
        let id = record.application_id.as_str();

        let body = format!(
            "<h1>{portal}</h1>\n<h2>Dear {name},</h2>\n<p>Thank you for submitting your admission application. It has been received and is now under review.</p>\n<p><strong>Application ID:</strong> {id}</p>\n<p><strong>Submission Date:</strong> {date}</p>\n<p><strong>Status:</strong> Under Review</p>\n<p>Please keep your Application ID safe for future reference. Your complete application is attached as a PDF.</p>\n",
            portal = escape_html(&self.settings.portal_name),
            name = escape_html(&record.full_name().unwrap_or_else(|| "Applicant".to_string())),
            id = escape_html(id),
            date = record.submission_date.format("%B %-d, %Y"),
        );

        Ok(MailMessage {
            from: self.settings.from.clone(),
            to,
            subject: format!("Application Confirmation - {id}"),
            html_body: body,
            attachments: vec![pdf_attachment(format!("your-application-{id}.pdf"), pdf)],
        })
    }

    /// Send both messages. Failures are logged and reported, never propagated.
    pub fn notify_submission(&self, record: &AdmissionRecord, pdf: &[u8]) -> NotificationSummary {
        NotificationSummary {
            admin: self.deliver("admin", record, self.admin_message(record, pdf)),
            applicant: self.deliver(
                "applicant",
                record,
                self.confirmation_message(record, pdf),
            ),
        }
    }

    fn deliver(
        &self,
        audience: &'static str,
        record: &AdmissionRecord,
        message: Result<MailMessage, MailError>,
    ) -> DeliveryOutcome {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                info!(application_id = %record.application_id, audience, reason = %err, "notification skipped");
                return DeliveryOutcome::Skipped(err.to_string());
            }
        };

        match self.transport.deliver(message) {
            Ok(()) => {
                info!(application_id = %record.application_id, audience, "notification sent");
                DeliveryOutcome::Sent
            }
            Err(err) => {
                warn!(application_id = %record.application_id, audience, error = %err, "notification failed");
                DeliveryOutcome::Failed(err.to_string())
            }
        }
    }
}

fn pdf_attachment(file_name: String, pdf: &[u8]) -> MailAttachment {
    MailAttachment {
        file_name,
        content_type: "application/pdf",
        content: pdf.to_vec(),
    }
}

/// Transport that keeps every delivered message in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryOutbox {
    messages: Arc<Mutex<Vec<MailMessage>>>,
}

impl MemoryOutbox {
    pub fn messages(&self) -> Vec<MailMessage> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl MailTransport for MemoryOutbox {
    fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        self.messages
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
