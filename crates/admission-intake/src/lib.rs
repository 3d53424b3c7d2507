//! Admission form intake: applicant records, document uploads, notifications, and a
//! tiered PDF rendering chain that degrades from HTML renderers to a synthetic PDF writer.

pub mod admissions;
pub mod config;
pub mod error;
pub mod notifications;
pub mod rendering;
pub mod telemetry;
