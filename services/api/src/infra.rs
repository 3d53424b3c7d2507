use admission_intake::admissions::{
    AdmissionRecord, AdmissionRepository, ApplicationId, RepositoryError,
};
use admission_intake::notifications::{MailError, MailMessage, MailTransport};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAdmissionRepository {
    records: Arc<Mutex<HashMap<ApplicationId, AdmissionRecord>>>,
}

impl AdmissionRepository for InMemoryAdmissionRepository {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<AdmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<AdmissionRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| {
            b.submission_date
                .cmp(&a.submission_date)
                .then_with(|| b.application_id.cmp(&a.application_id))
        });
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").len())
    }
}

/// Transport that only records deliveries in the log; no SMTP relay is configured.
#[derive(Default, Clone, Copy)]
pub(crate) struct LoggingMailTransport;

impl MailTransport for LoggingMailTransport {
    fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "mail queued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(id: &str, minutes: i64) -> AdmissionRecord {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        AdmissionRecord::new(ApplicationId(id.to_string()), base + Duration::minutes(minutes))
    }

    #[test]
    fn duplicate_ids_conflict() {
        let repository = InMemoryAdmissionRepository::default();
        repository.insert(record("HLC20250001", 0)).expect("insert");
        assert!(matches!(
            repository.insert(record("HLC20250001", 5)),
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(repository.count().expect("count"), 1);
    }

    #[test]
    fn listing_is_newest_first() {
        let repository = InMemoryAdmissionRepository::default();
        for (id, minutes) in [("HLC20250001", 0), ("HLC20250002", 30), ("HLC20250003", 10)] {
            repository.insert(record(id, minutes)).expect("insert");
        }

        let ids: Vec<String> = repository
            .list(0, 2)
            .expect("list")
            .into_iter()
            .map(|record| record.application_id.0)
            .collect();
        assert_eq!(ids, ["HLC20250002", "HLC20250003"]);
        assert_eq!(repository.list(2, 2).expect("list").len(), 1);
    }
}
