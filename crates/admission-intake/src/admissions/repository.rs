use serde::Serialize;

use super::domain::{AdmissionRecord, ApplicationId};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait AdmissionRepository: Send + Sync {
    fn insert(&self, record: AdmissionRecord) -> Result<AdmissionRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<AdmissionRecord>, RepositoryError>;
    /// Newest submissions first.
    fn list(&self, offset: usize, limit: usize) -> Result<Vec<AdmissionRecord>, RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Page metadata returned alongside listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionPage {
    pub admissions: Vec<AdmissionRecord>,
    pub pagination: Pagination,
}
