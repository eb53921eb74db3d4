use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, Posting, PostingId, RepId, RepresentativeProfile, Role,
    StudentId, StudentProfile,
};

/// Keyed access to posting records.
pub trait PostingStore: Send + Sync {
    fn all_postings(&self) -> Result<Vec<Posting>, RepositoryError>;
    fn fetch_posting(&self, id: &PostingId) -> Result<Option<Posting>, RepositoryError>;
    fn persist_posting(&self, posting: Posting) -> Result<(), RepositoryError>;

    fn postings_by_owner(&self, owner: &RepId) -> Result<Vec<Posting>, RepositoryError> {
        Ok(self
            .all_postings()?
            .into_iter()
            .filter(|posting| &posting.owner_rep_id == owner)
            .collect())
    }
}

/// Storage for application records; only the ledger writes through it.
pub trait ApplicationStore: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn applications_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_posting(
        &self,
        posting: &PostingId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn withdrawal_requests(&self) -> Result<Vec<Application>, RepositoryError>;

    /// Write every record in `batch` or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError>;
}

/// Records changed together by one ledger decision. Postings are upserted;
/// applications must already exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub postings: Vec<Posting>,
    pub applications: Vec<Application>,
}

/// User accounts. Representatives start unapproved until staff approve them.
pub trait AccountStore: Send + Sync {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn representative(&self, id: &RepId) -> Result<Option<RepresentativeProfile>, RepositoryError>;
    fn resolve_role(&self, actor_id: &str) -> Result<Option<Role>, RepositoryError>;
    /// Unapproved representatives, ordered by id.
    fn pending_representatives(&self) -> Result<Vec<RepresentativeProfile>, RepositoryError>;
    /// Mark a representative approved. `None` if the id is unknown.
    fn approve_representative(
        &self,
        id: &RepId,
    ) -> Result<Option<RepresentativeProfile>, RepositoryError>;
}

/// Everything the placement workflow persists, behind one handle.
pub trait PlacementStore: PostingStore + ApplicationStore + AccountStore {}

impl<T> PlacementStore for T where T: PostingStore + ApplicationStore + AccountStore {}

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

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date, used by tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outbound message to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub template: String,
    pub recipient: StudentId,
    pub posting_id: PostingId,
    pub message: String,
}

/// Delivery hook for student notices (in-app inbox, e-mail, ...).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}
