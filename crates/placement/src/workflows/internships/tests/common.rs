use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::PlacementLimits;
use crate::workflows::internships::domain::{
    Application, ApplicationId, Posting, PostingId, PostingLevel, PostingStatus, RepId,
    RepresentativeProfile, Role, StaffId, StudentId, StudentProfile,
};
use crate::workflows::internships::eligibility::MajorEligibilityPolicy;
use crate::workflows::internships::ledger::ApplicationLedger;
use crate::workflows::internships::memory::{InMemoryNoticeBox, InMemoryPlacementStore};
use crate::workflows::internships::repository::{
    AccountStore, ApplicationStore, FixedClock, Notice, NotificationSink, NotifyError,
    PostingStore, RepositoryError, WriteBatch,
};
use crate::workflows::internships::waitlist::WaitlistNotifier;
use crate::workflows::internships::{placement_router, PlacementContext, PlacementService};

pub(super) type MemoryService = PlacementService<InMemoryPlacementStore, InMemoryNoticeBox>;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

pub(super) fn days_from_today(days: i64) -> NaiveDate {
    today() + chrono::Duration::days(days)
}

pub(super) fn student(id: &str, year: u8, major: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::new(id),
        year,
        major: major.to_string(),
    }
}

pub(super) fn posting(id: &str, capacity: u8) -> Posting {
    Posting {
        id: PostingId::new(id),
        title: format!("Software Intern {id}"),
        description: "Build internal tooling".to_string(),
        level: PostingLevel::Basic,
        preferred_major: None,
        company_name: "Acme".to_string(),
        owner_rep_id: RepId::new("rep-1"),
        capacity,
        confirmed_count: 0,
        visible: true,
        open_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
        close_date: Some(NaiveDate::from_ymd_opt(2025, 4, 30).expect("valid date")),
        status: PostingStatus::Approved,
    }
}

pub(super) fn representative(id: &str, company: &str, approved: bool) -> RepresentativeProfile {
    RepresentativeProfile {
        id: RepId::new(id),
        company_name: company.to_string(),
        approved,
    }
}

/// Accounts shared by most tests: five senior CSC students, one first-year,
/// two approved representatives, one awaiting approval, and a staff member.
pub(super) fn seeded_store() -> InMemoryPlacementStore {
    let mut store = InMemoryPlacementStore::new();
    for id in ["U1", "U2", "U3", "U4", "U5"] {
        store = store.with_student(student(id, 3, "CSC"));
    }
    store
        .with_student(student("J1", 1, "CSC"))
        .with_student(student("E1", 3, "EEE"))
        .with_representative(representative("rep-1", "Acme", true))
        .with_representative(representative("rep-2", "Globex", true))
        .with_representative(representative("rep-3", "Initech", false))
        .with_staff(StaffId::new("staff-1"))
}

pub(super) fn store_with(postings: Vec<Posting>) -> InMemoryPlacementStore {
    postings
        .into_iter()
        .fold(seeded_store(), |store, posting| store.with_posting(posting))
}

pub(super) fn context<S, N>(store: S, notices: N) -> PlacementContext<S, N>
where
    S: crate::workflows::internships::PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    PlacementContext::new(
        Arc::new(store),
        Arc::new(notices),
        Arc::new(FixedClock(today())),
        PlacementLimits::default(),
    )
}

pub(super) fn build_service(
    postings: Vec<Posting>,
) -> (Arc<MemoryService>, InMemoryPlacementStore, InMemoryNoticeBox) {
    let store = store_with(postings);
    let notices = InMemoryNoticeBox::default();
    let service = PlacementService::new(context(store.clone(), notices.clone()));
    (Arc::new(service), store, notices)
}

pub(super) struct LedgerFixture<N> {
    pub(super) ledger: ApplicationLedger<InMemoryPlacementStore, N>,
    pub(super) store: InMemoryPlacementStore,
    pub(super) waitlist: Arc<WaitlistNotifier<N>>,
}

pub(super) fn ledger_with_sink<N>(postings: Vec<Posting>, notices: N) -> LedgerFixture<N>
where
    N: NotificationSink + 'static,
{
    let store = store_with(postings);
    let context = context(store.clone(), notices);
    let waitlist = Arc::new(WaitlistNotifier::new(Arc::clone(&context.notices)));
    let ledger = ApplicationLedger::new(
        &context,
        Arc::new(MajorEligibilityPolicy),
        Arc::clone(&waitlist),
    );
    LedgerFixture {
        ledger,
        store,
        waitlist,
    }
}

pub(super) fn build_ledger(
    postings: Vec<Posting>,
) -> (LedgerFixture<InMemoryNoticeBox>, InMemoryNoticeBox) {
    let notices = InMemoryNoticeBox::default();
    (ledger_with_sink(postings, notices.clone()), notices)
}

pub(super) fn router_for(service: Arc<MemoryService>) -> axum::Router {
    placement_router(service)
}

pub(super) fn stored_posting(store: &InMemoryPlacementStore, id: &str) -> Posting {
    store
        .fetch_posting(&PostingId::new(id))
        .expect("store readable")
        .expect("posting exists")
}

pub(super) fn stored_application(store: &InMemoryPlacementStore, id: &ApplicationId) -> Application {
    store
        .fetch_application(id)
        .expect("store readable")
        .expect("application exists")
}

pub(super) fn sid(id: &str) -> StudentId {
    StudentId::new(id)
}

pub(super) fn pid(id: &str) -> PostingId {
    PostingId::new(id)
}

/// Sink whose transport is always down.
#[derive(Default, Clone)]
pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn deliver(&self, _notice: Notice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Store that fails every call.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl PostingStore for UnavailableStore {
    fn all_postings(&self) -> Result<Vec<Posting>, RepositoryError> {
        offline()
    }

    fn fetch_posting(&self, _id: &PostingId) -> Result<Option<Posting>, RepositoryError> {
        offline()
    }

    fn persist_posting(&self, _posting: Posting) -> Result<(), RepositoryError> {
        offline()
    }
}

impl ApplicationStore for UnavailableStore {
    fn insert_application(&self, _application: Application) -> Result<Application, RepositoryError> {
        offline()
    }

    fn update_application(&self, _application: Application) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn applications_for_student(
        &self,
        _student: &StudentId,
    ) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn applications_for_posting(
        &self,
        _posting: &PostingId,
    ) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn withdrawal_requests(&self) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        offline()
    }
}

impl AccountStore for UnavailableStore {
    fn student(&self, _id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        offline()
    }

    fn representative(&self, _id: &RepId) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        offline()
    }

    fn resolve_role(&self, actor_id: &str) -> Result<Option<Role>, RepositoryError> {
        // Callers still authenticate so the failure surfaces at the operation.
        Ok(Some(Role::Student(student(actor_id, 3, "CSC"))))
    }

    fn pending_representatives(&self) -> Result<Vec<RepresentativeProfile>, RepositoryError> {
        offline()
    }

    fn approve_representative(
        &self,
        _id: &RepId,
    ) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        offline()
    }
}

/// In-memory store whose batched writes always fail. Single-record writes
/// go through, so applications can be set up before the failing decision.
pub(super) struct BatchRefusingStore(pub(super) InMemoryPlacementStore);

impl PostingStore for BatchRefusingStore {
    fn all_postings(&self) -> Result<Vec<Posting>, RepositoryError> {
        self.0.all_postings()
    }

    fn fetch_posting(&self, id: &PostingId) -> Result<Option<Posting>, RepositoryError> {
        self.0.fetch_posting(id)
    }

    fn persist_posting(&self, posting: Posting) -> Result<(), RepositoryError> {
        self.0.persist_posting(posting)
    }
}

impl ApplicationStore for BatchRefusingStore {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.0.insert_application(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.0.update_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.0.fetch_application(id)
    }

    fn applications_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.0.applications_for_student(student)
    }

    fn applications_for_posting(
        &self,
        posting: &PostingId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.0.applications_for_posting(posting)
    }

    fn withdrawal_requests(&self) -> Result<Vec<Application>, RepositoryError> {
        self.0.withdrawal_requests()
    }

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        offline()
    }
}

impl AccountStore for BatchRefusingStore {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        self.0.student(id)
    }

    fn representative(&self, id: &RepId) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        self.0.representative(id)
    }

    fn resolve_role(&self, actor_id: &str) -> Result<Option<Role>, RepositoryError> {
        self.0.resolve_role(actor_id)
    }

    fn pending_representatives(&self) -> Result<Vec<RepresentativeProfile>, RepositoryError> {
        self.0.pending_representatives()
    }

    fn approve_representative(
        &self,
        id: &RepId,
    ) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        self.0.approve_representative(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
