use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Application, ApplicationId, Posting, PostingId, RepId, RepresentativeProfile, Role, StaffId,
    StudentId, StudentProfile,
};
use super::repository::{
    AccountStore, ApplicationStore, Notice, NotificationSink, NotifyError, PostingStore,
    RepositoryError, WriteBatch,
};

#[derive(Default)]
struct Tables {
    postings: Vec<Posting>,
    applications: Vec<Application>,
    students: HashMap<StudentId, StudentProfile>,
    representatives: HashMap<RepId, RepresentativeProfile>,
    staff: Vec<StaffId>,
}

/// Process-local store keeping catalog order for postings and insertion order for
/// applications.
#[derive(Default, Clone)]
pub struct InMemoryPlacementStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryPlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("placement store mutex poisoned".to_string()))
    }

    pub fn with_student(self, student: StudentProfile) -> Self {
        if let Ok(mut tables) = self.tables() {
            tables.students.insert(student.id.clone(), student);
        }
        self
    }

    pub fn with_representative(self, rep: RepresentativeProfile) -> Self {
        if let Ok(mut tables) = self.tables() {
            tables.representatives.insert(rep.id.clone(), rep);
        }
        self
    }

    pub fn with_staff(self, staff: StaffId) -> Self {
        if let Ok(mut tables) = self.tables() {
            tables.staff.push(staff);
        }
        self
    }

    pub fn with_posting(self, posting: Posting) -> Self {
        if let Err(error) = self.persist_posting(posting) {
            tracing::warn!(%error, "seed posting dropped");
        }
        self
    }
}

impl PostingStore for InMemoryPlacementStore {
    fn all_postings(&self) -> Result<Vec<Posting>, RepositoryError> {
        Ok(self.tables()?.postings.clone())
    }

    fn fetch_posting(&self, id: &PostingId) -> Result<Option<Posting>, RepositoryError> {
        Ok(self
            .tables()?
            .postings
            .iter()
            .find(|posting| &posting.id == id)
            .cloned())
    }

    fn persist_posting(&self, posting: Posting) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.postings.iter_mut().find(|existing| existing.id == posting.id) {
            Some(existing) => *existing = posting,
            None => tables.postings.push(posting),
        }
        Ok(())
    }
}

impl ApplicationStore for InMemoryPlacementStore {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .applications
            .iter()
            .any(|existing| existing.id == application.id)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.applications.push(application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let existing = tables
            .applications
            .iter_mut()
            .find(|existing| existing.id == application.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = application;
        Ok(())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .find(|application| &application.id == id)
            .cloned())
    }

    fn applications_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .filter(|application| &application.student_id == student)
            .cloned()
            .collect())
    }

    fn applications_for_posting(
        &self,
        posting: &PostingId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .filter(|application| &application.posting_id == posting)
            .cloned()
            .collect())
    }

    fn withdrawal_requests(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .filter(|application| application.withdrawal_requested)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let positions = batch
            .applications
            .iter()
            .map(|application| {
                tables
                    .applications
                    .iter()
                    .position(|existing| existing.id == application.id)
                    .ok_or(RepositoryError::NotFound)
            })
            .collect::<Result<Vec<usize>, RepositoryError>>()?;

        for posting in batch.postings {
            match tables.postings.iter_mut().find(|existing| existing.id == posting.id) {
                Some(existing) => *existing = posting,
                None => tables.postings.push(posting),
            }
        }
        for (position, application) in positions.into_iter().zip(batch.applications) {
            tables.applications[position] = application;
        }
        Ok(())
    }
}

impl AccountStore for InMemoryPlacementStore {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.tables()?.students.get(id).cloned())
    }

    fn representative(&self, id: &RepId) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        Ok(self.tables()?.representatives.get(id).cloned())
    }

    fn resolve_role(&self, actor_id: &str) -> Result<Option<Role>, RepositoryError> {
        let tables = self.tables()?;
        let actor_id = actor_id.trim();

        if let Some(student) = tables.students.get(&StudentId::new(actor_id)) {
            return Ok(Some(Role::Student(student.clone())));
        }
        if let Some(rep) = tables.representatives.get(&RepId::new(actor_id)) {
            return Ok(Some(Role::Representative(rep.clone())));
        }
        Ok(tables
            .staff
            .iter()
            .find(|staff| staff.as_str() == actor_id)
            .map(|staff| Role::Staff { id: staff.clone() }))
    }

    fn pending_representatives(&self) -> Result<Vec<RepresentativeProfile>, RepositoryError> {
        let mut pending: Vec<RepresentativeProfile> = self
            .tables()?
            .representatives
            .values()
            .filter(|rep| !rep.approved)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(pending)
    }

    fn approve_representative(
        &self,
        id: &RepId,
    ) -> Result<Option<RepresentativeProfile>, RepositoryError> {
        let mut tables = self.tables()?;
        Ok(tables.representatives.get_mut(id).map(|rep| {
            rep.approved = true;
            rep.clone()
        }))
    }
}

/// Notification sink that records every notice, for demos and tests.
#[derive(Default, Clone)]
pub struct InMemoryNoticeBox {
    events: Arc<Mutex<Vec<Notice>>>,
}

impl InMemoryNoticeBox {
    pub fn events(&self) -> Vec<Notice> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn for_student(&self, student: &StudentId) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter(|notice| &notice.recipient == student)
            .collect()
    }
}

impl NotificationSink for InMemoryNoticeBox {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Transport("notice box mutex poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::internships::domain::{ApplicationStatus, PostingLevel, PostingStatus};
    use chrono::NaiveDate;

    fn posting(id: &str) -> Posting {
        Posting {
            id: PostingId::new(id),
            title: "Data Intern".to_string(),
            description: "Pipelines".to_string(),
            level: PostingLevel::Basic,
            preferred_major: None,
            company_name: "Acme".to_string(),
            owner_rep_id: RepId::new("rep-1"),
            capacity: 1,
            confirmed_count: 0,
            visible: true,
            open_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid"),
            close_date: None,
            status: PostingStatus::Approved,
        }
    }

    fn rep(id: &str, approved: bool) -> RepresentativeProfile {
        RepresentativeProfile {
            id: RepId::new(id),
            company_name: "Acme".to_string(),
            approved,
        }
    }

    #[test]
    fn commit_with_an_unknown_application_writes_nothing() {
        let store = InMemoryPlacementStore::new().with_posting(posting("INT-0001"));
        let known = Application::new(
            ApplicationId::new("APP-0001"),
            StudentId::new("U1"),
            PostingId::new("INT-0001"),
        );
        store.insert_application(known.clone()).expect("insert");

        let mut filled = posting("INT-0001");
        filled.confirmed_count = 1;
        filled.status = PostingStatus::Filled;
        let confirmed = Application {
            status: ApplicationStatus::Confirmed,
            ..known.clone()
        };
        let stranger = Application::new(
            ApplicationId::new("APP-0404"),
            StudentId::new("U2"),
            PostingId::new("INT-0001"),
        );

        let error = store
            .commit(WriteBatch {
                postings: vec![filled.clone()],
                applications: vec![confirmed.clone(), stranger],
            })
            .expect_err("unknown application");

        assert!(matches!(error, RepositoryError::NotFound));
        assert_eq!(
            store.fetch_posting(&filled.id).expect("readable"),
            Some(posting("INT-0001"))
        );
        assert_eq!(store.fetch_application(&known.id).expect("readable"), Some(known));

        store
            .commit(WriteBatch {
                postings: vec![filled.clone()],
                applications: vec![confirmed.clone()],
            })
            .expect("commit");
        assert_eq!(store.fetch_posting(&filled.id).expect("readable"), Some(filled));
        assert_eq!(
            store.fetch_application(&confirmed.id).expect("readable"),
            Some(confirmed)
        );
    }

    #[test]
    fn approving_a_representative_removes_it_from_the_pending_list() {
        let store = InMemoryPlacementStore::new()
            .with_representative(rep("rep-9", false))
            .with_representative(rep("rep-2", false))
            .with_representative(rep("rep-1", true));

        let pending: Vec<String> = store
            .pending_representatives()
            .expect("readable")
            .into_iter()
            .map(|rep| rep.id.to_string())
            .collect();
        assert_eq!(pending, vec!["rep-2", "rep-9"]);

        let approved = store
            .approve_representative(&RepId::new("rep-9"))
            .expect("writable")
            .expect("known rep");
        assert!(approved.approved);
        assert_eq!(store.pending_representatives().expect("readable").len(), 1);
        assert_eq!(
            store
                .approve_representative(&RepId::new("rep-404"))
                .expect("writable"),
            None
        );
    }
}
