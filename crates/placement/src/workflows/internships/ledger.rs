use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::PlacementLimits;

use super::context::PlacementContext;
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Posting, PostingId, StudentId, StudentProfile,
};
use super::eligibility::EligibilityPolicy;
use super::error::PlacementError;
use super::locks::LockScopes;
use super::repository::{NotificationSink, PlacementStore, WriteBatch};
use super::slots::SlotAllocator;
use super::waitlist::WaitlistNotifier;

/// Owns application records and every status transition.
///
/// Each mutating call loads what it needs, validates completely, builds the new
/// records, and only then writes them back. A rejected call writes nothing.
pub struct ApplicationLedger<S, N> {
    store: Arc<S>,
    policy: Arc<dyn EligibilityPolicy>,
    waitlist: Arc<WaitlistNotifier<N>>,
    slots: SlotAllocator,
    limits: PlacementLimits,
    locks: LockScopes,
    sequence: AtomicU64,
}

/// Result of a successful `confirm`, including both cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    pub application: Application,
    pub posting: Posting,
    pub withdrawn_for_student: Vec<ApplicationId>,
    pub withdrawn_for_posting: Vec<ApplicationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalResolution {
    pub application: Application,
    pub slot_released: bool,
    pub notified: usize,
}

impl<S, N> ApplicationLedger<S, N>
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        context: &PlacementContext<S, N>,
        policy: Arc<dyn EligibilityPolicy>,
        waitlist: Arc<WaitlistNotifier<N>>,
    ) -> Self {
        Self {
            store: Arc::clone(&context.store),
            policy,
            waitlist,
            slots: SlotAllocator,
            limits: context.limits,
            locks: LockScopes::default(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    fn next_application_id(&self) -> Result<ApplicationId, PlacementError> {
        loop {
            let next = self.sequence.fetch_add(1, Ordering::Relaxed);
            let id = ApplicationId(format!("APP-{next:04}"));
            if self.store.fetch_application(&id)?.is_none() {
                return Ok(id);
            }
        }
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| PlacementError::application_not_found(id))
    }

    fn posting(&self, id: &PostingId) -> Result<Posting, PlacementError> {
        self.store
            .fetch_posting(id)?
            .ok_or_else(|| PlacementError::posting_not_found(id))
    }

    pub fn for_student(&self, student: &StudentId) -> Result<Vec<Application>, PlacementError> {
        Ok(self.store.applications_for_student(student)?)
    }

    pub fn for_posting(&self, posting: &PostingId) -> Result<Vec<Application>, PlacementError> {
        Ok(self.store.applications_for_posting(posting)?)
    }

    pub fn withdrawal_requests(&self) -> Result<Vec<Application>, PlacementError> {
        Ok(self.store.withdrawal_requests()?)
    }

    pub fn remaining(&self, posting: &PostingId) -> Result<u8, PlacementError> {
        let posting = self.posting(posting)?;
        Ok(self.slots.remaining(&posting))
    }

    fn ensure_transition(
        application: &Application,
        next: ApplicationStatus,
        action: &'static str,
    ) -> Result<(), PlacementError> {
        if application.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(PlacementError::InvalidStateTransition {
                application: application.id.clone(),
                from: application.status,
                action,
            })
        }
    }

    /// Run `f` on a fresh copy of the application inside both lock scopes.
    fn locked<R>(
        &self,
        id: &ApplicationId,
        f: impl FnOnce(Application) -> Result<R, PlacementError>,
    ) -> Result<R, PlacementError> {
        let keys = self.get(id)?;
        self.locks
            .student_then_posting(&keys.student_id, &keys.posting_id, || f(self.get(id)?))
    }

    /// Apply `edit` to a posting under its lock and persist the result.
    pub(crate) fn update_posting(
        &self,
        id: &PostingId,
        edit: impl FnOnce(&mut Posting) -> Result<(), PlacementError>,
    ) -> Result<Posting, PlacementError> {
        self.locks.posting(id, || {
            let mut posting = self.posting(id)?;
            edit(&mut posting)?;
            self.store.persist_posting(posting.clone())?;
            Ok(posting)
        })
    }

    pub fn submit(
        &self,
        student: &StudentProfile,
        posting_id: &PostingId,
    ) -> Result<Application, PlacementError> {
        self.locks.student_then_posting(&student.id, posting_id, || {
            let posting = self.posting(posting_id)?;
            let existing = self.store.applications_for_student(&student.id)?;

            if existing
                .iter()
                .any(|application| &application.posting_id == posting_id)
            {
                return Err(PlacementError::DuplicateApplication {
                    student: student.id.clone(),
                    posting: posting_id.clone(),
                });
            }

            self.policy
                .check(student, &posting)
                .map_err(|reason| PlacementError::NotEligible {
                    student: student.id.clone(),
                    posting: posting_id.clone(),
                    reason,
                })?;

            let active = existing
                .iter()
                .filter(|application| application.status.is_active())
                .count();
            if active >= self.limits.max_active_applications {
                return Err(PlacementError::ApplicationLimitExceeded {
                    student: student.id.clone(),
                    limit: self.limits.max_active_applications,
                });
            }

            if !self.slots.has_room(&posting) {
                return Err(PlacementError::CapacityExceeded {
                    posting: posting_id.clone(),
                });
            }

            let application = Application::new(
                self.next_application_id()?,
                student.id.clone(),
                posting_id.clone(),
            );
            let stored = self.store.insert_application(application)?;
            info!(
                application_id = %stored.id,
                student_id = %stored.student_id,
                posting_id = %stored.posting_id,
                "application submitted"
            );
            Ok(stored)
        })
    }

    pub fn approve(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.locked(id, |application| {
            Self::ensure_transition(&application, ApplicationStatus::Successful, "approve")?;

            let posting = self.posting(&application.posting_id)?;
            if !self.slots.has_room(&posting) {
                return Err(PlacementError::CapacityExceeded { posting: posting.id });
            }

            let approved = Application {
                status: ApplicationStatus::Successful,
                ..application
            };
            self.store.update_application(approved.clone())?;
            info!(application_id = %approved.id, "application approved");
            Ok(approved)
        })
    }

    pub fn reject(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.locked(id, |application| {
            Self::ensure_transition(&application, ApplicationStatus::Unsuccessful, "reject")?;

            let rejected = Application {
                status: ApplicationStatus::Unsuccessful,
                withdrawal_requested: false,
                ..application
            };
            self.store.update_application(rejected.clone())?;
            info!(application_id = %rejected.id, "application rejected");
            Ok(rejected)
        })
    }

    /// Accept a SUCCESSFUL offer: take a slot, withdraw the student's other live
    /// applications, then, if the posting is now full, every other live
    /// application for that posting.
    pub fn confirm(&self, id: &ApplicationId) -> Result<ConfirmOutcome, PlacementError> {
        self.locked(id, |application| {
            Self::ensure_transition(&application, ApplicationStatus::Confirmed, "confirm")?;

            let student_applications = self
                .store
                .applications_for_student(&application.student_id)?;
            if student_applications.iter().any(|other| {
                other.id != application.id && other.status == ApplicationStatus::Confirmed
            }) {
                return Err(PlacementError::PlacementAlreadyConfirmed {
                    student: application.student_id.clone(),
                });
            }

            let mut posting = self.posting(&application.posting_id)?;
            self.slots
                .decrement(&mut posting)
                .map_err(|_| PlacementError::CapacityExceeded {
                    posting: posting.id.clone(),
                })?;

            let confirmed = Application {
                status: ApplicationStatus::Confirmed,
                ..application
            };

            let student_cascade: Vec<Application> = student_applications
                .iter()
                .filter(|other| other.id != confirmed.id && other.status.is_active())
                .map(Application::withdrawn)
                .collect();

            let posting_cascade: Vec<Application> = if self.slots.has_room(&posting) {
                Vec::new()
            } else {
                self.store
                    .applications_for_posting(&posting.id)?
                    .iter()
                    .filter(|other| {
                        other.id != confirmed.id
                            && other.status.is_active()
                            && !student_cascade.iter().any(|done| done.id == other.id)
                    })
                    .map(Application::withdrawn)
                    .collect()
            };

            let applications = std::iter::once(&confirmed)
                .chain(student_cascade.iter())
                .chain(posting_cascade.iter())
                .cloned()
                .collect();
            self.store.commit(WriteBatch {
                postings: vec![posting.clone()],
                applications,
            })?;

            info!(
                application_id = %confirmed.id,
                posting_id = %posting.id,
                remaining = self.slots.remaining(&posting),
                student_withdrawals = student_cascade.len(),
                posting_withdrawals = posting_cascade.len(),
                "placement confirmed"
            );

            Ok(ConfirmOutcome {
                application: confirmed,
                posting,
                withdrawn_for_student: student_cascade.into_iter().map(|a| a.id).collect(),
                withdrawn_for_posting: posting_cascade.into_iter().map(|a| a.id).collect(),
            })
        })
    }

    pub fn request_withdrawal(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.locked(id, |application| {
            if application.status.is_terminal() {
                return Err(PlacementError::InvalidStateTransition {
                    application: application.id.clone(),
                    from: application.status,
                    action: "request withdrawal of",
                });
            }

            let flagged = Application {
                withdrawal_requested: true,
                ..application
            };
            self.store.update_application(flagged.clone())?;
            info!(application_id = %flagged.id, status = %flagged.status, "withdrawal requested");
            Ok(flagged)
        })
    }

    /// Staff decision on a pending withdrawal request. Approving a CONFIRMED
    /// placement frees its slot and notifies the posting's waitlist.
    pub fn resolve_withdrawal(
        &self,
        id: &ApplicationId,
        approve: bool,
    ) -> Result<WithdrawalResolution, PlacementError> {
        let (resolution, freed) = self.locked(id, |application| {
            if !application.withdrawal_requested {
                return Err(PlacementError::InvalidStateTransition {
                    application: application.id.clone(),
                    from: application.status,
                    action: "resolve a withdrawal for",
                });
            }

            if !approve {
                let denied = Application {
                    withdrawal_requested: false,
                    ..application
                };
                self.store.update_application(denied.clone())?;
                info!(application_id = %denied.id, "withdrawal denied");
                return Ok((
                    WithdrawalResolution {
                        application: denied,
                        slot_released: false,
                        notified: 0,
                    },
                    None,
                ));
            }

            Self::ensure_transition(&application, ApplicationStatus::Withdrawn, "withdraw")?;
            let withdrawn = application.withdrawn();

            let freed = if application.status == ApplicationStatus::Confirmed {
                let mut posting = self.posting(&application.posting_id)?;
                self.slots.increment(&mut posting);
                Some(posting)
            } else {
                None
            };

            self.store.commit(WriteBatch {
                postings: freed.iter().cloned().collect(),
                applications: vec![withdrawn.clone()],
            })?;
            info!(
                application_id = %withdrawn.id,
                prior = %application.status,
                slot_released = freed.is_some(),
                "withdrawal approved"
            );

            Ok((
                WithdrawalResolution {
                    application: withdrawn,
                    slot_released: freed.is_some(),
                    notified: 0,
                },
                freed,
            ))
        })?;

        // Notices go out after the locks are released.
        match freed {
            Some(posting) => Ok(WithdrawalResolution {
                notified: self.waitlist.on_slot_freed(&posting),
                ..resolution
            }),
            None => Ok(resolution),
        }
    }
}
