use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::context::PlacementContext;
use super::domain::{
    Application, ApplicationId, Posting, PostingDraft, PostingId, PostingStatus, RepId,
    RepresentativeProfile, Role, StudentId, StudentProfile,
};
use super::eligibility::{
    EligibilityPolicy, LevelRestriction, MajorEligibilityPolicy, YearLevelRestriction,
};
use super::error::{PlacementError, ValidationError};
use super::filter::{FilterConfig, FilterEngine, NonNegotiables};
use super::ledger::{ApplicationLedger, ConfirmOutcome, WithdrawalResolution};
use super::ranking::{RankingEngine, RankingWeights, ScoreComponent, ScoredPosting};
use super::repository::{NotificationSink, PlacementStore};
use super::waitlist::WaitlistNotifier;

/// What a student asked to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRequest {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub weights: RankingWeights,
    #[serde(default)]
    pub non_negotiables: Option<NonNegotiables>,
    #[serde(default = "default_recommendations")]
    pub recommendations: bool,
}

fn default_recommendations() -> bool {
    true
}

impl Default for ListingRequest {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            weights: RankingWeights::default(),
            non_negotiables: None,
            recommendations: default_recommendations(),
        }
    }
}

/// Facade the menu or HTTP layer talks to. It resolves accounts, enforces
/// ownership and caller-side rules, and hands every status change to the ledger.
pub struct PlacementService<S, N> {
    context: PlacementContext<S, N>,
    ledger: ApplicationLedger<S, N>,
    waitlist: Arc<WaitlistNotifier<N>>,
    restriction: Arc<dyn LevelRestriction>,
    filters: FilterEngine,
    ranking: RankingEngine,
    posting_sequence: AtomicU64,
    posting_gate: Mutex<()>,
    bulk_history: Mutex<Vec<Vec<PriorPostingState>>>,
}

/// Status and visibility of a posting just before a bulk approval changed it.
#[derive(Debug, Clone)]
struct PriorPostingState {
    id: PostingId,
    status: PostingStatus,
    visible: bool,
}

impl<S, N> PlacementService<S, N>
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(context: PlacementContext<S, N>) -> Self {
        Self::with_policies(
            context,
            Arc::new(MajorEligibilityPolicy),
            Arc::new(YearLevelRestriction::default()),
        )
    }

    pub fn with_policies(
        context: PlacementContext<S, N>,
        policy: Arc<dyn EligibilityPolicy>,
        restriction: Arc<dyn LevelRestriction>,
    ) -> Self {
        let waitlist = Arc::new(WaitlistNotifier::new(Arc::clone(&context.notices)));
        let ledger = ApplicationLedger::new(&context, policy, Arc::clone(&waitlist));

        Self {
            context,
            ledger,
            waitlist,
            restriction,
            filters: FilterEngine,
            ranking: RankingEngine::new(),
            posting_sequence: AtomicU64::new(1),
            posting_gate: Mutex::new(()),
            bulk_history: Mutex::new(Vec::new()),
        }
    }

    pub fn ledger(&self) -> &ApplicationLedger<S, N> {
        &self.ledger
    }

    pub fn waitlist(&self) -> &WaitlistNotifier<N> {
        &self.waitlist
    }

    fn student(&self, id: &StudentId) -> Result<StudentProfile, PlacementError> {
        self.context
            .store
            .student(id)?
            .ok_or_else(|| PlacementError::student_not_found(id))
    }

    fn representative(&self, id: &RepId) -> Result<RepresentativeProfile, PlacementError> {
        self.context
            .store
            .representative(id)?
            .ok_or_else(|| PlacementError::representative_not_found(id))
    }

    pub fn posting(&self, id: &PostingId) -> Result<Posting, PlacementError> {
        self.context
            .store
            .fetch_posting(id)?
            .ok_or_else(|| PlacementError::posting_not_found(id))
    }

    /// Resolve an opaque caller id into its role once, at the edge.
    pub fn resolve_role(&self, actor_id: &str) -> Result<Role, PlacementError> {
        self.context
            .store
            .resolve_role(actor_id)?
            .ok_or_else(|| PlacementError::NotFound {
                entity: "account",
                id: actor_id.to_string(),
            })
    }

    fn owned_posting(&self, rep: &RepId, posting_id: &PostingId) -> Result<Posting, PlacementError> {
        let posting = self.posting(posting_id)?;
        if &posting.owner_rep_id != rep {
            return Err(PlacementError::Unauthorized {
                actor: rep.to_string(),
                resource: format!("posting {posting_id}"),
            });
        }
        Ok(posting)
    }

    fn owned_application(
        &self,
        student: &StudentId,
        application_id: &ApplicationId,
    ) -> Result<Application, PlacementError> {
        let application = self.ledger.get(application_id)?;
        if &application.student_id != student {
            return Err(PlacementError::Unauthorized {
                actor: student.to_string(),
                resource: format!("application {application_id}"),
            });
        }
        Ok(application)
    }

    /// Postings a student may see today: filtered, then ranked or left in catalog order.
    pub fn list_ranked(
        &self,
        student_id: &StudentId,
        request: &ListingRequest,
    ) -> Result<Vec<ScoredPosting>, PlacementError> {
        let student = self.student(student_id)?;
        let today = self.context.clock.today();

        let visible: Vec<Posting> = self
            .context
            .store
            .all_postings()?
            .into_iter()
            .filter(|posting| posting.is_open_on(today))
            .filter(|posting| self.restriction.permits(&student, posting))
            .collect();

        let mut listed = self.filters.apply(visible, &request.filter);
        if let Some(non_negotiables) = &request.non_negotiables {
            listed.retain(|posting| non_negotiables.admits(posting, &student));
        }

        let ranked = if request.recommendations {
            self.ranking.rank(listed, &student, &request.weights, today)
        } else {
            self.ranking.unranked(listed)
        };

        info!(
            student_id = %student.id,
            listed = ranked.len(),
            recommendations = request.recommendations,
            "postings listed"
        );
        Ok(ranked)
    }

    /// Per-term score explanation for one posting.
    pub fn explain(
        &self,
        student_id: &StudentId,
        posting_id: &PostingId,
        weights: &RankingWeights,
    ) -> Result<Vec<ScoreComponent>, PlacementError> {
        let student = self.student(student_id)?;
        let posting = self.posting(posting_id)?;
        Ok(self
            .ranking
            .breakdown(&posting, &student, weights, self.context.clock.today()))
    }

    pub fn apply(
        &self,
        student_id: &StudentId,
        posting_id: &PostingId,
    ) -> Result<Application, PlacementError> {
        let student = self.student(student_id)?;
        let posting = self.posting(posting_id)?;

        self.restriction
            .check(&student, &posting)
            .map_err(|reason| PlacementError::NotEligible {
                student: student.id.clone(),
                posting: posting.id.clone(),
                reason,
            })?;

        if !posting.accepts_applications_on(self.context.clock.today()) {
            return Err(ValidationError::PostingClosed(posting.id).into());
        }

        self.ledger.submit(&student, posting_id)
    }

    pub fn approve(
        &self,
        rep: &RepId,
        application_id: &ApplicationId,
    ) -> Result<Application, PlacementError> {
        let application = self.ledger.get(application_id)?;
        self.owned_posting(rep, &application.posting_id)?;
        self.ledger.approve(application_id)
    }

    pub fn reject(
        &self,
        rep: &RepId,
        application_id: &ApplicationId,
    ) -> Result<Application, PlacementError> {
        let application = self.ledger.get(application_id)?;
        self.owned_posting(rep, &application.posting_id)?;
        self.ledger.reject(application_id)
    }

    pub fn confirm(
        &self,
        student: &StudentId,
        application_id: &ApplicationId,
    ) -> Result<ConfirmOutcome, PlacementError> {
        self.owned_application(student, application_id)?;
        self.ledger.confirm(application_id)
    }

    pub fn request_withdrawal(
        &self,
        student: &StudentId,
        application_id: &ApplicationId,
    ) -> Result<Application, PlacementError> {
        self.owned_application(student, application_id)?;
        self.ledger.request_withdrawal(application_id)
    }

    pub fn resolve_withdrawal(
        &self,
        application_id: &ApplicationId,
        approve: bool,
    ) -> Result<WithdrawalResolution, PlacementError> {
        self.ledger.resolve_withdrawal(application_id, approve)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<Application, PlacementError> {
        self.ledger.get(id)
    }

    pub fn applications_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Application>, PlacementError> {
        self.ledger.for_student(student)
    }

    /// Applications received by one of the representative's postings.
    pub fn applications_for_posting(
        &self,
        rep: &RepId,
        posting_id: &PostingId,
    ) -> Result<Vec<Application>, PlacementError> {
        self.owned_posting(rep, posting_id)?;
        self.ledger.for_posting(posting_id)
    }

    pub fn withdrawal_requests(&self) -> Result<Vec<Application>, PlacementError> {
        self.ledger.withdrawal_requests()
    }

    pub fn remaining(&self, posting_id: &PostingId) -> Result<u8, PlacementError> {
        self.ledger.remaining(posting_id)
    }

    pub fn postings_by_owner(&self, rep: &RepId) -> Result<Vec<Posting>, PlacementError> {
        Ok(self.context.store.postings_by_owner(rep)?)
    }

    fn next_posting_id(&self) -> Result<PostingId, PlacementError> {
        loop {
            let next = self.posting_sequence.fetch_add(1, Ordering::Relaxed);
            let id = PostingId(format!("INT-{next:04}"));
            if self.context.store.fetch_posting(&id)?.is_none() {
                return Ok(id);
            }
        }
    }

    /// Publish a new PENDING posting on behalf of an approved representative.
    pub fn create_posting(
        &self,
        rep_id: &RepId,
        draft: PostingDraft,
    ) -> Result<Posting, PlacementError> {
        let rep = self.representative(rep_id)?;
        if !rep.approved {
            return Err(ValidationError::RepresentativeNotApproved(rep.id).into());
        }
        validate_draft(&draft, &rep, self.context.limits.max_capacity)?;

        let _gate = self.posting_gate.lock();

        let limit = self.context.limits.max_postings_per_rep;
        let live = self
            .context
            .store
            .postings_by_owner(&rep.id)?
            .iter()
            .filter(|posting| posting.status != PostingStatus::Rejected)
            .count();
        if live >= limit {
            return Err(ValidationError::PostingLimitReached { rep: rep.id, limit }.into());
        }

        let posting = Posting {
            id: self.next_posting_id()?,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            level: draft.level,
            preferred_major: draft
                .preferred_major
                .map(|major| major.trim().to_string())
                .filter(|major| !major.is_empty()),
            company_name: rep.company_name.trim().to_string(),
            owner_rep_id: rep.id.clone(),
            capacity: draft.capacity,
            confirmed_count: 0,
            visible: true,
            open_date: draft.open_date,
            close_date: draft.close_date,
            status: PostingStatus::Pending,
        };

        self.context.store.persist_posting(posting.clone())?;
        info!(posting_id = %posting.id, rep_id = %rep.id, "posting created");
        Ok(posting)
    }

    pub fn toggle_visibility(
        &self,
        rep: &RepId,
        posting_id: &PostingId,
    ) -> Result<Posting, PlacementError> {
        self.owned_posting(rep, posting_id)?;
        let posting = self.ledger.update_posting(posting_id, |posting| {
            posting.visible = !posting.visible;
            Ok(())
        })?;
        info!(posting_id = %posting.id, visible = posting.visible, "posting visibility toggled");
        Ok(posting)
    }

    /// Staff decision on a PENDING posting.
    pub fn review_posting(
        &self,
        posting_id: &PostingId,
        approve: bool,
    ) -> Result<Posting, PlacementError> {
        let posting = self.ledger.update_posting(posting_id, |posting| {
            if posting.status != PostingStatus::Pending {
                return Err(PlacementError::PostingStateTransition {
                    posting: posting.id.clone(),
                    from: posting.status,
                    action: "review",
                });
            }
            if approve {
                posting.status = PostingStatus::Approved;
                posting.visible = true;
            } else {
                posting.status = PostingStatus::Rejected;
            }
            Ok(())
        })?;
        info!(posting_id = %posting.id, status = posting.status.label(), "posting reviewed");
        Ok(posting)
    }

    /// Approve every PENDING posting whose id is not in `except` (case-insensitive).
    /// The prior state of each approved posting is kept so the batch can be undone.
    pub fn bulk_approve_postings(
        &self,
        except: &BTreeSet<String>,
    ) -> Result<Vec<PostingId>, PlacementError> {
        let excluded: BTreeSet<String> = except
            .iter()
            .map(|id| id.trim().to_ascii_uppercase())
            .collect();

        let candidates: Vec<PostingId> = self
            .context
            .store
            .all_postings()?
            .into_iter()
            .filter(|posting| posting.status == PostingStatus::Pending)
            .filter(|posting| !excluded.contains(&posting.id.as_str().to_ascii_uppercase()))
            .map(|posting| posting.id)
            .collect();

        let mut batch = Vec::with_capacity(candidates.len());
        for id in candidates {
            let mut prior = None;
            self.ledger.update_posting(&id, |posting| {
                if posting.status == PostingStatus::Pending {
                    prior = Some(PriorPostingState {
                        id: posting.id.clone(),
                        status: posting.status,
                        visible: posting.visible,
                    });
                    posting.status = PostingStatus::Approved;
                    posting.visible = true;
                }
                Ok(())
            })?;
            batch.extend(prior);
        }

        let approved: Vec<PostingId> = batch.iter().map(|prior| prior.id.clone()).collect();
        if !batch.is_empty() {
            self.bulk_history.lock().push(batch);
        }

        info!(approved = approved.len(), excluded = excluded.len(), "postings bulk approved");
        Ok(approved)
    }

    /// Revert the most recent bulk approval. Postings that have since left
    /// APPROVED or taken a placement keep their current state.
    pub fn undo_bulk_approval(&self) -> Result<Vec<PostingId>, PlacementError> {
        let batch = self
            .bulk_history
            .lock()
            .pop()
            .ok_or(ValidationError::NothingToUndo)?;

        let mut restored = Vec::with_capacity(batch.len());
        for prior in batch {
            let mut reverted = false;
            self.ledger.update_posting(&prior.id, |posting| {
                if posting.status == PostingStatus::Approved && posting.confirmed_count == 0 {
                    posting.status = prior.status;
                    posting.visible = prior.visible;
                    reverted = true;
                }
                Ok(())
            })?;
            if reverted {
                restored.push(prior.id);
            }
        }

        info!(restored = restored.len(), "bulk approval undone");
        Ok(restored)
    }

    /// Representatives still waiting for staff approval.
    pub fn pending_representatives(&self) -> Result<Vec<RepresentativeProfile>, PlacementError> {
        Ok(self.context.store.pending_representatives()?)
    }

    /// Staff approval of a representative account. Approving twice is harmless.
    pub fn approve_representative(
        &self,
        rep_id: &RepId,
    ) -> Result<RepresentativeProfile, PlacementError> {
        let rep = self
            .context
            .store
            .approve_representative(rep_id)?
            .ok_or_else(|| PlacementError::representative_not_found(rep_id))?;
        info!(rep_id = %rep.id, company = %rep.company_name, "representative approved");
        Ok(rep)
    }

    /// Register interest in a full posting. Returns `false` if already waitlisted.
    pub fn join_waitlist(
        &self,
        student_id: &StudentId,
        posting_id: &PostingId,
    ) -> Result<bool, PlacementError> {
        let student = self.student(student_id)?;
        let posting = self.posting(posting_id)?;
        if self.ledger.slots().has_room(&posting) {
            return Err(ValidationError::PostingNotFull(posting.id).into());
        }

        let joined = self.waitlist.join(&student.id, &posting.id);
        if joined {
            self.waitlist.acknowledge(&student.id, &posting);
            info!(student_id = %student.id, posting_id = %posting.id, "waitlist joined");
        }
        Ok(joined)
    }

    pub fn waitlisted(&self, posting_id: &PostingId) -> Vec<StudentId> {
        self.waitlist.waitlisted(posting_id)
    }

    pub fn drain_waitlist(&self, posting_id: &PostingId) -> Vec<StudentId> {
        self.waitlist.drain(posting_id)
    }
}

fn validate_draft(
    draft: &PostingDraft,
    rep: &RepresentativeProfile,
    max_capacity: u8,
) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    if draft.description.trim().is_empty() {
        return Err(ValidationError::MissingField("description"));
    }
    if rep.company_name.trim().is_empty() {
        return Err(ValidationError::MissingField("company_name"));
    }
    if draft.capacity == 0 || draft.capacity > max_capacity {
        return Err(ValidationError::CapacityOutOfRange {
            capacity: draft.capacity,
            max: max_capacity,
        });
    }
    if let Some(close) = draft.close_date {
        if close < draft.open_date {
            return Err(ValidationError::InvalidWindow);
        }
    }
    Ok(())
}
