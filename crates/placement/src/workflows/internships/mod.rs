//! Internship placement: the application lifecycle with slot bookkeeping, and the
//! filter/ranking pipeline that decides what each student sees.

pub mod context;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod filter;
pub mod ledger;
pub(crate) mod locks;
pub mod memory;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod slots;
pub mod waitlist;

#[cfg(test)]
mod tests;

pub use context::PlacementContext;
pub use domain::{
    Application, ApplicationId, ApplicationStatus, Posting, PostingDraft, PostingId,
    PostingLevel, PostingStatus, RepId, RepresentativeProfile, Role, StaffId, StudentId,
    StudentProfile,
};
pub use eligibility::{
    EligibilityPolicy, LevelRestriction, MajorEligibilityPolicy, YearLevelRestriction,
};
pub use error::{IneligibilityReason, PlacementError, ValidationError};
pub use filter::{FilterConfig, FilterEngine, NonNegotiables};
pub use ledger::{ApplicationLedger, ConfirmOutcome, WithdrawalResolution};
pub use memory::{InMemoryNoticeBox, InMemoryPlacementStore};
pub use ranking::{RankingEngine, RankingWeights, ScoreComponent, ScoreFactor, ScoredPosting};
pub use repository::{
    AccountStore, ApplicationStore, Clock, FixedClock, Notice, NotificationSink, NotifyError,
    PlacementStore, PostingStore, RepositoryError, SystemClock, WriteBatch,
};
pub use router::{placement_router, ACTOR_HEADER};
pub use service::{ListingRequest, PlacementService};
pub use slots::{SlotAllocator, SlotError};
pub use waitlist::WaitlistNotifier;
