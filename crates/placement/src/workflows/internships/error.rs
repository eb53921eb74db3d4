use super::domain::{
    ApplicationId, ApplicationStatus, PostingId, PostingLevel, PostingStatus, RepId, StudentId,
};
use super::repository::RepositoryError;

/// Error raised by placement operations. A failed call leaves every entity untouched.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("student {student} already applied to posting {posting}")]
    DuplicateApplication {
        student: StudentId,
        posting: PostingId,
    },
    #[error("student {student} already holds {limit} active applications")]
    ApplicationLimitExceeded { student: StudentId, limit: usize },
    #[error("posting {posting} has no slots remaining")]
    CapacityExceeded { posting: PostingId },
    #[error("student {student} is not eligible for posting {posting}: {reason}")]
    NotEligible {
        student: StudentId,
        posting: PostingId,
        reason: IneligibilityReason,
    },
    #[error("{actor} is not allowed to act on {resource}")]
    Unauthorized { actor: String, resource: String },
    #[error("cannot {action} application {application} while it is {from}")]
    InvalidStateTransition {
        application: ApplicationId,
        from: ApplicationStatus,
        action: &'static str,
    },
    #[error("cannot {action} posting {posting} while it is {}", .from.label())]
    PostingStateTransition {
        posting: PostingId,
        from: PostingStatus,
        action: &'static str,
    },
    #[error("student {student} already confirmed a placement")]
    PlacementAlreadyConfirmed { student: StudentId },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlacementError {
    /// Stable label callers can render or match on.
    pub const fn kind(&self) -> &'static str {
        match self {
            PlacementError::Validation(_) => "validation",
            PlacementError::PlacementAlreadyConfirmed { .. } => "placement_already_confirmed",
            PlacementError::DuplicateApplication { .. } => "duplicate_application",
            PlacementError::ApplicationLimitExceeded { .. } => "application_limit_exceeded",
            PlacementError::CapacityExceeded { .. } => "capacity_exceeded",
            PlacementError::NotEligible { .. } => "not_eligible",
            PlacementError::Unauthorized { .. } => "unauthorized",
            PlacementError::InvalidStateTransition { .. }
            | PlacementError::PostingStateTransition { .. } => "invalid_state_transition",
            PlacementError::NotFound { .. } => "not_found",
            PlacementError::Repository(_) => "repository",
        }
    }

    pub(crate) fn posting_not_found(id: &PostingId) -> Self {
        PlacementError::NotFound {
            entity: "posting",
            id: id.to_string(),
        }
    }

    pub(crate) fn application_not_found(id: &ApplicationId) -> Self {
        PlacementError::NotFound {
            entity: "application",
            id: id.to_string(),
        }
    }

    pub(crate) fn student_not_found(id: &StudentId) -> Self {
        PlacementError::NotFound {
            entity: "student",
            id: id.to_string(),
        }
    }

    pub(crate) fn representative_not_found(id: &RepId) -> Self {
        PlacementError::NotFound {
            entity: "representative",
            id: id.to_string(),
        }
    }
}

/// Input rejected before any state was touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("capacity {capacity} outside allowed range 1..={max}")]
    CapacityOutOfRange { capacity: u8, max: u8 },
    #[error("representative {rep} already owns {limit} live postings")]
    PostingLimitReached { rep: RepId, limit: usize },
    #[error("{0} must not be blank")]
    MissingField(&'static str),
    #[error("close date precedes open date")]
    InvalidWindow,
    #[error("representative {0} has not been approved yet")]
    RepresentativeNotApproved(RepId),
    #[error("posting {0} still has open slots")]
    PostingNotFull(PostingId),
    #[error("posting {0} is not accepting applications")]
    PostingClosed(PostingId),
    #[error("no bulk approval to undo")]
    NothingToUndo,
}

/// Why a student may not apply to a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibilityReason {
    MajorMismatch { required: String, actual: String },
    LevelRestricted { year: u8, level: PostingLevel },
}

impl std::fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibilityReason::MajorMismatch { required, actual } => {
                write!(f, "requires major {required}, student majors in {actual}")
            }
            IneligibilityReason::LevelRestricted { year, level } => {
                write!(f, "year {year} students cannot take {} postings", level.label())
            }
        }
    }
}
