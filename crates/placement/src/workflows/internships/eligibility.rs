use super::domain::{Posting, PostingLevel, StudentProfile};
use super::error::IneligibilityReason;

/// Decides whether a student may apply to a posting at all.
pub trait EligibilityPolicy: Send + Sync {
    fn check(&self, student: &StudentProfile, posting: &Posting) -> Result<(), IneligibilityReason>;

    fn is_eligible(&self, student: &StudentProfile, posting: &Posting) -> bool {
        self.check(student, posting).is_ok()
    }
}

/// Rejects only when the posting names a preferred major the student does not hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct MajorEligibilityPolicy;

impl EligibilityPolicy for MajorEligibilityPolicy {
    fn check(&self, student: &StudentProfile, posting: &Posting) -> Result<(), IneligibilityReason> {
        match posting.preferred_major() {
            Some(required) if !posting.welcomes_major(&student.major) => {
                Err(IneligibilityReason::MajorMismatch {
                    required: required.to_string(),
                    actual: student.major.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Seniority rule applied by the listing and apply call sites, separate from
/// [`EligibilityPolicy`] so either can be swapped.
pub trait LevelRestriction: Send + Sync {
    fn check(&self, student: &StudentProfile, posting: &Posting) -> Result<(), IneligibilityReason>;

    fn permits(&self, student: &StudentProfile, posting: &Posting) -> bool {
        self.check(student, posting).is_ok()
    }
}

pub const DEFAULT_JUNIOR_MAX_YEAR: u8 = 2;

/// Students up to `junior_max_year` only see and apply to BASIC postings.
#[derive(Debug, Clone, Copy)]
pub struct YearLevelRestriction {
    pub junior_max_year: u8,
}

impl Default for YearLevelRestriction {
    fn default() -> Self {
        Self {
            junior_max_year: DEFAULT_JUNIOR_MAX_YEAR,
        }
    }
}

impl LevelRestriction for YearLevelRestriction {
    fn check(&self, student: &StudentProfile, posting: &Posting) -> Result<(), IneligibilityReason> {
        if student.year <= self.junior_max_year && posting.level != PostingLevel::Basic {
            return Err(IneligibilityReason::LevelRestricted {
                year: student.year,
                level: posting.level,
            });
        }
        Ok(())
    }
}
