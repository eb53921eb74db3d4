use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for internship postings.
    PostingId
);
identifier!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
identifier!(StudentId);
identifier!(
    /// Opaque reference to the company representative owning a posting.
    RepId
);
identifier!(StaffId);

/// Seniority band of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl PostingLevel {
    pub const fn label(self) -> &'static str {
        match self {
            PostingLevel::Basic => "basic",
            PostingLevel::Intermediate => "intermediate",
            PostingLevel::Advanced => "advanced",
        }
    }
}

/// Administrative status of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingStatus {
    Pending,
    Approved,
    Rejected,
    Filled,
}

impl PostingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PostingStatus::Pending => "pending",
            PostingStatus::Approved => "approved",
            PostingStatus::Rejected => "rejected",
            PostingStatus::Filled => "filled",
        }
    }
}

/// An internship opportunity with a bounded number of slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub title: String,
    pub description: String,
    pub level: PostingLevel,
    pub preferred_major: Option<String>,
    pub company_name: String,
    pub owner_rep_id: RepId,
    pub capacity: u8,
    pub confirmed_count: u8,
    pub visible: bool,
    pub open_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub status: PostingStatus,
}

impl Posting {
    /// Preferred major with blank values treated as unset.
    pub fn preferred_major(&self) -> Option<&str> {
        self.preferred_major
            .as_deref()
            .map(str::trim)
            .filter(|major| !major.is_empty())
    }

    /// True when the posting has no preferred major or it matches `major` ignoring case.
    pub fn welcomes_major(&self, major: &str) -> bool {
        match self.preferred_major() {
            Some(preferred) => preferred.eq_ignore_ascii_case(major.trim()),
            None => true,
        }
    }

    /// Case-insensitive substring search over title, company and description.
    pub fn mentions(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }

        [&self.title, &self.company_name, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn within_window(&self, today: NaiveDate) -> bool {
        today >= self.open_date && self.close_date.map_or(true, |close| today <= close)
    }

    /// Listable to students on `today`.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.visible && self.status == PostingStatus::Approved && self.within_window(today)
    }

    /// FILLED postings still accept submissions so the capacity check reports the failure.
    pub fn accepts_applications_on(&self, today: NaiveDate) -> bool {
        self.visible
            && matches!(
                self.status,
                PostingStatus::Approved | PostingStatus::Filled
            )
            && self.within_window(today)
    }
}

/// Representative-supplied fields for a new posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDraft {
    pub title: String,
    pub description: String,
    pub level: PostingLevel,
    #[serde(default)]
    pub preferred_major: Option<String>,
    pub capacity: u8,
    pub open_date: NaiveDate,
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
}

/// Lifecycle of a student's application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Successful,
    Unsuccessful,
    Confirmed,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Successful => "successful",
            ApplicationStatus::Unsuccessful => "unsuccessful",
            ApplicationStatus::Confirmed => "confirmed",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Unsuccessful | ApplicationStatus::Withdrawn
        )
    }

    /// Counts against the per-student active application cap.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Successful
        )
    }

    pub const fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Successful)
                | (Pending, Unsuccessful)
                | (Successful, Confirmed)
                | (Pending, Withdrawn)
                | (Successful, Withdrawn)
                | (Confirmed, Withdrawn)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A student's claim on one slot of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub posting_id: PostingId,
    pub status: ApplicationStatus,
    pub withdrawal_requested: bool,
}

impl Application {
    pub fn new(id: ApplicationId, student_id: StudentId, posting_id: PostingId) -> Self {
        Self {
            id,
            student_id,
            posting_id,
            status: ApplicationStatus::Pending,
            withdrawal_requested: false,
        }
    }

    /// Copy of the record moved to WITHDRAWN with any pending request cleared.
    pub(crate) fn withdrawn(&self) -> Self {
        Self {
            status: ApplicationStatus::Withdrawn,
            withdrawal_requested: false,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub year: u8,
    pub major: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentativeProfile {
    pub id: RepId,
    pub company_name: String,
    pub approved: bool,
}

/// Caller identity resolved once per session and dispatched with a single match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Student(StudentProfile),
    Representative(RepresentativeProfile),
    Staff { id: StaffId },
}

impl Role {
    pub const fn label(&self) -> &'static str {
        match self {
            Role::Student(_) => "student",
            Role::Representative(_) => "representative",
            Role::Staff { .. } => "staff",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> Posting {
        Posting {
            id: PostingId::new("INT-0001"),
            title: "Backend Intern".to_string(),
            description: "Work on payment rails".to_string(),
            level: PostingLevel::Basic,
            preferred_major: Some("  ".to_string()),
            company_name: "Acme Fintech".to_string(),
            owner_rep_id: RepId::new("rep-1"),
            capacity: 2,
            confirmed_count: 0,
            visible: true,
            open_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid"),
            close_date: Some(NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid")),
            status: PostingStatus::Approved,
        }
    }

    #[test]
    fn blank_preferred_major_welcomes_everyone() {
        let posting = posting();
        assert_eq!(posting.preferred_major(), None);
        assert!(posting.welcomes_major("Biology"));
    }

    #[test]
    fn mentions_is_case_insensitive_across_fields() {
        let posting = posting();
        assert!(posting.mentions("BACKEND"));
        assert!(posting.mentions("fintech"));
        assert!(posting.mentions("Payment"));
        assert!(!posting.mentions("frontend"));
        assert!(!posting.mentions("   "));
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let posting = posting();
        assert!(posting.is_open_on(NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid")));
        assert!(posting.is_open_on(NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid")));
        assert!(!posting.is_open_on(NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid")));
    }

    #[test]
    fn filled_postings_are_hidden_but_still_accept_submissions() {
        let mut posting = posting();
        posting.status = PostingStatus::Filled;
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid");
        assert!(!posting.is_open_on(today));
        assert!(posting.accepts_applications_on(today));
    }

    #[test]
    fn terminal_states_allow_no_transitions() {
        use ApplicationStatus::*;
        for next in [Pending, Successful, Unsuccessful, Confirmed, Withdrawn] {
            assert!(!Unsuccessful.can_transition_to(next));
            assert!(!Withdrawn.can_transition_to(next));
        }
        assert!(Pending.can_transition_to(Withdrawn));
        assert!(!Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Withdrawn));
    }
}
