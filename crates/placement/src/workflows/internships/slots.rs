use tracing::debug;

use super::domain::{Posting, PostingId, PostingStatus};

/// Capacity arithmetic for a single posting.
///
/// `decrement` and `increment` are named after the remaining-slot count: taking a
/// slot decrements what is left (and bumps `confirmed_count`), releasing one
/// increments it again.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlotAllocator;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("posting {0} has no slots remaining")]
    Exhausted(PostingId),
}

impl SlotAllocator {
    pub fn remaining(&self, posting: &Posting) -> u8 {
        posting.capacity.saturating_sub(posting.confirmed_count)
    }

    pub fn has_room(&self, posting: &Posting) -> bool {
        self.remaining(posting) > 0
    }

    /// Take one slot; the posting becomes FILLED when the last one goes.
    pub fn decrement(&self, posting: &mut Posting) -> Result<(), SlotError> {
        if !self.has_room(posting) {
            return Err(SlotError::Exhausted(posting.id.clone()));
        }

        posting.confirmed_count += 1;
        if posting.confirmed_count == posting.capacity {
            posting.status = PostingStatus::Filled;
        }

        debug!(
            posting_id = %posting.id,
            confirmed = posting.confirmed_count,
            capacity = posting.capacity,
            "slot taken"
        );
        Ok(())
    }

    /// Give a slot back. FILLED is sticky and is not reverted here.
    pub fn increment(&self, posting: &mut Posting) {
        posting.confirmed_count = posting.confirmed_count.saturating_sub(1);
        debug!(
            posting_id = %posting.id,
            confirmed = posting.confirmed_count,
            "slot released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::internships::domain::{PostingLevel, RepId};
    use chrono::NaiveDate;

    fn posting(capacity: u8) -> Posting {
        Posting {
            id: PostingId::new("INT-0042"),
            title: "QA Intern".to_string(),
            description: "Automation suites".to_string(),
            level: PostingLevel::Basic,
            preferred_major: None,
            company_name: "Globex".to_string(),
            owner_rep_id: RepId::new("rep-2"),
            capacity,
            confirmed_count: 0,
            visible: true,
            open_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid"),
            close_date: None,
            status: PostingStatus::Approved,
        }
    }

    #[test]
    fn last_slot_marks_posting_filled() {
        let allocator = SlotAllocator;
        let mut posting = posting(2);

        allocator.decrement(&mut posting).expect("first slot");
        assert_eq!(posting.status, PostingStatus::Approved);
        assert_eq!(allocator.remaining(&posting), 1);

        allocator.decrement(&mut posting).expect("second slot");
        assert_eq!(posting.status, PostingStatus::Filled);
        assert_eq!(allocator.remaining(&posting), 0);
    }

    #[test]
    fn decrement_refuses_when_exhausted_and_leaves_posting_alone() {
        let allocator = SlotAllocator;
        let mut posting = posting(1);
        allocator.decrement(&mut posting).expect("only slot");
        let before = posting.clone();

        assert_eq!(
            allocator.decrement(&mut posting),
            Err(SlotError::Exhausted(PostingId::new("INT-0042")))
        );
        assert_eq!(posting, before);
    }

    #[test]
    fn increment_floors_at_zero_and_keeps_filled() {
        let allocator = SlotAllocator;
        let mut posting = posting(1);
        allocator.decrement(&mut posting).expect("only slot");

        allocator.increment(&mut posting);
        assert_eq!(posting.confirmed_count, 0);
        assert_eq!(posting.status, PostingStatus::Filled);
        assert_eq!(allocator.remaining(&posting), 1);

        allocator.increment(&mut posting);
        assert_eq!(posting.confirmed_count, 0);
    }
}
