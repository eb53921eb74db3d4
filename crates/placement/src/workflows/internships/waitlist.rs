use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::domain::{Posting, PostingId, StudentId};
use super::repository::{Notice, NotificationSink};

/// Per-posting, insertion-ordered and duplicate-free sets of interested students.
pub struct WaitlistNotifier<N> {
    entries: Mutex<HashMap<PostingId, Vec<StudentId>>>,
    sink: Arc<N>,
}

impl<N> WaitlistNotifier<N>
where
    N: NotificationSink + 'static,
{
    pub fn new(sink: Arc<N>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Returns `false` when the student was already waitlisted.
    pub fn join(&self, student: &StudentId, posting: &PostingId) -> bool {
        let mut entries = self.entries.lock();
        let waitlist = entries.entry(posting.clone()).or_default();
        if waitlist.contains(student) {
            return false;
        }
        waitlist.push(student.clone());
        true
    }

    pub fn waitlisted(&self, posting: &PostingId) -> Vec<StudentId> {
        self.entries
            .lock()
            .get(posting)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove and return the waitlist, for callers wanting one-shot notifications.
    pub fn drain(&self, posting: &PostingId) -> Vec<StudentId> {
        self.entries.lock().remove(posting).unwrap_or_default()
    }

    /// Tell every waitlisted student a slot opened. Entries are kept; returns the
    /// number of notices delivered.
    pub fn on_slot_freed(&self, posting: &Posting) -> usize {
        let recipients = self.waitlisted(&posting.id);
        let mut delivered = 0;

        for student in recipients {
            let notice = Notice {
                template: "slot_freed".to_string(),
                recipient: student.clone(),
                posting_id: posting.id.clone(),
                message: format!(
                    "A slot just opened for {} @ {}",
                    posting.title, posting.company_name
                ),
            };
            match self.sink.deliver(notice) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(posting_id = %posting.id, student_id = %student, %error, "slot notice not delivered")
                }
            }
        }

        info!(posting_id = %posting.id, delivered, "waitlist notified of freed slot");
        delivered
    }

    /// Confirmation sent when a student joins a waitlist.
    pub(crate) fn acknowledge(&self, student: &StudentId, posting: &Posting) {
        let notice = Notice {
            template: "waitlist_joined".to_string(),
            recipient: student.clone(),
            posting_id: posting.id.clone(),
            message: format!("You joined the waitlist for {}", posting.title),
        };
        if let Err(error) = self.sink.deliver(notice) {
            warn!(posting_id = %posting.id, student_id = %student, %error, "waitlist acknowledgement not delivered");
        }
    }
}
