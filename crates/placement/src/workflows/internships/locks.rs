use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use super::domain::{PostingId, StudentId};

/// One mutex per key, created on first use and dropped once nobody holds or waits on it.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn get(&self, key: &K) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn with<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let lock = self.get(key);
        let result = {
            let _guard = lock.lock();
            f()
        };
        self.release(key, &lock);
        result
    }

    /// Evict the entry when the map and this caller hold the only handles. New
    /// handles are only cloned under the map lock, so the count cannot grow here.
    fn release(&self, key: &K, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        if Arc::strong_count(lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// The two mutual-exclusion scopes of the ledger. Always taken student first, then posting.
#[derive(Default)]
pub(crate) struct LockScopes {
    students: KeyedLocks<StudentId>,
    postings: KeyedLocks<PostingId>,
}

impl LockScopes {
    pub(crate) fn student_then_posting<R>(
        &self,
        student: &StudentId,
        posting: &PostingId,
        f: impl FnOnce() -> R,
    ) -> R {
        self.students
            .with(student, || self.postings.with(posting, f))
    }

    pub(crate) fn posting<R>(&self, posting: &PostingId, f: impl FnOnce() -> R) -> R {
        self.postings.with(posting, f)
    }
}
