//! A sequence list shared between threads behind one reentrant lock
//!
//! The owning thread may lock again while already holding the lock; each
//! [`ListGuard`] adds one to the hold count and releases it on drop. Other
//! threads block in [`SharedSequenceList::lock`] until the count falls to
//! zero.

use std::cell::{Ref, RefCell, RefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::collection::list::SequenceList;

struct Shared {
    list: ReentrantMutex<RefCell<SequenceList>>,
    holds: AtomicUsize,
}

#[derive(Clone)]
pub struct SharedSequenceList {
    inner: Arc<Shared>,
}

impl SharedSequenceList {
    pub fn new(list: SequenceList) -> Self {
        Self {
            inner: Arc::new(Shared {
                list: ReentrantMutex::new(RefCell::new(list)),
                holds: AtomicUsize::new(0),
            }),
        }
    }

    /// Block until this thread holds the lock.
    pub fn lock(&self) -> ListGuard<'_> {
        let guard = self.inner.list.lock();
        self.inner.holds.fetch_add(1, Ordering::AcqRel);
        ListGuard {
            guard,
            holds: &self.inner.holds,
        }
    }

    pub fn try_lock(&self) -> Option<ListGuard<'_>> {
        let guard = self.inner.list.try_lock()?;
        self.inner.holds.fetch_add(1, Ordering::AcqRel);
        Some(ListGuard {
            guard,
            holds: &self.inner.holds,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.inner.list.is_locked()
    }

    pub fn is_locked_by_current_thread(&self) -> bool {
        self.inner.list.is_owned_by_current_thread()
    }
}

impl Default for SharedSequenceList {
    fn default() -> Self {
        Self::new(SequenceList::new())
    }
}

impl From<SequenceList> for SharedSequenceList {
    fn from(list: SequenceList) -> Self {
        Self::new(list)
    }
}

impl std::fmt::Debug for SharedSequenceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSequenceList")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// One hold on a [`SharedSequenceList`].
///
/// Reading and writing go through `borrow`/`borrow_mut`. Nested guards on
/// the same thread share the list, so a `borrow_mut` must not overlap any
/// other borrow from an outer guard.
pub struct ListGuard<'a> {
    guard: ReentrantMutexGuard<'a, RefCell<SequenceList>>,
    holds: &'a AtomicUsize,
}

impl ListGuard<'_> {
    pub fn borrow(&self) -> Ref<'_, SequenceList> {
        self.guard.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SequenceList> {
        self.guard.borrow_mut()
    }

    /// How many guards the owning thread currently holds.
    pub fn hold_count(&self) -> usize {
        self.holds.load(Ordering::Acquire)
    }

    /// Release this hold. Same as dropping the guard.
    pub fn unlock(self) {}
}

impl Drop for ListGuard<'_> {
    fn drop(&mut self) {
        self.holds.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reentrant_hold_count() {
        let shared = SharedSequenceList::default();
        let outer = shared.lock();
        assert_eq!(outer.hold_count(), 1);
        assert!(shared.is_locked_by_current_thread());
        {
            let inner = shared.lock();
            assert_eq!(inner.hold_count(), 2);
            inner.borrow_mut().add(Sequence::new("Aus bus", "ACGT").unwrap());
        }
        assert_eq!(outer.hold_count(), 1);
        assert_eq!(outer.borrow().len(), 1);
        outer.unlock();
        assert!(!shared.is_locked());
    }

    #[test]
    fn test_other_threads_wait() {
        let shared = SharedSequenceList::default();
        let guard = shared.lock();

        let other = shared.clone();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let blocked = other.try_lock().is_none();
            let owned = other.is_locked_by_current_thread();
            ready_tx.send((blocked, owned)).unwrap();
            let guard = other.lock();
            guard.borrow_mut().add(Sequence::new("Aus bus", "ACGT").unwrap());
            done_tx.send(()).unwrap();
        });

        assert_eq!(ready_rx.recv().unwrap(), (true, false));
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        guard.unlock();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert_eq!(shared.lock().borrow().len(), 1);
    }
}
