use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Opaque handle to a mounted root. Never reused within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(pub(crate) u32);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    queue: Vec<RootId>,
    pending: HashSet<RootId>,
}

/// Microtask queue of pending root renders.
///
/// Cloning yields another handle to the same queue; tracked values carry one
/// so a write anywhere can schedule renders without reaching the runtime.
#[derive(Debug, Clone, Default)]
pub struct Scheduler(Rc<RefCell<SchedulerState>>);

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a render for `root`. A root already pending is not queued twice.
    /// Returns whether the call queued anything.
    pub fn schedule_render(&self, root: RootId) -> bool {
        let mut state = self.0.borrow_mut();
        if !state.pending.insert(root) {
            return false;
        }
        state.queue.push(root);
        tracing::trace!(%root, "render scheduled");
        true
    }

    pub fn is_pending(&self, root: RootId) -> bool {
        self.0.borrow().pending.contains(&root)
    }

    pub fn pending_count(&self) -> usize {
        self.0.borrow().queue.len()
    }

    /// Take the roots queued so far, in FIFO order. Their pending flags stay
    /// set until [`Scheduler::begin_render`] so that writes made while an
    /// earlier root of the batch renders do not queue them again.
    pub(crate) fn take_batch(&self) -> Vec<RootId> {
        std::mem::take(&mut self.0.borrow_mut().queue)
    }

    /// Clear the pending flag right before `root` renders
    pub(crate) fn begin_render(&self, root: RootId) {
        self.0.borrow_mut().pending.remove(&root);
    }

    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
