#![forbid(unsafe_code)]

//! Deferred-task and animation-frame scheduling.
//!
//! The shell runs on a single-threaded, cooperative event loop. Two kinds of
//! deferral exist:
//!
//! - **Tasks** (`defer`): zero-delay macrotasks. They run strictly after the
//!   current synchronous call stack, including any nested store
//!   notifications, has returned. The URL synchroniser releases its
//!   re-entrancy guard this way.
//! - **Frames** (`request_frame`): callbacks run at the next animation frame.
//!   The panel controller applies coalesced resize events this way.
//!
//! [`Scheduler`] is the seam. The browser binding implements it with
//! `setTimeout(0)` and `requestAnimationFrame`; [`LocalScheduler`] is the
//! deterministic, host-driven implementation used by native hosts and tests:
//! nothing runs until the host calls [`LocalScheduler::run_tasks`],
//! [`LocalScheduler::run_frame`], or [`LocalScheduler::run_until_idle`].
//!
//! # Invariants
//!
//! 1. Tasks run in FIFO order; a task deferred while tasks are running runs
//!    in the same `run_tasks` call, after the ones already queued.
//! 2. `run_frame` runs only the frame callbacks requested before it started;
//!    callbacks requested during a frame wait for the next one.
//! 3. Cancelled tasks and frames never run. Cancelling an already-run or
//!    unknown handle is a no-op.
//! 4. No internal borrow is held while a callback runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A queued callback.
pub type Task = Box<dyn FnOnce()>;

/// Handle to a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Handle to a requested animation frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Event-loop deferral primitives.
pub trait Scheduler {
    /// Run `task` after the current call stack completes (zero-delay timer).
    fn defer(&self, task: Task) -> TaskId;

    /// Cancel a deferred task that has not run yet.
    fn cancel(&self, id: TaskId);

    /// Run `task` at the next animation frame.
    fn request_frame(&self, task: Task) -> FrameId;

    /// Cancel a frame callback that has not run yet.
    fn cancel_frame(&self, id: FrameId);
}

#[derive(Default)]
struct Queues {
    next_id: u64,
    tasks: VecDeque<(u64, Task)>,
    frames: VecDeque<(u64, Task)>,
    tasks_run: u64,
    frames_run: u64,
}

impl Queues {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Deterministic host-driven scheduler.
///
/// Cloning yields another handle to the same queues, so a controller can
/// hold one handle while the host pumps another.
#[derive(Clone, Default)]
pub struct LocalScheduler {
    queues: Rc<RefCell<Queues>>,
}

impl std::fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = self.queues.borrow();
        f.debug_struct("LocalScheduler")
            .field("pending_tasks", &q.tasks.len())
            .field("pending_frames", &q.frames.len())
            .field("tasks_run", &q.tasks_run)
            .field("frames_run", &q.frames_run)
            .finish()
    }
}

impl LocalScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queues.borrow().tasks.len()
    }

    /// Number of queued frame callbacks.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.queues.borrow().frames.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let q = self.queues.borrow();
        q.tasks.is_empty() && q.frames.is_empty()
    }

    /// Total tasks executed so far.
    #[must_use]
    pub fn tasks_run(&self) -> u64 {
        self.queues.borrow().tasks_run
    }

    /// Total frame callbacks executed so far.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.queues.borrow().frames_run
    }

    /// Run queued tasks until the task queue is empty. Returns how many ran.
    pub fn run_tasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut q = self.queues.borrow_mut();
                let next = q.tasks.pop_front();
                if next.is_some() {
                    q.tasks_run += 1;
                }
                next
            };
            match next {
                Some((_, task)) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Run one animation frame: the callbacks requested before this call.
    /// Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let due: Vec<(u64, Task)> = {
            let mut q = self.queues.borrow_mut();
            let due: Vec<_> = q.frames.drain(..).collect();
            q.frames_run += due.len() as u64;
            due
        };
        let ran = due.len();
        for (_, task) in due {
            task();
        }
        ran
    }

    /// Alternate tasks and frames until both queues are empty.
    ///
    /// `max_rounds` bounds the loop so a callback that keeps re-arming
    /// itself cannot hang a test; returns `false` if the bound was hit.
    pub fn run_until_idle(&self, max_rounds: usize) -> bool {
        for _ in 0..max_rounds {
            self.run_tasks();
            if self.is_idle() {
                return true;
            }
            self.run_frame();
            if self.is_idle() {
                return true;
            }
        }
        self.is_idle()
    }
}

impl Scheduler for LocalScheduler {
    fn defer(&self, task: Task) -> TaskId {
        let mut q = self.queues.borrow_mut();
        let id = q.next_id();
        q.tasks.push_back((id, task));
        TaskId(id)
    }

    fn cancel(&self, id: TaskId) {
        self.queues
            .borrow_mut()
            .tasks
            .retain(|(task_id, _)| *task_id != id.0);
    }

    fn request_frame(&self, task: Task) -> FrameId {
        let mut q = self.queues.borrow_mut();
        let id = q.next_id();
        q.frames.push_back((id, task));
        FrameId(id)
    }

    fn cancel_frame(&self, id: FrameId) {
        self.queues
            .borrow_mut()
            .frames
            .retain(|(frame_id, _)| *frame_id != id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let make = move |label: &'static str| -> Task {
            let log = Rc::clone(&log_clone);
            Box::new(move || log.borrow_mut().push(label))
        };
        (log, make)
    }

    #[test]
    fn nothing_runs_until_pumped() {
        let sched = LocalScheduler::new();
        let (log, task) = recorder();
        sched.defer(task("a"));
        sched.request_frame(task("f"));
        assert!(log.borrow().is_empty());
        assert_eq!(sched.pending_tasks(), 1);
        assert_eq!(sched.pending_frames(), 1);
    }

    #[test]
    fn tasks_run_fifo_including_nested() {
        let sched = LocalScheduler::new();
        let (log, task) = recorder();
        let inner = sched.clone();
        let nested = task("nested");
        sched.defer(task("first"));
        sched.defer(Box::new(move || {
            inner.defer(nested);
        }));
        sched.defer(task("third"));

        assert_eq!(sched.run_tasks(), 4);
        assert_eq!(*log.borrow(), vec!["first", "third", "nested"]);
        assert_eq!(sched.tasks_run(), 4);
    }

    #[test]
    fn frame_requested_during_frame_waits() {
        let sched = LocalScheduler::new();
        let (log, task) = recorder();
        let inner = sched.clone();
        let later = task("second-frame");
        sched.request_frame(Box::new(move || {
            inner.request_frame(later);
        }));

        assert_eq!(sched.run_frame(), 1);
        assert!(log.borrow().is_empty());
        assert_eq!(sched.run_frame(), 1);
        assert_eq!(*log.borrow(), vec!["second-frame"]);
    }

    #[test]
    fn cancelled_work_never_runs() {
        let sched = LocalScheduler::new();
        let (log, task) = recorder();
        let t = sched.defer(task("task"));
        let f = sched.request_frame(task("frame"));
        sched.cancel(t);
        sched.cancel_frame(f);
        sched.cancel(TaskId(999));

        assert!(sched.run_until_idle(4));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn run_until_idle_is_bounded() {
        fn rearm_frame(sched: LocalScheduler) {
            let next = sched.clone();
            sched.request_frame(Box::new(move || rearm_frame(next)));
        }
        let sched = LocalScheduler::new();
        rearm_frame(sched.clone());
        assert!(!sched.run_until_idle(3));
        assert_eq!(sched.frames_run(), 3);
        assert_eq!(sched.pending_frames(), 1);
    }
}
