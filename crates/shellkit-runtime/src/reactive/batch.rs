#![forbid(unsafe_code)]

//! Grouped store writes.
//!
//! A URL→store pass can write the project and the initiative back to back.
//! Unbatched, a project subscriber would run while the initiative still
//! holds its old value and render a state that never existed in the URL.
//! Holding a [`BatchScope`] across the writes postpones every notification
//! to the moment the outermost scope drops; each subscriber then runs once
//! and reads the final values.
//!
//! ```
//! use shellkit_runtime::reactive::{BatchScope, Observable};
//!
//! let project = Observable::new(None::<String>);
//! let initiative = Observable::new(None::<String>);
//! {
//!     let _batch = BatchScope::new();
//!     project.set(Some("proj-001".into()));
//!     initiative.set(Some("INIT-42".into()));
//!     assert_eq!(project.get().as_deref(), Some("proj-001"));
//! }
//! ```
//!
//! # Invariants
//!
//! 1. Scopes nest; only the outermost drop flushes.
//! 2. Values change immediately. Only notifications wait.
//! 3. A keyed entry queued twice keeps its first position and its latest
//!    callback, so one subscriber of one observable runs at most once.
//! 4. Flushed callbacks run after the batch is torn down: a write made by a
//!    callback notifies on the spot.
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: the remaining callbacks still run, then the
//!   first panic resumes.

use std::cell::RefCell;

use tracing::debug_span;
use web_time::Instant;

struct Pending {
    key: Option<usize>,
    run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct OpenBatch {
    depth: u32,
    queue: Vec<Pending>,
}

thread_local! {
    static OPEN: RefCell<Option<OpenBatch>> = const { RefCell::new(None) };
}

/// Whether a [`BatchScope`] is alive on this thread.
pub fn is_batching() -> bool {
    OPEN.with(|open| open.borrow().is_some())
}

/// Queue `f` in the open batch, or run it now when none is open.
///
/// With `Some(key)`, a later call with the same key replaces the queued
/// callback in place. Returns `true` when `f` was queued.
pub fn enqueue(key: Option<usize>, f: impl FnOnce() + 'static) -> bool {
    let f = {
        let mut open = OPEN.with(|open| open.borrow_mut().take());
        let queued = match open.as_mut() {
            None => Some(f),
            Some(batch) => {
                let slot = match key {
                    Some(k) => batch.queue.iter_mut().find(|p| p.key == Some(k)),
                    None => None,
                };
                match slot {
                    Some(pending) => pending.run = Box::new(f),
                    None => batch.queue.push(Pending {
                        key,
                        run: Box::new(f),
                    }),
                }
                None
            }
        };
        OPEN.with(|slot| *slot.borrow_mut() = open);
        queued
    };
    match f {
        Some(f) => {
            f();
            false
        }
        None => true,
    }
}

fn flush(queue: Vec<Pending>) {
    if queue.is_empty() {
        return;
    }
    let start = Instant::now();
    let span = debug_span!(
        "store.batch_flush",
        callbacks = queue.len() as u64,
        duration_us = tracing::field::Empty
    );
    let _entered = span.enter();

    let mut first_panic = None;
    for pending in queue {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(pending.run));
        if let Err(payload) = outcome {
            first_panic.get_or_insert(payload);
        }
    }
    span.record("duration_us", start.elapsed().as_micros() as u64);

    if let Some(payload) = first_panic {
        std::panic::resume_unwind(payload);
    }
}

/// RAII batch guard. See the module docs.
pub struct BatchScope {
    outermost: bool,
}

impl BatchScope {
    #[must_use]
    pub fn new() -> Self {
        let outermost = OPEN.with(|open| {
            let mut open = open.borrow_mut();
            let batch = open.get_or_insert_with(OpenBatch::default);
            batch.depth += 1;
            batch.depth == 1
        });
        Self { outermost }
    }

    /// Callbacks waiting in the open batch.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        OPEN.with(|open| open.borrow().as_ref().map_or(0, |b| b.queue.len()))
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let finished = OPEN.with(|open| {
            let mut open = open.borrow_mut();
            let batch = open.as_mut()?;
            batch.depth = batch.depth.saturating_sub(1);
            if batch.depth == 0 { open.take() } else { None }
        });
        if let Some(batch) = finished {
            flush(batch.queue);
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("outermost", &self.outermost)
            .field("pending", &self.pending_count())
            .finish()
    }
}
