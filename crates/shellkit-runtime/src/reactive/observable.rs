#![forbid(unsafe_code)]

//! Shared selection values.
//!
//! # Design
//!
//! An [`Observable<T>`] is one value behind `Rc<RefCell<..>>` plus a list of
//! weakly held listeners. Writes compare with `PartialEq` first: an equal
//! write changes nothing, bumps nothing and notifies nobody. Two-way URL
//! sync settles because of that rule, since echoing a value back is silent.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: the borrow is released before listeners run, so a
//!   listener may write this or any other observable. The nested round
//!   finishes before the outer one continues.
//! - **Forgotten guards**: listeners live exactly as long as their
//!   [`Subscription`]. Entries whose guard is gone are swept on the next
//!   write.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug_span;
use web_time::Instant;

type Listener<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    value: T,
    version: u64,
    listeners: Vec<Weak<dyn Fn(&T)>>,
}

/// Shared value with change notification.
///
/// Clones are handles to the same slot.
///
/// # Invariants
///
/// 1. Each effective write bumps `version` by one.
/// 2. Writing the current value is a no-op.
/// 3. Listeners run in subscription order.
pub struct Observable<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("Observable")
            .field("value", &slot.value)
            .field("version", &slot.version)
            .field("listeners", &slot.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Fresh slot at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value,
                version: 0,
                listeners: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().value.clone()
    }

    /// Borrow the value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow().value)
    }

    /// Write `value`; `true` when it differed and listeners ran (or were
    /// queued in the open batch).
    pub fn set(&self, value: T) -> bool {
        {
            let mut slot = self.slot.borrow_mut();
            if slot.value == value {
                return false;
            }
            slot.value = value;
            slot.version += 1;
        }
        self.notify();
        true
    }

    /// Listen for effective writes until the guard drops.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Listener<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.slot.borrow_mut().listeners.push(weak);
        Subscription::new(strong)
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.borrow().version
    }

    /// Registered listeners, counting dead ones not yet swept.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slot.borrow().listeners.len()
    }

    /// Run live listeners with the current value, sweeping dead entries.
    ///
    /// Inside a [`super::batch::BatchScope`] each listener is queued under its
    /// own address and later reads whatever value is current at flush.
    fn notify(&self) {
        let live: Vec<Listener<T>> = {
            let mut slot = self.slot.borrow_mut();
            slot.listeners.retain(|w| w.strong_count() > 0);
            slot.listeners.iter().filter_map(Weak::upgrade).collect()
        };
        if live.is_empty() {
            return;
        }

        if super::batch::is_batching() {
            for listener in live {
                let key = Rc::as_ptr(&listener).cast::<()>() as usize;
                let source = self.clone();
                super::batch::enqueue(Some(key), move || listener(&source.get()));
            }
            return;
        }

        let value = self.get();
        let start = Instant::now();
        let span = debug_span!(
            "store.notify",
            listeners = live.len() as u64,
            duration_us = tracing::field::Empty
        );
        let _entered = span.enter();
        for listener in &live {
            listener(&value);
        }
        span.record("duration_us", start.elapsed().as_micros() as u64);
    }
}

/// Read-only view of an [`Observable`].
///
/// Handed to consumers that may observe a value but must not write it
/// (the panel's open and mobile-mode flags).
pub struct ReadSignal<T> {
    source: Observable<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.source).finish()
    }
}

impl<T: Clone + PartialEq + 'static> ReadSignal<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    /// Subscribe to value changes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// A read-only handle sharing this observable's state.
    #[must_use]
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            source: self.clone(),
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` makes the associated callback unreachable
/// (the strong `Rc` is dropped, so the `Weak` held by the source fails to
/// upgrade on the next notification).
///
/// The same guard type is returned by every subscription point in the
/// shell (observables, history, stores), so owners can keep them in one
/// `Vec<Subscription>` and release them together.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl Subscription {
    /// Wrap any keep-alive value as a subscription guard.
    pub fn new(guard: impl std::any::Any) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
