#![forbid(unsafe_code)]

//! Side-panel visibility controller.
//!
//! [`PanelController`] is the single source of truth for whether the
//! secondary panel is open. It reacts to viewport resizes, the toggle
//! shortcut and explicit toggles, remembers the user's preference in a
//! [`PreferenceStore`], and returns focus to the toggle control when the
//! user closes the panel.
//!
//! # Initialization
//!
//! | Viewport             | `is_open`                  | Storage                        |
//! |----------------------|----------------------------|--------------------------------|
//! | unknown (SSR)        | `true`                     | untouched                      |
//! | `< tablet`           | `false`                    | written only if it disagrees   |
//! | `>= tablet`          | `!collapsed` from storage  | read                           |
//!
//! A controller started without a viewport hydrates on its first resize:
//! that width is run through the same precedence.
//!
//! # Invariants
//!
//! 1. At rest, the stored `collapsed` value is the inverse of `is_open`
//!    (while persistence is available).
//! 2. After any resize to a width below the tablet breakpoint the panel is
//!    closed. Growing the viewport never reopens it.
//! 3. `is_mobile_nav_mode` is recomputed from the width on every resize and
//!    has no other mutation path.
//! 4. Focus moves to the toggle control only on a user-caused open→closed
//!    transition, never on mount, hydration or auto-collapse.
//! 5. Raw resize events reach [`PanelController::on_resize`] at most once
//!    per animation frame, with the latest width.
//!
//! # Failure Modes
//!
//! - **Storage failure**: the first failed read or write logs one warning
//!   and switches the controller to [`PersistenceMode::Ephemeral`]. No
//!   storage calls are made after that; the panel keeps working in memory.
//! - **Focus target gone**: the target is held weakly. If the control was
//!   unmounted, focus return is skipped.
//! - **Disposed**: after [`PanelController::dispose`] every handler is a
//!   no-op and the pending resize frame is cancelled.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use shellkit_core::{Breakpoints, KeyDisposition, KeyEvent, ResizeCoalescer, Shortcut, Viewport};
use tracing::{debug, debug_span, trace, warn};

use crate::config::PanelConfig;
use crate::reactive::{Observable, ReadSignal};
use crate::scheduler::{FrameId, Scheduler};
use crate::storage::{PreferenceStore, StorageError};

/// Something that can take keyboard focus (the panel's toggle button).
pub trait FocusTarget {
    /// Move focus to this element.
    fn focus(&self);
}

/// Whether panel preference changes reach the preference store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Reads and writes go to the preference store.
    Persistent,
    /// In-memory only for the rest of the session.
    Ephemeral,
}

/// Snapshot of the panel's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelState {
    /// Whether the panel is open.
    pub is_open: bool,
    /// Whether the viewport is narrower than the mobile breakpoint.
    pub is_mobile_nav_mode: bool,
    /// Last known viewport width.
    pub viewport_width: Option<u32>,
}

/// Dependencies injected into the controller.
pub struct PanelPorts {
    /// Where the collapsed preference lives.
    pub storage: Rc<dyn PreferenceStore>,
    /// Animation-frame source for resize throttling.
    pub scheduler: Rc<dyn Scheduler>,
    /// Viewport at mount time.
    pub viewport: Viewport,
}

/// Why the open state is changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cause {
    User,
    Resize,
}

/// Edge of an observed boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    None,
    Opened,
    Closed,
}

/// Remembers the previous observed state. The first observation only
/// records, so nothing fires on the initial render.
#[derive(Debug, Default)]
struct TransitionTracker {
    previous: Option<bool>,
}

impl TransitionTracker {
    fn observe(&mut self, now: bool) -> Transition {
        let previous = self.previous.replace(now);
        match previous {
            Some(true) if !now => Transition::Closed,
            Some(false) if now => Transition::Opened,
            _ => Transition::None,
        }
    }
}

struct Inner {
    storage_key: String,
    breakpoints: Breakpoints,
    shortcut: Shortcut,
    storage: Rc<dyn PreferenceStore>,
    scheduler: Rc<dyn Scheduler>,
    open: Observable<bool>,
    mobile: Observable<bool>,
    width: Cell<Option<u32>>,
    hydrated: Cell<bool>,
    mode: Cell<PersistenceMode>,
    focus_target: RefCell<Option<Weak<dyn FocusTarget>>>,
    tracker: RefCell<TransitionTracker>,
    coalescer: RefCell<ResizeCoalescer>,
    pending_frame: Cell<Option<FrameId>>,
    disposed: Cell<bool>,
}

/// Side-panel visibility controller. See the module docs.
pub struct PanelController {
    inner: Rc<Inner>,
}

impl fmt::Debug for PanelController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelController")
            .field("state", &self.state())
            .field("mode", &self.inner.mode.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl PanelController {
    /// Build the controller and compute its initial state.
    #[must_use]
    pub fn new(config: &PanelConfig, ports: PanelPorts) -> Self {
        let mode = if config.persist {
            PersistenceMode::Persistent
        } else {
            PersistenceMode::Ephemeral
        };
        let inner = Rc::new(Inner {
            storage_key: config.storage_key.clone(),
            breakpoints: config.breakpoints,
            shortcut: config.toggle_shortcut,
            storage: ports.storage,
            scheduler: ports.scheduler,
            open: Observable::new(true),
            mobile: Observable::new(false),
            width: Cell::new(None),
            hydrated: Cell::new(false),
            mode: Cell::new(mode),
            focus_target: RefCell::new(None),
            tracker: RefCell::new(TransitionTracker::default()),
            coalescer: RefCell::new(ResizeCoalescer::new()),
            pending_frame: Cell::new(None),
            disposed: Cell::new(false),
        });

        if let Some(width) = ports.viewport.width() {
            inner.hydrate(width);
        }
        inner.tracker.borrow_mut().observe(inner.open.get());

        debug!(
            is_open = inner.open.get(),
            is_mobile_nav_mode = inner.mobile.get(),
            viewport_width = ?inner.width.get(),
            mode = ?inner.mode.get(),
            "panel initialized"
        );
        Self { inner }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> PanelState {
        PanelState {
            is_open: self.inner.open.get(),
            is_mobile_nav_mode: self.inner.mobile.get(),
            viewport_width: self.inner.width.get(),
        }
    }

    /// Whether the panel is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Whether the viewport is in mobile navigation mode.
    #[must_use]
    pub fn is_mobile_nav_mode(&self) -> bool {
        self.inner.mobile.get()
    }

    /// Observe the open flag.
    #[must_use]
    pub fn open_signal(&self) -> ReadSignal<bool> {
        self.inner.open.read_only()
    }

    /// Observe the mobile navigation flag.
    #[must_use]
    pub fn mobile_signal(&self) -> ReadSignal<bool> {
        self.inner.mobile.read_only()
    }

    /// Whether preferences are currently being persisted.
    #[must_use]
    pub fn persistence_mode(&self) -> PersistenceMode {
        self.inner.mode.get()
    }

    /// Register the toggle control that receives focus when the user closes
    /// the panel. Held weakly; replaces any previous target.
    pub fn attach_focus_target(&self, target: &Rc<dyn FocusTarget>) {
        *self.inner.focus_target.borrow_mut() = Some(Rc::downgrade(target));
    }

    /// Flip the panel and persist the new preference.
    pub fn toggle(&self) {
        if self.inner.disposed.get() {
            return;
        }
        let next = !self.inner.open.get();
        let _span = debug_span!("panel.toggle", is_open = next).entered();
        self.inner.commit(next, Cause::User);
    }

    /// Apply a new viewport width immediately.
    ///
    /// Hosts normally call [`Self::handle_resize_event`], which throttles to
    /// one call of this per animation frame.
    pub fn on_resize(&self, width: u32) {
        self.inner.on_resize(width);
    }

    /// Feed a raw resize event. Bursts within one frame collapse to the
    /// latest width.
    pub fn handle_resize_event(&self, width: u32) {
        let inner = &self.inner;
        if inner.disposed.get() {
            return;
        }
        if !inner.coalescer.borrow_mut().push(width) {
            trace!(width, "resize coalesced into pending frame");
            return;
        }
        let weak = Rc::downgrade(inner);
        let id = inner.scheduler.request_frame(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending_frame.set(None);
            let latest = inner.coalescer.borrow_mut().take();
            if let Some(width) = latest {
                inner.on_resize(width);
            }
        }));
        inner.pending_frame.set(Some(id));
    }

    /// Handle a global key event. Returns [`KeyDisposition::Handled`] when
    /// the toggle shortcut matched; the host must then prevent the default.
    pub fn handle_key(&self, event: &KeyEvent) -> KeyDisposition {
        if self.inner.disposed.get() || !self.inner.shortcut.matches(event) {
            return KeyDisposition::Ignored;
        }
        self.toggle();
        KeyDisposition::Handled
    }

    /// Number of raw resize events folded into an earlier one.
    #[must_use]
    pub fn coalesced_resizes(&self) -> u64 {
        self.inner.coalescer.borrow().coalesced_count()
    }

    /// Tear down: cancel the pending resize frame and ignore further input.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.replace(true) {
            return;
        }
        if let Some(id) = inner.pending_frame.take() {
            inner.scheduler.cancel_frame(id);
        }
        inner.coalescer.borrow_mut().clear();
        debug!("panel disposed");
    }
}

impl Drop for PanelController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    /// Apply the initialization precedence for a measured width.
    fn hydrate(&self, width: u32) {
        self.hydrated.set(true);
        self.width.set(Some(width));
        self.mobile.set(self.breakpoints.is_mobile(width));

        if self.breakpoints.is_below_tablet(width) {
            self.open.set(false);
            // Forced close still leaves storage as the inverse of the flag.
            if self.read_collapsed() == Some(false) {
                self.write_collapsed(true);
            }
        } else {
            self.open.set(!self.read_collapsed().unwrap_or(false));
        }
    }

    fn on_resize(&self, width: u32) {
        if self.disposed.get() {
            return;
        }
        if !self.hydrated.get() {
            let _span = debug_span!("panel.hydrate", width).entered();
            self.hydrate(width);
            self.tracker.borrow_mut().observe(self.open.get());
            return;
        }
        self.width.set(Some(width));
        self.mobile.set(self.breakpoints.is_mobile(width));
        if self.breakpoints.is_below_tablet(width) && self.open.get() {
            let _span = debug_span!("panel.auto_collapse", width).entered();
            self.commit(false, Cause::Resize);
        }
    }

    fn commit(&self, open: bool, cause: Cause) {
        // Storage and tracker settle before subscribers run; a subscriber
        // may toggle again and its commit must land last.
        self.write_collapsed(!open);
        let transition = self.tracker.borrow_mut().observe(open);
        self.open.set(open);
        if transition == Transition::Closed && cause == Cause::User {
            self.return_focus();
        }
    }

    fn return_focus(&self) {
        let target = self
            .focus_target
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade);
        match target {
            Some(target) => target.focus(),
            None => trace!("no focus target attached"),
        }
    }

    /// Stored collapsed flag. `None` when ephemeral or the read failed;
    /// a missing key reads as not collapsed.
    fn read_collapsed(&self) -> Option<bool> {
        if self.mode.get() == PersistenceMode::Ephemeral {
            return None;
        }
        match self.storage.get(&self.storage_key) {
            Ok(value) => Some(value.as_deref() == Some("true")),
            Err(err) => {
                self.degrade(&err);
                None
            }
        }
    }

    fn write_collapsed(&self, collapsed: bool) {
        if self.mode.get() == PersistenceMode::Ephemeral {
            return;
        }
        let value = if collapsed { "true" } else { "false" };
        if let Err(err) = self.storage.set(&self.storage_key, value) {
            self.degrade(&err);
        }
    }

    fn degrade(&self, err: &StorageError) {
        self.mode.set(PersistenceMode::Ephemeral);
        warn!(
            key = %self.storage_key,
            error = %err,
            "panel preference storage failed; continuing without persistence"
        );
    }
}
