#![forbid(unsafe_code)]

//! Bidirectional, loop-safe URL ↔ store synchronisation.
//!
//! [`UrlStoreSync`] mirrors a set of selection stores (`project`,
//! `initiative`) into query parameters and back.
//!
//! # State machine
//!
//! ```text
//!              URL changed, stores differ          store changed, URL differs
//!   Idle ──────────────────────────────▶ SyncingFromUrl     Idle ──────────────▶ SyncingFromStore
//!    ▲                                        │              ▲                         │
//!    └────────── deferred release ────────────┘              └──── deferred release ───┘
//! ```
//!
//! - **URL → store**: every in-scope parameter that is present and
//!   non-empty in the URL is written into its store when the values
//!   differ. An absent parameter never clears a store.
//! - **Store → URL**: every in-scope store value is written into the URL;
//!   a store holding no selection removes the parameter. The URL is
//!   updated with a history *replace*, once per pass, only if something
//!   changed.
//!
//! A pass enters its phase only when it is about to write. The phase is
//! released on a deferred task, strictly after the write's synchronous
//! notifications have returned. While `SyncingFromUrl`, store-change events
//! are suppressed; while `SyncingFromStore`, navigation events are
//! suppressed. Suppressed events are remembered and a single catch-up pass
//! runs when the phase is released. Because passes only write differences,
//! the echo of the pass's own write finds nothing to do there.
//!
//! # Invariants
//!
//! 1. At most one phase is active (`SyncPhase` is a single value).
//! 2. No pass writes a value equal to the destination's current value.
//! 3. A route-scoped parameter is neither read nor written outside its
//!    routes; unrelated query parameters are always preserved.
//! 4. After [`UrlStoreSync::dispose`] no task is pending and no callback
//!    writes anything.
//!
//! # Failure Modes
//!
//! None surface. A malformed query string yields no parameters, so the
//! URL → store pass has nothing to copy.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, trace};

use crate::config::SyncConfig;
use crate::location::{History, RouteScope};
use crate::reactive::{BatchScope, SelectionStore, Subscription};
use crate::scheduler::{Scheduler, TaskId};

/// A query parameter mirrored into a selection store.
pub struct TrackedParam {
    /// Query parameter name.
    pub name: String,
    /// Store holding the selection.
    pub store: Rc<dyn SelectionStore>,
    /// Routes on which the parameter is synced.
    pub scope: RouteScope,
}

impl TrackedParam {
    /// A parameter synced on every route.
    #[must_use]
    pub fn global(name: impl Into<String>, store: Rc<dyn SelectionStore>) -> Self {
        Self {
            name: name.into(),
            store,
            scope: RouteScope::Global,
        }
    }

    /// A parameter synced only on the routes covered by `scope`.
    #[must_use]
    pub fn scoped(name: impl Into<String>, store: Rc<dyn SelectionStore>, scope: RouteScope) -> Self {
        Self {
            name: name.into(),
            store,
            scope,
        }
    }
}

impl fmt::Debug for TrackedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedParam")
            .field("name", &self.name)
            .field("current", &self.store.current())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Which direction currently holds the re-entrancy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No guarded window is open.
    #[default]
    Idle,
    /// Stores were just written from the URL.
    SyncingFromUrl,
    /// The URL was just written from the stores.
    SyncingFromStore,
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    /// URL → store passes evaluated.
    pub url_passes: u64,
    /// Store → URL passes evaluated.
    pub store_passes: u64,
    /// Events ignored because the opposite direction held the guard.
    pub suppressed: u64,
    /// Individual store writes.
    pub store_writes: u64,
    /// History replaces issued.
    pub url_replaces: u64,
}

struct Inner {
    params: Vec<TrackedParam>,
    history: Rc<dyn History>,
    scheduler: Rc<dyn Scheduler>,
    phase: Cell<SyncPhase>,
    release: Cell<Option<TaskId>>,
    pending_url: Cell<bool>,
    pending_store: Cell<bool>,
    stats: Cell<SyncStats>,
    disposed: Cell<bool>,
}

/// URL ↔ store synchroniser. See the module docs.
pub struct UrlStoreSync {
    inner: Rc<Inner>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl fmt::Debug for UrlStoreSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlStoreSync")
            .field("params", &self.inner.params)
            .field("phase", &self.inner.phase.get())
            .field("stats", &self.inner.stats.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl UrlStoreSync {
    /// Wire the synchroniser to its history and stores.
    ///
    /// Subscriptions are live on return, but no pass runs until the first
    /// event; call [`Self::sync_now`] at mount.
    #[must_use]
    pub fn new(
        params: Vec<TrackedParam>,
        history: Rc<dyn History>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let inner = Rc::new(Inner {
            params,
            history,
            scheduler,
            phase: Cell::new(SyncPhase::Idle),
            release: Cell::new(None),
            pending_url: Cell::new(false),
            pending_store: Cell::new(false),
            stats: Cell::new(SyncStats::default()),
            disposed: Cell::new(false),
        });

        let mut subscriptions = Vec::with_capacity(inner.params.len() + 1);
        let weak = Rc::downgrade(&inner);
        subscriptions.push(inner.history.subscribe(Box::new(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_navigation();
            }
        })));
        for param in &inner.params {
            let weak = Rc::downgrade(&inner);
            subscriptions.push(param.store.subscribe(Box::new(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_store_change();
                }
            })));
        }

        Self {
            inner,
            subscriptions: RefCell::new(subscriptions),
        }
    }

    /// Build the stock `project` + `initiative` synchroniser from config.
    #[must_use]
    pub fn from_config(
        config: &SyncConfig,
        project: Rc<dyn SelectionStore>,
        initiative: Rc<dyn SelectionStore>,
        history: Rc<dyn History>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let params = vec![
            TrackedParam::global(config.project_param.clone(), project),
            TrackedParam::scoped(
                config.initiative_param.clone(),
                initiative,
                config.initiative_scope(),
            ),
        ];
        Self::new(params, history, scheduler)
    }

    /// Treat the current location as freshly navigated to: URL → store,
    /// then store → URL.
    pub fn sync_now(&self) {
        self.inner.handle_navigation();
    }

    /// Current guard phase.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.inner.phase.get()
    }

    /// Pass and write counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.get()
    }

    /// Tracked parameter names, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.inner.params.iter().map(|p| p.name.as_str())
    }

    /// Whether [`Self::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Unsubscribe and cancel the pending guard release.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.replace(true) {
            return;
        }
        if let Some(id) = inner.release.take() {
            inner.scheduler.cancel(id);
        }
        inner.phase.set(SyncPhase::Idle);
        inner.pending_url.set(false);
        inner.pending_store.set(false);
        self.subscriptions.borrow_mut().clear();
        debug!(stats = ?inner.stats.get(), "url sync disposed");
    }
}

impl Drop for UrlStoreSync {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn bump(&self, f: impl FnOnce(&mut SyncStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn handle_navigation(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        if self.phase.get() == SyncPhase::SyncingFromStore {
            trace!("navigation suppressed during store sync");
            self.bump(|s| s.suppressed += 1);
            self.pending_url.set(true);
            return;
        }
        self.url_to_store();
        if self.phase.get() == SyncPhase::SyncingFromUrl {
            self.pending_store.set(true);
        } else {
            self.store_to_url();
        }
    }

    fn handle_store_change(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        if self.phase.get() == SyncPhase::SyncingFromUrl {
            trace!("store change suppressed during url sync");
            self.bump(|s| s.suppressed += 1);
            self.pending_store.set(true);
            return;
        }
        self.store_to_url();
    }

    fn url_to_store(self: &Rc<Self>) {
        let location = self.history.location();
        let _span = debug_span!("sync.url_to_store", path = %location.pathname).entered();
        self.bump(|s| s.url_passes += 1);

        let writes: Vec<(&TrackedParam, String)> = self
            .params
            .iter()
            .filter(|p| p.scope.applies_to(&location.pathname))
            .filter_map(|p| {
                let value = location.query.get(&p.name).filter(|v| !v.is_empty())?;
                (p.store.current().as_deref() != Some(value)).then(|| (p, value.to_string()))
            })
            .collect();
        if writes.is_empty() {
            return;
        }

        self.enter(SyncPhase::SyncingFromUrl);
        let _batch = BatchScope::new();
        for (param, value) in writes {
            debug!(param = %param.name, value = %value, "store updated from url");
            param.store.set(Some(value));
            self.bump(|s| s.store_writes += 1);
        }
    }

    fn store_to_url(self: &Rc<Self>) {
        let location = self.history.location();
        let _span = debug_span!("sync.store_to_url", path = %location.pathname).entered();
        self.bump(|s| s.store_passes += 1);

        let mut query = location.query.clone();
        let mut changed = false;
        for param in self
            .params
            .iter()
            .filter(|p| p.scope.applies_to(&location.pathname))
        {
            match param.store.current() {
                Some(value) => {
                    if query.get(&param.name) != Some(value.as_str()) {
                        query.set(&param.name, &value);
                        changed = true;
                    }
                }
                None => {
                    if query.remove(&param.name) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            return;
        }

        self.enter(SyncPhase::SyncingFromStore);
        debug!(query = %query, "url updated from stores");
        self.bump(|s| s.url_replaces += 1);
        self.history.replace_query(query);
    }

    /// Take the guard and (re)schedule its release.
    fn enter(self: &Rc<Self>, phase: SyncPhase) {
        self.phase.set(phase);
        if let Some(previous) = self.release.take() {
            self.scheduler.cancel(previous);
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = self.scheduler.defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.release_guard();
            }
        }));
        self.release.set(Some(id));
    }

    fn release_guard(self: &Rc<Self>) {
        self.release.set(None);
        if self.disposed.get() {
            return;
        }
        trace!(phase = ?self.phase.get(), "sync guard released");
        self.phase.set(SyncPhase::Idle);
        let url = self.pending_url.take();
        let store = self.pending_store.take();
        if url {
            self.handle_navigation();
        } else if store {
            self.handle_store_change();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{MemoryHistory, RouteSet};
    use crate::reactive::Observable;
    use crate::scheduler::LocalScheduler;
    use pretty_assertions::assert_eq;

    struct Fixture {
        history: MemoryHistory,
        scheduler: LocalScheduler,
        project: Observable<Option<String>>,
        initiative: Observable<Option<String>>,
        sync: UrlStoreSync,
    }

    fn fixture(href: &str, project: Option<&str>, initiative: Option<&str>) -> Fixture {
        let history = MemoryHistory::new(href).unwrap();
        let scheduler = LocalScheduler::new();
        let project = Observable::new(project.map(str::to_owned));
        let initiative = Observable::new(initiative.map(str::to_owned));
        let sync = UrlStoreSync::from_config(
            &SyncConfig::default(),
            Rc::new(project.clone()),
            Rc::new(initiative.clone()),
            Rc::new(history.clone()),
            Rc::new(scheduler.clone()),
        );
        Fixture {
            history,
            scheduler,
            project,
            initiative,
            sync,
        }
    }

    fn href(f: &Fixture) -> String {
        f.history.location().href()
    }

    #[test]
    fn store_value_appears_in_url() {
        let f = fixture("/", Some("proj-001"), None);
        f.sync.sync_now();
        assert_eq!(href(&f), "/?project=proj-001");
        assert_eq!(f.sync.phase(), SyncPhase::SyncingFromStore);
        assert!(f.scheduler.run_until_idle(8));
        assert_eq!(f.sync.phase(), SyncPhase::Idle);
        assert_eq!(f.sync.stats().url_replaces, 1);
        assert_eq!(f.history.len(), 1, "replace, not push");
    }

    #[test]
    fn url_value_reaches_store_on_supported_route() {
        let f = fixture("/board?initiative=INIT-42", None, None);
        f.sync.sync_now();
        assert_eq!(f.initiative.get().as_deref(), Some("INIT-42"));
        assert_eq!(f.sync.phase(), SyncPhase::SyncingFromUrl);
        assert!(f.scheduler.run_until_idle(8));
        assert_eq!(href(&f), "/board?initiative=INIT-42");
        assert_eq!(f.sync.stats().url_replaces, 0);
    }

    #[test]
    fn echo_of_url_write_is_suppressed() {
        let f = fixture("/board?project=p2&initiative=I2", None, None);
        f.sync.sync_now();
        let stats = f.sync.stats();
        assert_eq!(stats.store_writes, 2);
        assert_eq!(stats.suppressed, 2);
        assert_eq!(stats.store_passes, 0);

        assert!(f.scheduler.run_until_idle(8));
        let stats = f.sync.stats();
        assert_eq!(stats.store_passes, 1, "one catch-up pass after release");
        assert_eq!(stats.url_replaces, 0);
    }

    #[test]
    fn store_subscribers_see_both_writes_together() {
        let f = fixture("/board?project=p2&initiative=I2", None, None);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let initiative = f.initiative.clone();
        let _sub = f.project.subscribe(move |p| {
            seen_clone.borrow_mut().push((p.clone(), initiative.get()));
        });
        f.sync.sync_now();
        assert_eq!(
            *seen.borrow(),
            vec![(Some("p2".to_string()), Some("I2".to_string()))]
        );
    }

    #[test]
    fn absent_param_never_clears_store() {
        let f = fixture("/?project=p1", None, None);
        f.sync.sync_now();
        f.scheduler.run_until_idle(8);
        f.history.push("/settings").unwrap();
        assert_eq!(f.project.get().as_deref(), Some("p1"));
        f.scheduler.run_until_idle(8);
        assert_eq!(href(&f), "/settings?project=p1");
    }

    #[test]
    fn empty_param_never_clears_store() {
        let f = fixture("/?project=", Some("p1"), None);
        f.sync.sync_now();
        f.scheduler.run_until_idle(8);
        assert_eq!(f.project.get().as_deref(), Some("p1"));
        assert_eq!(href(&f), "/?project=p1");
    }

    #[test]
    fn cleared_store_removes_param_and_keeps_others() {
        let f = fixture("/?view=list&project=p1&sort=asc", None, None);
        f.sync.sync_now();
        f.scheduler.run_until_idle(8);

        f.project.set(None);
        assert_eq!(href(&f), "/?view=list&sort=asc");
        f.scheduler.run_until_idle(8);
        assert_eq!(f.project.get(), None);
    }

    #[test]
    fn unsupported_route_leaves_initiative_alone() {
        let f = fixture("/settings?initiative=X", None, None);
        f.sync.sync_now();
        f.scheduler.run_until_idle(8);
        assert_eq!(f.initiative.get(), None);
        assert_eq!(href(&f), "/settings?initiative=X");

        f.initiative.set(Some("I-1".into()));
        f.scheduler.run_until_idle(8);
        assert_eq!(href(&f), "/settings?initiative=X");

        f.initiative.set(None);
        assert_eq!(href(&f), "/settings?initiative=X");
    }

    #[test]
    fn navigating_to_supported_route_reflects_store() {
        let f = fixture("/settings", None, None);
        f.sync.sync_now();
        f.initiative.set(Some("I-1".into()));
        f.scheduler.run_until_idle(8);
        assert_eq!(href(&f), "/settings");

        f.history.push("/board").unwrap();
        assert_eq!(href(&f), "/board?initiative=I-1");
        assert_eq!(f.history.len(), 2);
    }

    #[test]
    fn supported_route_reflects_store_even_after_url_write() {
        let f = fixture("/settings", None, Some("I-1"));
        f.sync.sync_now();
        f.scheduler.run_until_idle(8);

        f.history.push("/board?project=p9").unwrap();
        assert_eq!(f.project.get().as_deref(), Some("p9"));
        assert_eq!(href(&f), "/board?project=p9", "store pass waits for release");
        assert!(f.scheduler.run_until_idle(8));
        assert_eq!(href(&f), "/board?project=p9&initiative=I-1");
    }

    #[test]
    fn store_change_during_url_window_is_synced_after_release() {
        let f = fixture("/?project=p1", None, None);
        f.sync.sync_now();
        assert_eq!(f.sync.phase(), SyncPhase::SyncingFromUrl);

        f.project.set(Some("p-other".into()));
        assert_eq!(href(&f), "/?project=p1", "suppressed inside the window");
        assert!(f.scheduler.run_until_idle(8));
        assert_eq!(href(&f), "/?project=p-other");
    }

    #[test]
    fn custom_scope_and_names() {
        let history = MemoryHistory::new("/roadmap/q3?team=core").unwrap();
        let scheduler = LocalScheduler::new();
        let team = Observable::new(None::<String>);
        let sync = UrlStoreSync::new(
            vec![TrackedParam::scoped(
                "team",
                Rc::new(team.clone()),
                RouteScope::Routes(RouteSet::new(["/roadmap"])),
            )],
            Rc::new(history.clone()),
            Rc::new(scheduler.clone()),
        );
        sync.sync_now();
        assert_eq!(team.get().as_deref(), Some("core"));
        assert_eq!(sync.param_names().collect::<Vec<_>>(), vec!["team"]);
    }

    #[test]
    fn dispose_cancels_release_and_unsubscribes() {
        let f = fixture("/?project=p1", None, None);
        f.sync.sync_now();
        assert_eq!(f.scheduler.pending_tasks(), 1);
        f.sync.dispose();
        assert!(f.sync.is_disposed());
        assert_eq!(f.scheduler.pending_tasks(), 0);

        f.project.set(Some("p2".into()));
        f.history.push("/?project=p3").unwrap();
        assert_eq!(f.project.get().as_deref(), Some("p2"));
        assert_eq!(href(&f), "/?project=p3");
    }

    #[test]
    fn drop_cancels_release() {
        let f = fixture("/?project=p1", None, None);
        f.sync.sync_now();
        let Fixture { scheduler, sync, .. } = f;
        drop(sync);
        assert_eq!(scheduler.pending_tasks(), 0);
    }
}
