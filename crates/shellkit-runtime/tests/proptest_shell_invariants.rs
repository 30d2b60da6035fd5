#![forbid(unsafe_code)]

//! Property tests for the shell state layer.
//!
//! 1. Interleaved navigations and store writes always settle, with a pass
//!    count bounded by the number of triggering events, and leave URL and
//!    stores consistent on the current route.
//! 2. Two toggles restore state and the stored preference.
//! 3. Any resize below the tablet breakpoint leaves the panel closed.
//! 4. Toggle then reload yields the same open state.
//!
//! Run:
//!   cargo test -p shellkit-runtime --test proptest_shell_invariants

use std::rc::Rc;

use proptest::prelude::*;
use shellkit_core::{Breakpoints, Viewport};
use shellkit_runtime::config::DEFAULT_STORAGE_KEY;
use shellkit_runtime::{
    History, LocalScheduler, MemoryHistory, MemoryStorage, Observable, PanelConfig,
    PanelController, PanelPorts, PreferenceStore, RouteScope, RouteSet, SyncConfig, UrlStoreSync,
};

// ============================================================================
// Sync operations
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push {
        route: &'static str,
        project: Option<&'static str>,
        initiative: Option<&'static str>,
    },
    SetProject(Option<&'static str>),
    SetInitiative(Option<&'static str>),
    Back,
    RunTasks,
}

fn route() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("/"), Just("/board"), Just("/tasks/3"), Just("/settings")]
}

fn id() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("a")), Just(Some("b")), Just(Some(""))]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (route(), id(), id()).prop_map(|(route, project, initiative)| Op::Push {
            route,
            project,
            initiative
        }),
        id().prop_map(Op::SetProject),
        id().prop_map(Op::SetInitiative),
        Just(Op::Back),
        Just(Op::RunTasks),
    ]
}

fn push_href(route: &str, project: Option<&str>, initiative: Option<&str>) -> String {
    let mut pairs = Vec::new();
    if let Some(p) = project {
        pairs.push(format!("project={p}"));
    }
    if let Some(i) = initiative {
        pairs.push(format!("initiative={i}"));
    }
    if pairs.is_empty() {
        route.to_string()
    } else {
        format!("{route}?{}", pairs.join("&"))
    }
}

proptest! {
    #[test]
    fn sync_always_settles_and_converges(ops in prop::collection::vec(op(), 1..40)) {
        let history = MemoryHistory::new("/").unwrap();
        let scheduler = LocalScheduler::new();
        let project = Observable::new(None::<String>);
        let initiative = Observable::new(None::<String>);
        let sync = UrlStoreSync::from_config(
            &SyncConfig::default(),
            Rc::new(project.clone()),
            Rc::new(initiative.clone()),
            Rc::new(history.clone()),
            Rc::new(scheduler.clone()),
        );
        sync.sync_now();

        let mut events: u64 = 1;
        for op in &ops {
            match op {
                Op::Push { route, project: p, initiative: i } => {
                    history.push(&push_href(route, *p, *i)).unwrap();
                    events += 1;
                }
                Op::SetProject(v) => {
                    if project.set(v.map(str::to_owned).filter(|s| !s.is_empty())) {
                        events += 1;
                    }
                }
                Op::SetInitiative(v) => {
                    if initiative.set(v.map(str::to_owned).filter(|s| !s.is_empty())) {
                        events += 1;
                    }
                }
                Op::Back => {
                    if history.back() {
                        events += 1;
                    }
                }
                Op::RunTasks => {
                    scheduler.run_tasks();
                }
            }
        }

        prop_assert!(scheduler.run_until_idle(64), "sync never settled");
        let stats = sync.stats();
        prop_assert!(
            stats.url_passes + stats.store_passes <= 4 * events,
            "{stats:?} for {events} events"
        );

        let location = history.location();
        let project_now = project.get();
        prop_assert_eq!(location.query.get("project"), project_now.as_deref());
        let scope = RouteScope::Routes(RouteSet::new(["/board", "/tasks"]));
        if scope.applies_to(&location.pathname) {
            let initiative_now = initiative.get();
            prop_assert_eq!(location.query.get("initiative"), initiative_now.as_deref());
        }
    }
}

// ============================================================================
// Panel properties
// ============================================================================

fn panel(storage: &MemoryStorage, width: u32) -> PanelController {
    PanelController::new(
        &PanelConfig::default(),
        PanelPorts {
            storage: Rc::new(storage.clone()),
            scheduler: Rc::new(LocalScheduler::new()),
            viewport: Viewport::with_width(width),
        },
    )
}

fn stored_collapsed(storage: &MemoryStorage) -> Option<String> {
    storage.get(DEFAULT_STORAGE_KEY).unwrap()
}

proptest! {
    #[test]
    fn double_toggle_is_identity(width in 1024u32..4000, collapsed in any::<bool>()) {
        let storage = MemoryStorage::with_entry(DEFAULT_STORAGE_KEY, if collapsed { "true" } else { "false" });
        let panel = panel(&storage, width);
        let before = panel.state();
        let stored = stored_collapsed(&storage);

        panel.toggle();
        panel.toggle();

        prop_assert_eq!(panel.state(), before);
        prop_assert_eq!(stored_collapsed(&storage), stored);
        prop_assert_eq!(storage.writes().len(), 2);
    }

    #[test]
    fn narrow_resize_always_closes(
        start in 200u32..4000,
        toggles in 0usize..3,
        widths in prop::collection::vec(200u32..4000, 0..8),
        last in 200u32..1024,
    ) {
        let storage = MemoryStorage::new();
        let panel = panel(&storage, start);
        for _ in 0..toggles {
            panel.toggle();
        }
        for w in widths {
            panel.on_resize(w);
        }
        panel.on_resize(last);

        prop_assert!(!panel.is_open());
        prop_assert_eq!(panel.is_mobile_nav_mode(), Breakpoints::default().is_mobile(last));
        prop_assert_eq!(stored_collapsed(&storage), Some("true".to_string()));
    }

    #[test]
    fn toggle_survives_reload(width in 1024u32..4000, toggles in 1usize..5) {
        let storage = MemoryStorage::new();
        let first = panel(&storage, width);
        for _ in 0..toggles {
            first.toggle();
        }
        let expected = first.is_open();
        drop(first);

        let reloaded = panel(&storage, width);
        prop_assert_eq!(reloaded.is_open(), expected);
    }
}
