#![forbid(unsafe_code)]

//! shellkit Runtime
//!
//! This crate provides the state-synchronization layer of the app shell:
//! the side-panel visibility controller and the bidirectional URL ↔ store
//! synchroniser, plus the seams they run on.
//!
//! # Key Components
//!
//! - [`PanelController`] - Open/closed state, breakpoints, persistence, shortcut, focus return
//! - [`UrlStoreSync`] - Loop-safe URL query ↔ selection store mirroring
//! - [`AppShell`] - Facade owning both controllers; hosts dispatch events into it
//! - [`Observable`] / [`BatchScope`] - Reactive store layer
//! - [`Scheduler`] / [`LocalScheduler`] - Deferred tasks and animation frames
//! - [`PreferenceStore`] - Persistent key/value preferences
//! - [`History`] / [`MemoryHistory`] - URL and navigation
//! - [`ShellConfig`] - Configuration, loadable from TOML/JSON with the `config` feature
//!
//! # Role in shellkit
//! `shellkit-runtime` is the orchestrator. It consumes events from
//! `shellkit-core`, applies them to the two controllers, and talks to the
//! outside world only through injected ports, so the same code runs in the
//! browser (`shellkit-web`) and under deterministic native tests.
//!
//! # How it fits in the system
//! Presentational components read [`PanelController::open_signal`] and
//! [`PanelController::mobile_signal`] and call [`PanelController::toggle`].
//! Nothing else mutates panel or sync state.

pub mod config;
pub mod error;
pub mod location;
pub mod panel;
pub mod reactive;
pub mod scheduler;
pub mod shell;
pub mod storage;
pub mod url_sync;

pub use config::{ConfigError, PanelConfig, ShellConfig, SyncConfig};
pub use error::ShellError;
pub use location::{History, Location, LocationError, MemoryHistory, QueryParams, RouteScope, RouteSet};
pub use panel::{FocusTarget, PanelController, PanelPorts, PanelState, PersistenceMode};
pub use reactive::{BatchScope, Observable, ReadSignal, SelectionStore, Subscription};
pub use scheduler::{LocalScheduler, Scheduler};
pub use shell::{AppShell, ShellPorts};
pub use storage::{MemoryStorage, PreferenceStore, StorageError, UnavailableStorage};
#[cfg(feature = "state-persistence")]
pub use storage::JsonFileStorage;
pub use url_sync::{SyncPhase, SyncStats, TrackedParam, UrlStoreSync};
