#![forbid(unsafe_code)]

//! Platform-independent core of the browser handle.
//!
//! [`ShellHost`] owns a mounted [`AppShell`] plus the two selection stores
//! the page reads and writes. The wasm module only adapts browser objects
//! into [`HostPorts`] and forwards calls; everything here runs under native
//! tests with the in-memory ports.

use std::rc::Rc;

use shellkit_core::{Event, Viewport};
use shellkit_runtime::{
    AppShell, FocusTarget, History, Observable, PreferenceStore, Scheduler, SelectionStore,
    ShellConfig, ShellError,
};
use tracing::debug;

use crate::key_map::DomKey;

/// Browser objects the host binds to.
pub struct HostPorts {
    /// Backing store for the panel's collapsed flag (`localStorage`).
    pub preferences: Rc<dyn PreferenceStore>,
    /// Current location plus query replacement.
    pub history: Rc<dyn History>,
    /// Deferred tasks and animation frames.
    pub scheduler: Rc<dyn Scheduler>,
    /// Width at mount; `Viewport::unknown()` before layout.
    pub viewport: Viewport,
}

/// A mounted shell and its selection stores.
#[derive(Debug)]
pub struct ShellHost {
    shell: AppShell,
    project: Observable<Option<String>>,
    initiative: Observable<Option<String>>,
}

impl ShellHost {
    /// Parse `config_json` (empty means defaults) and mount the shell.
    pub fn mount(config_json: &str, ports: HostPorts) -> Result<Self, ShellError> {
        let config = if config_json.trim().is_empty() {
            ShellConfig::default()
        } else {
            ShellConfig::from_json_str(config_json)?
        };
        let project = Observable::new(None::<String>);
        let initiative = Observable::new(None::<String>);
        let shell = AppShell::mount(
            config,
            shellkit_runtime::ShellPorts {
                preferences: ports.preferences,
                history: ports.history,
                scheduler: ports.scheduler,
                project: Rc::new(project.clone()),
                initiative: Rc::new(initiative.clone()),
                viewport: ports.viewport,
            },
        )?;
        Ok(Self {
            shell,
            project,
            initiative,
        })
    }

    /// Feed a DOM key-down. Returns `true` when the page must call
    /// `preventDefault()`.
    pub fn key_down(&self, key: &DomKey<'_>) -> bool {
        let event = key.to_key_down();
        let handled = self.shell.dispatch(&Event::Key(event)).prevents_default();
        if handled {
            debug!(key = key.key, code = key.code, "shortcut handled");
        }
        handled
    }

    /// Feed a window resize; applied on the next animation frame.
    pub fn resize(&self, width: u32) {
        self.shell.dispatch(&Event::Resize { width });
    }

    /// Re-read the location after the router changed it.
    pub fn navigate(&self) {
        self.shell.dispatch(&Event::Navigate);
    }

    /// Flip the panel as a user action (persists, may return focus).
    pub fn toggle(&self) {
        self.shell.panel().toggle();
    }

    /// Whether the side panel is showing.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shell.panel().is_open()
    }

    /// Below the mobile breakpoint the page swaps to its compact navigation.
    #[must_use]
    pub fn is_mobile_nav_mode(&self) -> bool {
        self.shell.panel().is_mobile_nav_mode()
    }

    /// Selected project id.
    #[must_use]
    pub fn project(&self) -> Option<String> {
        self.project.current()
    }

    /// Select a project. Empty strings clear the selection.
    pub fn set_project(&self, id: Option<String>) {
        SelectionStore::set(&self.project, id);
    }

    /// Active initiative filter.
    #[must_use]
    pub fn initiative(&self) -> Option<String> {
        self.initiative.current()
    }

    /// Select an initiative. Empty strings clear the selection.
    pub fn set_initiative(&self, id: Option<String>) {
        SelectionStore::set(&self.initiative, id);
    }

    /// Subscribe to open-state changes.
    pub fn on_open_change(
        &self,
        callback: impl Fn(bool) + 'static,
    ) -> shellkit_runtime::Subscription {
        self.shell
            .panel()
            .open_signal()
            .subscribe(move |open| callback(*open))
    }

    /// Register the toggle control that regains focus on a user close.
    /// Held weakly; the caller keeps `target` alive.
    pub fn attach_focus_target(&self, target: &Rc<dyn FocusTarget>) {
        self.shell.panel().attach_focus_target(target);
    }

    /// The mounted shell.
    #[must_use]
    pub fn shell(&self) -> &AppShell {
        &self.shell
    }

    /// Dispose the panel controller and the URL synchronizer.
    pub fn unmount(self) {
        self.shell.unmount();
    }
}
