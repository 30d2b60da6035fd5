#![forbid(unsafe_code)]

//! The app-shell facade.
//!
//! [`AppShell`] owns one [`PanelController`] and one [`UrlStoreSync`],
//! built from a validated [`ShellConfig`] and a bundle of injected
//! [`ShellPorts`]. Hosts push [`Event`]s through [`AppShell::dispatch`];
//! presentational code reads state through [`AppShell::panel`].
//!
//! ```
//! use std::rc::Rc;
//! use shellkit_core::{Event, KeyCode, KeyDisposition, KeyEvent, Modifiers, Viewport};
//! use shellkit_runtime::location::MemoryHistory;
//! use shellkit_runtime::reactive::Observable;
//! use shellkit_runtime::scheduler::LocalScheduler;
//! use shellkit_runtime::shell::{AppShell, ShellPorts};
//! use shellkit_runtime::storage::MemoryStorage;
//! use shellkit_runtime::ShellConfig;
//!
//! let history = MemoryHistory::new("/board?initiative=INIT-42").unwrap();
//! let initiative = Observable::new(None::<String>);
//! let shell = AppShell::mount(
//!     ShellConfig::default(),
//!     ShellPorts {
//!         preferences: Rc::new(MemoryStorage::new()),
//!         history: Rc::new(history),
//!         scheduler: Rc::new(LocalScheduler::new()),
//!         project: Rc::new(Observable::new(None::<String>)),
//!         initiative: Rc::new(initiative.clone()),
//!         viewport: Viewport::with_width(1280),
//!     },
//! )
//! .unwrap();
//! assert_eq!(initiative.get().as_deref(), Some("INIT-42"));
//!
//! let toggle = KeyEvent::new(KeyCode::Char('R')).with_modifiers(Modifiers::SHIFT | Modifiers::ALT);
//! assert_eq!(shell.dispatch(&Event::Key(toggle)), KeyDisposition::Handled);
//! assert!(!shell.panel().is_open());
//! ```

use std::rc::Rc;

use shellkit_core::{Event, KeyDisposition, Viewport};
use tracing::{info, info_span, trace};

use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::location::History;
use crate::panel::{PanelController, PanelPorts};
use crate::reactive::SelectionStore;
use crate::scheduler::Scheduler;
use crate::storage::PreferenceStore;
use crate::url_sync::UrlStoreSync;

/// Everything the shell consumes from its host.
pub struct ShellPorts {
    /// Persistent preference store (browser local storage).
    pub preferences: Rc<dyn PreferenceStore>,
    /// Browser URL/history.
    pub history: Rc<dyn History>,
    /// Task and animation-frame scheduling.
    pub scheduler: Rc<dyn Scheduler>,
    /// Current project selection.
    pub project: Rc<dyn SelectionStore>,
    /// Current initiative filter.
    pub initiative: Rc<dyn SelectionStore>,
    /// Viewport at mount time; unknown before hydration.
    pub viewport: Viewport,
}

/// Mounted shell state layer.
#[derive(Debug)]
pub struct AppShell {
    config: ShellConfig,
    panel: PanelController,
    sync: UrlStoreSync,
}

impl AppShell {
    /// Validate `config`, build both controllers and run the initial
    /// URL/store reconciliation.
    pub fn mount(config: ShellConfig, ports: ShellPorts) -> Result<Self, ShellError> {
        let config = config.validated()?;
        let _span = info_span!("shell.mount").entered();

        let panel = PanelController::new(
            &config.panel,
            PanelPorts {
                storage: ports.preferences,
                scheduler: Rc::clone(&ports.scheduler),
                viewport: ports.viewport,
            },
        );
        let sync = UrlStoreSync::from_config(
            &config.sync,
            ports.project,
            ports.initiative,
            ports.history,
            ports.scheduler,
        );
        sync.sync_now();

        info!(
            is_open = panel.is_open(),
            is_mobile_nav_mode = panel.is_mobile_nav_mode(),
            shortcut = %config.panel.toggle_shortcut,
            "shell mounted"
        );
        Ok(Self {
            config,
            panel,
            sync,
        })
    }

    /// Route a host event. The returned disposition tells the host whether
    /// to suppress the browser default.
    pub fn dispatch(&self, event: &Event) -> KeyDisposition {
        match event {
            Event::Key(key) => self.panel.handle_key(key),
            Event::Resize { width } => {
                self.panel.handle_resize_event(*width);
                KeyDisposition::Ignored
            }
            Event::Navigate => {
                self.sync.sync_now();
                KeyDisposition::Ignored
            }
            Event::Focus(gained) => {
                trace!(gained, "document focus changed");
                KeyDisposition::Ignored
            }
        }
    }

    /// The panel controller.
    #[must_use]
    pub fn panel(&self) -> &PanelController {
        &self.panel
    }

    /// The URL/store synchroniser.
    #[must_use]
    pub fn sync(&self) -> &UrlStoreSync {
        &self.sync
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Tear down both controllers, cancelling any pending frame or guard
    /// release.
    pub fn unmount(self) {
        self.panel.dispose();
        self.sync.dispose();
        info!(sync = ?self.sync.stats(), "shell unmounted");
    }
}
