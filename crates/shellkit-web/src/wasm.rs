#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the shell.
//!
//! This module adapts `window.localStorage`, `window.history` and the
//! browser timer/frame APIs into runtime ports, then wraps
//! [`super::host::ShellHost`] with JS-friendly types.
//! Only compiled on `wasm32` targets.

use std::rc::Rc;

use js_sys::Reflect;
use shellkit_core::Viewport;
use shellkit_runtime::scheduler::{FrameId, Task, TaskId};
use shellkit_runtime::{
    FocusTarget, History, Location, Observable, PreferenceStore, QueryParams, Scheduler,
    StorageError, Subscription,
};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::host::{HostPorts, ShellHost};
use super::key_map::DomKey;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn js_error_text(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

// ---------------------------------------------------------------------------
// localStorage
// ---------------------------------------------------------------------------

/// `window.localStorage` as a preference store.
struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable("localStorage is null".into())),
            Err(err) => Err(StorageError::Unavailable(js_error_text(&err))),
        }
    }
}

impl PreferenceStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| StorageError::Unavailable(js_error_text(&err)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?.set_item(key, value).map_err(|err| {
            let name = Reflect::get(&err, &"name".into())
                .ok()
                .and_then(|n| n.as_string());
            if name.as_deref() == Some("QuotaExceededError") {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                }
            } else {
                StorageError::Unavailable(js_error_text(&err))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

fn read_location() -> Option<Location> {
    let location = web_sys::window()?.location();
    let href = format!(
        "{}{}{}",
        location.pathname().ok()?,
        location.search().ok()?,
        location.hash().ok()?
    );
    Location::parse(&href).ok()
}

/// `window.history` with router-style notifications.
///
/// Subscribers hear `popstate` and our own `replaceState` calls. Router
/// pushes are invisible to the page; the host reports them through
/// [`ShellHandle::navigate`].
struct BrowserHistory {
    current: Observable<Location>,
    popstate: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

impl BrowserHistory {
    fn attach() -> Self {
        let current = Observable::new(read_location().unwrap_or_default());
        let mut history = Self {
            current: current.clone(),
            popstate: None,
        };
        let Some(window) = web_sys::window() else {
            return history;
        };
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            if let Some(location) = read_location() {
                current.set(location);
            }
        });
        let installed =
            window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        match installed {
            Ok(()) => history.popstate = Some(closure),
            Err(err) => warn!(error = %js_error_text(&err), "popstate listener not installed"),
        }
        history
    }
}

impl Drop for BrowserHistory {
    fn drop(&mut self) {
        if let (Some(window), Some(closure)) = (web_sys::window(), self.popstate.take()) {
            let _ = window
                .remove_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }
    }
}

impl History for BrowserHistory {
    fn location(&self) -> Location {
        read_location().unwrap_or_else(|| self.current.get())
    }

    fn replace_query(&self, query: QueryParams) {
        let next = self.location().with_query(query);
        let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
            warn!("history unavailable; URL not updated");
            return;
        };
        if let Err(err) = history.replace_state_with_url(&JsValue::NULL, "", Some(&next.href())) {
            warn!(error = %js_error_text(&err), "replaceState failed");
            return;
        }
        self.current.set(next);
    }

    fn subscribe(&self, callback: shellkit_runtime::location::LocationCallback) -> Subscription {
        self.current.subscribe(move |location| callback(location))
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Queue `callback` behind an already-resolved promise. Microtasks cannot
/// be cancelled.
fn queue_microtask(callback: &JsValue) -> Result<(), JsValue> {
    let resolved = js_sys::Promise::resolve(&JsValue::NULL);
    let then = Reflect::get(&resolved, &"then".into())?.dyn_into::<js_sys::Function>()?;
    then.call1(&resolved, callback).map(|_| ())
}

/// `setTimeout(0)` and `requestAnimationFrame`.
///
/// A cancelled callback is never invoked, so its closure is leaked; each is
/// a few words. Without a window (workers, Node) or when `setTimeout`
/// throws, deferred tasks fall back to a microtask so a held sync guard is
/// still released.
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn defer(&self, task: Task) -> TaskId {
        let callback = Closure::once_into_js(move || task());
        let scheduled = match web_sys::window() {
            Some(window) => window
                .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0),
            None => Err(JsValue::from_str("no window")),
        };
        match scheduled {
            Ok(id) => TaskId(id as u32 as u64),
            Err(err) => {
                warn!(error = %js_error_text(&err), "setTimeout unavailable; deferring to a microtask");
                if let Err(err) = queue_microtask(&callback) {
                    console_error(&format!("deferred task dropped: {}", js_error_text(&err)));
                }
                TaskId(0)
            }
        }
    }

    fn cancel(&self, id: TaskId) {
        if id.0 != 0
            && let Some(window) = web_sys::window()
        {
            window.clear_timeout_with_handle(id.0 as i32);
        }
    }

    fn request_frame(&self, task: Task) -> FrameId {
        let callback = Closure::once_into_js(move |_ts: f64| task());
        let handle = web_sys::window().map(|w| w.request_animation_frame(callback.unchecked_ref()));
        match handle {
            Some(Ok(id)) => FrameId(id as u32 as u64),
            Some(Err(err)) => {
                console_error(&format!(
                    "requestAnimationFrame failed: {}",
                    js_error_text(&err)
                ));
                FrameId(0)
            }
            None => FrameId(0),
        }
    }

    fn cancel_frame(&self, id: FrameId) {
        if id.0 != 0
            && let Some(window) = web_sys::window()
        {
            let _ = window.cancel_animation_frame(id.0 as i32);
        }
    }
}

/// The panel's toggle button.
struct ElementFocus(web_sys::HtmlElement);

impl FocusTarget for ElementFocus {
    fn focus(&self) {
        if let Err(err) = self.0.focus() {
            warn!(error = %js_error_text(&err), "focus return failed");
        }
    }
}

fn window_width() -> Viewport {
    web_sys::window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .filter(|w| w.is_finite() && *w >= 0.0)
        .map_or(Viewport::unknown(), |w| Viewport::with_width(w.round() as u32))
}

// ---------------------------------------------------------------------------
// Exported handle
// ---------------------------------------------------------------------------

/// The mounted shell state layer for one page.
///
/// Host-driven: the page forwards `keydown`, `resize` and router navigation
/// events, and reads panel state back.
#[wasm_bindgen]
pub struct ShellHandle {
    host: Option<ShellHost>,
    listeners: Vec<Subscription>,
    focus_target: Option<Rc<dyn FocusTarget>>,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

#[wasm_bindgen]
impl ShellHandle {
    /// Mount with a JSON-encoded config (pass `""` for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<ShellHandle, JsValue> {
        install_panic_hook();
        let ports = HostPorts {
            preferences: Rc::new(LocalStorage),
            history: Rc::new(BrowserHistory::attach()),
            scheduler: Rc::new(BrowserScheduler),
            viewport: window_width(),
        };
        let host = ShellHost::mount(config_json, ports).map_err(|err| {
            let msg = err.to_string();
            console_error(&msg);
            JsValue::from_str(&msg)
        })?;
        Ok(Self {
            host: Some(host),
            listeners: Vec::new(),
            focus_target: None,
        })
    }

    /// Forward a `keydown`. Returns `true` when the caller must call
    /// `preventDefault()`.
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(js_name = handleKeyDown)]
    pub fn handle_key_down(
        &self,
        key: &str,
        code: &str,
        shift: bool,
        alt: bool,
        ctrl: bool,
        meta: bool,
        repeat: bool,
    ) -> bool {
        let Some(host) = &self.host else {
            return false;
        };
        host.key_down(&DomKey {
            key,
            code,
            shift,
            alt,
            ctrl,
            meta,
            repeat,
        })
    }

    /// Forward a window resize (`innerWidth`, CSS pixels).
    pub fn resize(&self, width: f64) {
        if let Some(host) = &self.host
            && width.is_finite()
            && width >= 0.0
        {
            host.resize(width.round() as u32);
        }
    }

    /// Report a router navigation (push or replace) the page performed.
    pub fn navigate(&self) {
        if let Some(host) = &self.host {
            host.navigate();
        }
    }

    pub fn toggle(&self) {
        if let Some(host) = &self.host {
            host.toggle();
        }
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.host.as_ref().is_some_and(ShellHost::is_open)
    }

    #[wasm_bindgen(js_name = isMobileNavMode)]
    pub fn is_mobile_nav_mode(&self) -> bool {
        self.host.as_ref().is_some_and(ShellHost::is_mobile_nav_mode)
    }

    pub fn project(&self) -> Option<String> {
        self.host.as_ref().and_then(ShellHost::project)
    }

    #[wasm_bindgen(js_name = setProject)]
    pub fn set_project(&self, id: Option<String>) {
        if let Some(host) = &self.host {
            host.set_project(id);
        }
    }

    pub fn initiative(&self) -> Option<String> {
        self.host.as_ref().and_then(ShellHost::initiative)
    }

    #[wasm_bindgen(js_name = setInitiative)]
    pub fn set_initiative(&self, id: Option<String>) {
        if let Some(host) = &self.host {
            host.set_initiative(id);
        }
    }

    /// Call `callback(isOpen)` on every open-state change until unmount.
    #[wasm_bindgen(js_name = onOpenChange)]
    pub fn on_open_change(&mut self, callback: js_sys::Function) {
        let Some(host) = &self.host else {
            return;
        };
        let sub = host.on_open_change(move |open| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_bool(open)) {
                console_error(&format!("onOpenChange listener threw: {}", js_error_text(&err)));
            }
        });
        self.listeners.push(sub);
    }

    /// Element that takes focus when the user closes the panel. Replaces
    /// any previous target.
    #[wasm_bindgen(js_name = attachFocusTarget)]
    pub fn attach_focus_target(&mut self, element: web_sys::HtmlElement) {
        let Some(host) = &self.host else {
            return;
        };
        let target: Rc<dyn FocusTarget> = Rc::new(ElementFocus(element));
        host.attach_focus_target(&target);
        self.focus_target = Some(target);
    }

    /// Tear down listeners, pending frames and guard releases. Idempotent.
    pub fn unmount(&mut self) {
        self.listeners.clear();
        self.focus_target = None;
        if let Some(host) = self.host.take() {
            host.unmount();
        }
    }
}
