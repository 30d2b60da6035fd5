#![forbid(unsafe_code)]

//! Browser binding for the shellkit state layer.
//!
//! This crate provides [`ShellHandle`] (wasm32 only), a `wasm-bindgen`
//! exported struct that mounts an `AppShell` on browser ports:
//! `localStorage` for the panel preference, `history.replaceState` for URL
//! writes, `setTimeout(0)` for guard release and `requestAnimationFrame`
//! for resize coalescing.
//!
//! The page wires it up with a handful of listeners:
//!
//! ```text
//! const shell = new ShellHandle(JSON.stringify(config));
//! window.addEventListener("keydown", (e) => {
//!   if (shell.handleKeyDown(e.key, e.code, e.shiftKey, e.altKey,
//!                           e.ctrlKey, e.metaKey, e.repeat)) e.preventDefault();
//! });
//! window.addEventListener("resize", () => shell.resize(window.innerWidth));
//! router.afterEach(() => shell.navigate());
//! shell.onOpenChange((open) => panel.toggleAttribute("hidden", !open));
//! shell.attachFocusTarget(document.querySelector("#panel-toggle"));
//! ```

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{BrowserScheduler, ShellHandle};

pub mod host;
pub mod key_map;

pub use host::{HostPorts, ShellHost};
pub use key_map::{DomKey, normalize_key_code};
