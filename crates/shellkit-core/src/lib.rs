#![forbid(unsafe_code)]

//! Core: input vocabulary and pure decision helpers for the app shell.
//!
//! # Role in shellkit
//! `shellkit-core` is the input layer. It owns the normalized event types a
//! host pushes into the shell (keys, resizes, navigation), the keyboard
//! shortcut matcher, viewport breakpoints, and the per-frame resize
//! coalescer.
//!
//! # How it fits in the system
//! The runtime (`shellkit-runtime`) consumes these types and drives the panel
//! controller and the URL/store synchroniser. Nothing here performs I/O or
//! schedules work, so every type is usable from native tests and from the
//! `wasm32` browser binding alike.

pub mod event;
pub mod keybinding;
pub mod resize_coalescer;
pub mod viewport;

pub use event::{Event, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use keybinding::{KeyDisposition, Shortcut, ShortcutMap, ShortcutParseError};
pub use resize_coalescer::ResizeCoalescer;
pub use viewport::{Breakpoint, Breakpoints, Viewport};
