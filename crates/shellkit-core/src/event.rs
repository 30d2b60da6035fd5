#![forbid(unsafe_code)]

//! Host events.
//!
//! Everything the page reports to the shell arrives as an [`Event`]: global
//! key-downs, window resizes, router navigations, and document focus.
//!
//! # Design Notes
//!
//! - Widths are CSS pixels, already rounded by the host.
//! - A DOM `keydown` with `repeat: true` becomes [`KeyEventKind::Repeat`];
//!   shortcuts fire on both press and repeat.
//! - [`Modifiers`] is a bitflag set so exact-set comparison is one `==`.

use bitflags::bitflags;

/// One host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Global key-down (or key-up) from the document.
    Key(KeyEvent),

    /// The window was resized.
    Resize {
        /// `innerWidth` in CSS pixels.
        width: u32,
    },

    /// The location changed: push, replace, back or forward.
    Navigate,

    /// Document focus gained (`true`) or lost (`false`).
    Focus(bool),
}

/// A normalized keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Unmodified key press.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Exact character comparison (case-sensitive).
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        self.code == KeyCode::Char(c)
    }

    /// Press or auto-repeat; shortcuts ignore releases.
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }
}

/// Which key, after layout resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Printable character as the layout produced it.
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Up,
    Down,
    Left,
    Right,
    /// `F1` through `F24`.
    F(u8),
    /// Any key the shell does not distinguish (modifier-only presses,
    /// media keys, dead keys).
    Other,
}

/// Press, auto-repeat or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// Held modifier keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0;
        const SHIFT = 1 << 0;
        /// Alt on Windows/Linux, Option on macOS.
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        /// Meta: Command on macOS, the Windows key elsewhere.
        const SUPER = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_is_an_unmodified_press() {
        let ev = KeyEvent::new(KeyCode::Char('r'));
        assert_eq!(ev.kind, KeyEventKind::Press);
        assert!(ev.modifiers.is_empty());
        assert!(ev.is_char('r'));
        assert!(!ev.is_char('R'));
    }

    #[test]
    fn only_press_and_repeat_are_down() {
        let press = KeyEvent::new(KeyCode::Escape);
        assert!(press.is_down());
        assert!(press.with_kind(KeyEventKind::Repeat).is_down());
        assert!(!press.with_kind(KeyEventKind::Release).is_down());
    }

    #[test]
    fn modifier_bits_are_stable() {
        assert_eq!(Modifiers::default(), Modifiers::NONE);
        assert_eq!((Modifiers::SHIFT | Modifiers::ALT).bits(), 0b0011);
        assert_eq!(Modifiers::from_bits_truncate(0xff).bits(), 0b1111);
    }

    #[test]
    fn resize_events_compare_by_width() {
        assert_eq!(Event::Resize { width: 800 }, Event::Resize { width: 800 });
        assert_ne!(Event::Resize { width: 800 }, Event::Resize { width: 801 });
    }
}
