#![forbid(unsafe_code)]

//! DOM `KeyboardEvent` fields to [`KeyEvent`].
//!
//! The browser reports two strings per key: `key` (the layout-resolved
//! character) and `code` (the physical key). With Alt held, macOS resolves
//! `key` to a dead or symbol character (`Alt+Shift+R` arrives as `"‰"`), so
//! letter and digit shortcuts must fall back to `code` whenever Alt, Ctrl or
//! Meta is down.

use shellkit_core::{KeyCode, KeyEvent, KeyEventKind, Modifiers};

/// Raw fields of one DOM `keydown`/`keyup` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomKey<'a> {
    pub key: &'a str,
    pub code: &'a str,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub repeat: bool,
}

impl DomKey<'_> {
    /// Modifier flags held during the event.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        let mut mods = Modifiers::NONE;
        mods.set(Modifiers::SHIFT, self.shift);
        mods.set(Modifiers::ALT, self.alt);
        mods.set(Modifiers::CTRL, self.ctrl);
        mods.set(Modifiers::SUPER, self.meta);
        mods
    }

    /// Normalize a key-down event.
    #[must_use]
    pub fn to_key_down(&self) -> KeyEvent {
        let mods = self.modifiers();
        let kind = if self.repeat {
            KeyEventKind::Repeat
        } else {
            KeyEventKind::Press
        };
        KeyEvent::new(normalize_key_code(self.key, self.code, mods))
            .with_modifiers(mods)
            .with_kind(kind)
    }
}

/// Deterministic normalization of DOM key/code strings into a [`KeyCode`].
#[must_use]
pub fn normalize_key_code(dom_key: &str, dom_code: &str, mods: Modifiers) -> KeyCode {
    let chorded = mods.intersects(Modifiers::ALT | Modifiers::CTRL | Modifiers::SUPER);
    if chorded && let Some(c) = char_from_dom_code(dom_code) {
        return KeyCode::Char(c);
    }

    let mut chars = dom_key.chars();
    if let Some(first) = chars.next()
        && chars.next().is_none()
    {
        return KeyCode::Char(first);
    }

    match dom_key {
        "Enter" => KeyCode::Enter,
        "Escape" | "Esc" => KeyCode::Escape,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Delete" => KeyCode::Delete,
        "ArrowUp" => KeyCode::Up,
        "ArrowDown" => KeyCode::Down,
        "ArrowLeft" => KeyCode::Left,
        "ArrowRight" => KeyCode::Right,
        "Spacebar" => KeyCode::Char(' '),
        _ => {
            if let Some(n) = parse_function_key(dom_key) {
                return KeyCode::F(n);
            }
            // "Dead", "Unidentified" and friends.
            char_from_dom_code(dom_code).map_or(KeyCode::Other, KeyCode::Char)
        }
    }
}

/// `KeyA`..`KeyZ` and `Digit0`..`Digit9`.
fn char_from_dom_code(dom_code: &str) -> Option<char> {
    if let Some(tail) = dom_code.strip_prefix("Key") {
        let mut chars = tail.chars();
        if let Some(c) = chars.next()
            && chars.next().is_none()
            && c.is_ascii_alphabetic()
        {
            return Some(c.to_ascii_lowercase());
        }
    }
    if let Some(tail) = dom_code.strip_prefix("Digit") {
        let mut chars = tail.chars();
        if let Some(c) = chars.next()
            && chars.next().is_none()
            && c.is_ascii_digit()
        {
            return Some(c);
        }
    }
    None
}

fn parse_function_key(s: &str) -> Option<u8> {
    let rest = s.strip_prefix('F')?;
    rest.parse::<u8>().ok().filter(|n| (1..=24).contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shellkit_core::keybinding::DEFAULT_PANEL_TOGGLE;

    fn dom<'a>(key: &'a str, code: &'a str) -> DomKey<'a> {
        DomKey {
            key,
            code,
            ..DomKey::default()
        }
    }

    #[test]
    fn printable_key_wins_without_chord() {
        assert_eq!(
            normalize_key_code("R", "KeyR", Modifiers::SHIFT),
            KeyCode::Char('R')
        );
        assert_eq!(
            normalize_key_code("ä", "Quote", Modifiers::NONE),
            KeyCode::Char('ä')
        );
    }

    #[test]
    fn chorded_letter_uses_physical_code() {
        let mods = Modifiers::SHIFT | Modifiers::ALT;
        assert_eq!(normalize_key_code("‰", "KeyR", mods), KeyCode::Char('r'));
        assert_eq!(
            normalize_key_code("¡", "Digit1", Modifiers::ALT),
            KeyCode::Char('1')
        );
    }

    #[test]
    fn named_and_function_keys() {
        assert_eq!(
            normalize_key_code("Escape", "Escape", Modifiers::NONE),
            KeyCode::Escape
        );
        assert_eq!(
            normalize_key_code("ArrowLeft", "ArrowLeft", Modifiers::NONE),
            KeyCode::Left
        );
        assert_eq!(
            normalize_key_code("F12", "F12", Modifiers::NONE),
            KeyCode::F(12)
        );
        assert_eq!(
            normalize_key_code("F25", "F25", Modifiers::NONE),
            KeyCode::Other
        );
    }

    #[test]
    fn dead_key_falls_back_to_code_then_other() {
        assert_eq!(
            normalize_key_code("Dead", "KeyE", Modifiers::NONE),
            KeyCode::Char('e')
        );
        assert_eq!(
            normalize_key_code("Shift", "ShiftLeft", Modifiers::SHIFT),
            KeyCode::Other
        );
    }

    #[test]
    fn macos_alt_shift_r_matches_default_toggle() {
        let ev = DomKey {
            shift: true,
            alt: true,
            ..dom("‰", "KeyR")
        }
        .to_key_down();
        assert!(DEFAULT_PANEL_TOGGLE.matches(&ev));
    }

    #[test]
    fn windows_alt_shift_r_matches_default_toggle() {
        let ev = DomKey {
            shift: true,
            alt: true,
            ..dom("R", "KeyR")
        }
        .to_key_down();
        assert!(DEFAULT_PANEL_TOGGLE.matches(&ev));
    }

    #[test]
    fn repeat_flag_maps_to_repeat_kind() {
        let ev = DomKey {
            repeat: true,
            ..dom("a", "KeyA")
        }
        .to_key_down();
        assert_eq!(ev.kind, KeyEventKind::Repeat);
        assert!(ev.is_down());
    }

    #[test]
    fn modifier_bits() {
        let key = DomKey {
            ctrl: true,
            meta: true,
            ..dom("k", "KeyK")
        };
        assert_eq!(key.modifiers(), Modifiers::CTRL | Modifiers::SUPER);
    }
}
