#![forbid(unsafe_code)]

//! Keyboard shortcut parsing, matching, and action mapping.
//!
//! # Key Concepts
//!
//! - **Shortcut**: a single character key plus an exact modifier set, e.g.
//!   `Shift+Alt+R`. Parsed from and printed as the `+`-joined form.
//!
//! - **Matching rule**: a key-down event matches when its modifiers are
//!   *exactly* the shortcut's modifiers and its character equals the
//!   shortcut key case-insensitively. `Ctrl+Shift+Alt+R` does not match
//!   `Shift+Alt+R`; neither does a key release.
//!
//! - **ShortcutMap**: ordered shortcut → action table. The first matching
//!   entry wins.
//!
//! - **KeyDisposition**: what the host should do with the native event.
//!   `Handled` means suppress the browser default for that combination.
//!
//! # Example
//!
//! ```
//! use shellkit_core::event::{KeyCode, KeyEvent, Modifiers};
//! use shellkit_core::keybinding::Shortcut;
//!
//! let toggle: Shortcut = "Shift+Alt+R".parse().unwrap();
//! let ev = KeyEvent::new(KeyCode::Char('R')).with_modifiers(Modifiers::SHIFT | Modifiers::ALT);
//! assert!(toggle.matches(&ev));
//!
//! let extra = ev.with_modifiers(Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL);
//! assert!(!toggle.matches(&extra));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::event::{KeyCode, KeyEvent, Modifiers};

/// Default shortcut that toggles the side panel.
pub const DEFAULT_PANEL_TOGGLE: Shortcut = Shortcut::new('r', Modifiers::SHIFT.union(Modifiers::ALT));

/// What the host should do with the native key event after the shell saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The shell acted on the event; the host must suppress default handling.
    Handled,
    /// The shell did not act; the event continues normally.
    Ignored,
}

impl KeyDisposition {
    /// True when the host should call `preventDefault()`.
    #[must_use]
    pub const fn prevents_default(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// A single-key shortcut with an exact modifier set.
///
/// The key is stored lowercased; matching is case-insensitive because the
/// reported character changes with Shift and Caps Lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    key: char,
    modifiers: Modifiers,
}

impl Shortcut {
    /// Create a shortcut from a key and modifiers.
    ///
    /// ASCII keys are lowercased; other characters are kept as given.
    #[must_use]
    pub const fn new(key: char, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_ascii_lowercase(),
            modifiers,
        }
    }

    /// The (lowercased) shortcut key.
    #[must_use]
    pub const fn key(&self) -> char {
        self.key
    }

    /// The exact modifier set required.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether `event` triggers this shortcut.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if !event.is_down() || event.modifiers != self.modifiers {
            return false;
        }
        match event.code {
            KeyCode::Char(c) => chars_eq_ignore_case(c, self.key),
            _ => false,
        }
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ORDER: [(Modifiers, &str); 4] = [
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::CTRL, "Ctrl"),
            (Modifiers::SUPER, "Meta"),
        ];
        for (flag, name) in ORDER {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        for upper in self.key.to_uppercase() {
            write!(f, "{upper}")?;
        }
        Ok(())
    }
}

/// Error returned when a shortcut string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    /// The input was empty or only whitespace.
    Empty,
    /// A modifier token was not recognised.
    UnknownModifier(String),
    /// The same modifier appeared twice.
    DuplicateModifier(String),
    /// No key followed the modifiers (e.g. `"Shift+Alt+"`).
    MissingKey,
    /// The key token was not a single character.
    InvalidKey(String),
}

impl fmt::Display for ShortcutParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty shortcut"),
            Self::UnknownModifier(m) => write!(f, "unknown modifier: {m}"),
            Self::DuplicateModifier(m) => write!(f, "duplicate modifier: {m}"),
            Self::MissingKey => write!(f, "shortcut has no key"),
            Self::InvalidKey(k) => write!(f, "shortcut key must be one character, got {k:?}"),
        }
    }
}

impl std::error::Error for ShortcutParseError {}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token.to_ascii_lowercase().as_str() {
        "shift" => Some(Modifiers::SHIFT),
        "alt" | "option" | "opt" => Some(Modifiers::ALT),
        "ctrl" | "control" => Some(Modifiers::CTRL),
        "meta" | "super" | "cmd" | "command" => Some(Modifiers::SUPER),
        _ => None,
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let tokens: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key_token, modifier_tokens) = tokens
            .split_last()
            .ok_or(ShortcutParseError::Empty)?;

        let mut modifiers = Modifiers::NONE;
        for token in modifier_tokens {
            let flag = parse_modifier(token)
                .ok_or_else(|| ShortcutParseError::UnknownModifier((*token).to_string()))?;
            if modifiers.contains(flag) {
                return Err(ShortcutParseError::DuplicateModifier((*token).to_string()));
            }
            modifiers |= flag;
        }

        if key_token.is_empty() {
            return Err(ShortcutParseError::MissingKey);
        }
        let mut chars = key_token.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(ShortcutParseError::InvalidKey((*key_token).to_string())),
        };

        Ok(Shortcut::new(key, modifiers))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Shortcut {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Shortcut {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered shortcut → action table.
///
/// Resolution walks entries in insertion order and returns the first match.
#[derive(Debug, Clone)]
pub struct ShortcutMap<A> {
    entries: Vec<(Shortcut, A)>,
}

impl<A> Default for ShortcutMap<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Copy> ShortcutMap<A> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding (builder pattern).
    #[must_use]
    pub fn bind(mut self, shortcut: Shortcut, action: A) -> Self {
        self.insert(shortcut, action);
        self
    }

    /// Add a binding. A second binding for the same shortcut replaces the
    /// first, keeping its position.
    pub fn insert(&mut self, shortcut: Shortcut, action: A) {
        if let Some(entry) = self.entries.iter_mut().find(|(s, _)| *s == shortcut) {
            entry.1 = action;
        } else {
            self.entries.push((shortcut, action));
        }
    }

    /// Resolve a key event to its bound action, if any.
    #[must_use]
    pub fn resolve(&self, event: &KeyEvent) -> Option<A> {
        self.entries
            .iter()
            .find(|(shortcut, _)| shortcut.matches(event))
            .map(|(_, action)| *action)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no bindings are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyEventKind;
    use proptest::prelude::*;

    fn shift_alt(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::SHIFT | Modifiers::ALT)
    }

    #[test]
    fn parses_canonical_form() {
        let s: Shortcut = "Shift+Alt+R".parse().unwrap();
        assert_eq!(s, DEFAULT_PANEL_TOGGLE);
        assert_eq!(s.key(), 'r');
        assert_eq!(s.modifiers(), Modifiers::SHIFT | Modifiers::ALT);
    }

    #[test]
    fn parse_is_case_and_space_insensitive() {
        let s: Shortcut = " alt + SHIFT + r ".parse().unwrap();
        assert_eq!(s, DEFAULT_PANEL_TOGGLE);
        let mac: Shortcut = "Option+Shift+R".parse().unwrap();
        assert_eq!(mac, DEFAULT_PANEL_TOGGLE);
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(DEFAULT_PANEL_TOGGLE.to_string(), "Shift+Alt+R");
        let s: Shortcut = "Cmd+k".parse().unwrap();
        assert_eq!(s.to_string(), "Meta+K");
        assert_eq!(s.to_string().parse::<Shortcut>().unwrap(), s);
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Shortcut>(), Err(ShortcutParseError::Empty));
        assert_eq!(
            "Hyper+R".parse::<Shortcut>(),
            Err(ShortcutParseError::UnknownModifier("Hyper".into()))
        );
        assert_eq!(
            "Shift+shift+R".parse::<Shortcut>(),
            Err(ShortcutParseError::DuplicateModifier("shift".into()))
        );
        assert_eq!("Shift+Alt+".parse::<Shortcut>(), Err(ShortcutParseError::MissingKey));
        assert_eq!(
            "Shift+Enter".parse::<Shortcut>(),
            Err(ShortcutParseError::InvalidKey("Enter".into()))
        );
    }

    #[test]
    fn matches_either_case() {
        assert!(DEFAULT_PANEL_TOGGLE.matches(&shift_alt('R')));
        assert!(DEFAULT_PANEL_TOGGLE.matches(&shift_alt('r')));
    }

    #[test]
    fn rejects_other_modifier_sets() {
        let sets = [
            Modifiers::NONE,
            Modifiers::SHIFT,
            Modifiers::ALT,
            Modifiers::SHIFT | Modifiers::CTRL,
            Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL,
            Modifiers::SHIFT | Modifiers::ALT | Modifiers::SUPER,
        ];
        for mods in sets {
            let ev = KeyEvent::new(KeyCode::Char('R')).with_modifiers(mods);
            assert!(!DEFAULT_PANEL_TOGGLE.matches(&ev), "{mods:?} must not match");
        }
    }

    #[test]
    fn rejects_release_and_other_keys() {
        assert!(!DEFAULT_PANEL_TOGGLE.matches(&shift_alt('R').with_kind(KeyEventKind::Release)));
        assert!(DEFAULT_PANEL_TOGGLE.matches(&shift_alt('R').with_kind(KeyEventKind::Repeat)));
        assert!(!DEFAULT_PANEL_TOGGLE.matches(&shift_alt('t')));
        let enter = KeyEvent::new(KeyCode::Enter).with_modifiers(Modifiers::SHIFT | Modifiers::ALT);
        assert!(!DEFAULT_PANEL_TOGGLE.matches(&enter));
    }

    #[test]
    fn map_resolves_first_match_and_replaces_duplicates() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Act {
            TogglePanel,
            Search,
            Other,
        }
        let search: Shortcut = "Meta+K".parse().unwrap();
        let mut map = ShortcutMap::new()
            .bind(DEFAULT_PANEL_TOGGLE, Act::Other)
            .bind(search, Act::Search);
        map.insert(DEFAULT_PANEL_TOGGLE, Act::TogglePanel);

        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(&shift_alt('R')), Some(Act::TogglePanel));
        let cmd_k = KeyEvent::new(KeyCode::Char('k')).with_modifiers(Modifiers::SUPER);
        assert_eq!(map.resolve(&cmd_k), Some(Act::Search));
        assert_eq!(map.resolve(&KeyEvent::new(KeyCode::Char('k'))), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_display_form() {
        let json = serde_json::to_string(&DEFAULT_PANEL_TOGGLE).unwrap();
        assert_eq!(json, "\"Shift+Alt+R\"");
        let parsed: Shortcut = serde_json::from_str("\"ctrl+shift+p\"").unwrap();
        assert_eq!(parsed, Shortcut::new('p', Modifiers::CTRL | Modifiers::SHIFT));
        assert!(serde_json::from_str::<Shortcut>("\"Hyper+R\"").is_err());
    }

    proptest! {
        #[test]
        fn only_exact_modifiers_match(bits in 0u8..16, upper in any::<bool>()) {
            let mods = Modifiers::from_bits_truncate(bits);
            let c = if upper { 'R' } else { 'r' };
            let ev = KeyEvent::new(KeyCode::Char(c)).with_modifiers(mods);
            prop_assert_eq!(
                DEFAULT_PANEL_TOGGLE.matches(&ev),
                mods == Modifiers::SHIFT | Modifiers::ALT
            );
        }
    }
}
