#![forbid(unsafe_code)]

//! Selection stores: the reactive values the URL synchroniser mirrors.
//!
//! A selection is an optional identifier (`"proj-001"`, `"INIT-42"`). The
//! shell only needs three things from a store: read the current value,
//! write a new one, and be told when it changes. [`SelectionStore`] is that
//! narrow seam, so the synchroniser can be driven by an [`Observable`] in
//! production and by hand-rolled fakes in tests.
//!
//! Empty strings are treated as "no selection" in both directions.

use super::observable::{Observable, Subscription};

/// Callback invoked with the new selection after a store change.
pub type SelectionCallback = Box<dyn Fn(Option<&str>)>;

/// Read/write/subscribe access to one selection.
pub trait SelectionStore {
    /// Current selection, `None` when nothing is selected.
    fn current(&self) -> Option<String>;

    /// Replace the selection. Writing the current value must not notify.
    fn set(&self, id: Option<String>);

    /// Register a change callback. Dropping the guard unsubscribes.
    fn subscribe(&self, callback: SelectionCallback) -> Subscription;
}

/// Normalise an identifier: empty strings mean "no selection".
#[must_use]
pub fn normalize_selection(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.is_empty())
}

impl SelectionStore for Observable<Option<String>> {
    fn current(&self) -> Option<String> {
        normalize_selection(self.get())
    }

    fn set(&self, id: Option<String>) {
        Observable::set(self, normalize_selection(id));
    }

    fn subscribe(&self, callback: SelectionCallback) -> Subscription {
        Observable::subscribe(self, move |value: &Option<String>| {
            callback(value.as_deref().filter(|s| !s.is_empty()));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observable_is_a_selection_store() {
        let obs = Observable::new(None::<String>);
        let store: &dyn SelectionStore = &obs;
        assert_eq!(store.current(), None);

        store.set(Some("proj-001".into()));
        assert_eq!(store.current().as_deref(), Some("proj-001"));
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn empty_string_is_no_selection() {
        let obs = Observable::new(Some("proj-001".to_string()));
        let store: &dyn SelectionStore = &obs;
        store.set(Some(String::new()));
        assert_eq!(obs.get(), None);
        assert_eq!(store.current(), None);
    }

    #[test]
    fn subscription_reports_borrowed_value() {
        let obs = Observable::new(None::<String>);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = SelectionStore::subscribe(
            &obs,
            Box::new(move |v| seen_clone.borrow_mut().push(v.map(str::to_owned))),
        );

        SelectionStore::set(&obs, Some("INIT-42".into()));
        SelectionStore::set(&obs, Some("INIT-42".into()));
        SelectionStore::set(&obs, None);
        assert_eq!(
            *seen.borrow(),
            vec![Some("INIT-42".to_string()), None]
        );
    }
}
