#![forbid(unsafe_code)]

//! URL location model: query parameters, history, and route scoping.
//!
//! # Types
//!
//! - [`QueryParams`]: ordered query-string multimap. Editing one parameter
//!   never reorders or drops unrelated ones.
//! - [`Location`]: pathname + query + hash, parsed from an `href`-like
//!   string (`/board?initiative=INIT-42`).
//! - [`History`]: the browser history seam (read location, replace the
//!   query without a new entry, subscribe to navigation).
//! - [`MemoryHistory`]: in-process history stack for native hosts and tests.
//! - [`RouteSet`] / [`RouteScope`]: which routes a tracked parameter applies
//!   to.
//!
//! # Notification semantics
//!
//! [`MemoryHistory`] behaves like a client-side router: every change of the
//! current location notifies subscribers, replaces included. The browser
//! binding mirrors this by notifying after its own `replaceState` calls.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::reactive::{Observable, Subscription};

/// Location parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The pathname did not start with `/`.
    NotAbsolute(String),
    /// The query string could not be decoded.
    InvalidQuery(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAbsolute(path) => write!(f, "path must start with '/': {path:?}"),
            Self::InvalidQuery(detail) => write!(f, "invalid query string: {detail}"),
        }
    }
}

impl std::error::Error for LocationError {}

// ---------------------------------------------------------------------------
// QueryParams
// ---------------------------------------------------------------------------

/// Ordered query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` text. A leading `?` is
    /// ignored.
    pub fn parse(query: &str) -> Result<Self, LocationError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        if query.is_empty() {
            return Ok(Self::new());
        }
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| LocationError::InvalidQuery(e.to_string()))?;
        Ok(Self { pairs })
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `name` is present (with any value, including empty).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    /// Set `name` to `value`.
    ///
    /// The first occurrence is updated in place and later duplicates are
    /// removed; an absent parameter is appended.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == name) {
            Some(first) => {
                self.pairs[first].1 = value.to_string();
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || k != name;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((name.to_string(), value.to_string())),
        }
    }

    /// Remove every occurrence of `name`. Returns `true` if any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != name);
        self.pairs.len() != before
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        // A sequence of string pairs always serializes.
        serde_urlencoded::to_string(&self.pairs).unwrap_or_default()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A parsed location: `pathname?query#hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Absolute path, always starting with `/`.
    pub pathname: String,
    /// Query parameters.
    pub query: QueryParams,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            pathname: "/".to_string(),
            query: QueryParams::new(),
            hash: String::new(),
        }
    }
}

impl Location {
    /// Parse an in-app href such as `/board?initiative=INIT-42#top`.
    pub fn parse(href: &str) -> Result<Self, LocationError> {
        let (rest, hash) = match href.find('#') {
            Some(i) => (&href[..i], href[i..].to_string()),
            None => (href, String::new()),
        };
        let (path, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let pathname = if path.is_empty() { "/" } else { path };
        if !pathname.starts_with('/') {
            return Err(LocationError::NotAbsolute(pathname.to_string()));
        }
        Ok(Self {
            pathname: pathname.to_string(),
            query: QueryParams::parse(query)?,
            hash,
        })
    }

    /// Same location with a different query.
    #[must_use]
    pub fn with_query(&self, query: QueryParams) -> Self {
        Self {
            pathname: self.pathname.clone(),
            query,
            hash: self.hash.clone(),
        }
    }

    /// Reassemble the href.
    #[must_use]
    pub fn href(&self) -> String {
        let mut out = self.pathname.clone();
        if !self.query.is_empty() {
            out.push('?');
            out.push_str(&self.query.to_query_string());
        }
        out.push_str(&self.hash);
        out
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Callback invoked with the new location after a navigation.
pub type LocationCallback = Box<dyn Fn(&Location)>;

/// Browser URL/history access.
pub trait History {
    /// Current location.
    fn location(&self) -> Location;

    /// Replace the current entry's query. Must not create a history entry.
    fn replace_query(&self, query: QueryParams);

    /// Register a navigation callback. Dropping the guard unsubscribes.
    fn subscribe(&self, callback: LocationCallback) -> Subscription;
}

struct HistoryStack {
    entries: Vec<Location>,
    index: usize,
}

/// In-process history stack with router-style notifications.
#[derive(Clone)]
pub struct MemoryHistory {
    stack: Rc<RefCell<HistoryStack>>,
    current: Observable<Location>,
    replaces: Rc<Cell<u64>>,
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack.borrow();
        f.debug_struct("MemoryHistory")
            .field("current", &self.current.get().href())
            .field("len", &stack.entries.len())
            .field("index", &stack.index)
            .finish()
    }
}

impl MemoryHistory {
    /// Start a history at `href`.
    pub fn new(href: &str) -> Result<Self, LocationError> {
        let initial = Location::parse(href)?;
        Ok(Self {
            stack: Rc::new(RefCell::new(HistoryStack {
                entries: vec![initial.clone()],
                index: 0,
            })),
            current: Observable::new(initial),
            replaces: Rc::new(Cell::new(0)),
        })
    }

    /// Navigate to `href`, discarding any forward entries.
    pub fn push(&self, href: &str) -> Result<(), LocationError> {
        let location = Location::parse(href)?;
        {
            let mut stack = self.stack.borrow_mut();
            let keep = stack.index + 1;
            stack.entries.truncate(keep);
            stack.entries.push(location.clone());
            stack.index = keep;
        }
        self.current.set(location);
        Ok(())
    }

    /// Go back one entry. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Go forward one entry. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn go(&self, delta: isize) -> bool {
        let target = {
            let mut stack = self.stack.borrow_mut();
            let Some(next) = stack.index.checked_add_signed(delta) else {
                return false;
            };
            if next >= stack.entries.len() {
                return false;
            }
            stack.index = next;
            stack.entries[next].clone()
        };
        self.current.set(target);
        true
    }

    /// Number of history entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.borrow().entries.len()
    }

    /// True when the stack is empty (never, after construction).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.borrow().entries.is_empty()
    }

    /// How many times `replace_query` actually changed the URL.
    #[must_use]
    pub fn replace_count(&self) -> u64 {
        self.replaces.get()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        self.current.get()
    }

    fn replace_query(&self, query: QueryParams) {
        let next = {
            let mut stack = self.stack.borrow_mut();
            let index = stack.index;
            let next = stack.entries[index].with_query(query);
            stack.entries[index] = next.clone();
            next
        };
        if self.current.set(next) {
            self.replaces.set(self.replaces.get() + 1);
        }
    }

    fn subscribe(&self, callback: LocationCallback) -> Subscription {
        self.current.subscribe(move |location| callback(location))
    }
}

// ---------------------------------------------------------------------------
// Route scoping
// ---------------------------------------------------------------------------

/// A set of route prefixes.
///
/// `/board` matches `/board` and `/board/123` but not `/boards`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteSet {
    prefixes: Vec<String>,
}

impl RouteSet {
    /// Build from route prefixes. Trailing slashes are ignored.
    #[must_use]
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = routes
            .into_iter()
            .map(|r| {
                let r = r.as_ref().trim();
                let trimmed = r.trim_end_matches('/');
                if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
            })
            .collect();
        Self { prefixes }
    }

    /// Whether `pathname` falls under one of the prefixes.
    #[must_use]
    pub fn contains(&self, pathname: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                return pathname == "/";
            }
            match pathname.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }

    /// The configured prefixes.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }
}

/// Where a tracked URL parameter is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouteScope {
    /// Every route.
    #[default]
    Global,
    /// Only the listed routes; elsewhere the parameter is left untouched.
    Routes(RouteSet),
}

impl RouteScope {
    /// Whether the scope covers `pathname`.
    #[must_use]
    pub fn applies_to(&self, pathname: &str) -> bool {
        match self {
            Self::Global => true,
            Self::Routes(routes) => routes.contains(pathname),
        }
    }
}
