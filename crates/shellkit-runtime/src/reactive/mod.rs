#![forbid(unsafe_code)]

//! Reactive store layer.
//!
//! - [`Observable`]: shared, versioned value with change notification.
//! - [`ReadSignal`]: read-only view handed to consumers.
//! - [`BatchScope`]: defers notifications until a group of writes is done.
//! - [`SelectionStore`]: the narrow store interface the URL synchroniser
//!   reads from and writes to.

pub mod batch;
pub mod observable;
pub mod store;

pub use batch::BatchScope;
pub use observable::{Observable, ReadSignal, Subscription};
pub use store::{SelectionCallback, SelectionStore, normalize_selection};
