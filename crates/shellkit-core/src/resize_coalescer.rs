#![forbid(unsafe_code)]

//! Per-frame coalescing for viewport resize events.
//!
//! Browsers can fire many `resize` events inside one animation frame while
//! the user drags a window edge. Handling each one causes redundant state
//! writes and layout thrash. [`ResizeCoalescer`] keeps only the latest width
//! and tells the caller when a frame callback needs to be requested, so the
//! real handler runs at most once per frame.
//!
//! # Design
//!
//! "Latest wins": every `push` overwrites the pending width. The first push
//! after a `take` (or after construction) returns `true`, meaning "request
//! an animation frame now"; later pushes return `false` because a frame is
//! already on its way.
//!
//! # Usage
//!
//! ```
//! use shellkit_core::resize_coalescer::ResizeCoalescer;
//!
//! let mut coalescer = ResizeCoalescer::new();
//! assert!(coalescer.push(1200));   // request a frame
//! assert!(!coalescer.push(1100));  // frame already requested
//! assert!(!coalescer.push(900));
//!
//! // Inside the frame callback:
//! assert_eq!(coalescer.take(), Some(900));
//! assert_eq!(coalescer.take(), None);
//! ```

/// Coalesces resize widths to one per animation frame.
///
/// # Thread Safety
///
/// Not thread-safe; lives on the UI thread next to its controller.
#[derive(Debug, Clone, Default)]
pub struct ResizeCoalescer {
    /// Latest width seen since the last `take`.
    pending: Option<u32>,
    /// Events folded into an earlier pending width (diagnostics).
    coalesced: u64,
}

impl ResizeCoalescer {
    /// Create an empty coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resize to `width`.
    ///
    /// Returns `true` when the caller must request an animation frame.
    pub fn push(&mut self, width: u32) -> bool {
        let first = self.pending.is_none();
        if !first {
            self.coalesced = self.coalesced.saturating_add(1);
            #[cfg(feature = "tracing")]
            tracing::trace!(width, coalesced = self.coalesced, "resize coalesced");
        }
        self.pending = Some(width);
        first
    }

    /// Take the latest width, re-arming the coalescer.
    pub fn take(&mut self) -> Option<u32> {
        self.pending.take()
    }

    /// Drop any pending width without handling it (teardown).
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// True if a width is waiting for the next frame.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Total events that were folded into an earlier pending width.
    #[must_use]
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }
}
