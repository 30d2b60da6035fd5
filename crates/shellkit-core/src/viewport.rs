#![forbid(unsafe_code)]

//! Viewport breakpoints.
//!
//! The shell distinguishes three layout tiers by viewport width:
//!
//! | Tier      | Width (default)      | Effect                                  |
//! |-----------|----------------------|-----------------------------------------|
//! | `Mobile`  | `< 768`              | mobile navigation mode                  |
//! | `Tablet`  | `768 ..= 1023`       | side panel forced closed on entry       |
//! | `Desktop` | `>= 1024`            | side panel follows user preference      |
//!
//! # Invariants
//!
//! 1. Classification is a pure function of width; there is no hysteresis.
//! 2. `is_mobile(w)` implies `is_below_tablet(w)` for any valid config.
//! 3. An unknown viewport (pre-hydration) classifies as nothing; callers
//!    decide their own default.

/// Default mobile breakpoint in CSS pixels.
pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 768;

/// Default tablet breakpoint in CSS pixels.
pub const DEFAULT_TABLET_BREAKPOINT: u32 = 1024;

/// Layout tier for a given width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breakpoint {
    /// Narrower than the mobile breakpoint.
    Mobile,
    /// At least mobile, narrower than the tablet breakpoint.
    Tablet,
    /// At or above the tablet breakpoint.
    Desktop,
}

/// Width thresholds separating the layout tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Breakpoints {
    /// Widths strictly below this are mobile.
    pub mobile: u32,
    /// Widths strictly below this are tablet (or mobile).
    pub tablet: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile: DEFAULT_MOBILE_BREAKPOINT,
            tablet: DEFAULT_TABLET_BREAKPOINT,
        }
    }
}

impl Breakpoints {
    /// Create breakpoints with explicit thresholds.
    #[must_use]
    pub const fn new(mobile: u32, tablet: u32) -> Self {
        Self { mobile, tablet }
    }

    /// Mobile navigation mode applies below the mobile breakpoint.
    #[must_use]
    pub const fn is_mobile(&self, width: u32) -> bool {
        width < self.mobile
    }

    /// The side panel may not stay open below the tablet breakpoint.
    #[must_use]
    pub const fn is_below_tablet(&self, width: u32) -> bool {
        width < self.tablet
    }

    /// Classify a width into its tier.
    #[must_use]
    pub const fn classify(&self, width: u32) -> Breakpoint {
        if width < self.mobile {
            Breakpoint::Mobile
        } else if width < self.tablet {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    /// Validate thresholds. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.mobile == 0 {
            errors.push("breakpoints.mobile must be > 0".to_string());
        }
        if self.mobile >= self.tablet {
            errors.push(format!(
                "breakpoints.mobile ({}) must be below breakpoints.tablet ({})",
                self.mobile, self.tablet
            ));
        }
        errors
    }
}

/// Last known viewport width. `None` before the host has measured anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    width: Option<u32>,
}

impl Viewport {
    /// Pre-hydration viewport: no width known yet.
    #[must_use]
    pub const fn unknown() -> Self {
        Self { width: None }
    }

    /// A measured viewport.
    #[must_use]
    pub const fn with_width(width: u32) -> Self {
        Self { width: Some(width) }
    }

    /// Measured width, if any.
    #[must_use]
    pub const fn width(&self) -> Option<u32> {
        self.width
    }

    /// Tier of this viewport, or `None` when unmeasured.
    #[must_use]
    pub fn breakpoint(&self, breakpoints: &Breakpoints) -> Option<Breakpoint> {
        self.width.map(|w| breakpoints.classify(w))
    }
}
