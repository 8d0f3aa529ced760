//! Environment capabilities: the clock and device class.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// What the plugin needs to know about its surroundings.
pub trait Environment {
    /// Current time, used for search debouncing.
    fn now(&self) -> Instant;

    /// Touch devices get no automatic highlight in the menu.
    fn is_mobile(&self) -> bool {
        false
    }
}

/// Wall clock, desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock, for hosts that run their own event loop and for tests.
#[derive(Debug, Clone)]
pub struct ManualEnvironment {
    now: Cell<Instant>,
    mobile: bool,
}

impl Default for ManualEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualEnvironment {
    /// Desktop environment starting at the current instant.
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
            mobile: false,
        }
    }

    /// Mobile environment starting at the current instant.
    pub fn mobile() -> Self {
        Self {
            mobile: true,
            ..Self::new()
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Environment for ManualEnvironment {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }
}
