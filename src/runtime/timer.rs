//! Time sources and cancellable deadlines
//!
//! The editor never spawns timers. It reads the time from a `Clock` and
//! checks `Debounce` deadlines whenever it is ticked. `Timer` uses
//! `std::time::Instant` on native targets and `js_sys::Date::now()` on
//! `wasm32` targets (where `Instant::now()` panics with "time not
//! implemented on this platform").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Native implementation ───────────────────────────────────────────────────

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use std::time::Instant;

    #[derive(Clone)]
    pub struct Timer {
        start: Instant,
    }

    impl Timer {
        pub fn now() -> Self {
            Self {
                start: Instant::now(),
            }
        }

        pub fn elapsed_ms(&self) -> f64 {
            self.start.elapsed().as_secs_f64() * 1000.0
        }
    }
}

// ── WASM implementation ─────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
mod imp {
    #[derive(Clone)]
    pub struct Timer {
        start_ms: f64,
    }

    impl Timer {
        pub fn now() -> Self {
            Self {
                start_ms: js_sys::Date::now(),
            }
        }

        pub fn elapsed_ms(&self) -> f64 {
            js_sys::Date::now() - self.start_ms
        }
    }
}

pub use imp::Timer;

// ── Clocks ──────────────────────────────────────────────────────────────────

/// Monotonic millisecond time source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from construction
#[derive(Clone)]
pub struct SystemClock {
    origin: Timer,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Timer::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed_ms() as u64
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ── Debounce ────────────────────────────────────────────────────────────────

/// A single cancellable deadline that restarts on every `schedule`.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// (Re)start the countdown from `now_ms`.
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    /// Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.deadline.map_or(false, |deadline| now_ms >= deadline)
    }
}
