//! Synchronized state abstraction for shared telemetry and settings.
//!
//! The attitude task owns its filter state outright; everything it shares
//! with other contexts (published records, the parameter store, the flight
//! status it consumes) goes through `SharedState`, so the same pipeline
//! code runs against an interrupt-safe mutex on target and a `RefCell` in
//! host tests.

/// Platform-agnostic synchronized state access.
///
/// Implementations:
/// - `EmbassyState<T>` for embedded targets using Embassy's
///   critical-section Mutex
/// - `MockState<T>` for host testing using RefCell (single-threaded)
pub trait SharedState<T> {
    /// Access state immutably.
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Access state mutably.
    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R;
}

// ============================================================================
// Embassy Implementation
// ============================================================================

#[cfg(feature = "embassy")]
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// Embassy-based synchronized state using a critical-section Mutex.
///
/// The critical section ensures atomic access even in interrupt contexts,
/// making this safe for use in async tasks and interrupt handlers.
#[cfg(feature = "embassy")]
pub struct EmbassyState<T> {
    inner: Mutex<CriticalSectionRawMutex, core::cell::RefCell<T>>,
}

#[cfg(feature = "embassy")]
impl<T> EmbassyState<T> {
    /// Creates a new `EmbassyState` wrapping the given value.
    ///
    /// This is a const fn, allowing static initialization.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(core::cell::RefCell::new(value)),
        }
    }
}

#[cfg(feature = "embassy")]
impl<T> SharedState<T> for EmbassyState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock synchronized state using RefCell for single-threaded testing.
///
/// # Panics
///
/// Panics if borrowing rules are violated (e.g., calling `with_mut` while
/// `with` is active). This indicates a bug in the test code.
pub struct MockState<T> {
    inner: core::cell::RefCell<T>,
}

impl<T> MockState<T> {
    /// Creates a new `MockState` wrapping the given value.
    pub fn new(value: T) -> Self {
        Self {
            inner: core::cell::RefCell::new(value),
        }
    }
}

impl<T> SharedState<T> for MockState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.borrow())
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.inner.borrow_mut())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_state_with_read() {
        let state = MockState::new(42u32);
        let value = state.with(|v| *v);
        assert_eq!(value, 42);
    }

    #[test]
    fn mock_state_with_mut_write() {
        let state = MockState::new(0u32);
        state.with_mut(|v| *v = 100);
        assert_eq!(state.with(|v| *v), 100);
    }

    #[test]
    fn mock_state_with_struct() {
        #[derive(Default)]
        struct TestState {
            counter: u32,
            name: &'static str,
        }

        let state = MockState::new(TestState {
            counter: 0,
            name: "test",
        });

        assert_eq!(state.with(|s| s.counter), 0);
        assert_eq!(state.with(|s| s.name), "test");

        state.with_mut(|s| {
            s.counter = 5;
            s.name = "modified";
        });

        assert_eq!(state.with(|s| s.counter), 5);
        assert_eq!(state.with(|s| s.name), "modified");
    }

    #[test]
    fn mock_state_closure_return_value() {
        let state = MockState::new([1, 2, 3]);
        let sum: i32 = state.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }
}
