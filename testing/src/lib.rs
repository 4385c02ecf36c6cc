//! # Ticketshop Testing
//!
//! Testing utilities and helpers for the ticketshop cart engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A fluent Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use ticketshop_testing::{ReducerTest, mocks::SequentialIdGenerator};
//!
//! ReducerTest::new(CartReducer::new())
//!     .with_env(test_environment())
//!     .given_state(OrderState::default())
//!     .when_action(CartAction::AddProduct { product_id, variation: None })
//!     .then_state(|state| {
//!         assert_eq!(state.selected_products.len(), 1);
//!     })
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use ticketshop_core::environment::{Clock, IdGenerator};

/// Fluent Given-When-Then harness for reducers
pub mod reducer_test;

/// Mock implementations of Environment traits
///
/// Deterministic stand-ins for the production environment:
/// - [`FixedClock`]: always returns the same time
/// - [`SequentialIdGenerator`]: predictable instance ids
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketshop_testing::mocks::FixedClock;
    /// use ticketshop_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Sequential id generator for deterministic tests
    ///
    /// Produces UUIDs whose low 64 bits count up from zero, so instance
    /// ids created during a test are predictable and assertable.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketshop_testing::mocks::SequentialIdGenerator;
    /// use ticketshop_core::environment::IdGenerator;
    ///
    /// let ids = SequentialIdGenerator::new();
    /// let first = ids.generate();
    /// let second = ids.generate();
    /// assert_ne!(first, second);
    /// assert_eq!(first, SequentialIdGenerator::nth(0));
    /// ```
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator starting at id 0
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }

        /// The UUID this generator produces on its `n`-th call (0-indexed)
        #[must_use]
        pub const fn nth(n: u64) -> Uuid {
            Uuid::from_u64_pair(0, n)
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn generate(&self) -> Uuid {
            let n = self.next.fetch_add(1, Ordering::Relaxed);
            Self::nth(n)
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;
    use ticketshop_core::environment::IdGenerator;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.generate(), SequentialIdGenerator::nth(0));
        assert_eq!(ids.generate(), SequentialIdGenerator::nth(1));
        assert_eq!(ids.generate(), SequentialIdGenerator::nth(2));
    }
}
