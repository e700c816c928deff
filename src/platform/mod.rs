//! Platform integration
//!
//! Embedded implementations of the estimator's trait surfaces. Only the
//! Embassy integration exists today; the mock implementations used by
//! host tests live next to their traits.

#[cfg(feature = "embassy")]
pub mod embassy;
