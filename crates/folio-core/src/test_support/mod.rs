//! Test support
//!
//! Fixtures shared by unit tests and the integration suites. Enabled for
//! this crate's own tests and, for downstream crates, by the `test-utils`
//! feature.

pub mod fixtures;
