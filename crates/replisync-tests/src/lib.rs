//! replisync integration testing support
//!
//! Fixture helpers shared by the end-to-end tests in `tests/`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Builds source/replica layouts on disk and reads trees back for
/// comparison, so every test states its trees the same way.
pub mod test_utils;
