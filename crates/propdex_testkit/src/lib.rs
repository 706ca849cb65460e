//! # propdex testkit
//!
//! Test utilities for propdex.
//!
//! This crate provides:
//! - Fixture entities with their metadata
//! - Temporary index helpers
//! - A minimal persistence client wired to an index manager
//! - Property-based test generators using proptest
//!
//! Cross-crate integration tests live in this crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use propdex_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_index() {
//!     let fixtures = Fixtures::new();
//!     with_temp_index(fixtures.registry.clone(), |manager, _index| {
//!         manager.write(&fixtures.person, &Person::new("p1", 32)).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use client::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;
