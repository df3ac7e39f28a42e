//! # JsonDB Testkit
//!
//! Test utilities for JsonDB.
//!
//! This crate provides:
//! - Temp-dir store fixtures with automatic cleanup
//! - Property-based test generators for items using proptest
//! - Concurrent writer stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jsondb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         let notices = store.collection("notices.json");
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
