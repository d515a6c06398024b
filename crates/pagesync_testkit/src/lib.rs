//! # Pagesync Testkit
//!
//! Test utilities for pagesync.
//!
//! This crate provides:
//! - Catalog and price fixtures with increasing timestamps
//! - Sync contexts over memory and temporary file stores
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use pagesync_testkit::prelude::*;
//!
//! let ctx = TestContext::memory();
//! let items = catalog(3);
//! assert_eq!(items.len(), 3);
//! assert_eq!(ctx.record_count(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
