//! # CKAN Sync Testkit
//!
//! Test utilities for the CKAN sync engine.
//!
//! This crate provides:
//! - `FakeCatalog`, an in-memory action API behind the engine's `HttpClient`
//! - Fixtures wiring engines, stores and notices to the fake
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ckan_sync_testkit::prelude::*;
//!
//! #[test]
//! fn creates_group() {
//!     let harness = TestHarness::new();
//!     let engine = harness.engine(EntityKind::Group);
//!     // ... drive lifecycle events, then inspect harness.catalog
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use ckan_sync_protocol::{EntityKind, LifecycleEvent, LifecycleKind, LocalEntity};
}

pub use fake::*;
pub use fixtures::*;
pub use generators::*;
