//! Common test infrastructure
//!
//! A catalogue backed by a temporary directory, with in-process fakes for the
//! composer lookup and thumbnail services. Tests should only import from this
//! module.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestCatalog, CHOPIN};
//!
//! #[test]
//! fn test_upload() {
//!     let catalog = TestCatalog::new();
//!     let sheet = catalog.upload(CHOPIN, "Nocturne").unwrap();
//!     assert_eq!(sheet.safe_composer, "frederic-chopin");
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{FakeLookup, FakeRenderer, TestCatalog};
