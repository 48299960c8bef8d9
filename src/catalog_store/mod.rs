mod error;
mod models;
mod pagination;
mod schema;
pub mod search;
mod store;
pub mod tag_set;
mod trait_def;

pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use pagination::*;
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use tag_set::{TagSet, TagSetError};
pub use trait_def::CatalogStore;
