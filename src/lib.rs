//! Sheetable catalogue library
//!
//! A catalogue of musical sheets: SQLite metadata, PDFs and thumbnails on
//! disk, and canonical composer records shared between sheets.

pub mod assets;
pub mod catalog_manager;
pub mod catalog_store;
pub mod cli_style;
pub mod composer;
pub mod config;
pub mod safe_name;
pub mod sqlite_persistence;
pub mod thumbnail;
pub mod upload;

// Re-export commonly used types for convenience
pub use assets::AssetStore;
pub use catalog_manager::CatalogManager;
pub use catalog_store::{CatalogError, CatalogResult, CatalogStore, SqliteCatalogStore};
pub use composer::{ComposerLookup, ComposerRegistry, OpenOpusClient};
pub use thumbnail::{HttpThumbnailClient, ThumbnailRenderer};
pub use upload::UploadRequest;
