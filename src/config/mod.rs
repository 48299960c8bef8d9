mod file_config;

pub use file_config::{ComposerLookupConfig, FileConfig, ThumbnailConfig};

use crate::catalog_store::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::composer::OPEN_OPUS_API_BASE;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOOKUP_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_THUMBNAIL_TIMEOUT_SEC: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub composer_lookup_url: Option<String>,
    pub composer_lookup_timeout_sec: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_timeout_sec: Option<u64>,
    pub default_page_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of the asset tree.
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub default_page_size: usize,

    pub composer_lookup: Option<LookupSettings>,
    pub thumbnail: Option<ThumbnailSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSettings {
    pub url: String,
    pub timeout: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| data_dir.join("catalog.db"));

        let default_page_size = file
            .default_page_size
            .or(cli.default_page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if default_page_size == 0 || default_page_size > MAX_PAGE_SIZE {
            bail!(
                "default_page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                default_page_size
            );
        }

        let lookup_file = file.composer_lookup.unwrap_or_default();
        let lookup_url = lookup_file
            .url
            .or_else(|| cli.composer_lookup_url.clone())
            .unwrap_or_else(|| OPEN_OPUS_API_BASE.to_string());
        let lookup_timeout = lookup_file
            .timeout_sec
            .or(cli.composer_lookup_timeout_sec)
            .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_SEC);
        // Empty URL switches lookups off
        let composer_lookup = (!lookup_url.trim().is_empty()).then(|| LookupSettings {
            base_url: lookup_url.trim().to_string(),
            timeout: Duration::from_secs(lookup_timeout),
        });

        let thumbnail_file = file.thumbnail.unwrap_or_default();
        let thumbnail_timeout = thumbnail_file
            .timeout_sec
            .or(cli.thumbnail_timeout_sec)
            .unwrap_or(DEFAULT_THUMBNAIL_TIMEOUT_SEC);
        let thumbnail = thumbnail_file
            .url
            .or_else(|| cli.thumbnail_url.clone())
            .filter(|url| !url.trim().is_empty())
            .map(|url| ThumbnailSettings {
                url: url.trim().to_string(),
                timeout: Duration::from_secs(thumbnail_timeout),
            });

        Ok(Self {
            data_dir,
            db_path,
            default_page_size,
            composer_lookup,
            thumbnail,
        })
    }
}
