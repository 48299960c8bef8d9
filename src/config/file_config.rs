use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Storage (can override CLI)
    pub data_dir: Option<String>,
    pub db_path: Option<String>,
    pub default_page_size: Option<usize>,

    // Collaborators
    pub composer_lookup: Option<ComposerLookupConfig>,
    pub thumbnail: Option<ThumbnailConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ComposerLookupConfig {
    /// Base URL of the lookup API. An empty string disables lookups.
    pub url: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Full URL of the rendering endpoint.
    pub url: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            data_dir = "/srv/sheets"
            db_path = "/var/lib/sheets/catalog.db"
            default_page_size = 25

            [composer_lookup]
            url = "https://api.openopus.org"
            timeout_sec = 5

            [thumbnail]
            url = "http://localhost:5000/createthumbnail"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir.as_deref(), Some("/srv/sheets"));
        assert_eq!(config.default_page_size, Some(25));
        let lookup = config.composer_lookup.unwrap();
        assert_eq!(lookup.timeout_sec, Some(5));
        let thumbnail = config.thumbnail.unwrap();
        assert_eq!(
            thumbnail.url.as_deref(),
            Some("http://localhost:5000/createthumbnail")
        );
        assert_eq!(thumbnail.timeout_sec, None);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.composer_lookup.is_none());
    }

    #[test]
    fn test_load_reports_path() {
        let err = FileConfig::load(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("catalog.toml"));
    }
}
