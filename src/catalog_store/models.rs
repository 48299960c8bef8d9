//! Catalogue entities as stored in SQLite.

use super::error::{CatalogError, CatalogResult};
use super::tag_set::{self, TagSet};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Safe name of the reserved bucket used when no composer is given.
pub const UNKNOWN_COMPOSER_SAFE_NAME: &str = "unknown";

/// Display name of the reserved bucket.
pub const UNKNOWN_COMPOSER_NAME: &str = "Unknown";

/// Portrait used when no confident composer metadata is available.
pub const PLACEHOLDER_PORTRAIT_URL: &str =
    "https://icon-library.com/images/unknown-person-icon/unknown-person-icon-4.jpg";

/// Epoch used when no confident composer metadata is available.
pub const UNKNOWN_EPOCH: &str = "Unknown";

const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A musical score in the catalogue.
///
/// `tags` and `categories` hold the encoded column text exactly as stored, so
/// a row whose text does not decode can still be listed, shown and deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub safe_sheet_name: String,
    pub sheet_name: String,
    pub safe_composer: String,
    pub composer: String,
    pub release_date: NaiveDate,
    pub pdf_url: String,
    pub uploader_id: u32,
    pub tags: String,
    pub categories: String,
    pub information_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sheet {
    /// Relative reference of a sheet's PDF, `<safe_composer>/<safe_sheet_name>`.
    pub fn pdf_url_for(safe_composer: &str, safe_sheet_name: &str) -> String {
        format!("{}/{}", safe_composer, safe_sheet_name)
    }

    pub fn tag_set(&self) -> CatalogResult<TagSet> {
        TagSet::decode(&self.tags).map_err(|e| CatalogError::from_tag_set(&self.safe_sheet_name, e))
    }

    pub fn category_list(&self) -> CatalogResult<Vec<String>> {
        tag_set::decode_list(&self.categories).map_err(|e| CatalogError::Corrupted {
            safe_sheet_name: self.safe_sheet_name.clone(),
            field: "categories",
            reason: e.to_string(),
        })
    }

    /// Pre-persist transformation applied before every save.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Canonical composer record, the owner of a composer's identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composer {
    pub safe_name: String,
    pub name: String,
    pub portrait_url: String,
    pub epoch: String,
    pub birth: Option<String>,
    pub death: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Composer {
    /// The reserved bucket. It never has a database row.
    pub fn unknown() -> Self {
        let now = now();
        Composer {
            safe_name: UNKNOWN_COMPOSER_SAFE_NAME.to_string(),
            name: UNKNOWN_COMPOSER_NAME.to_string(),
            portrait_url: PLACEHOLDER_PORTRAIT_URL.to_string(),
            epoch: UNKNOWN_EPOCH.to_string(),
            birth: None,
            death: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record used when the lookup service has nothing confident to say.
    pub fn placeholder(safe_name: &str, name: &str) -> Self {
        let now = now();
        Composer {
            safe_name: safe_name.to_string(),
            name: name.to_string(),
            portrait_url: PLACEHOLDER_PORTRAIT_URL.to_string(),
            epoch: UNKNOWN_EPOCH.to_string(),
            birth: None,
            death: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.safe_name == UNKNOWN_COMPOSER_SAFE_NAME
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Editable fields of a composer. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ComposerUpdate {
    pub name: Option<String>,
    pub epoch: Option<String>,
    pub portrait_url: Option<String>,
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 so that text order equals chronological order.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// The zero date unparseable release dates fall back to.
pub fn zero_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
}

pub(crate) fn format_release_date(date: &NaiveDate) -> String {
    date.format(RELEASE_DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` release date; anything else becomes the zero date.
pub fn parse_release_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s.trim(), RELEASE_DATE_FORMAT).unwrap_or_else(|_| zero_release_date())
}
