//! Substring and exact-tag matching over full catalogue scans.
//!
//! Tags live in an encoded text column, so tag lookups decode every row. That
//! is fine at catalogue scale; larger catalogues would want a tag table.

use super::models::{Composer, Sheet};
use super::tag_set::TagSet;
use tracing::warn;

/// Case-insensitive substring match. An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keeps the sheets whose display title contains `text`, in input order.
pub fn filter_by_title(sheets: Vec<Sheet>, text: &str) -> Vec<Sheet> {
    let needle = text.to_lowercase();
    sheets
        .into_iter()
        .filter(|sheet| sheet.sheet_name.to_lowercase().contains(&needle))
        .collect()
}

/// Keeps the sheets whose tag set contains exactly `tag`.
///
/// Rows whose stored tags cannot be decoded are skipped with a warning.
pub fn filter_by_tag(sheets: Vec<Sheet>, tag: &str) -> Vec<Sheet> {
    sheets
        .into_iter()
        .filter(|sheet| match TagSet::decode(&sheet.tags) {
            Ok(set) => set.contains(tag),
            Err(e) => {
                warn!(
                    "Skipping sheet {} during tag scan: {}",
                    sheet.safe_sheet_name, e
                );
                false
            }
        })
        .collect()
}

/// Keeps the composers whose display name contains `text`, in input order.
pub fn filter_composers_by_name(composers: Vec<Composer>, text: &str) -> Vec<Composer> {
    composers
        .into_iter()
        .filter(|composer| contains_ignore_case(&composer.name, text))
        .collect()
}
