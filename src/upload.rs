//! Upload payload as it arrives from a caller, before any resolution.

use crate::catalog_store::{parse_release_date, TagSet};
use chrono::NaiveDate;
use serde::Deserialize;

/// Form fields accompanying an uploaded PDF.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRequest {
    pub composer: String,
    pub sheet_name: String,
    /// `YYYY-MM-DD`; anything else is stored as the zero date.
    pub release_date: String,
    /// Semicolon separated.
    pub categories: String,
    /// Semicolon separated.
    pub tags: String,
    pub information_text: String,
}

impl UploadRequest {
    pub fn new(composer: &str, sheet_name: &str) -> Self {
        Self {
            composer: composer.to_string(),
            sheet_name: sheet_name.to_string(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        self.sheet_name.trim()
    }

    pub fn parsed_release_date(&self) -> NaiveDate {
        parse_release_date(&self.release_date)
    }

    pub fn category_list(&self) -> Vec<String> {
        parse_semicolon_list(&self.categories)
    }

    pub fn tag_set(&self) -> TagSet {
        TagSet::from_values(parse_semicolon_list(&self.tags))
    }
}

/// Splits on `;`, trims every part and drops the empty ones. Order is kept
/// and duplicates are not removed.
pub fn parse_semicolon_list(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::zero_release_date;

    #[test]
    fn test_semicolon_list() {
        assert_eq!(
            parse_semicolon_list("Classical; Romantic;; Baroque ;"),
            vec!["Classical", "Romantic", "Baroque"]
        );
        assert!(parse_semicolon_list("").is_empty());
        assert!(parse_semicolon_list(" ; ;").is_empty());
        assert_eq!(parse_semicolon_list("a;a"), vec!["a", "a"]);
    }

    #[test]
    fn test_tags_are_deduplicated_but_categories_are_not() {
        let request = UploadRequest {
            tags: "Piano;Romantic;Piano".to_string(),
            categories: "Piano;Piano".to_string(),
            ..UploadRequest::new("Frédéric Chopin", "Étude N. 1")
        };
        assert_eq!(
            request.tag_set().iter().collect::<Vec<_>>(),
            vec!["Piano", "Romantic"]
        );
        assert_eq!(request.category_list().len(), 2);
    }

    #[test]
    fn test_release_date_quirk() {
        let mut request = UploadRequest::new("", "Sonata");
        request.release_date = "1830-03-17".to_string();
        assert_eq!(
            request.parsed_release_date(),
            NaiveDate::from_ymd_opt(1830, 3, 17).unwrap()
        );
        request.release_date = "March 1830".to_string();
        assert_eq!(request.parsed_release_date(), zero_release_date());
    }

    #[test]
    fn test_deserializes_form_field_names() {
        let request: UploadRequest = serde_json::from_str(
            r#"{"composer":"Franz Liszt","sheetName":"Liebestraum","informationText":"No. 3"}"#,
        )
        .unwrap();
        assert_eq!(request.sheet_name, "Liebestraum");
        assert_eq!(request.information_text, "No. 3");
        assert!(request.tags.is_empty());
    }
}
