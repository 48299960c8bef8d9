//! SQLite schema of the sheet catalogue.
//!
//! Sheets reference their composer by value (`safe_composer`), not through a
//! foreign key: the reserved "unknown" bucket has no composer row.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Composers table - canonical composer identity
const COMPOSERS_TABLE: Table = Table {
    name: "composers",
    columns: &[
        sqlite_column!("safe_name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("portrait_url", &SqlType::Text, non_null = true),
        sqlite_column!("epoch", &SqlType::Text, non_null = true),
        sqlite_column!("birth", &SqlType::Text),
        sqlite_column!("death", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true), // RFC 3339
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_composers_name", "name")],
};

/// Sheets table - one row per uploaded score
const SHEETS_TABLE: Table = Table {
    name: "sheets",
    columns: &[
        sqlite_column!("safe_sheet_name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("sheet_name", &SqlType::Text, non_null = true),
        sqlite_column!("safe_composer", &SqlType::Text, non_null = true),
        sqlite_column!("composer", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Text, non_null = true), // YYYY-MM-DD
        sqlite_column!("pdf_url", &SqlType::Text, non_null = true),
        sqlite_column!("uploader_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "tags",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ), // JSON array
        sqlite_column!(
            "categories",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ), // JSON array
        sqlite_column!(
            "information_text",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_sheets_safe_composer", "safe_composer"),
        ("idx_sheets_updated_at", "updated_at"),
    ],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[COMPOSERS_TABLE, SHEETS_TABLE],
    migration: None,
}];
