//! Page windows and sort keys for catalogue listings.

use super::error::{CatalogError, CatalogResult};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Columns sheets can be ordered by.
pub const SHEET_SORT_COLUMNS: &[&str] = &[
    "updated_at",
    "created_at",
    "release_date",
    "sheet_name",
    "composer",
];

/// Columns composers can be ordered by.
pub const COMPOSER_SORT_COLUMNS: &[&str] = &["name", "updated_at", "created_at", "epoch"];

/// A validated `ORDER BY` clause. Only whitelisted column names ever reach SQL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub const fn new(column: &'static str, descending: bool) -> Self {
        Self { column, descending }
    }

    /// Parses `"<column>"`, `"<column> asc"` or `"<column> desc"` against `allowed`.
    /// A blank string yields `default`.
    pub fn parse(raw: &str, allowed: &[&'static str], default: SortKey) -> CatalogResult<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.is_empty() {
            return Ok(default);
        }

        let mut parts = raw.split_whitespace();
        let column_name = parts.next().unwrap_or_default();
        let descending = match parts.next() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(CatalogError::Validation {
                    field: "sort_by",
                    reason: format!("unknown sort direction '{}'", other),
                })
            }
        };
        if parts.next().is_some() {
            return Err(CatalogError::Validation {
                field: "sort_by",
                reason: format!("unexpected trailing input in '{}'", raw),
            });
        }

        let column = allowed
            .iter()
            .copied()
            .find(|c| *c == column_name)
            .ok_or_else(|| CatalogError::Validation {
                field: "sort_by",
                reason: format!(
                    "cannot sort by '{}', expected one of: {}",
                    column_name,
                    allowed.join(", ")
                ),
            })?;
        Ok(SortKey { column, descending })
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {}",
            self.column,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.column,
            if self.descending { "desc" } else { "asc" }
        )
    }
}

/// What a caller asks for. `page` is 1-based; values below 1 are allowed and
/// simply yield no rows.
#[derive(Clone, Debug, Default)]
pub struct PageRequest {
    pub sort_by: String,
    pub limit: usize,
    pub page: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: usize) -> Self {
        Self {
            sort_by: String::new(),
            limit,
            page,
        }
    }

    pub fn sorted_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }
}

/// Position of a page inside a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: usize,
    pub total_pages: usize,
    /// Row offset of the page, `None` when the page is out of range.
    pub offset: Option<usize>,
}

impl PageWindow {
    /// Locates `page` among `ceil(total_rows / limit)` pages. A `limit` of 0
    /// means `default_limit`; anything above `MAX_PAGE_SIZE` is rejected
    /// rather than shrunk, so the page count always matches the asked size.
    pub fn compute(
        total_rows: usize,
        limit: usize,
        default_limit: usize,
        page: i64,
    ) -> CatalogResult<Self> {
        let limit = if limit == 0 { default_limit.max(1) } else { limit };
        if limit > MAX_PAGE_SIZE {
            return Err(CatalogError::Validation {
                field: "limit",
                reason: format!("{} is above the maximum page size of {}", limit, MAX_PAGE_SIZE),
            });
        }
        let total_pages = total_rows.div_ceil(limit);
        let offset = if page >= 1 && (page as u64) <= total_pages as u64 {
            Some((page as usize - 1) * limit)
        } else {
            None
        };
        Ok(PageWindow {
            limit,
            total_pages,
            offset,
        })
    }
}

/// A page of rows together with the window it was cut from.
#[derive(Clone, Debug, Serialize)]
pub struct Pagination<T> {
    pub sort: String,
    pub limit: usize,
    pub page: i64,
    pub total_rows: usize,
    pub total_pages: usize,
    pub rows: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn from_window(
        sort: SortKey,
        window: PageWindow,
        page: i64,
        total_rows: usize,
        rows: Vec<T>,
    ) -> Self {
        Pagination {
            sort: sort.to_string(),
            limit: window.limit,
            page,
            total_rows,
            total_pages: window.total_pages,
            rows,
        }
    }
}
