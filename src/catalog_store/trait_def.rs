//! CatalogStore trait definition.
//!
//! Row-level persistence of sheets and composers. Every mutating call is
//! atomic on its own; orchestration across rows and files lives in
//! [`crate::catalog_manager::CatalogManager`].

use super::error::CatalogResult;
use super::models::{Composer, Sheet};
use super::pagination::SortKey;

pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Sheets
    // =========================================================================

    /// Inserts a new sheet. Fails with `Conflict` if the safe name is taken.
    fn insert_sheet(&self, sheet: &Sheet) -> CatalogResult<()>;

    /// Returns Ok(None) if the sheet does not exist.
    fn get_sheet(&self, safe_sheet_name: &str) -> CatalogResult<Option<Sheet>>;

    /// Saves every mutable column of an existing sheet.
    /// Fails with `NotFound` if the row is gone.
    fn update_sheet(&self, sheet: &Sheet) -> CatalogResult<()>;

    /// Deletes a sheet row, returning the number of rows affected (0 or 1).
    fn delete_sheet(&self, safe_sheet_name: &str) -> CatalogResult<usize>;

    /// Counts sheets, optionally only those of one composer.
    fn count_sheets(&self, safe_composer: Option<&str>) -> CatalogResult<usize>;

    /// Returns one page of sheets.
    fn list_sheets(
        &self,
        sort: SortKey,
        limit: usize,
        offset: usize,
        safe_composer: Option<&str>,
    ) -> CatalogResult<Vec<Sheet>>;

    /// Returns every sheet in natural storage order.
    fn all_sheets(&self) -> CatalogResult<Vec<Sheet>>;

    // =========================================================================
    // Composers
    // =========================================================================

    /// Inserts a new composer. Fails with `Conflict` if the safe name is taken.
    fn insert_composer(&self, composer: &Composer) -> CatalogResult<()>;

    /// Returns Ok(None) if the composer does not exist.
    fn get_composer(&self, safe_name: &str) -> CatalogResult<Option<Composer>>;

    /// Saves display name, portrait, epoch and dates of an existing composer.
    fn update_composer(&self, composer: &Composer) -> CatalogResult<()>;

    /// Deletes the composer row if no sheet other than `departing_sheet`
    /// references it. The check and the delete are one statement.
    /// Returns whether a row was deleted.
    fn delete_composer_if_orphaned(
        &self,
        safe_name: &str,
        departing_sheet: Option<&str>,
    ) -> CatalogResult<bool>;

    fn count_composers(&self) -> CatalogResult<usize>;

    /// Returns one page of composers.
    fn list_composers(
        &self,
        sort: SortKey,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Vec<Composer>>;

    /// Returns every composer in natural storage order.
    fn all_composers(&self) -> CatalogResult<Vec<Composer>>;
}
