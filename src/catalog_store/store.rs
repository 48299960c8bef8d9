//! SQLite-backed catalog store.

use super::error::{is_constraint_violation, CatalogError, CatalogResult};
use super::models::{
    format_release_date, format_timestamp, now, parse_release_date, parse_timestamp, Composer,
    Sheet,
};
use super::pagination::SortKey;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::VersionedSchema;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const SHEET_COLUMNS: &str = "safe_sheet_name, sheet_name, safe_composer, composer, release_date,
     pdf_url, uploader_id, tags, categories, information_text, created_at, updated_at";

const COMPOSER_COLUMNS: &str =
    "safe_name, name, portrait_url, epoch, birth, death, created_at, updated_at";

/// SQLite-backed catalog store.
///
/// A single connection behind a mutex: the catalogue is small and every call
/// is short, so serialized access keeps transactions trivially isolated.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {:?}", parent)
            })?;
        }

        let mut conn = Connection::open(path).context("Failed to open catalog database")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        VersionedSchema::open_latest(&mut conn, CATALOG_VERSIONED_SCHEMAS, "catalog")?;

        let sheet_count: i64 = conn.query_row("SELECT COUNT(*) FROM sheets", [], |r| r.get(0))?;
        let composer_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM composers", [], |r| r.get(0))?;
        info!(
            "Opened sheet catalog at {:?}: {} sheets, {} composers",
            path, sheet_count, composer_count
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_sheet_row(row: &rusqlite::Row) -> rusqlite::Result<Sheet> {
        let release_date: String = row.get("release_date")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let tags: Option<String> = row.get("tags")?;
        let categories: Option<String> = row.get("categories")?;
        let information_text: Option<String> = row.get("information_text")?;

        Ok(Sheet {
            safe_sheet_name: row.get("safe_sheet_name")?,
            sheet_name: row.get("sheet_name")?,
            safe_composer: row.get("safe_composer")?,
            composer: row.get("composer")?,
            release_date: parse_release_date(&release_date),
            pdf_url: row.get("pdf_url")?,
            uploader_id: row.get("uploader_id")?,
            tags: tags.unwrap_or_default(),
            categories: categories.unwrap_or_default(),
            information_text: information_text.unwrap_or_default(),
            created_at: parse_timestamp(&created_at).unwrap_or_else(now),
            updated_at: parse_timestamp(&updated_at).unwrap_or_else(now),
        })
    }

    fn parse_composer_row(row: &rusqlite::Row) -> rusqlite::Result<Composer> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Composer {
            safe_name: row.get("safe_name")?,
            name: row.get("name")?,
            portrait_url: row.get("portrait_url")?,
            epoch: row.get("epoch")?,
            birth: row.get("birth")?,
            death: row.get("death")?,
            created_at: parse_timestamp(&created_at).unwrap_or_else(now),
            updated_at: parse_timestamp(&updated_at).unwrap_or_else(now),
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn insert_sheet(&self, sheet: &Sheet) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!(
                "INSERT INTO sheets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                SHEET_COLUMNS
            ),
            params![
                sheet.safe_sheet_name,
                sheet.sheet_name,
                sheet.safe_composer,
                sheet.composer,
                format_release_date(&sheet.release_date),
                sheet.pdf_url,
                sheet.uploader_id,
                sheet.tags,
                sheet.categories,
                sheet.information_text,
                format_timestamp(&sheet.created_at),
                format_timestamp(&sheet.updated_at),
            ],
        );
        match result {
            Ok(_) => {
                debug!("Inserted sheet {}", sheet.safe_sheet_name);
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(CatalogError::Conflict {
                entity: "Sheet",
                name: sheet.safe_sheet_name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_sheet(&self, safe_sheet_name: &str) -> CatalogResult<Option<Sheet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM sheets WHERE safe_sheet_name = ?1",
            SHEET_COLUMNS
        ))?;
        Ok(stmt
            .query_row(params![safe_sheet_name], Self::parse_sheet_row)
            .optional()?)
    }

    fn update_sheet(&self, sheet: &Sheet) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE sheets SET sheet_name = ?2, safe_composer = ?3, composer = ?4,
                release_date = ?5, pdf_url = ?6, uploader_id = ?7, tags = ?8,
                categories = ?9, information_text = ?10, updated_at = ?11
             WHERE safe_sheet_name = ?1",
            params![
                sheet.safe_sheet_name,
                sheet.sheet_name,
                sheet.safe_composer,
                sheet.composer,
                format_release_date(&sheet.release_date),
                sheet.pdf_url,
                sheet.uploader_id,
                sheet.tags,
                sheet.categories,
                sheet.information_text,
                format_timestamp(&sheet.updated_at),
            ],
        )?;
        if rows_affected == 0 {
            return Err(CatalogError::sheet_not_found(&sheet.safe_sheet_name));
        }
        Ok(())
    }

    fn delete_sheet(&self, safe_sheet_name: &str) -> CatalogResult<usize> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "DELETE FROM sheets WHERE safe_sheet_name = ?1",
            params![safe_sheet_name],
        )?;
        Ok(rows_affected)
    }

    fn count_sheets(&self, safe_composer: Option<&str>) -> CatalogResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = match safe_composer {
            Some(composer) => conn.query_row(
                "SELECT COUNT(*) FROM sheets WHERE safe_composer = ?1",
                params![composer],
                |r| r.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM sheets", [], |r| r.get(0))?,
        };
        Ok(count as usize)
    }

    fn list_sheets(
        &self,
        sort: SortKey,
        limit: usize,
        offset: usize,
        safe_composer: Option<&str>,
    ) -> CatalogResult<Vec<Sheet>> {
        let conn = self.conn.lock().unwrap();
        let filter = if safe_composer.is_some() {
            "WHERE safe_composer = ?3"
        } else {
            ""
        };
        // Tie-break on the primary key so pages never overlap
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sheets {} ORDER BY {}, safe_sheet_name ASC LIMIT ?1 OFFSET ?2",
            SHEET_COLUMNS,
            filter,
            sort.to_sql()
        ))?;
        let rows = match safe_composer {
            Some(composer) => stmt
                .query_map(
                    params![limit as i64, offset as i64, composer],
                    Self::parse_sheet_row,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![limit as i64, offset as i64], Self::parse_sheet_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    fn all_sheets(&self) -> CatalogResult<Vec<Sheet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM sheets", SHEET_COLUMNS))?;
        let rows = stmt
            .query_map([], Self::parse_sheet_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_composer(&self, composer: &Composer) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!(
                "INSERT INTO composers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                COMPOSER_COLUMNS
            ),
            params![
                composer.safe_name,
                composer.name,
                composer.portrait_url,
                composer.epoch,
                composer.birth,
                composer.death,
                format_timestamp(&composer.created_at),
                format_timestamp(&composer.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(CatalogError::Conflict {
                entity: "Composer",
                name: composer.safe_name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_composer(&self, safe_name: &str) -> CatalogResult<Option<Composer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM composers WHERE safe_name = ?1",
            COMPOSER_COLUMNS
        ))?;
        Ok(stmt
            .query_row(params![safe_name], Self::parse_composer_row)
            .optional()?)
    }

    fn update_composer(&self, composer: &Composer) -> CatalogResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE composers SET name = ?2, portrait_url = ?3, epoch = ?4, birth = ?5,
                death = ?6, updated_at = ?7
             WHERE safe_name = ?1",
            params![
                composer.safe_name,
                composer.name,
                composer.portrait_url,
                composer.epoch,
                composer.birth,
                composer.death,
                format_timestamp(&composer.updated_at),
            ],
        )?;
        if rows_affected == 0 {
            return Err(CatalogError::composer_not_found(&composer.safe_name));
        }
        Ok(())
    }

    fn delete_composer_if_orphaned(
        &self,
        safe_name: &str,
        departing_sheet: Option<&str>,
    ) -> CatalogResult<bool> {
        let conn = self.conn.lock().unwrap();
        // `IS NOT NULL` matches every sheet when nothing is departing
        let rows_affected = conn.execute(
            "DELETE FROM composers WHERE safe_name = ?1 AND NOT EXISTS (
                SELECT 1 FROM sheets WHERE safe_composer = ?1 AND safe_sheet_name IS NOT ?2
             )",
            params![safe_name, departing_sheet],
        )?;
        Ok(rows_affected > 0)
    }

    fn count_composers(&self) -> CatalogResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM composers", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn list_composers(
        &self,
        sort: SortKey,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Vec<Composer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM composers ORDER BY {}, safe_name ASC LIMIT ?1 OFFSET ?2",
            COMPOSER_COLUMNS,
            sort.to_sql()
        ))?;
        let rows = stmt
            .query_map(
                params![limit as i64, offset as i64],
                Self::parse_composer_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn all_composers(&self) -> CatalogResult<Vec<Composer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM composers", COMPOSER_COLUMNS))?;
        let rows = stmt
            .query_map([], Self::parse_composer_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::models::zero_release_date;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    struct TestStore {
        store: SqliteCatalogStore,
        _temp_dir: TempDir, // Keep temp dir alive
    }

    fn create_test_store() -> TestStore {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db")).unwrap();
        TestStore {
            store,
            _temp_dir: temp_dir,
        }
    }

    fn make_sheet(safe_name: &str, safe_composer: &str, minutes_ago: i64) -> Sheet {
        let at = now() - ChronoDuration::minutes(minutes_ago);
        Sheet {
            safe_sheet_name: safe_name.to_string(),
            sheet_name: safe_name.to_uppercase(),
            safe_composer: safe_composer.to_string(),
            composer: safe_composer.to_string(),
            release_date: zero_release_date(),
            pdf_url: Sheet::pdf_url_for(safe_composer, safe_name),
            uploader_id: 7,
            tags: r#"["Piano"]"#.to_string(),
            categories: "[]".to_string(),
            information_text: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_insert_and_get_sheet() {
        let test = create_test_store();
        let sheet = make_sheet("etude-n-1", "frederic-chopin", 0);
        test.store.insert_sheet(&sheet).unwrap();

        let loaded = test.store.get_sheet("etude-n-1").unwrap().unwrap();
        assert_eq!(loaded.sheet_name, "ETUDE-N-1");
        assert_eq!(loaded.tags, r#"["Piano"]"#);
        assert_eq!(loaded.uploader_id, 7);
        assert_eq!(
            format_timestamp(&loaded.created_at),
            format_timestamp(&sheet.created_at)
        );

        assert!(test.store.get_sheet("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_sheet_is_conflict() {
        let test = create_test_store();
        let sheet = make_sheet("etude-n-1", "frederic-chopin", 0);
        test.store.insert_sheet(&sheet).unwrap();
        assert!(matches!(
            test.store.insert_sheet(&sheet),
            Err(CatalogError::Conflict { entity: "Sheet", .. })
        ));
    }

    #[test]
    fn test_update_missing_sheet_is_not_found() {
        let test = create_test_store();
        let sheet = make_sheet("ghost", "unknown", 0);
        assert!(test.store.update_sheet(&sheet).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_sheets_orders_and_filters() {
        let test = create_test_store();
        test.store
            .insert_sheet(&make_sheet("old", "franz-liszt", 30))
            .unwrap();
        test.store
            .insert_sheet(&make_sheet("new", "frederic-chopin", 1))
            .unwrap();
        test.store
            .insert_sheet(&make_sheet("middle", "franz-liszt", 10))
            .unwrap();

        let newest_first = test
            .store
            .list_sheets(SortKey::new("updated_at", true), 10, 0, None)
            .unwrap();
        let names: Vec<_> = newest_first.iter().map(|s| s.safe_sheet_name.as_str()).collect();
        assert_eq!(names, vec!["new", "middle", "old"]);

        let liszt = test
            .store
            .list_sheets(SortKey::new("sheet_name", false), 10, 0, Some("franz-liszt"))
            .unwrap();
        let names: Vec<_> = liszt.iter().map(|s| s.safe_sheet_name.as_str()).collect();
        assert_eq!(names, vec!["middle", "old"]);

        let second_page = test
            .store
            .list_sheets(SortKey::new("updated_at", true), 2, 2, None)
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].safe_sheet_name, "old");

        assert_eq!(test.store.count_sheets(None).unwrap(), 3);
        assert_eq!(test.store.count_sheets(Some("franz-liszt")).unwrap(), 2);
    }

    #[test]
    fn test_delete_sheet_reports_rows() {
        let test = create_test_store();
        test.store
            .insert_sheet(&make_sheet("etude", "unknown", 0))
            .unwrap();
        assert_eq!(test.store.delete_sheet("etude").unwrap(), 1);
        assert_eq!(test.store.delete_sheet("etude").unwrap(), 0);
    }

    #[test]
    fn test_delete_composer_if_orphaned() {
        let test = create_test_store();
        test.store
            .insert_composer(&Composer::placeholder("franz-liszt", "Franz Liszt"))
            .unwrap();
        test.store
            .insert_sheet(&make_sheet("liebestraum", "franz-liszt", 0))
            .unwrap();

        // Still referenced
        assert!(!test
            .store
            .delete_composer_if_orphaned("franz-liszt", None)
            .unwrap());
        // Referenced only by the sheet being deleted
        assert!(test
            .store
            .delete_composer_if_orphaned("franz-liszt", Some("liebestraum"))
            .unwrap());
        assert!(test.store.get_composer("franz-liszt").unwrap().is_none());
    }

    #[test]
    fn test_composer_crud() {
        let test = create_test_store();
        let mut composer = Composer::placeholder("frederic-chopin", "Frederic Chopin");
        test.store.insert_composer(&composer).unwrap();
        assert!(matches!(
            test.store.insert_composer(&composer),
            Err(CatalogError::Conflict { entity: "Composer", .. })
        ));

        composer.name = "Frédéric Chopin".to_string();
        composer.epoch = "Romantic".to_string();
        composer.birth = Some("1810-03-01".to_string());
        test.store.update_composer(&composer).unwrap();

        let loaded = test.store.get_composer("frederic-chopin").unwrap().unwrap();
        assert_eq!(loaded.name, "Frédéric Chopin");
        assert_eq!(loaded.epoch, "Romantic");
        assert_eq!(loaded.birth.as_deref(), Some("1810-03-01"));
        assert_eq!(loaded.death, None);

        assert_eq!(test.store.count_composers().unwrap(), 1);
        let page = test
            .store
            .list_composers(SortKey::new("name", false), 10, 0)
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_reopen_validates_existing_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        {
            let store = SqliteCatalogStore::new(&db_path).unwrap();
            store
                .insert_sheet(&make_sheet("etude", "unknown", 0))
                .unwrap();
        }
        let reopened = SqliteCatalogStore::new(&db_path).unwrap();
        assert!(reopened.get_sheet("etude").unwrap().is_some());
    }
}
