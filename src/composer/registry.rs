//! Canonical composer records: lazy creation on upload, collection when
//! orphaned, and the administrative list/search/update/delete operations.

use super::lookup::{confident_match, ComposerLookup, ComposerMetadata};
use crate::catalog_store::{
    search, CatalogError, CatalogResult, CatalogStore, Composer, ComposerUpdate, PageRequest,
    PageWindow, Pagination, SortKey, COMPOSER_SORT_COLUMNS, DEFAULT_PAGE_SIZE,
    UNKNOWN_COMPOSER_SAFE_NAME, UNKNOWN_EPOCH,
};
use crate::safe_name::require_safe_name;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_COMPOSER_SORT: SortKey = SortKey::new("name", false);

pub struct ComposerRegistry {
    store: Arc<dyn CatalogStore>,
    lookup: Option<Arc<dyn ComposerLookup>>,
    default_page_size: usize,
}

impl ComposerRegistry {
    pub fn new(store: Arc<dyn CatalogStore>, lookup: Option<Arc<dyn ComposerLookup>>) -> Self {
        Self {
            store,
            lookup,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, default_page_size: usize) -> Self {
        self.default_page_size = default_page_size;
        self
    }

    /// Resolves a free-text composer name to its canonical record, creating
    /// the record on first use.
    ///
    /// A blank name (or one that derives to "unknown") yields the reserved
    /// bucket, which never gets a row.
    pub fn resolve(&self, raw_name: &str) -> CatalogResult<Composer> {
        let raw_name = raw_name.trim();
        if raw_name.is_empty() {
            return Ok(Composer::unknown());
        }
        let safe_name = require_safe_name("composer", raw_name)?;
        if safe_name == UNKNOWN_COMPOSER_SAFE_NAME {
            return Ok(Composer::unknown());
        }

        if let Some(existing) = self.store.get_composer(&safe_name)? {
            return Ok(existing);
        }

        let composer = self.build_record(&safe_name, raw_name);
        match self.store.insert_composer(&composer) {
            Ok(()) => {
                info!(
                    "Created composer {} ({}, epoch {})",
                    composer.safe_name, composer.name, composer.epoch
                );
                Ok(composer)
            }
            // A concurrent upload created it first
            Err(CatalogError::Conflict { .. }) => self.get(&safe_name),
            Err(e) => Err(e),
        }
    }

    fn build_record(&self, safe_name: &str, raw_name: &str) -> Composer {
        let Some(lookup) = &self.lookup else {
            return Composer::placeholder(safe_name, raw_name);
        };

        match lookup.search(raw_name) {
            Ok(candidates) => match confident_match(raw_name, &candidates) {
                Some(found) => from_metadata(safe_name, raw_name, found),
                None => {
                    debug!(
                        "No confident lookup match for '{}' among {} candidates",
                        raw_name,
                        candidates.len()
                    );
                    Composer::placeholder(safe_name, raw_name)
                }
            },
            Err(e) => {
                warn!(
                    "Composer lookup for '{}' failed, using placeholder: {:#}",
                    raw_name, e
                );
                Composer::placeholder(safe_name, raw_name)
            }
        }
    }

    pub fn get(&self, safe_name: &str) -> CatalogResult<Composer> {
        if safe_name == UNKNOWN_COMPOSER_SAFE_NAME {
            return Ok(Composer::unknown());
        }
        self.store
            .get_composer(safe_name)?
            .ok_or_else(|| CatalogError::composer_not_found(safe_name))
    }

    /// Deletes the composer row if `departing_sheet` was its last sheet.
    /// The reserved bucket is never collected. Returns whether a row went away.
    pub fn collect_if_orphaned(
        &self,
        safe_composer: &str,
        departing_sheet: Option<&str>,
    ) -> CatalogResult<bool> {
        if safe_composer == UNKNOWN_COMPOSER_SAFE_NAME {
            return Ok(false);
        }
        let collected = self
            .store
            .delete_composer_if_orphaned(safe_composer, departing_sheet)?;
        if collected {
            info!("Collected orphaned composer {}", safe_composer);
        }
        Ok(collected)
    }

    pub fn list(&self, request: &PageRequest) -> CatalogResult<Pagination<Composer>> {
        let sort = SortKey::parse(
            &request.sort_by,
            COMPOSER_SORT_COLUMNS,
            DEFAULT_COMPOSER_SORT,
        )?;
        let total_rows = self.store.count_composers()?;
        let window =
            PageWindow::compute(total_rows, request.limit, self.default_page_size, request.page)?;
        let rows = match window.offset {
            Some(offset) => self.store.list_composers(sort, window.limit, offset)?,
            None => Vec::new(),
        };
        Ok(Pagination::from_window(
            sort,
            window,
            request.page,
            total_rows,
            rows,
        ))
    }

    pub fn search(&self, text: &str) -> CatalogResult<Vec<Composer>> {
        let text = non_blank("query", text)?;
        Ok(search::filter_composers_by_name(
            self.store.all_composers()?,
            text,
        ))
    }

    /// Applies `update` to an existing composer. The safe name never changes.
    pub fn update(&self, safe_name: &str, update: ComposerUpdate) -> CatalogResult<Composer> {
        if safe_name == UNKNOWN_COMPOSER_SAFE_NAME {
            return Err(reserved_bucket());
        }
        let mut composer = self.get(safe_name)?;

        if let Some(name) = update.name {
            composer.name = non_blank("name", &name)?.to_string();
        }
        if let Some(epoch) = update.epoch {
            composer.epoch = non_blank("epoch", &epoch)?.to_string();
        }
        if let Some(portrait_url) = update.portrait_url {
            composer.portrait_url = non_blank("portrait_url", &portrait_url)?.to_string();
        }

        composer.touch();
        self.store.update_composer(&composer)?;
        Ok(composer)
    }

    /// Deletes a composer that no sheet references anymore.
    pub fn delete(&self, safe_name: &str) -> CatalogResult<()> {
        if safe_name == UNKNOWN_COMPOSER_SAFE_NAME {
            return Err(reserved_bucket());
        }
        self.get(safe_name)?;

        if !self.store.delete_composer_if_orphaned(safe_name, None)? {
            let references = self.store.count_sheets(Some(safe_name))?;
            // Gone between the lookup and the delete
            if references == 0 {
                return Err(CatalogError::composer_not_found(safe_name));
            }
            return Err(CatalogError::InUse {
                entity: "Composer",
                name: safe_name.to_string(),
                references,
            });
        }
        info!("Deleted composer {}", safe_name);
        Ok(())
    }
}

fn from_metadata(safe_name: &str, raw_name: &str, found: &ComposerMetadata) -> Composer {
    let mut composer = Composer::placeholder(safe_name, raw_name);
    if !found.complete_name.trim().is_empty() {
        composer.name = found.complete_name.trim().to_string();
    }
    if let Some(portrait) = found.portrait.as_deref().filter(|p| !p.trim().is_empty()) {
        composer.portrait_url = portrait.to_string();
    }
    composer.epoch = found
        .epoch
        .clone()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_EPOCH.to_string());
    composer.birth = found.birth.clone().filter(|b| !b.is_empty());
    composer.death = found.death.clone().filter(|d| !d.is_empty());
    composer
}

fn non_blank<'a>(field: &'static str, value: &'a str) -> CatalogResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::Validation {
            field,
            reason: "must not be blank".to_string(),
        });
    }
    Ok(value)
}

fn reserved_bucket() -> CatalogError {
    CatalogError::Validation {
        field: "composer",
        reason: format!("'{}' is reserved", UNKNOWN_COMPOSER_SAFE_NAME),
    }
}
