//! The catalogue aggregate.
//!
//! Keeps sheet rows, their PDFs and thumbnails, and the composer rows they
//! reference consistent with each other. Every multi-step operation lives
//! here; the store and the asset store only ever see single steps.

use crate::assets::{AssetStore, RemoveOutcome};
use crate::catalog_store::{
    search, tag_set, CatalogError, CatalogResult, CatalogStore, Composer, PageRequest, PageWindow,
    Pagination, Sheet, SortKey, SqliteCatalogStore, DEFAULT_PAGE_SIZE, SHEET_SORT_COLUMNS,
};
use crate::composer::{ComposerLookup, ComposerRegistry, OpenOpusClient};
use crate::config::AppConfig;
use crate::safe_name::require_safe_name;
use crate::thumbnail::{HttpThumbnailClient, ThumbnailRenderer};
use crate::upload::UploadRequest;
use anyhow::Context;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_SHEET_SORT: SortKey = SortKey::new("updated_at", true);

pub struct CatalogManager {
    store: Arc<dyn CatalogStore>,
    assets: AssetStore,
    composers: ComposerRegistry,
    thumbnails: Option<Arc<dyn ThumbnailRenderer>>,
    default_page_size: usize,
}

impl CatalogManager {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        assets: AssetStore,
        composers: ComposerRegistry,
        thumbnails: Option<Arc<dyn ThumbnailRenderer>>,
    ) -> Self {
        Self {
            store,
            assets,
            composers,
            thumbnails,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Wires the store, the asset tree and the HTTP collaborators described
    /// by `config`.
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::new(&config.db_path)?);

        let assets = AssetStore::new(&config.data_dir);
        assets
            .ensure_layout()
            .context("Failed to prepare the asset directories")?;

        let lookup: Option<Arc<dyn ComposerLookup>> = match &config.composer_lookup {
            Some(settings) if !cfg!(feature = "no_lookup") => Some(Arc::new(
                OpenOpusClient::new(&settings.base_url, settings.timeout)?,
            )),
            _ => {
                info!("Composer lookup disabled, new composers get placeholder metadata");
                None
            }
        };

        let thumbnails: Option<Arc<dyn ThumbnailRenderer>> = match &config.thumbnail {
            Some(settings) => Some(Arc::new(HttpThumbnailClient::new(
                &settings.url,
                settings.timeout,
            )?)),
            None => None,
        };

        let composers = ComposerRegistry::new(store.clone(), lookup)
            .with_default_page_size(config.default_page_size);
        Ok(Self::new(store, assets, composers, thumbnails)
            .with_default_page_size(config.default_page_size))
    }

    pub fn with_default_page_size(mut self, default_page_size: usize) -> Self {
        self.default_page_size = default_page_size;
        self
    }

    pub fn composers(&self) -> &ComposerRegistry {
        &self.composers
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a sheet from an uploaded PDF.
    ///
    /// The composer is resolved (and created if new), the PDF written to its
    /// derived path, and the row inserted. A failure before the row exists
    /// removes the PDF again. A thumbnail failure is reported as
    /// `CatalogError::Thumbnail` but leaves the row and the PDF in place.
    pub fn upload<R: Read + ?Sized>(
        &self,
        uploader_id: u32,
        request: &UploadRequest,
        pdf: &mut R,
    ) -> CatalogResult<Sheet> {
        let title = request.title();
        let safe_sheet_name = require_safe_name("sheet_name", title)?;
        if self.store.get_sheet(&safe_sheet_name)?.is_some() {
            return Err(CatalogError::Conflict {
                entity: "Sheet",
                name: safe_sheet_name,
            });
        }

        let composer = self.composers.resolve(&request.composer)?;
        let pdf_path = self
            .assets
            .pdf_path(&composer.safe_name, &safe_sheet_name)?;

        if let Err(e) = self.assets.write(&pdf_path, pdf) {
            self.release_composer(&composer);
            return Err(e);
        }

        let now = crate::catalog_store::now();
        let sheet = Sheet {
            pdf_url: Sheet::pdf_url_for(&composer.safe_name, &safe_sheet_name),
            safe_sheet_name,
            sheet_name: title.to_string(),
            safe_composer: composer.safe_name.clone(),
            composer: composer.name.clone(),
            release_date: request.parsed_release_date(),
            uploader_id,
            tags: request.tag_set().encode(),
            categories: tag_set::encode_list(&request.category_list()),
            information_text: request.information_text.clone(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_sheet(&sheet) {
            self.discard_file(&pdf_path);
            self.release_composer(&composer);
            return Err(e);
        }
        info!(
            "Uploaded sheet {} by {} (uploader {})",
            sheet.safe_sheet_name, sheet.safe_composer, uploader_id
        );

        self.render_thumbnail(&sheet, &pdf_path)?;
        Ok(sheet)
    }

    /// Replaces a sheet with a fresh upload. The old sheet is fully deleted
    /// first; if the upload then fails the old sheet stays gone.
    pub fn replace<R: Read + ?Sized>(
        &self,
        safe_sheet_name: &str,
        uploader_id: u32,
        request: &UploadRequest,
        pdf: &mut R,
    ) -> CatalogResult<Sheet> {
        self.delete(safe_sheet_name)?;
        self.upload(uploader_id, request, pdf)
    }

    /// Re-renders the thumbnail of an existing sheet.
    pub fn refresh_thumbnail(&self, safe_sheet_name: &str) -> CatalogResult<()> {
        let sheet = self.find_by_safe_name(safe_sheet_name)?;
        let pdf_path = self
            .assets
            .pdf_path(&sheet.safe_composer, &sheet.safe_sheet_name)?;
        self.render_thumbnail(&sheet, &pdf_path)
    }

    fn render_thumbnail(&self, sheet: &Sheet, pdf_path: &Path) -> CatalogResult<()> {
        let Some(renderer) = &self.thumbnails else {
            warn!(
                "No thumbnail service configured, skipping thumbnail for {}",
                sheet.safe_sheet_name
            );
            return Ok(());
        };

        let png = renderer
            .render(pdf_path, &sheet.safe_sheet_name)
            .map_err(|e| {
                warn!(
                    "Thumbnail rendering failed for {}: {:#}",
                    sheet.safe_sheet_name, e
                );
                CatalogError::Thumbnail {
                    safe_sheet_name: sheet.safe_sheet_name.clone(),
                    reason: format!("{:#}", e),
                }
            })?;
        self.assets
            .store_thumbnail(&sheet.safe_sheet_name, &png)
            .map_err(|e| CatalogError::Thumbnail {
                safe_sheet_name: sheet.safe_sheet_name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn discard_file(&self, path: &Path) {
        if let Err(e) = self.assets.remove(path) {
            warn!("Failed to discard {:?}: {}", path, e);
        }
    }

    /// Undoes the lazy creation of a composer whose first upload failed.
    fn release_composer(&self, composer: &Composer) {
        if composer.is_unknown() {
            return;
        }
        match self.composers.collect_if_orphaned(&composer.safe_name, None) {
            Ok(true) => self.remove_composer_dir(&composer.safe_name),
            Ok(false) => {}
            Err(e) => warn!(
                "Failed to release composer {}: {}",
                composer.safe_name, e
            ),
        }
    }

    fn remove_composer_dir(&self, safe_composer: &str) {
        let dir = match self.assets.composer_dir(safe_composer) {
            Ok(dir) => dir,
            Err(e) => {
                debug!("Not removing directory of {}: {}", safe_composer, e);
                return;
            }
        };
        match self.assets.remove_dir_if_empty(&dir) {
            Ok(true) => debug!("Removed empty directory {:?}", dir),
            Ok(false) => {}
            Err(e) => warn!("Failed to remove directory {:?}: {}", dir, e),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn find_by_safe_name(&self, safe_sheet_name: &str) -> CatalogResult<Sheet> {
        self.store
            .get_sheet(safe_sheet_name)?
            .ok_or_else(|| CatalogError::sheet_not_found(safe_sheet_name))
    }

    /// One page of sheets, optionally restricted to one composer.
    pub fn list(
        &self,
        request: &PageRequest,
        safe_composer: Option<&str>,
    ) -> CatalogResult<Pagination<Sheet>> {
        let sort = SortKey::parse(&request.sort_by, SHEET_SORT_COLUMNS, DEFAULT_SHEET_SORT)?;
        let total_rows = self.store.count_sheets(safe_composer)?;
        let window =
            PageWindow::compute(total_rows, request.limit, self.default_page_size, request.page)?;
        let rows = match window.offset {
            Some(offset) => self
                .store
                .list_sheets(sort, window.limit, offset, safe_composer)?,
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

    /// Case-insensitive substring search on titles.
    ///
    /// Blank (or all-whitespace) text is rejected with `Validation` on field
    /// `query` instead of matching every sheet; use [`CatalogManager::list`]
    /// to browse the whole catalogue.
    pub fn search(&self, text: &str) -> CatalogResult<Vec<Sheet>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CatalogError::Validation {
                field: "query",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(search::filter_by_title(self.store.all_sheets()?, text))
    }

    /// Sheets carrying exactly `tag`.
    pub fn search_by_tag(&self, tag: &str) -> CatalogResult<Vec<Sheet>> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CatalogError::EmptyTag);
        }
        Ok(search::filter_by_tag(self.store.all_sheets()?, tag))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a tag. Adding a tag that is already present changes nothing.
    pub fn append_tag(&self, safe_sheet_name: &str, tag: &str) -> CatalogResult<Sheet> {
        let mut sheet = self.find_by_safe_name(safe_sheet_name)?;
        let tags = tag_set::append(&sheet.tags, tag)
            .map_err(|e| CatalogError::from_tag_set(safe_sheet_name, e))?;
        if tags == sheet.tags {
            return Ok(sheet);
        }
        sheet.tags = tags;
        self.save(&mut sheet)?;
        Ok(sheet)
    }

    pub fn remove_tag(&self, safe_sheet_name: &str, tag: &str) -> CatalogResult<Sheet> {
        let mut sheet = self.find_by_safe_name(safe_sheet_name)?;
        sheet.tags = tag_set::remove(&sheet.tags, tag)
            .map_err(|e| CatalogError::from_tag_set(safe_sheet_name, e))?;
        self.save(&mut sheet)?;
        Ok(sheet)
    }

    pub fn update_information_text(
        &self,
        safe_sheet_name: &str,
        text: &str,
    ) -> CatalogResult<Sheet> {
        let mut sheet = self.find_by_safe_name(safe_sheet_name)?;
        sheet.information_text = text.to_string();
        self.save(&mut sheet)?;
        Ok(sheet)
    }

    fn save(&self, sheet: &mut Sheet) -> CatalogResult<()> {
        sheet.touch();
        self.store.update_sheet(sheet)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Deletes a sheet together with its PDF, its thumbnail and, when it was
    /// the composer's last sheet, the composer row.
    ///
    /// File removal problems are logged and do not stop the delete. Only a
    /// failure to delete the row itself aborts. Returns the number of rows
    /// deleted.
    pub fn delete(&self, safe_sheet_name: &str) -> CatalogResult<usize> {
        let sheet = self.find_by_safe_name(safe_sheet_name)?;

        let pdf_path = self
            .assets
            .pdf_path(&sheet.safe_composer, &sheet.safe_sheet_name);
        let thumbnail_path = self.assets.thumbnail_path(&sheet.safe_sheet_name);
        for (kind, path) in [("PDF", pdf_path), ("thumbnail", thumbnail_path)] {
            let path = match path {
                Ok(path) => path,
                Err(e) => {
                    warn!("Cannot locate {} of {}: {}", kind, safe_sheet_name, e);
                    continue;
                }
            };
            match self.assets.remove(&path) {
                Ok(RemoveOutcome::Removed) => debug!("Removed {} {:?}", kind, path),
                Ok(RemoveOutcome::Missing) => {
                    info!("{} {:?} was already missing", kind, path)
                }
                Err(e) => warn!("Failed to remove {} of {}: {}", kind, safe_sheet_name, e),
            }
        }

        let composer = sheet.safe_composer.as_str();
        match self
            .composers
            .collect_if_orphaned(composer, Some(safe_sheet_name))
        {
            Ok(true) => self.remove_composer_dir(composer),
            Ok(false) => {}
            Err(e) => warn!("Orphan check for composer {} failed: {}", composer, e),
        }

        let deleted = self.store.delete_sheet(safe_sheet_name)?;
        info!("Deleted sheet {} ({} row)", safe_sheet_name, deleted);
        Ok(deleted)
    }
}
