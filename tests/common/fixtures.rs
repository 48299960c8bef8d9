//! In-process collaborators and a throwaway catalogue on disk.

#![allow(dead_code)]

use super::constants::*;
use anyhow::Result;
use sheetable_catalog::catalog_store::Sheet;
use sheetable_catalog::composer::ComposerMetadata;
use sheetable_catalog::{
    AssetStore, CatalogManager, CatalogResult, ComposerLookup, ComposerRegistry,
    SqliteCatalogStore, ThumbnailRenderer, UploadRequest,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Lookup service that knows a fixed set of composers and records queries.
#[derive(Default)]
pub struct FakeLookup {
    known: Vec<ComposerMetadata>,
    pub queries: Mutex<Vec<String>>,
    pub offline: AtomicBool,
}

impl FakeLookup {
    pub fn with_chopin() -> Self {
        Self {
            known: vec![ComposerMetadata {
                name: "Chopin".to_string(),
                complete_name: CHOPIN.to_string(),
                birth: Some("1810-01-01".to_string()),
                death: Some("1849-01-01".to_string()),
                epoch: Some("Romantic".to_string()),
                portrait: Some(CHOPIN_PORTRAIT.to_string()),
            }],
            ..Default::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl ComposerLookup for FakeLookup {
    fn search(&self, name: &str) -> Result<Vec<ComposerMetadata>> {
        self.queries.lock().unwrap().push(name.to_string());
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("lookup service unreachable");
        }
        let needle = name.to_lowercase();
        Ok(self
            .known
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.complete_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

/// Renderer answering with fixed PNG bytes, or failing on demand.
#[derive(Default)]
pub struct FakeRenderer {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl ThumbnailRenderer for FakeRenderer {
    fn render(&self, pdf_path: &Path, _safe_sheet_name: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !pdf_path.exists() {
            anyhow::bail!("PDF {:?} does not exist", pdf_path);
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("renderer answered 500");
        }
        Ok(PNG_BYTES.to_vec())
    }
}

pub struct TestCatalog {
    pub manager: CatalogManager,
    pub store: Arc<SqliteCatalogStore>,
    pub lookup: Arc<FakeLookup>,
    pub renderer: Arc<FakeRenderer>,
    pub temp_dir: TempDir,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::with_lookup(FakeLookup::with_chopin())
    }

    pub fn with_lookup(lookup: FakeLookup) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteCatalogStore::new(temp_dir.path().join("catalog.db"))
                .expect("Failed to open catalog store"),
        );
        let lookup = Arc::new(lookup);
        let renderer = Arc::new(FakeRenderer::default());

        let registry = ComposerRegistry::new(store.clone(), Some(lookup.clone()));
        let manager = CatalogManager::new(
            store.clone(),
            AssetStore::new(temp_dir.path()),
            registry,
            Some(renderer.clone()),
        );

        Self {
            manager,
            store,
            lookup,
            renderer,
            temp_dir,
        }
    }

    pub fn upload(&self, composer: &str, title: &str) -> CatalogResult<Sheet> {
        self.upload_request(&UploadRequest::new(composer, title))
    }

    pub fn upload_request(&self, request: &UploadRequest) -> CatalogResult<Sheet> {
        self.manager
            .upload(UPLOADER_ID, request, &mut Cursor::new(PDF_BYTES.to_vec()))
    }

    pub fn pdf_path(&self, safe_composer: &str, safe_sheet_name: &str) -> PathBuf {
        self.temp_dir
            .path()
            .join("sheets/uploaded-sheets")
            .join(safe_composer)
            .join(format!("{}.pdf", safe_sheet_name))
    }

    pub fn thumbnail_path(&self, safe_sheet_name: &str) -> PathBuf {
        self.temp_dir
            .path()
            .join("sheets/thumbnails")
            .join(format!("{}.png", safe_sheet_name))
    }
}
