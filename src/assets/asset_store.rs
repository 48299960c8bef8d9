//! On-disk layout of sheet PDFs and thumbnails.
//!
//! ```text
//! <root>/sheets/uploaded-sheets/<safe_composer>/<safe_sheet_name>.pdf
//! <root>/sheets/thumbnails/<safe_sheet_name>.png
//! ```
//!
//! The asset store never touches the database.

use crate::catalog_store::{CatalogError, CatalogResult};
use crate::safe_name::is_safe_name;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SHEETS_DIR: &str = "sheets";
const UPLOADED_SHEETS_DIR: &str = "uploaded-sheets";
const THUMBNAILS_DIR: &str = "thumbnails";

/// Result of an idempotent removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Missing,
}

#[derive(Clone, Debug)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn uploaded_sheets_dir(&self) -> PathBuf {
        self.root.join(SHEETS_DIR).join(UPLOADED_SHEETS_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(SHEETS_DIR).join(THUMBNAILS_DIR)
    }

    /// Directory holding every PDF of one composer.
    pub fn composer_dir(&self, safe_composer: &str) -> CatalogResult<PathBuf> {
        check_component("safe_composer", safe_composer)?;
        Ok(self.uploaded_sheets_dir().join(safe_composer))
    }

    pub fn pdf_path(&self, safe_composer: &str, safe_sheet_name: &str) -> CatalogResult<PathBuf> {
        check_component("safe_sheet_name", safe_sheet_name)?;
        Ok(self
            .composer_dir(safe_composer)?
            .join(format!("{}.pdf", safe_sheet_name)))
    }

    pub fn thumbnail_path(&self, safe_sheet_name: &str) -> CatalogResult<PathBuf> {
        check_component("safe_sheet_name", safe_sheet_name)?;
        Ok(self
            .thumbnails_dir()
            .join(format!("{}.png", safe_sheet_name)))
    }

    /// Creates the two top-level asset directories.
    pub fn ensure_layout(&self) -> CatalogResult<()> {
        self.ensure_dir(&self.uploaded_sheets_dir())?;
        self.ensure_dir(&self.thumbnails_dir())
    }

    pub fn ensure_dir(&self, path: &Path) -> CatalogResult<()> {
        fs::create_dir_all(path).map_err(|e| CatalogError::asset_io(path, e))
    }

    /// Streams `reader` into a new file at `path`, creating parent directories.
    ///
    /// Refuses to overwrite: an existing path fails with `Conflict` before any
    /// byte is written. A partially written file is removed on failure.
    /// Returns the number of bytes written.
    pub fn write<R: Read + ?Sized>(&self, path: &Path, reader: &mut R) -> CatalogResult<u64> {
        if path.exists() {
            return Err(asset_conflict(path));
        }
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }

        // create_new closes the window between the check above and the open
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(asset_conflict(path))
            }
            Err(e) => return Err(CatalogError::asset_io(path, e)),
        };

        let written = io::copy(reader, &mut file).and_then(|n| {
            file.flush()?;
            file.sync_all()?;
            Ok(n)
        });
        match written {
            Ok(n) => {
                debug!("Wrote {} bytes to {:?}", n, path);
                Ok(n)
            }
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(path) {
                    warn!("Failed to remove partial file {:?}: {}", path, cleanup);
                }
                Err(CatalogError::asset_io(path, e))
            }
        }
    }

    /// Writes a rendered thumbnail, replacing any previous one.
    pub fn store_thumbnail(&self, safe_sheet_name: &str, png: &[u8]) -> CatalogResult<PathBuf> {
        let path = self.thumbnail_path(safe_sheet_name)?;
        self.ensure_dir(&self.thumbnails_dir())?;
        fs::write(&path, png).map_err(|e| CatalogError::asset_io(&path, e))?;
        debug!("Stored thumbnail {:?} ({} bytes)", path, png.len());
        Ok(path)
    }

    /// Removes a file. A missing file is not an error.
    pub fn remove(&self, path: &Path) -> CatalogResult<RemoveOutcome> {
        match fs::remove_file(path) {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RemoveOutcome::Missing),
            Err(e) => Err(CatalogError::asset_io(path, e)),
        }
    }

    /// Removes `dir` if it exists and is empty. Returns whether it was removed.
    pub fn remove_dir_if_empty(&self, dir: &Path) -> CatalogResult<bool> {
        let mut entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(CatalogError::asset_io(dir, e)),
        };
        if entries.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(dir).map_err(|e| CatalogError::asset_io(dir, e))?;
        Ok(true)
    }
}

/// Rejects anything that is not a safe name before it becomes a path segment.
fn check_component(field: &'static str, component: &str) -> CatalogResult<()> {
    if !is_safe_name(component) {
        return Err(CatalogError::Validation {
            field,
            reason: format!("'{}' is not a safe path component", component),
        });
    }
    Ok(())
}

fn asset_conflict(path: &Path) -> CatalogError {
    CatalogError::Conflict {
        entity: "Asset",
        name: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn create_store() -> (AssetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (AssetStore::new(temp_dir.path()), temp_dir)
    }

    /// Fails after yielding a few bytes.
    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"%PDF");
            Ok(4)
        }
    }

    #[test]
    fn test_layout() {
        let (store, temp_dir) = create_store();
        assert_eq!(
            store.pdf_path("frederic-chopin", "etude-n-1").unwrap(),
            temp_dir
                .path()
                .join("sheets/uploaded-sheets/frederic-chopin/etude-n-1.pdf")
        );
        assert_eq!(
            store.thumbnail_path("etude-n-1").unwrap(),
            temp_dir.path().join("sheets/thumbnails/etude-n-1.png")
        );
    }

    #[test]
    fn test_rejects_unsafe_components() {
        let (store, _temp_dir) = create_store();
        assert!(matches!(
            store.pdf_path("..", "x"),
            Err(CatalogError::Validation { .. })
        ));
        assert!(store.pdf_path("unknown", "../escape").is_err());
        assert!(store.thumbnail_path("").is_err());
    }

    #[test]
    fn test_write_creates_dirs_and_refuses_overwrite() {
        let (store, _temp_dir) = create_store();
        let path = store.pdf_path("unknown", "sonata").unwrap();

        let written = store
            .write(&path, &mut Cursor::new(b"%PDF-1.7".to_vec()))
            .unwrap();
        assert_eq!(written, 8);
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");

        let second = store.write(&path, &mut Cursor::new(b"other".to_vec()));
        assert!(matches!(
            second,
            Err(CatalogError::Conflict { entity: "Asset", .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let (store, _temp_dir) = create_store();
        let path = store.pdf_path("unknown", "broken").unwrap();
        let result = store.write(&path, &mut BrokenReader { sent: false });
        assert!(matches!(result, Err(CatalogError::AssetIo { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, _temp_dir) = create_store();
        let path = store.pdf_path("unknown", "sonata").unwrap();
        store.write(&path, &mut Cursor::new(b"x".to_vec())).unwrap();

        assert_eq!(store.remove(&path).unwrap(), RemoveOutcome::Removed);
        assert_eq!(store.remove(&path).unwrap(), RemoveOutcome::Missing);
    }

    #[test]
    fn test_thumbnail_overwrite_is_allowed() {
        let (store, _temp_dir) = create_store();
        store.store_thumbnail("sonata", b"one").unwrap();
        let path = store.store_thumbnail("sonata", b"two").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"two");
    }

    #[test]
    fn test_remove_dir_if_empty() {
        let (store, _temp_dir) = create_store();
        let dir = store.composer_dir("franz-liszt").unwrap();
        assert!(!store.remove_dir_if_empty(&dir).unwrap());

        let pdf = store.pdf_path("franz-liszt", "liebestraum").unwrap();
        store.write(&pdf, &mut Cursor::new(b"x".to_vec())).unwrap();
        assert!(!store.remove_dir_if_empty(&dir).unwrap());

        store.remove(&pdf).unwrap();
        assert!(store.remove_dir_if_empty(&dir).unwrap());
        assert!(!dir.exists());
    }

    #[test]
    fn test_ensure_layout() {
        let (store, _temp_dir) = create_store();
        store.ensure_layout().unwrap();
        assert!(store.uploaded_sheets_dir().is_dir());
        assert!(store.thumbnails_dir().is_dir());
    }
}
