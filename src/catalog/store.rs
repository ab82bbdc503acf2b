use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::spacetrack::{ElementSource, ProviderError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog snapshot IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog download failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("catalog is empty")]
    Empty,
}

/// Local snapshot of the satellite catalog.
///
/// Read once at startup and never written again unless refreshed.
pub struct CatalogStore {
    path: PathBuf,
    entries: Vec<CatalogEntry>,
}

impl CatalogStore {
    /// Load an existing snapshot.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&content)?;
        let entries = drop_duplicate_ids(entries);
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        log::info!(
            "Loaded {} catalog entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self { path, entries })
    }

    /// Load the snapshot at `path`, downloading it first if it does not exist.
    pub fn open_or_fetch<S: ElementSource + ?Sized>(
        path: impl Into<PathBuf>,
        source: &S,
    ) -> Result<Self, CatalogError> {
        let path = path.into();
        if path.is_file() {
            return Self::load(path);
        }

        log::info!("No catalog snapshot at {}, downloading", path.display());
        let mut store = Self {
            path,
            entries: Vec::new(),
        };
        store.refresh(source)?;
        Ok(store)
    }

    /// Replace the snapshot with a fresh provider listing.
    ///
    /// The current entries and file are kept if the download fails.
    pub fn refresh<S: ElementSource + ?Sized>(&mut self, source: &S) -> Result<usize, CatalogError> {
        let entries = drop_duplicate_ids(source.fetch_catalog()?);
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        write_snapshot(&self.path, &entries)?;
        self.entries = entries;
        log::info!(
            "Stored {} catalog entries in {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(self.entries.len())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn drop_duplicate_ids(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let fresh = seen.insert(entry.norad_id);
            if !fresh {
                log::warn!(
                    "Dropping duplicate catalog id {} ({})",
                    entry.norad_id,
                    entry.name
                );
            }
            fresh
        })
        .collect()
}

fn write_snapshot(path: &Path, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // temp sibling, renamed into place
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, serde_json::to_string_pretty(entries)?)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct FakeProvider {
        listing: Result<Vec<CatalogEntry>, u16>,
        calls: Cell<u32>,
    }

    impl FakeProvider {
        fn with(listing: Result<Vec<CatalogEntry>, u16>) -> Self {
            Self {
                listing,
                calls: Cell::new(0),
            }
        }
    }

    impl ElementSource for FakeProvider {
        fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            self.listing.clone().map_err(ProviderError::Status)
        }

        fn fetch_latest_elements(&self, _norad_id: u32) -> Result<String, ProviderError> {
            Err(ProviderError::Status(404))
        }
    }

    fn listing() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("STARLINK-1", 60001),
            CatalogEntry::new("ISS (ZARYA)", 25544),
        ]
    }

    #[test]
    fn test_fetches_and_persists_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog").join("satellitelist.json");
        let provider = FakeProvider::with(Ok(listing()));

        let store = CatalogStore::open_or_fetch(&path, &provider).unwrap();
        assert_eq!(store.entries(), listing().as_slice());
        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());

        // Second open reads the snapshot instead of the provider.
        let reopened = CatalogStore::open_or_fetch(&path, &provider).unwrap();
        assert_eq!(reopened.entries(), listing().as_slice());
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_missing_snapshot_and_failed_download() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("satellitelist.json");
        let provider = FakeProvider::with(Err(503));

        let err = CatalogStore::open_or_fetch(&path, &provider).err().unwrap();
        assert!(matches!(err, CatalogError::Provider(ProviderError::Status(503))));
        assert!(!path.exists());
    }

    #[test]
    fn test_loads_provider_style_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("satellitelist.json");
        fs::write(
            &path,
            r#"[{"SATNAME":"ISS (ZARYA)","NORAD_CAT_ID":25544},
                {"SATNAME":"ISSPACE DEBRIS","NORAD_CAT_ID":"99001"}]"#,
        )
        .unwrap();

        let store = CatalogStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[1].norad_id, 99001);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("satellitelist.json");
        fs::write(&path, "[{\"SATNAME\": \"ISS\"").unwrap();
        assert!(matches!(
            CatalogStore::load(&path),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let entries = vec![
            CatalogEntry::new("ISS (ZARYA)", 25544),
            CatalogEntry::new("ISS DUPLICATE", 25544),
            CatalogEntry::new("AO-91", 43017),
        ];
        let kept = drop_duplicate_ids(entries);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "ISS (ZARYA)");
    }

    #[test]
    fn test_failed_refresh_keeps_previous_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("satellitelist.json");
        let mut store =
            CatalogStore::open_or_fetch(&path, &FakeProvider::with(Ok(listing()))).unwrap();

        let err = store.refresh(&FakeProvider::with(Ok(Vec::new()))).unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
        assert_eq!(store.len(), 2);
        assert_eq!(CatalogStore::load(&path).unwrap().len(), 2);
    }
}
