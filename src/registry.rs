use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Local};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::data::coerce::coerce;
use crate::data::model::Dataset;
use crate::data::reader::read_table;
use crate::error::{LoadError, NotLoaded};

// ---------------------------------------------------------------------------
// Snapshot – every dataset as of one successful reload
// ---------------------------------------------------------------------------

/// Immutable view of all configured datasets.  Replaced wholesale by the next
/// successful reload, never modified.
#[derive(Debug)]
pub struct Snapshot {
    datasets: BTreeMap<String, Dataset>,
    loaded_at: DateTime<Local>,
}

impl Snapshot {
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }

    pub fn loaded_at(&self) -> DateTime<Local> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns the current snapshot and knows how to rebuild it.
///
/// Build one per process and hand it to whatever renders the dashboard.
pub struct Registry {
    catalog: Catalog,
    config: Config,
    /// `None` until the first successful reload.
    current: RwLock<Option<Arc<Snapshot>>>,
    /// Serializes reloads; a second trigger waits for the first.
    reload_lock: Mutex<()>,
}

impl Registry {
    pub fn new(catalog: Catalog, config: Config) -> Self {
        Self {
            catalog,
            config,
            current: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Re-read every dataset and publish them together.
    ///
    /// On the first failing dataset nothing is published: whatever snapshot
    /// was current stays current.
    pub fn reload(&self) -> Result<Arc<Snapshot>, LoadError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());
        log::info!(
            "reloading {} datasets from {}",
            self.catalog.len(),
            self.config.data_dir.display()
        );

        let snapshot = match self.load_all() {
            Ok(s) => Arc::new(s),
            Err(e) => {
                log::warn!("reload aborted, keeping previous snapshot: {e}: {}", e.kind);
                return Err(e);
            }
        };

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&snapshot));
        log::info!("published snapshot loaded at {}", snapshot.loaded_at());
        Ok(snapshot)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, NotLoaded> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(NotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_ok()
    }

    fn load_all(&self) -> Result<Snapshot, LoadError> {
        let timeout = self.config.read_timeout();
        let mut datasets = BTreeMap::new();

        for spec in self.catalog.iter() {
            let path = spec.path_in(&self.config.data_dir);
            let raw = read_table(&path, &spec.expected_header(), timeout)
                .map_err(|kind| LoadError::new(&spec.name, kind))?;
            let dataset =
                coerce(&spec.name, raw, &spec.schema).map_err(|kind| LoadError::new(&spec.name, kind))?;
            log::debug!("loaded '{}': {} rows", spec.name, dataset.len());
            datasets.insert(spec.name.clone(), dataset);
        }

        Ok(Snapshot {
            datasets,
            loaded_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::catalog::DatasetSpec;
    use crate::data::model::{ColumnType, Schema};
    use crate::error::LoadErrorKind;

    fn two_dataset_catalog() -> Catalog {
        Catalog::new(vec![
            DatasetSpec::new(
                "a",
                "a.csv",
                Schema::new([("name", ColumnType::Text), ("n", ColumnType::Integer)]),
            ),
            DatasetSpec::new("b", "b.csv", Schema::new([("x", ColumnType::Real)])),
        ])
    }

    fn write(dir: &Path, file: &str, text: &str) {
        fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn snapshot_before_reload_is_not_loaded() {
        let registry = Registry::new(two_dataset_catalog(), Config::default());
        assert_eq!(registry.snapshot().unwrap_err(), NotLoaded);
        assert!(!registry.is_loaded());
    }

    #[test]
    fn failed_first_reload_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "name,n\nx,1\n");
        let registry = Registry::new(two_dataset_catalog(), Config::with_data_dir(dir.path()));

        let err = registry.reload().unwrap_err();
        assert_eq!(err.dataset, "b");
        assert!(matches!(err.kind, LoadErrorKind::SourceNotFound { .. }));
        assert!(registry.snapshot().is_err());
    }

    #[test]
    fn reload_publishes_all_datasets() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "name,n\nx,1\ny,2\n");
        write(dir.path(), "b.csv", "x\n0.5\n");
        let registry = Registry::new(two_dataset_catalog(), Config::with_data_dir(dir.path()));

        let loaded = registry.reload().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dataset("a").unwrap().len(), 2);
        assert!(Arc::ptr_eq(&loaded, &registry.snapshot().unwrap()));
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "name,n\nx,1\n");
        write(dir.path(), "b.csv", "x\n0.5\n");
        let registry = Registry::new(two_dataset_catalog(), Config::with_data_dir(dir.path()));
        let first = registry.reload().unwrap();

        write(dir.path(), "a.csv", "name,n\nx,1\ny,2\nz,3\n");
        write(dir.path(), "b.csv", "x\nnot-a-number\n");
        let err = registry.reload().unwrap_err();
        assert_eq!(err.dataset, "b");
        assert!(matches!(err.kind, LoadErrorKind::TypeCoercionError { .. }));

        let current = registry.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.dataset("a").unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn hung_file_fails_reload_and_keeps_previous_snapshot() {
        use crate::data::reader::{make_fifo, release_fifo};

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "name,n\nx,1\n");
        write(dir.path(), "b.csv", "x\n0.5\n");
        let mut config = Config::with_data_dir(dir.path());
        config.read_timeout_ms = 200;
        let registry = Registry::new(two_dataset_catalog(), config);
        let first = registry.reload().unwrap();

        let hung = dir.path().join("b.csv");
        fs::remove_file(&hung).unwrap();
        make_fifo(&hung);

        let err = registry.reload().unwrap_err();
        assert_eq!(err.dataset, "b");
        match &err.kind {
            LoadErrorKind::SourceNotFound { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Arc::ptr_eq(&first, &registry.snapshot().unwrap()));

        release_fifo(&hung);
    }
}
