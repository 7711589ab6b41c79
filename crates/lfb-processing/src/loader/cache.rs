//! Parquet cache for loaded entity row-sets.
//!
//! Each entity is cached as `<dir>/<stem>.parquet` with a sidecar
//! `<stem>.sources.json` listing the sources and null markers it was built
//! with. A cache is fresh when both match and the cache file is at least as
//! new as every source. The reader for each source follows from its path, so
//! the source list also pins the format options.

use crate::error::{PipelineError, Result};
use crate::types::EntityKind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct CacheManifest {
    entity: EntityKind,
    sources: Vec<PathBuf>,
    #[serde(default)]
    null_markers: Vec<String>,
}

/// Memoizes loaded row-sets on disk.
#[derive(Debug, Clone)]
pub struct LoadCache {
    dir: PathBuf,
}

impl LoadCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the parquet file for an entity.
    pub fn path_for(&self, entity: EntityKind) -> PathBuf {
        self.dir.join(format!("{}.parquet", entity.cache_stem()))
    }

    fn manifest_path(&self, entity: EntityKind) -> PathBuf {
        self.dir.join(format!("{}.sources.json", entity.cache_stem()))
    }

    /// Read the cached row-set if it exists and is fresh for `sources` read
    /// with `null_markers`.
    pub fn read_if_fresh(
        &self,
        entity: EntityKind,
        sources: &[PathBuf],
        null_markers: &[String],
    ) -> Result<Option<DataFrame>> {
        let path = self.path_for(entity);
        if !path.is_file() {
            return Ok(None);
        }

        let manifest_path = self.manifest_path(entity);
        if !manifest_path.is_file() {
            debug!("Cache {} has no manifest", path.display());
            return Ok(None);
        }

        let manifest: CacheManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)?;
        if manifest.entity != entity || manifest.sources != sources {
            debug!("Cache {} was built from other sources", path.display());
            return Ok(None);
        }
        if manifest.null_markers != null_markers {
            debug!("Cache {} was built with other null markers", path.display());
            return Ok(None);
        }

        let cached_at = std::fs::metadata(&path)?.modified()?;
        for source in sources {
            match modified(source) {
                Some(source_at) if source_at <= cached_at => {}
                _ => {
                    debug!(
                        "Cache {} is older than {}",
                        path.display(),
                        source.display()
                    );
                    return Ok(None);
                }
            }
        }

        let file = File::open(&path)?;
        Ok(Some(ParquetReader::new(file).finish()?))
    }

    /// Write a row-set and its manifest, returning the parquet path.
    pub fn write(
        &self,
        entity: EntityKind,
        sources: &[PathBuf],
        null_markers: &[String],
        df: &mut DataFrame,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::Io(e).with_context(format!(
                "Creating cache directory {}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(entity);
        let mut file = File::create(&path)?;
        ParquetWriter::new(&mut file).finish(df)?;

        let manifest = CacheManifest {
            entity,
            sources: sources.to_vec(),
            null_markers: null_markers.to_vec(),
        };
        std::fs::write(
            self.manifest_path(entity),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        Ok(path)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::time::Duration;

    fn sample() -> DataFrame {
        df!("IncidentNumber" => ["1", "2"], "USRN" => [Some("10"), None]).unwrap()
    }

    fn markers() -> Vec<String> {
        vec!["NA".to_string()]
    }

    fn write_source(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "IncidentNumber\n1\n").unwrap();
        path
    }

    #[test]
    fn test_path_for() {
        let cache = LoadCache::new("cache");
        assert_eq!(
            cache.path_for(EntityKind::Incident),
            Path::new("cache").join("incidents.parquet")
        );
        assert_eq!(
            cache.path_for(EntityKind::Mobilisation),
            Path::new("cache").join("mobilisation.parquet")
        );
    }

    #[test]
    fn test_write_then_read_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.csv");
        let cache = LoadCache::new(dir.path().join("cache"));
        let sources = vec![source];

        let mut df = sample();
        let path = cache
            .write(EntityKind::Incident, &sources, &markers(), &mut df)
            .unwrap();
        assert!(path.is_file());

        let cached = cache
            .read_if_fresh(EntityKind::Incident, &sources, &markers())
            .unwrap()
            .expect("cache should be fresh");
        assert!(cached.equals_missing(&sample()));
    }

    #[test]
    fn test_missing_cache_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LoadCache::new(dir.path());
        let result = cache
            .read_if_fresh(EntityKind::Mobilisation, &[dir.path().join("a.csv")], &markers())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_changed_source_list_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_source(dir.path(), "a.csv");
        let b = write_source(dir.path(), "b.csv");
        let cache = LoadCache::new(dir.path().join("cache"));

        cache
            .write(EntityKind::Incident, &[a.clone()], &markers(), &mut sample())
            .unwrap();

        assert!(
            cache
                .read_if_fresh(EntityKind::Incident, &[a, b], &markers())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_newer_source_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.csv");
        let cache = LoadCache::new(dir.path().join("cache"));
        let sources = vec![source.clone()];

        cache
            .write(EntityKind::Incident, &sources, &markers(), &mut sample())
            .unwrap();

        let file = OpenOptions::new().write(true).open(&source).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(3600))
            .unwrap();

        assert!(
            cache
                .read_if_fresh(EntityKind::Incident, &sources, &markers())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_changed_null_markers_are_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.csv");
        let cache = LoadCache::new(dir.path().join("cache"));
        let sources = vec![source];

        cache
            .write(EntityKind::Incident, &sources, &markers(), &mut sample())
            .unwrap();

        assert!(
            cache
                .read_if_fresh(EntityKind::Incident, &sources, &[])
                .unwrap()
                .is_none()
        );
        assert!(
            cache
                .read_if_fresh(EntityKind::Incident, &sources, &markers())
                .unwrap()
                .is_some()
        );
    }
}
