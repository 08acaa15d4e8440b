use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{ReleaseName, Species};
use crate::error::SyncError;

#[derive(Debug, Clone)]
pub struct Store {
    data_root: Utf8PathBuf,
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new(data_dir: &str) -> Result<Self, SyncError> {
        let configured = Path::new(data_dir);
        let data_root = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            let cwd =
                std::env::current_dir().map_err(|err| SyncError::Filesystem(err.to_string()))?;
            cwd.join(configured)
        };
        let data_root = Utf8PathBuf::from_path_buf(data_root)
            .map_err(|_| SyncError::Filesystem("invalid data directory path".to_string()))?;

        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("pfocr-sync")).ok()
            })
            .ok_or_else(|| {
                SyncError::Filesystem("unable to resolve cache directory".to_string())
            })?;

        Ok(Self {
            data_root,
            cache_root,
        })
    }

    pub fn new_with_paths(data_root: Utf8PathBuf, cache_root: Utf8PathBuf) -> Self {
        Self {
            data_root,
            cache_root,
        }
    }

    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn data_path(&self, file_name: &str) -> Utf8PathBuf {
        self.data_root.join(file_name)
    }

    pub fn release_metadata_path(&self, name: &ReleaseName) -> Utf8PathBuf {
        self.data_root
            .join("metadata")
            .join("releases")
            .join(format!("{name}.json"))
    }

    pub fn gene_info_cache_path(&self, species: Species) -> Utf8PathBuf {
        self.cache_root
            .join("gene_info")
            .join(format!("{}.gene_info.gz", species.gene_info_stem()))
    }

    pub fn ensure_data_root(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.data_root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    pub fn ensure_cache_root(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    pub fn read_progress(path: &Utf8Path) -> Result<Vec<String>, SyncError> {
        if !path.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn append_progress(path: &Utf8Path, entry: &str) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        writeln!(file, "{entry}").map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    pub fn staging_file(dir: &Utf8Path) -> Result<NamedTempFile, SyncError> {
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        tempfile::Builder::new()
            .prefix("pfocr-sync")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    pub fn persist_staged(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), SyncError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        if dest.as_std_path().exists() {
            fs::remove_file(dest.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        temp.persist(dest.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn list_release_metadata(&self) -> Result<Vec<Metadata>, SyncError> {
        let metadata_root = self.data_root.join("metadata");
        if !metadata_root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for path in walk_dir(metadata_root.as_std_path())? {
            if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                let metadata: Metadata = serde_json::from_str(&content)
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                entries.push(metadata);
            }
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub file_name: String,
    pub release_date: Option<String>,
    pub url: String,
    pub downloaded_at: String,
    pub tool: String,
    pub resolved_path: String,
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
