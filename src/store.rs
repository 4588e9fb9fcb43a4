//! File-backed persistence for graph snapshots.
//!
//! `IndexStore` keeps a single snapshot under a fixed file name inside
//! its directory. Writes go to a temp file and rename into place, so a
//! crash mid-save leaves the previous snapshot intact. The store only
//! ever reads a snapshot the graph produced while mutations were paused;
//! it never touches a live graph.

use crate::graph::HnswGraph;
use crate::serialization::SnapshotError;
use crate::types::VectorElement;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed file name the snapshot lives under.
pub const INDEX_FILE_NAME: &str = "index.hnsw";

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store is not initialized")]
    NotReady,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A directory-backed snapshot store.
///
/// Every operation after `close` fails with [`StoreError::NotReady`].
pub struct IndexStore {
    root: Option<PathBuf>,
}

impl IndexStore {
    /// Open (and create if needed) the store directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let root = dir.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root: Some(root) })
    }

    /// Whether the store is usable.
    pub fn is_open(&self) -> bool {
        self.root.is_some()
    }

    /// Persist a snapshot of the graph, replacing any prior one.
    pub fn save_index<T: VectorElement>(&self, graph: &HnswGraph<T>) -> Result<(), StoreError> {
        let root = self.root()?;
        let path = root.join(INDEX_FILE_NAME);
        let tmp_path = root.join(format!("{INDEX_FILE_NAME}.tmp"));

        let file = fs::File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        graph.save(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load the stored snapshot, or `None` when none has been saved.
    pub fn load_index<T: VectorElement>(&self) -> Result<Option<HnswGraph<T>>, StoreError> {
        let path = self.root()?.join(INDEX_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(HnswGraph::load_from_file(path)?))
    }

    /// Remove the stored snapshot, if any.
    pub fn delete_index(&self) -> Result<(), StoreError> {
        let path = self.root()?.join(INDEX_FILE_NAME);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Close the store. Further operations fail with `NotReady`.
    pub fn close(&mut self) -> Result<(), StoreError> {
        if self.root.take().is_none() {
            return Err(StoreError::NotReady);
        }
        Ok(())
    }

    fn root(&self) -> Result<&Path, StoreError> {
        self.root.as_deref().ok_or(StoreError::NotReady)
    }
}
