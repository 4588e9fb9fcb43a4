//! Snapshot encoding for graphs.
//!
//! The snapshot is a versioned little-endian binary stream capturing the
//! full graph state: tuning parameters, metric, dimension, entry point,
//! and every node with its vector and per-layer adjacency. Vector
//! payloads round-trip bit-identically and neighbor lists keep their
//! stored order, so a restored graph answers queries exactly like the
//! original without any re-indexing.
//!
//! Nodes are written in ascending id order, making snapshots of equal
//! graphs byte-identical.

use crate::graph::{HnswGraph, HnswParams, DEFAULT_EF_SEARCH};
use crate::similarity::Metric;
use crate::types::{LabelType, VectorElement};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Magic number opening every snapshot ("HNSW").
pub const MAGIC_NUMBER: u32 = 0x484E_5357;

/// Current snapshot format version.
///
/// Version 1 predates the `metric` and `ef_search` fields; loading a
/// version-1 snapshot fills them with the constructor defaults.
pub const CURRENT_VERSION: u32 = 2;

/// Errors that can occur while encoding or decoding snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid magic number: expected {expected:#x}, got {got:#x}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("element type mismatch: expected type id {expected}, got {got}")]
    DataTypeMismatch { expected: u8, got: u8 },

    #[error("invalid snapshot data: {0}")]
    InvalidData(String),

    #[error("snapshot corruption: {0}")]
    Corruption(String),
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

impl<T: VectorElement> HnswGraph<T> {
    /// Write a snapshot of this graph.
    pub fn save<W: Write>(&self, writer: &mut W) -> SnapshotResult<()> {
        let params = self.params();

        write_u32(writer, MAGIC_NUMBER)?;
        write_u32(writer, CURRENT_VERSION)?;
        write_u8(writer, T::DATA_TYPE_ID)?;

        write_u64(writer, params.m as u64)?;
        write_u64(writer, params.ef_construction as u64)?;
        write_u8(writer, metric_to_u8(params.metric))?;
        write_u64(writer, params.ef_search as u64)?;

        match self.dim() {
            Some(dim) => {
                write_u8(writer, 1)?;
                write_u64(writer, dim as u64)?;
            }
            None => write_u8(writer, 0)?,
        }

        match self.entry_point() {
            Some(entry) => {
                write_u8(writer, 1)?;
                write_u64(writer, entry)?;
                let level_max = self.level_max().unwrap_or(0);
                write_u64(writer, level_max as u64)?;
            }
            None => write_u8(writer, 0)?,
        }

        let mut nodes: Vec<_> = self.nodes().collect();
        nodes.sort_by_key(|n| n.id);

        write_u64(writer, nodes.len() as u64)?;
        for node in nodes {
            write_u64(writer, node.id)?;
            write_u64(writer, node.level as u64)?;
            for &value in &node.vector {
                value.write_to(writer)?;
            }
            for layer in 0..node.layer_count() {
                let neighbors = node.neighbors(layer);
                write_u64(writer, neighbors.len() as u64)?;
                for &neighbor in neighbors {
                    write_u64(writer, neighbor)?;
                }
            }
        }

        Ok(())
    }

    /// Restore a graph from a snapshot.
    ///
    /// The stored adjacency is trusted as-is (no re-indexing); the entry
    /// point, hierarchy height, and every neighbor reference are checked
    /// before the graph is handed back.
    pub fn load<R: Read>(reader: &mut R) -> SnapshotResult<Self> {
        let magic = read_u32(reader)?;
        if magic != MAGIC_NUMBER {
            return Err(SnapshotError::InvalidMagicNumber {
                expected: MAGIC_NUMBER,
                got: magic,
            });
        }

        let version = read_u32(reader)?;
        if version == 0 || version > CURRENT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let data_type = read_u8(reader)?;
        if data_type != T::DATA_TYPE_ID {
            return Err(SnapshotError::DataTypeMismatch {
                expected: T::DATA_TYPE_ID,
                got: data_type,
            });
        }

        let m = read_u64(reader)? as usize;
        let ef_construction = read_u64(reader)? as usize;

        // Version 1 predates these; fall back to constructor defaults.
        let (metric, ef_search) = if version >= 2 {
            (metric_from_u8(read_u8(reader)?)?, read_u64(reader)? as usize)
        } else {
            (Metric::Cosine, DEFAULT_EF_SEARCH)
        };

        let dim = match read_u8(reader)? {
            0 => None,
            _ => Some(read_u64(reader)? as usize),
        };

        let entry = match read_u8(reader)? {
            0 => None,
            _ => {
                let id = read_u64(reader)?;
                let level_max = read_u64(reader)? as usize;
                Some((id, level_max))
            }
        };

        let count = read_u64(reader)? as usize;
        if count > 0 && dim.is_none() {
            return Err(SnapshotError::InvalidData(
                "snapshot has nodes but no dimension".into(),
            ));
        }

        let mut nodes: HashMap<LabelType, crate::graph::Node<T>> =
            HashMap::with_capacity(count);
        let dim_len = dim.unwrap_or(0);

        for _ in 0..count {
            let id = read_u64(reader)?;
            let level = read_u64(reader)? as usize;

            let mut vector = vec![T::zero(); dim_len];
            for value in &mut vector {
                *value = T::read_from(reader)?;
            }

            let mut neighbors = Vec::with_capacity(level + 1);
            for _ in 0..=level {
                let len = read_u64(reader)? as usize;
                let mut layer = Vec::with_capacity(len);
                for _ in 0..len {
                    layer.push(read_u64(reader)?);
                }
                neighbors.push(layer);
            }

            if nodes
                .insert(id, crate::graph::Node::from_parts(id, level, vector, neighbors))
                .is_some()
            {
                return Err(SnapshotError::Corruption(format!(
                    "node {id} appears twice in the snapshot"
                )));
            }
        }

        let entry_point = match entry {
            Some((id, level_max)) => {
                let Some(entry_node) = nodes.get(&id) else {
                    return Err(SnapshotError::Corruption(format!(
                        "entry point {id} is not among the stored nodes"
                    )));
                };
                if entry_node.level != level_max {
                    return Err(SnapshotError::Corruption(format!(
                        "entry point {id} has level {}, snapshot says {level_max}",
                        entry_node.level
                    )));
                }
                if let Some(above) = nodes.values().find(|n| n.level > level_max) {
                    return Err(SnapshotError::Corruption(format!(
                        "node {} has level {} above the entry point's {level_max}",
                        above.id, above.level
                    )));
                }
                Some(id)
            }
            None => {
                if !nodes.is_empty() {
                    return Err(SnapshotError::Corruption(
                        "snapshot has nodes but no entry point".into(),
                    ));
                }
                None
            }
        };

        for node in nodes.values() {
            for layer in 0..node.layer_count() {
                for &neighbor in node.neighbors(layer) {
                    if !nodes.contains_key(&neighbor) {
                        return Err(SnapshotError::Corruption(format!(
                            "node {} references missing node {neighbor}",
                            node.id
                        )));
                    }
                }
            }
        }

        let params = HnswParams {
            m,
            ef_construction,
            ef_search,
            metric,
            dim,
            seed: None,
        };

        HnswGraph::from_parts(params, dim, entry_point, nodes)
            .map_err(|e| SnapshotError::InvalidData(e.to_string()))
    }

    /// Write a snapshot to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SnapshotResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        self.save(&mut writer)
    }

    /// Restore a graph from a snapshot file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SnapshotResult<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = io::BufReader::new(file);
        Self::load(&mut reader)
    }
}

// Binary I/O helpers.

#[inline]
pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

#[inline]
pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[inline]
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[inline]
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn metric_to_u8(metric: Metric) -> u8 {
    match metric {
        Metric::Cosine => 1,
        Metric::Euclidean => 2,
    }
}

fn metric_from_u8(value: u8) -> SnapshotResult<Metric> {
    match value {
        1 => Ok(Metric::Cosine),
        2 => Ok(Metric::Euclidean),
        _ => Err(SnapshotError::InvalidData(format!(
            "invalid metric value: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HnswParams;
    use std::io::Cursor;

    fn sample_graph() -> HnswGraph<f32> {
        let mut graph = HnswGraph::new(
            HnswParams::new(Metric::Euclidean)
                .with_m(4)
                .with_ef_construction(32)
                .with_ef_search(16)
                .with_seed(11),
        )
        .unwrap();
        for i in 0..40u64 {
            let x = (i as f32 * 0.13).fract();
            let y = (i as f32 * 0.29).fract();
            graph.add_point(i, &[x, y, 1.0]).unwrap();
        }
        graph
    }

    #[test]
    fn test_snapshot_roundtrip_exact() {
        let graph = sample_graph();

        let mut buffer = Vec::new();
        graph.save(&mut buffer).unwrap();

        let loaded = HnswGraph::<f32>::load(&mut Cursor::new(buffer)).unwrap();
        loaded.validate().unwrap();

        assert_eq!(loaded.len(), graph.len());
        assert_eq!(loaded.dim(), graph.dim());
        assert_eq!(loaded.metric(), graph.metric());
        assert_eq!(loaded.ef_search(), graph.ef_search());
        assert_eq!(loaded.entry_point(), graph.entry_point());
        assert_eq!(loaded.level_max(), graph.level_max());

        for i in 0..40u64 {
            assert_eq!(loaded.get_vector(i), graph.get_vector(i));
            let level = graph.get_level(i).unwrap();
            assert_eq!(loaded.get_level(i), Some(level));
            for layer in 0..=level {
                assert_eq!(loaded.get_neighbors(i, layer), graph.get_neighbors(i, layer));
            }
        }

        for k in [1usize, 5, 17] {
            let q = [0.4f32, 0.6, 1.0];
            assert_eq!(
                loaded.search_knn(&q, k, None).unwrap(),
                graph.search_knn(&q, k, None).unwrap()
            );
        }
    }

    #[test]
    fn test_snapshot_stable_bytes() {
        let graph = sample_graph();
        let mut a = Vec::new();
        let mut b = Vec::new();
        graph.save(&mut a).unwrap();
        graph.save(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_graph_roundtrip() {
        let graph = HnswGraph::<f64>::new(HnswParams::default()).unwrap();
        let mut buffer = Vec::new();
        graph.save(&mut buffer).unwrap();

        let loaded = HnswGraph::<f64>::load(&mut Cursor::new(buffer)).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dim(), None);
        assert_eq!(loaded.entry_point(), None);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buffer = Vec::new();
        write_u32(&mut buffer, 0xDEAD_BEEF).unwrap();
        assert!(matches!(
            HnswGraph::<f32>::load(&mut Cursor::new(buffer)),
            Err(SnapshotError::InvalidMagicNumber { .. })
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut buffer = Vec::new();
        write_u32(&mut buffer, MAGIC_NUMBER).unwrap();
        write_u32(&mut buffer, CURRENT_VERSION + 1).unwrap();
        assert!(matches!(
            HnswGraph::<f32>::load(&mut Cursor::new(buffer)),
            Err(SnapshotError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_data_type_mismatch_rejected() {
        let graph = sample_graph();
        let mut buffer = Vec::new();
        graph.save(&mut buffer).unwrap();

        assert!(matches!(
            HnswGraph::<f64>::load(&mut Cursor::new(buffer)),
            Err(SnapshotError::DataTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_version_1_defaults_metric_and_ef_search() {
        // A hand-built empty version-1 snapshot: no metric or ef_search
        // fields between ef_construction and the dim flag.
        let mut buffer = Vec::new();
        write_u32(&mut buffer, MAGIC_NUMBER).unwrap();
        write_u32(&mut buffer, 1).unwrap();
        write_u8(&mut buffer, f32::DATA_TYPE_ID).unwrap();
        write_u64(&mut buffer, 8).unwrap(); // m
        write_u64(&mut buffer, 100).unwrap(); // ef_construction
        write_u8(&mut buffer, 0).unwrap(); // no dim
        write_u8(&mut buffer, 0).unwrap(); // no entry point
        write_u64(&mut buffer, 0).unwrap(); // no nodes

        let loaded = HnswGraph::<f32>::load(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(loaded.m(), 8);
        assert_eq!(loaded.ef_construction(), 100);
        assert_eq!(loaded.metric(), Metric::Cosine);
        assert_eq!(loaded.ef_search(), DEFAULT_EF_SEARCH);
    }

    #[test]
    fn test_missing_entry_node_rejected() {
        let graph = sample_graph();
        let mut buffer = Vec::new();
        graph.save(&mut buffer).unwrap();

        // Truncate the node section entirely and claim zero nodes: the
        // entry point now dangles.
        // Header: magic(4) + version(4) + type(1) + m(8) + efc(8) +
        // metric(1) + efs(8) + dim flag(1) + dim(8) + entry flag(1) +
        // entry(8) + level_max(8) = 60 bytes, then the node count.
        let mut truncated = buffer[..60].to_vec();
        write_u64(&mut truncated, 0).unwrap();

        assert!(matches!(
            HnswGraph::<f32>::load(&mut Cursor::new(truncated)),
            Err(SnapshotError::Corruption(_))
        ));
    }
}
