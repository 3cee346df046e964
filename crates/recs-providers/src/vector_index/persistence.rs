//! Snapshot file codec
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! u32            header length H
//! H bytes        JSON header {format_version, kind, dimensions, count, created_at}
//! count × u64    item ids
//! count × D × f32 vector components, row-major
//! ```
//!
//! Decoding validates the header against the payload before anything is
//! published; every inconsistency is [`Error::IndexCorrupt`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use recs_domain::constants::{INDEX_SNAPSHOT_FORMAT_VERSION, INDEX_SNAPSHOT_NORM_TOLERANCE};
use recs_domain::error::{Error, Result};
use recs_domain::value_objects::ItemId;
use recs_domain::value_objects::embedding::is_unit_norm_within;
use serde::{Deserialize, Serialize};

use super::snapshot::Segment;
use crate::constants::{
    INDEX_BYTES_PER_DIMENSION, INDEX_BYTES_PER_ID, INDEX_HEADER_LEN_BYTES, INDEX_MAX_DIMENSIONS,
    INDEX_MAX_HEADER_BYTES, INDEX_TEMP_SUFFIX,
};

/// JSON header of a snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Codec version
    pub format_version: u32,
    /// Index kind name at write time
    pub kind: String,
    /// Vector dimension
    pub dimensions: usize,
    /// Number of vectors
    pub count: usize,
    /// Write time
    pub created_at: DateTime<Utc>,
}

/// Serialize a segment into snapshot bytes
pub(crate) fn encode(segment: &Segment, kind: &str) -> Result<Vec<u8>> {
    let header = SnapshotHeader {
        format_version: INDEX_SNAPSHOT_FORMAT_VERSION,
        kind: kind.to_string(),
        dimensions: segment.dims(),
        count: segment.len(),
        created_at: Utc::now(),
    };
    let header_bytes = serde_json::to_vec(&header)?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| Error::internal("snapshot header too large"))?;

    let payload = segment.len() * (INDEX_BYTES_PER_ID + segment.dims() * INDEX_BYTES_PER_DIMENSION);
    let mut bytes = Vec::with_capacity(INDEX_HEADER_LEN_BYTES + header_bytes.len() + payload);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(&header_bytes);
    for (id, _) in segment.iter() {
        bytes.extend_from_slice(&id.get().to_le_bytes());
    }
    for (_, vector) in segment.iter() {
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(bytes)
}

/// Parse and validate snapshot bytes
pub(crate) fn decode(bytes: &[u8]) -> Result<(SnapshotHeader, Segment)> {
    let Some((len_bytes, rest)) = bytes.split_first_chunk::<INDEX_HEADER_LEN_BYTES>() else {
        return Err(Error::index_corrupt("file shorter than header length prefix"));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if header_len > INDEX_MAX_HEADER_BYTES || header_len > rest.len() {
        return Err(Error::index_corrupt(format!(
            "header length {header_len} exceeds file size"
        )));
    }
    let (header_bytes, payload) = rest.split_at(header_len);
    let header: SnapshotHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| Error::index_corrupt(format!("unreadable header: {e}")))?;

    if header.format_version != INDEX_SNAPSHOT_FORMAT_VERSION {
        return Err(Error::index_corrupt(format!(
            "unsupported format version {}",
            header.format_version
        )));
    }
    if header.dimensions == 0 || header.dimensions > INDEX_MAX_DIMENSIONS {
        return Err(Error::index_corrupt(format!(
            "header declares unsupported dimension {}",
            header.dimensions
        )));
    }

    let row = header
        .dimensions
        .checked_mul(INDEX_BYTES_PER_DIMENSION)
        .ok_or_else(|| Error::index_corrupt("header dimension overflows"))?;
    let expected = row
        .checked_add(INDEX_BYTES_PER_ID)
        .and_then(|entry| header.count.checked_mul(entry))
        .ok_or_else(|| Error::index_corrupt("header count overflows"))?;
    if payload.len() != expected {
        return Err(Error::index_corrupt(format!(
            "payload is {} bytes, header declares {} vectors of dimension {} ({} bytes)",
            payload.len(),
            header.count,
            header.dimensions,
            expected
        )));
    }

    let (id_bytes, vector_bytes) = payload.split_at(header.count * INDEX_BYTES_PER_ID);
    let mut seen = HashSet::with_capacity(header.count);
    let mut segment = Segment::with_capacity(header.dimensions, header.count);
    let mut vector = Vec::with_capacity(header.dimensions);
    for (id_chunk, row_chunk) in id_bytes
        .chunks_exact(INDEX_BYTES_PER_ID)
        .zip(vector_bytes.chunks_exact(row))
    {
        let mut raw = [0u8; INDEX_BYTES_PER_ID];
        raw.copy_from_slice(id_chunk);
        let id = ItemId(u64::from_le_bytes(raw));
        if !seen.insert(id) {
            return Err(Error::index_corrupt(format!("duplicate item id {id}")));
        }

        vector.clear();
        for c in row_chunk.chunks_exact(INDEX_BYTES_PER_DIMENSION) {
            vector.push(f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        }
        if vector.iter().any(|v| !v.is_finite())
            || !is_unit_norm_within(&vector, INDEX_SNAPSHOT_NORM_TOLERANCE)
        {
            return Err(Error::index_corrupt(format!(
                "vector of item {id} is not unit length"
            )));
        }
        segment.upsert(id, &vector);
    }
    Ok((header, segment))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(INDEX_TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write bytes to a sibling temp file, then rename over `path`
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::io_with_source(format!("Failed to create {}", parent.display()), e)
        })?;
    }
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| Error::io_with_source(format!("Failed to write {}", tmp.display()), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::io_with_source(format!("Failed to publish {}", path.display()), e))
}

/// Read a whole snapshot file
pub(crate) async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| Error::io_with_source(format!("Failed to read {}", path.display()), e))
}
