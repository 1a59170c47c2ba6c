// src/inspect.rs

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::format::{FileReader, RowGroupMeta};
use crate::table::Schema;

/// Shown when a file has no row groups or no columns to sample a codec from.
pub const UNKNOWN_COMPRESSION: &str = "unknown";

/// Everything `info` reports. Built from the trailer and footer only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub rows: u64,
    pub columns: usize,
    pub row_groups: usize,
    /// Codec of the first column chunk of the first row group.
    pub compression: String,
    pub created_by: String,
    pub size_bytes: u64,
    pub schema: Schema,
    pub row_group_details: Vec<RowGroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowGroupSummary {
    pub index: usize,
    pub rows: u64,
    pub compressed_bytes: u64,
    pub uncompressed_bytes: u64,
    /// One codec name per column, in schema order.
    pub codecs: Vec<String>,
}

impl RowGroupSummary {
    fn from_meta(index: usize, meta: &RowGroupMeta) -> Self {
        RowGroupSummary {
            index,
            rows: meta.num_rows,
            compressed_bytes: meta.compressed_size(),
            uncompressed_bytes: meta.uncompressed_size(),
            codecs: meta
                .columns
                .iter()
                .map(|c| c.compression.display_name().to_string())
                .collect(),
        }
    }
}

impl FileMetadata {
    pub fn from_reader<R: Read + Seek>(path: &Path, reader: &FileReader<R>) -> Self {
        let footer = reader.footer();
        let compression = footer
            .row_groups
            .first()
            .and_then(|rg| rg.columns.first())
            .map_or(UNKNOWN_COMPRESSION, |c| c.compression.display_name())
            .to_string();

        FileMetadata {
            path: path.to_path_buf(),
            rows: footer.num_rows,
            columns: footer.schema.len(),
            row_groups: footer.row_groups.len(),
            compression,
            created_by: footer.created_by.clone(),
            size_bytes: reader.file_len(),
            schema: footer.schema.clone(),
            row_group_details: footer
                .row_groups
                .iter()
                .enumerate()
                .map(|(i, rg)| RowGroupSummary::from_meta(i, rg))
                .collect(),
        }
    }
}

/// Read the metadata of the file at `path` without touching row data.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn inspect(path: &Path) -> Result<FileMetadata> {
    let reader = FileReader::open(path)?;
    Ok(FileMetadata::from_reader(path, &reader))
}
