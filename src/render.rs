// src/render.rs

//! Text, YAML and JSON renderings of tables and file metadata.

use anyhow::{Context, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::{Alignment, Padding, Style};

use crate::inspect::{FileMetadata, RowGroupSummary};
use crate::table::{Schema, Table};

const NULL_CELL: &str = "null";
/// Spaces between grid columns.
const CELL_GAP: usize = 2;

/// `1234567` → `"1,234,567"`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Right-aligned grid with a leading row index, one line per row.
pub fn render_table(table: &Table) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::new()];
    header.extend(table.column_names().iter().cloned());
    builder.push_record(header);

    for (i, row) in table.rows().enumerate() {
        let mut line = vec![i.to_string()];
        line.extend(row.into_iter().map(|c| c.unwrap_or_else(|| NULL_CELL.to_string())));
        builder.push_record(line);
    }

    let mut grid = builder.build();
    grid.with(Style::empty())
        .with(Padding::new(0, CELL_GAP, 0, 0))
        .with(Alignment::right());

    let mut out = String::new();
    for line in grid.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    if table.num_rows() == 0 {
        out.push_str("(0 rows)\n");
    }
    out
}

pub fn render_info_text(meta: &FileMetadata) -> String {
    let mut out = format!(
        "=== File Info ===\n\
         Path: {}\n\
         Rows: {}\n\
         Columns: {}\n\
         Row Groups: {}\n\
         Compression: {}\n\
         Created By: {}\n\
         \n\
         === Schema ===\n",
        meta.path.display(),
        format_count(meta.rows),
        meta.columns,
        meta.row_groups,
        meta.compression,
        meta.created_by,
    );
    for field in &meta.schema.fields {
        out.push_str(&format!("  {}: {}\n", field.name, field.logical_type));
    }
    out
}

pub fn render_info_yaml(meta: &FileMetadata) -> Result<String> {
    serde_yaml::to_string(&InfoDocument::from(meta)).context("serializing file info as YAML")
}

pub fn render_info_json(meta: &FileMetadata) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&InfoDocument::from(meta))
        .context("serializing file info as JSON")?;
    text.push('\n');
    Ok(text)
}

/// `{file: {...}, schema: {name: type}, row_group_details: [...]}`
#[derive(Serialize)]
struct InfoDocument<'a> {
    file: FileSection<'a>,
    schema: SchemaMap<'a>,
    row_group_details: &'a [RowGroupSummary],
}

#[derive(Serialize)]
struct FileSection<'a> {
    path: String,
    rows: u64,
    columns: usize,
    row_groups: usize,
    compression: &'a str,
    created_by: &'a str,
    size_bytes: u64,
}

impl<'a> From<&'a FileMetadata> for InfoDocument<'a> {
    fn from(meta: &'a FileMetadata) -> Self {
        InfoDocument {
            file: FileSection {
                path: meta.path.display().to_string(),
                rows: meta.rows,
                columns: meta.columns,
                row_groups: meta.row_groups,
                compression: &meta.compression,
                created_by: &meta.created_by,
                size_bytes: meta.size_bytes,
            },
            schema: SchemaMap(&meta.schema),
            row_group_details: &meta.row_group_details,
        }
    }
}

/// Serializes a schema as an ordered `name: type` mapping.
struct SchemaMap<'a>(&'a Schema);

impl Serialize for SchemaMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in &self.0.fields {
            map.serialize_entry(&field.name, field.logical_type.name())?;
        }
        map.end()
    }
}
