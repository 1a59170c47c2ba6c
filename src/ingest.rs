// src/ingest.rs

//! CSV in and out. Ingest produces an all-`String` table (empty cells become
//! null); typing is left to schema reconciliation.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::table::{Column, Table};

/// Read a headed CSV file into a table of string columns.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read_csv(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => EngineError::Io(e),
    })?;
    read_csv_from(file)
}

pub fn read_csv_from<R: Read>(input: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(input);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in rdr.records() {
        let record = record?;
        for (slot, field) in cells.iter_mut().zip(record.iter()) {
            slot.push((!field.is_empty()).then(|| field.to_string()));
        }
    }

    let table = Table::try_new(
        headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| (name, Column::String(values)))
            .collect(),
    )?;
    debug!(rows = table.num_rows(), columns = table.num_columns(), "parsed csv");
    Ok(table)
}

/// Write `table` as CSV with a header row. Nulls become empty cells.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path)?;
    write_csv_to(file, table)
}

pub fn write_csv_to<W: Write>(out: W, table: &Table) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(out);
    wtr.write_record(table.column_names())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LogicalType;

    #[test]
    fn header_and_rows_become_string_columns() -> Result<()> {
        let table = read_csv_from("id,name\n1,Alice\n2,Bob\n".as_bytes())?;
        assert_eq!(table.column_names(), ["id", "name"]);
        assert_eq!(table.num_rows(), 2);
        assert!(table
            .schema()
            .fields
            .iter()
            .all(|f| f.logical_type == LogicalType::String));
        assert_eq!(table.column("name"), Some(&Column::from(vec![Some("Alice"), Some("Bob")])));
        Ok(())
    }

    #[test]
    fn empty_cells_are_null() -> Result<()> {
        let table = read_csv_from("a,b\n1,\n,x\n".as_bytes())?;
        assert_eq!(table.column("a"), Some(&Column::from(vec![Some("1"), None])));
        assert_eq!(table.column("b"), Some(&Column::from(vec![None, Some("x")])));
        Ok(())
    }

    #[test]
    fn header_only_file_has_no_rows() -> Result<()> {
        let table = read_csv_from("a,b\n".as_bytes())?;
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 2);
        Ok(())
    }

    #[test]
    fn ragged_rows_and_duplicate_headers_are_rejected() {
        assert!(matches!(
            read_csv_from("a,b\n1,2,3\n".as_bytes()),
            Err(EngineError::InvalidTable(_))
        ));
        assert!(matches!(
            read_csv_from("a,a\n1,2\n".as_bytes()),
            Err(EngineError::InvalidTable(_))
        ));
    }

    #[test]
    fn written_csv_quotes_and_blanks_nulls() -> Result<()> {
        let table = Table::try_new(vec![
            ("id".into(), Column::from(vec![Some(1i64), None])),
            ("note".into(), Column::from(vec![Some("a, b"), Some("plain")])),
        ])?;
        let mut out = Vec::new();
        write_csv_to(&mut out, &table)?;
        assert_eq!(String::from_utf8(out).unwrap(), "id,note\n1,\"a, b\"\n,plain\n");
        Ok(())
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_csv(&dir.path().join("nope.csv")),
            Err(EngineError::FileNotFound { .. })
        ));
    }
}
