//! In-memory tables: named, equal-length, typed columns.

pub mod cast;
pub mod column;
pub mod types;

use std::collections::HashSet;

use tracing::debug;

use crate::error::{EngineError, Result};

pub use column::Column;
pub use types::{Field, LogicalType, Schema, Value};

/// An ordered set of uniquely named columns of equal length.
///
/// Tables are never edited cell by cell: `cast`, `slice` and `concat` each
/// build a new table and leave their inputs untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking that names are unique and lengths agree.
    pub fn try_new(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        let num_rows = columns.first().map_or(0, |(_, c)| c.len());

        for (name, column) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(EngineError::InvalidTable(format!(
                    "duplicate column name `{name}`"
                )));
            }
            if column.len() != num_rows {
                return Err(EngineError::InvalidTable(format!(
                    "column `{}` has {} rows, expected {}",
                    name,
                    column.len(),
                    num_rows
                )));
            }
        }

        let (names, columns) = columns.into_iter().unzip();
        Ok(Table {
            names,
            columns,
            num_rows,
        })
    }

    /// A zero-row table with the given schema.
    pub fn empty(schema: &Schema) -> Result<Self> {
        Table::try_new(
            schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), Column::empty(f.logical_type)))
                .collect(),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.names
                .iter()
                .zip(&self.columns)
                .map(|(name, col)| Field::new(name.clone(), col.logical_type()))
                .collect(),
        )
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// `(name, column)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Hand the columns back to the caller.
    pub fn into_columns(self) -> Vec<(String, Column)> {
        self.names.into_iter().zip(self.columns).collect()
    }

    /// Canonical text of every cell, row by row. Nulls are `None`.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<String>>> + '_ {
        (0..self.num_rows).map(move |row| {
            self.columns
                .iter()
                .map(|col| col.display_value(row))
                .collect()
        })
    }

    /// Rows `[offset, offset + count)`, clipped to what is available.
    pub fn slice(&self, offset: usize, count: usize) -> Table {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| c.slice(offset, count))
            .collect();
        let num_rows = if self.columns.is_empty() {
            0
        } else {
            columns[0].len()
        };
        Table {
            names: self.names.clone(),
            columns,
            num_rows,
        }
    }

    /// Stack `tables` vertically. All inputs must share one schema (names,
    /// types and order); rows keep input order.
    pub fn concat(tables: &[Table]) -> Result<Table> {
        let first = tables.first().ok_or_else(|| {
            EngineError::InvalidTable("no tables to concatenate".to_string())
        })?;
        let expected = first.schema();

        for (idx, table) in tables.iter().enumerate().skip(1) {
            check_same_schema(idx, &expected, &table.schema())?;
        }

        let mut columns = first.columns.clone();
        for table in &tables[1..] {
            for (acc, col) in columns.iter_mut().zip(&table.columns) {
                acc.extend_from(col)?;
            }
        }

        let num_rows = tables.iter().map(Table::num_rows).sum();
        debug!(tables = tables.len(), rows = num_rows, "concatenated tables");
        Ok(Table {
            names: first.names.clone(),
            columns,
            num_rows,
        })
    }

    /// Cast every column to the type `schema` gives it. The schema must list
    /// the table's columns in order. Nothing is returned unless every column
    /// casts.
    pub fn cast(&self, schema: &Schema) -> Result<Table> {
        check_same_names(&self.names, schema)?;

        let columns = self
            .names
            .iter()
            .zip(&self.columns)
            .zip(&schema.fields)
            .map(|((name, col), field)| col.cast(field.logical_type).map_err(|e| e.in_column(name)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Table {
            names: self.names.clone(),
            columns,
            num_rows: self.num_rows,
        })
    }
}

fn check_same_names(names: &[String], schema: &Schema) -> Result<()> {
    for (i, field) in schema.fields.iter().enumerate() {
        match names.get(i) {
            Some(name) if *name == field.name => {}
            Some(name) => {
                return Err(EngineError::SchemaMismatch {
                    table: 0,
                    column: field.name.clone(),
                    reason: format!("expected column `{}` at position {i}, found `{name}`", field.name),
                })
            }
            None => {
                return Err(EngineError::SchemaMismatch {
                    table: 0,
                    column: field.name.clone(),
                    reason: "column is missing from the table".to_string(),
                })
            }
        }
    }
    if let Some(extra) = names.get(schema.len()) {
        return Err(EngineError::SchemaMismatch {
            table: 0,
            column: extra.clone(),
            reason: "column is not part of the target schema".to_string(),
        });
    }
    Ok(())
}

fn check_same_schema(table: usize, expected: &Schema, actual: &Schema) -> Result<()> {
    let width = expected.len().max(actual.len());
    for i in 0..width {
        match (expected.fields.get(i), actual.fields.get(i)) {
            (Some(e), Some(a)) if e == a => {}
            (Some(e), Some(a)) if e.name != a.name => {
                return Err(EngineError::SchemaMismatch {
                    table,
                    column: e.name.clone(),
                    reason: format!("expected column `{}` at position {i}, found `{}`", e.name, a.name),
                })
            }
            (Some(e), Some(a)) => {
                return Err(EngineError::SchemaMismatch {
                    table,
                    column: e.name.clone(),
                    reason: format!("expected type {}, found {}", e.logical_type, a.logical_type),
                })
            }
            (Some(e), None) => {
                return Err(EngineError::SchemaMismatch {
                    table,
                    column: e.name.clone(),
                    reason: "column is missing".to_string(),
                })
            }
            (None, Some(a)) => {
                return Err(EngineError::SchemaMismatch {
                    table,
                    column: a.name.clone(),
                    reason: "unexpected extra column".to_string(),
                })
            }
            (None, None) => unreachable!("index is below the wider schema's length"),
        }
    }
    Ok(())
}
