// src/query.rs

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::table::{Column, LogicalType, Table};

/// Name the input table is registered under.
pub const TABLE_NAME: &str = "data";

/// Run `sql` against `table`, exposed as `data`, and collect the result set.
///
/// The connection is in-memory and lives only for this call. Result column
/// types are recovered from the source column when a result column is a
/// plain column reference, and inferred from the returned values otherwise:
/// integers only → int64, any real → float64, anything textual → string.
#[instrument(level = "debug", skip_all, fields(rows = table.num_rows(), columns = table.num_columns()))]
pub fn run_query(table: &Table, sql: &str) -> Result<Table> {
    if table.num_columns() == 0 {
        return Err(EngineError::QueryError(
            "input table has no columns".to_string(),
        ));
    }

    let mut conn = Connection::open_in_memory()?;
    load_table(&mut conn, table)?;

    let mut stmt = conn.prepare(sql)?;
    let names = dedupe_names(stmt.column_names().into_iter().map(String::from).collect());
    let declared: Vec<Option<LogicalType>> = stmt
        .columns()
        .iter()
        .map(|c| c.decl_type().and_then(logical_from_decl))
        .collect();

    let width = names.len();
    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); width];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, slot) in cells.iter_mut().enumerate() {
            slot.push(Cell::from(row.get_ref(i)?));
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .zip(declared)
        .map(|((name, values), decl)| (name, build_column(values, decl)))
        .collect();
    let result = Table::try_new(columns)?;
    debug!(rows = result.num_rows(), columns = result.num_columns(), "query finished");
    Ok(result)
}

/// `CREATE TABLE data (...)` then insert every row in one transaction.
fn load_table(conn: &mut Connection, table: &Table) -> Result<()> {
    let column_defs: Vec<String> = table
        .iter()
        .map(|(name, col)| format!("{} {}", quote_ident(name), decl_for(col.logical_type())))
        .collect();
    conn.execute(
        &format!("CREATE TABLE {} ({})", quote_ident(TABLE_NAME), column_defs.join(", ")),
        [],
    )?;

    let placeholders: Vec<String> = (1..=table.num_columns()).map(|i| format!("?{i}")).collect();
    let insert = format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(TABLE_NAME),
        placeholders.join(", ")
    );

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&insert)?;
        let columns: Vec<&Column> = table.iter().map(|(_, c)| c).collect();
        for row in 0..table.num_rows() {
            let values = columns.iter().map(|col| to_sql(col, row));
            stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Declared SQLite type per logical type. Booleans are stored as 0/1,
/// timestamps and dates as their canonical text.
fn decl_for(ty: LogicalType) -> &'static str {
    match ty {
        LogicalType::String => "TEXT",
        LogicalType::Int64 => "INTEGER",
        LogicalType::Float64 => "REAL",
        LogicalType::Boolean => "BOOLEAN",
        LogicalType::Timestamp => "TIMESTAMP",
        LogicalType::Date => "DATE",
    }
}

fn logical_from_decl(decl: &str) -> Option<LogicalType> {
    LogicalType::ALL
        .into_iter()
        .find(|&ty| decl.eq_ignore_ascii_case(decl_for(ty)))
}

fn to_sql(column: &Column, row: usize) -> SqlValue {
    match column {
        Column::Int64(v) => v[row].map_or(SqlValue::Null, SqlValue::Integer),
        Column::Float64(v) => v[row].map_or(SqlValue::Null, SqlValue::Real),
        Column::Boolean(v) => v[row].map_or(SqlValue::Null, |b| SqlValue::Integer(b as i64)),
        _ => column
            .display_value(row)
            .map_or(SqlValue::Null, SqlValue::Text),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite happily returns `SELECT id, id`; tables need unique names.
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<ValueRef<'_>> for Cell {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Int(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Cell::Text(bytes.iter().map(|b| format!("{b:02x}")).collect()),
        }
    }
}

impl Cell {
    fn into_text(self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(i) => Some(i.to_string()),
            Cell::Real(f) => Some(f.to_string()),
            Cell::Text(s) => Some(s),
        }
    }
}

fn build_column(cells: Vec<Cell>, declared: Option<LogicalType>) -> Column {
    let inferred = infer_column(cells);
    match declared {
        Some(ty) if ty != inferred.logical_type() => inferred.cast(ty).unwrap_or(inferred),
        _ => inferred,
    }
}

fn infer_column(cells: Vec<Cell>) -> Column {
    let any_text = cells.iter().any(|c| matches!(c, Cell::Text(_)));
    let any_real = cells.iter().any(|c| matches!(c, Cell::Real(_)));
    let any_int = cells.iter().any(|c| matches!(c, Cell::Int(_)));

    if any_text || !(any_real || any_int) {
        return Column::String(cells.into_iter().map(Cell::into_text).collect());
    }
    if any_real {
        return Column::Float64(
            cells
                .into_iter()
                .map(|c| match c {
                    Cell::Int(i) => Some(i as f64),
                    Cell::Real(f) => Some(f),
                    _ => None,
                })
                .collect(),
        );
    }
    Column::Int64(
        cells
            .into_iter()
            .map(|c| match c {
                Cell::Int(i) => Some(i),
                _ => None,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::try_new(vec![
            ("id".into(), Column::from(vec![Some(1i64), Some(2), Some(3)])),
            ("name".into(), Column::from(vec![Some("Alice"), Some("Bob"), None])),
            ("score".into(), Column::from(vec![Some(1.5f64), None, Some(3.0)])),
            ("active".into(), Column::from(vec![Some(true), Some(false), Some(true)])),
            ("born".into(), Column::Date(vec![Some(0), Some(365), None])),
        ])
        .unwrap()
    }

    #[test]
    fn select_star_keeps_types() -> Result<()> {
        let table = people();
        let out = run_query(&table, "SELECT * FROM data")?;
        assert_eq!(out, table);
        Ok(())
    }

    #[test]
    fn filters_and_projections() -> Result<()> {
        let out = run_query(&people(), "SELECT name FROM data WHERE active ORDER BY id DESC")?;
        assert_eq!(out.column_names(), ["name"]);
        assert_eq!(out.column("name"), Some(&Column::from(vec![None, Some("Alice")])));
        Ok(())
    }

    #[test]
    fn expression_columns_are_inferred() -> Result<()> {
        let out = run_query(
            &people(),
            "SELECT COUNT(*) AS n, AVG(id) AS mean, MAX(name) AS last FROM data",
        )?;
        assert_eq!(out.column("n"), Some(&Column::from(vec![Some(3i64)])));
        assert_eq!(out.column("mean"), Some(&Column::from(vec![Some(2.0f64)])));
        assert_eq!(out.column("last"), Some(&Column::from(vec![Some("Bob")])));
        Ok(())
    }

    #[test]
    fn all_null_column_is_string() -> Result<()> {
        let out = run_query(&people(), "SELECT NULL AS blank FROM data")?;
        assert_eq!(out.schema().fields[0].logical_type, LogicalType::String);
        assert_eq!(out.column("blank").map(Column::null_count), Some(3));
        Ok(())
    }

    #[test]
    fn duplicate_result_names_are_suffixed() -> Result<()> {
        let out = run_query(&people(), "SELECT id, id FROM data")?;
        assert_eq!(out.column_names(), ["id", "id_1"]);
        Ok(())
    }

    #[test]
    fn bad_sql_is_a_query_error() {
        assert!(matches!(
            run_query(&people(), "SELEKT nope"),
            Err(EngineError::QueryError(_))
        ));
        assert!(matches!(
            run_query(&people(), "SELECT missing FROM data"),
            Err(EngineError::QueryError(_))
        ));
    }

    #[test]
    fn odd_column_names_are_quoted() -> Result<()> {
        let table = Table::try_new(vec![(
            "weird \"name\"".into(),
            Column::from(vec![Some(1i64)]),
        )])?;
        let out = run_query(&table, "SELECT * FROM data")?;
        assert_eq!(out, table);
        Ok(())
    }
}
