use std::path::{Path, PathBuf};

use parquet_tools::{write_table, Column, Compression, Table, WriteOptions};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// id/name/value, five rows.
pub fn people() -> Table {
    Table::try_new(vec![
        ("id".into(), Column::from((1..=5).map(Some).collect::<Vec<Option<i64>>>())),
        (
            "name".into(),
            Column::from(vec![
                Some("Alice"),
                Some("Bob"),
                Some("Charlie"),
                Some("David"),
                Some("Eve"),
            ]),
        ),
        (
            "value".into(),
            Column::from(vec![Some(10.5), Some(20.3), Some(30.1), Some(40.7), Some(50.9)]),
        ),
    ])
    .expect("valid table")
}

/// id/value, `rows` rows, values `value_<i>`.
pub fn numbered(rows: i64) -> Table {
    Table::try_new(vec![
        ("id".into(), Column::from((0..rows).map(Some).collect::<Vec<_>>())),
        (
            "value".into(),
            Column::String((0..rows).map(|i| Some(format!("value_{i}"))).collect()),
        ),
    ])
    .expect("valid table")
}

pub fn write_file(path: &Path, table: &Table, codec: Compression) -> TestResult<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_table(path, table, &WriteOptions::default().with_compression(codec))?;
    Ok(path.to_path_buf())
}

/// Three files of three rows each, `file_0` .. `file_2`.
pub fn write_merge_inputs(dir: &Path) -> TestResult {
    std::fs::create_dir_all(dir)?;
    for i in 0..3i64 {
        let table = Table::try_new(vec![
            (
                "id".into(),
                Column::from((1..=3).map(|j| Some(i * 10 + j)).collect::<Vec<_>>()),
            ),
            (
                "name".into(),
                Column::String((1..=3).map(|j| Some(format!("name_{i}_{j}"))).collect()),
            ),
        ])?;
        write_file(&dir.join(format!("file_{i}.parquet")), &table, Compression::Snappy)?;
    }
    Ok(())
}

pub const SIMPLE_CSV: &str = "id,name,value\n1,Alice,10.5\n2,Bob,20.3\n3,Charlie,30.1\n";
