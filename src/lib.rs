//! A small columnar table-file engine and the `parquet-tools` commands built
//! on it.

pub mod cli;
pub mod error;
pub mod format;
pub mod ingest;
pub mod inspect;
pub mod query;
pub mod render;
pub mod schema;
pub mod table;

pub use error::{EngineError, Result};
pub use format::{read_table, write_table, Compression, FileReader, WriteOptions};
pub use table::{Column, Field, LogicalType, Schema, Table, Value};
