//! The on-disk columnar layout: codecs, chunk encoding, footer, and the
//! reader/writer pair built on them.

pub mod compression;
pub mod encoding;
pub mod footer;
pub mod reader;
pub mod writer;

pub use compression::Compression;
pub use footer::{ColumnChunkMeta, Footer, RowGroupMeta};
pub use reader::{read_head, read_table, FileReader};
pub use writer::{encode_table, write_table, WriteOptions};
