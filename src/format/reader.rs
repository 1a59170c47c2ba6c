// src/format/reader.rs

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::format::encoding::decode_column;
use crate::format::footer::{Footer, RowGroupMeta, Trailer, MAGIC, TRAILER_LEN};
use crate::table::{LogicalType, Schema, Table};

/// Random-access reader over one encoded file.
///
/// `new` reads only the leading magic, the trailer and the footer. Row data is
/// fetched when a row group is asked for.
pub struct FileReader<R> {
    inner: R,
    footer: Footer,
    file_len: u64,
}

impl FileReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => EngineError::Io(e),
        })?;
        FileReader::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> FileReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        let min_len = (MAGIC.len() + TRAILER_LEN) as u64;
        if file_len < min_len {
            return Err(EngineError::corrupt(
                file_len,
                format!("file is {file_len} bytes, shorter than the minimum {min_len}"),
            ));
        }

        // 1) leading magic
        let mut head = [0u8; 4];
        inner.seek(SeekFrom::Start(0))?;
        inner.read_exact(&mut head)?;
        if &head != MAGIC {
            return Err(EngineError::corrupt(0, "bad leading magic bytes"));
        }

        // 2) trailer
        let trailer_at = file_len - TRAILER_LEN as u64;
        let mut raw_trailer = [0u8; TRAILER_LEN];
        inner.seek(SeekFrom::Start(trailer_at))?;
        inner.read_exact(&mut raw_trailer)?;
        let trailer = Trailer::decode(&raw_trailer, trailer_at, file_len)?;

        // 3) footer
        let mut raw_footer = vec![0u8; trailer.footer_len as usize];
        inner.seek(SeekFrom::Start(trailer.footer_offset))?;
        inner.read_exact(&mut raw_footer)?;
        if crc32fast::hash(&raw_footer) != trailer.footer_crc {
            return Err(EngineError::corrupt(
                trailer.footer_offset,
                "footer checksum mismatch",
            ));
        }
        let footer = Footer::decode(&raw_footer, trailer.footer_offset)?;
        validate_chunk_ranges(&footer, trailer.footer_offset)?;

        debug!(
            rows = footer.num_rows,
            row_groups = footer.row_groups.len(),
            columns = footer.schema.len(),
            "read footer"
        );
        Ok(FileReader {
            inner,
            footer,
            file_len,
        })
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    pub fn schema(&self) -> &Schema {
        &self.footer.schema
    }

    pub fn num_rows(&self) -> u64 {
        self.footer.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.footer.row_groups.len()
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Decode a single row group.
    pub fn read_row_group(&mut self, index: usize) -> Result<Table> {
        let raw = self.fetch_row_group(index)?;
        decode_row_group(&self.footer.schema, &self.footer.row_groups[index], raw)
    }

    /// Decode every row group. Chunk bytes are read sequentially; decompression
    /// and decoding run in parallel and the results are stitched back together
    /// in row-group order.
    #[instrument(level = "debug", skip_all, fields(row_groups = self.num_row_groups()))]
    pub fn read_table(&mut self) -> Result<Table> {
        if self.footer.row_groups.is_empty() {
            return Table::empty(&self.footer.schema);
        }

        let raw = (0..self.num_row_groups())
            .map(|i| self.fetch_row_group(i))
            .collect::<Result<Vec<_>>>()?;

        let schema = &self.footer.schema;
        let tables = self
            .footer
            .row_groups
            .par_iter()
            .zip(raw)
            .map(|(meta, chunks)| decode_row_group(schema, meta, chunks))
            .collect::<Result<Vec<_>>>()?;

        Table::concat(&tables)
    }

    /// The first `n` rows. Row groups are decoded in order and reading stops
    /// as soon as enough rows are in hand.
    pub fn read_head(&mut self, n: usize) -> Result<Table> {
        let mut tables = Vec::new();
        let mut have = 0usize;
        for i in 0..self.num_row_groups() {
            if have >= n {
                break;
            }
            let table = self.read_row_group(i)?;
            have += table.num_rows();
            tables.push(table);
        }
        debug!(requested = n, row_groups_read = tables.len(), "read head");

        if tables.is_empty() {
            return Table::empty(&self.footer.schema);
        }
        Ok(Table::concat(&tables)?.slice(0, n))
    }

    fn fetch_row_group(&mut self, index: usize) -> Result<Vec<Vec<u8>>> {
        let meta = self.footer.row_groups.get(index).ok_or_else(|| {
            EngineError::InvalidTable(format!(
                "row group {index} out of range ({} row groups)",
                self.footer.row_groups.len()
            ))
        })?;

        let mut chunks = Vec::with_capacity(meta.columns.len());
        for chunk in &meta.columns {
            let mut buf = vec![0u8; chunk.compressed_len as usize];
            self.inner.seek(SeekFrom::Start(chunk.offset))?;
            self.inner.read_exact(&mut buf)?;
            chunks.push(buf);
        }
        Ok(chunks)
    }
}

/// Check the stored bytes of each chunk, inflate and decode them.
fn decode_row_group(schema: &Schema, meta: &RowGroupMeta, raw: Vec<Vec<u8>>) -> Result<Table> {
    let first_offset = meta.columns.first().map_or(0, |c| c.offset);
    let num_rows = usize::try_from(meta.num_rows).map_err(|_| {
        EngineError::corrupt(first_offset, format!("row group claims {} rows", meta.num_rows))
    })?;
    let mut columns = Vec::with_capacity(meta.columns.len());

    for ((field, chunk), stored) in schema.fields.iter().zip(&meta.columns).zip(raw) {
        if crc32fast::hash(&stored) != chunk.crc32 {
            return Err(EngineError::corrupt(
                chunk.offset,
                format!("checksum mismatch in column `{}`", field.name),
            ));
        }
        check_plain_len(field.logical_type, meta.num_rows, chunk.uncompressed_len).map_err(
            |reason| EngineError::corrupt(chunk.offset, format!("column `{}`: {reason}", field.name)),
        )?;
        let plain = chunk
            .compression
            .decompress(&stored, chunk.uncompressed_len as usize)
            .map_err(|e| EngineError::corrupt(chunk.offset, e.to_string()))?;
        if plain.len() as u64 != chunk.uncompressed_len {
            return Err(EngineError::corrupt(
                chunk.offset,
                format!(
                    "column `{}` inflated to {} bytes, footer says {}",
                    field.name,
                    plain.len(),
                    chunk.uncompressed_len
                ),
            ));
        }
        let column = decode_column(field.logical_type, num_rows, &plain).map_err(|reason| {
            EngineError::corrupt(chunk.offset, format!("column `{}`: {reason}", field.name))
        })?;
        columns.push((field.name.clone(), column));
    }

    Table::try_new(columns)
}

/// The plain size of a chunk is fixed by its type and row count, give or take
/// the validity bitmap. Strings only have a lower bound.
fn check_plain_len(
    ty: LogicalType,
    rows: u64,
    uncompressed_len: u64,
) -> std::result::Result<(), String> {
    let bitmap = rows.div_ceil(8);
    let values = match ty {
        LogicalType::Int64 | LogicalType::Timestamp | LogicalType::Float64 => rows.checked_mul(8),
        LogicalType::Date => rows.checked_mul(4),
        LogicalType::Boolean => Some(bitmap),
        LogicalType::String => rows.checked_add(1).and_then(|n| n.checked_mul(4)),
    };
    let min = values
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| format!("{rows} rows do not fit in a column chunk"))?;
    let max = match ty {
        LogicalType::String => u64::MAX,
        _ => min.saturating_add(bitmap),
    };
    if uncompressed_len < min || uncompressed_len > max {
        return Err(format!(
            "footer records {uncompressed_len} plain bytes for {rows} {ty} rows"
        ));
    }
    Ok(())
}

/// Every chunk must sit between the leading magic and the footer.
fn validate_chunk_ranges(footer: &Footer, footer_offset: u64) -> Result<()> {
    let data_start = MAGIC.len() as u64;
    for rg in &footer.row_groups {
        for chunk in &rg.columns {
            let end = chunk.offset.checked_add(chunk.compressed_len);
            if chunk.offset < data_start || end.map_or(true, |end| end > footer_offset) {
                return Err(EngineError::corrupt(
                    chunk.offset,
                    format!(
                        "column chunk {}+{} lies outside the data region",
                        chunk.offset, chunk.compressed_len
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Read a whole file.
pub fn read_table(path: &Path) -> Result<Table> {
    FileReader::open(path)?.read_table()
}

/// Read the first `n` rows of a file.
pub fn read_head(path: &Path, n: usize) -> Result<Table> {
    FileReader::open(path)?.read_head(n)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::format::compression::Compression;
    use crate::format::writer::{encode_table, WriteOptions};
    use crate::format::footer::Footer;
    use crate::table::Column;

    fn every_type() -> Table {
        Table::try_new(vec![
            ("s".into(), Column::from(vec![Some("a"), None, Some("ccc"), Some("")])),
            ("i".into(), Column::from(vec![Some(1i64), Some(-2), None, Some(4)])),
            ("f".into(), Column::from(vec![None, Some(2.5f64), Some(-0.0), Some(1e300)])),
            ("b".into(), Column::from(vec![Some(true), Some(false), None, Some(true)])),
            ("t".into(), Column::Timestamp(vec![Some(0), None, Some(-1), Some(1_705_314_600_000_000)])),
            ("d".into(), Column::Date(vec![Some(19_000), Some(-365), None, Some(0)])),
        ])
        .unwrap()
    }

    fn reader_for(table: &Table, options: &WriteOptions) -> FileReader<Cursor<Vec<u8>>> {
        FileReader::new(Cursor::new(encode_table(table, options).unwrap())).unwrap()
    }

    #[test]
    fn every_codec_round_trips_every_type() -> Result<()> {
        let table = every_type();
        for codec in Compression::ALL {
            let options = WriteOptions::default().with_compression(codec);
            let decoded = reader_for(&table, &options).read_table()?;
            assert_eq!(decoded, table, "{codec}");
        }
        Ok(())
    }

    #[test]
    fn multiple_row_groups_keep_row_order() -> Result<()> {
        let ids: Vec<Option<i64>> = (0..103).map(Some).collect();
        let table = Table::try_new(vec![("id".into(), Column::from(ids))])?;
        let options = WriteOptions::default().with_row_group_size(Some(10));

        let mut reader = reader_for(&table, &options);
        assert_eq!(reader.num_row_groups(), 11);
        assert_eq!(reader.read_table()?, table);
        assert_eq!(
            reader.read_row_group(10)?.column("id"),
            Some(&Column::from((100..103).map(Some).collect::<Vec<Option<i64>>>()))
        );
        Ok(())
    }

    #[test]
    fn head_stops_after_enough_row_groups() -> Result<()> {
        let ids: Vec<Option<i64>> = (0..30).map(Some).collect();
        let table = Table::try_new(vec![("id".into(), Column::from(ids))])?;
        let options = WriteOptions::default().with_row_group_size(Some(10));
        let mut bytes = encode_table(&table, &options)?;

        // wreck the last row group's chunk; head(15) must never look at it
        let footer = FileReader::new(Cursor::new(bytes.clone()))?.footer().clone();
        let last = &footer.row_groups[2].columns[0];
        bytes[last.offset as usize] ^= 0xff;

        let mut reader = FileReader::new(Cursor::new(bytes))?;
        let head = reader.read_head(15)?;
        assert_eq!(head, table.slice(0, 15));
        assert!(matches!(
            reader.read_table(),
            Err(EngineError::CorruptFile { offset, .. }) if offset == last.offset
        ));
        Ok(())
    }

    #[test]
    fn head_larger_than_file_returns_everything() -> Result<()> {
        let table = every_type();
        let head = reader_for(&table, &WriteOptions::default()).read_head(100)?;
        assert_eq!(head, table);
        Ok(())
    }

    #[test]
    fn empty_table_has_no_row_groups() -> Result<()> {
        let schema = every_type().schema();
        let table = Table::empty(&schema)?;
        let mut reader = reader_for(&table, &WriteOptions::default());
        assert_eq!(reader.num_row_groups(), 0);
        assert_eq!(reader.schema(), &schema);
        assert_eq!(reader.read_table()?, table);
        assert_eq!(reader.read_head(5)?.num_rows(), 0);
        Ok(())
    }

    #[test]
    fn bad_magic_is_reported_at_offset_zero() {
        let mut bytes = encode_table(&every_type(), &WriteOptions::default()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            FileReader::new(Cursor::new(bytes)),
            Err(EngineError::CorruptFile { offset: 0, .. })
        ));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let bytes = encode_table(&every_type(), &WriteOptions::default()).unwrap();
        let cut = bytes[..bytes.len() - 7].to_vec();
        let len = cut.len() as u64;
        match FileReader::new(Cursor::new(cut)) {
            Err(EngineError::CorruptFile { offset, .. }) => assert!(offset <= len),
            other => panic!("unexpected result: {:?}", other.map(|r| r.num_rows())),
        }

        assert!(matches!(
            FileReader::new(Cursor::new(b"PQTF".to_vec())),
            Err(EngineError::CorruptFile { .. })
        ));
    }

    #[test]
    fn flipped_footer_byte_fails_checksum() {
        let mut bytes = encode_table(&every_type(), &WriteOptions::default()).unwrap();
        let footer_offset = {
            let at = bytes.len() - TRAILER_LEN;
            u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
        };
        bytes[footer_offset as usize + 3] ^= 0x01;
        match FileReader::new(Cursor::new(bytes)) {
            Err(EngineError::CorruptFile { offset, reason }) => {
                assert_eq!(offset, footer_offset);
                assert!(reason.contains("checksum"), "{reason}");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.num_rows())),
        }
    }

    /// Replace the footer of `bytes` and re-seal the trailer with a valid CRC.
    fn reseal(bytes: &[u8], footer: &Footer) -> Vec<u8> {
        let at = bytes.len() - TRAILER_LEN;
        let mut raw = [0u8; TRAILER_LEN];
        raw.copy_from_slice(&bytes[at..]);
        let trailer = Trailer::decode(&raw, at as u64, bytes.len() as u64).unwrap();

        let mut out = bytes[..trailer.footer_offset as usize].to_vec();
        let footer_bytes = footer.encode();
        out.extend_from_slice(&footer_bytes);
        let resealed = Trailer {
            footer_offset: trailer.footer_offset,
            footer_len: footer_bytes.len() as u32,
            footer_crc: crc32fast::hash(&footer_bytes),
        };
        out.extend_from_slice(&resealed.encode());
        out
    }

    #[test]
    fn impossible_row_counts_are_corrupt_not_panics() {
        let bytes = encode_table(&every_type(), &WriteOptions::default()).unwrap();
        let mut footer = FileReader::new(Cursor::new(bytes.clone())).unwrap().footer().clone();
        footer.num_rows = 1 << 61;
        footer.row_groups[0].num_rows = 1 << 61;
        let first = footer.row_groups[0].columns[0].offset;

        let mut reader = FileReader::new(Cursor::new(reseal(&bytes, &footer))).unwrap();
        assert!(matches!(
            reader.read_table(),
            Err(EngineError::CorruptFile { offset, .. }) if offset == first
        ));
        assert!(matches!(reader.read_head(1), Err(EngineError::CorruptFile { .. })));
    }

    #[test]
    fn huge_uncompressed_len_is_corrupt_for_every_codec() {
        for codec in Compression::ALL {
            let options = WriteOptions::default().with_compression(codec);
            let bytes = encode_table(&every_type(), &options).unwrap();
            let mut footer = FileReader::new(Cursor::new(bytes.clone())).unwrap().footer().clone();
            let chunk = &mut footer.row_groups[0].columns[0];
            chunk.uncompressed_len = u64::MAX;
            let at = chunk.offset;

            let mut reader = FileReader::new(Cursor::new(reseal(&bytes, &footer))).unwrap();
            assert!(
                matches!(
                    reader.read_table(),
                    Err(EngineError::CorruptFile { offset, .. }) if offset == at
                ),
                "{codec}"
            );
        }
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.parquet");
        assert!(matches!(
            read_table(&missing),
            Err(EngineError::FileNotFound { path }) if path == missing
        ));
    }

    #[test]
    fn schema_comes_from_footer() {
        let reader = reader_for(&every_type(), &WriteOptions::default());
        let types: Vec<LogicalType> = reader
            .schema()
            .fields
            .iter()
            .map(|f| f.logical_type)
            .collect();
        assert_eq!(types, LogicalType::ALL.to_vec());
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn codec() -> impl Strategy<Value = Compression> {
            prop::sample::select(Compression::ALL.to_vec())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn decode_inverts_encode(
                ints in prop::collection::vec(prop::option::of(any::<i64>()), 0..64),
                words in prop::collection::vec(prop::option::of("[a-z0-9 ]{0,12}"), 0..64),
                codec in codec(),
                group in 1usize..20,
            ) {
                let n = ints.len().min(words.len());
                let table = Table::try_new(vec![
                    ("i".into(), Column::Int64(ints[..n].to_vec())),
                    ("w".into(), Column::String(words[..n].to_vec())),
                ]).unwrap();
                let options = WriteOptions::default()
                    .with_compression(codec)
                    .with_row_group_size(Some(group));

                let bytes = encode_table(&table, &options).unwrap();
                let decoded = FileReader::new(Cursor::new(bytes)).unwrap().read_table().unwrap();
                prop_assert_eq!(decoded, table);
            }
        }
    }
}
