// src/format/compression.rs

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use flate2::{read::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const ZSTD_LEVEL: i32 = 3;

/// Per-chunk compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Snappy,
    Zstd,
    Gzip,
    Lz4,
}

impl Compression {
    pub const ALL: [Compression; 5] = [
        Compression::None,
        Compression::Snappy,
        Compression::Zstd,
        Compression::Gzip,
        Compression::Lz4,
    ];

    /// The token accepted on the command line.
    pub fn token(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Snappy => "snappy",
            Compression::Zstd => "zstd",
            Compression::Gzip => "gzip",
            Compression::Lz4 => "lz4",
        }
    }

    /// The name reported by `info`.
    pub fn display_name(self) -> &'static str {
        match self {
            Compression::None => "UNCOMPRESSED",
            Compression::Snappy => "SNAPPY",
            Compression::Zstd => "ZSTD",
            Compression::Gzip => "GZIP",
            Compression::Lz4 => "LZ4",
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Snappy => 1,
            Compression::Zstd => 2,
            Compression::Gzip => 3,
            Compression::Lz4 => 4,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Compression::ALL.into_iter().find(|c| c.tag() == tag)
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map_err(|e| codec_failure(self, e)),
            Compression::Zstd => {
                zstd::stream::encode_all(data, ZSTD_LEVEL).map_err(|e| codec_failure(self, e))
            }
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compression::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        }
    }

    /// Inflate `data`. `expected_len` is the uncompressed size recorded in the
    /// footer and is used to size the output buffer, capped relative to the
    /// input so a bogus footer cannot force a huge allocation.
    pub fn decompress(self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| codec_failure(self, e)),
            Compression::Zstd => zstd::stream::decode_all(data).map_err(|e| codec_failure(self, e)),
            Compression::Gzip => {
                let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(64)));
                GzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| codec_failure(self, e))?;
                Ok(out)
            }
            Compression::Lz4 => {
                lz4_flex::decompress_size_prepended(data).map_err(|e| codec_failure(self, e))
            }
        }
    }
}

fn codec_failure(codec: Compression, err: impl fmt::Display) -> EngineError {
    EngineError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{} codec: {err}", codec.token()),
    ))
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Compression {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Compression::ALL
            .into_iter()
            .find(|c| c.token() == lower)
            .ok_or_else(|| EngineError::UnsupportedCodec {
                codec: s.to_string(),
            })
    }
}
