//! zlib wire codec (spec §3 "Wire form").

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("corrupt zlib stream: {0}")]
    Corrupt(#[from] std::io::Error),
}

/// Compress `data` with zlib at the default compression level.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("writing to an in-memory encoder cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory encoder cannot fail")
}

/// Inflate a zlib stream. Returns `CodecError::Corrupt` on malformed input
/// (surfaced by the Gateway as `FAIL: CORRUPT COMPRESSION`, spec §4.E).
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Whether `data` begins with a valid zlib header (spec §4.E step 2:
/// "if... the first two bytes are a zlib header, inflate").
pub fn looks_like_zlib(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let cmf = data[0];
    let flg = data[1];
    let method = cmf & 0x0f;
    if method != 8 {
        return false;
    }
    (u16::from(cmf) * 256 + u16::from(flg)) % 31 == 0
}
