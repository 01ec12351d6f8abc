use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::bufread::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a token file for line-oriented reading, transparently decompressing
/// gzip input. The file only needs to be re-openable, not seekable, which is
/// what the multi-pass document frequency computation relies on.
pub fn open(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    decompress(BufReader::new(file))
}

/// Wrap an already-open reader, sniffing the gzip magic bytes.
pub fn decompress<R>(mut reader: R) -> Result<Box<dyn BufRead + Send>>
where
    R: BufRead + Send + 'static,
{
    let head = reader.fill_buf().context("cannot read input")?;
    if head.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}
