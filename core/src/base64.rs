use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Decode one base64 line into the raw document body. Bodies may contain
/// embedded newlines; the line itself must not.
pub fn decode(line: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(line.trim_end_matches(['\r', '\n']))
        .context("invalid base64 document line")
}

/// Encode a document body as a single base64 line (without the newline).
pub fn encode(body: &[u8]) -> String {
    STANDARD.encode(body)
}
