use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use docalign_core::codec::{decode_documents, encode_documents, parse_range};
use docalign_core::input;

#[derive(Parser)]
#[command(name = "docenc")]
#[command(
    about = "Encode, decode and extract base64 one-document-per-line files",
    long_about = None
)]
struct Cli {
    /// Decode base64 lines back into plain documents
    #[arg(short = 'd')]
    decode: bool,
    /// Use NUL instead of a blank line / newline as the document delimiter
    #[arg(short = '0')]
    null_delimiter: bool,
    /// 1-based document indices (N or N-M ranges) and input files, mixed
    #[arg(value_name = "INDEX|FILE")]
    args: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(1);
    });

    let mut indices = Vec::new();
    let mut files: Vec<PathBuf> = Vec::new();
    for arg in &cli.args {
        if !parse_range(arg, &mut indices)? {
            files.push(PathBuf::from(arg));
        }
    }
    indices.sort_unstable();
    indices.dedup();

    let delimiter = if cli.null_delimiter { b'\0' } else { b'\n' };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut readers: Vec<Box<dyn BufRead + Send>> = Vec::new();
    if files.is_empty() {
        readers.push(input::decompress(BufReader::new(io::stdin()))?);
    } else {
        for path in &files {
            readers.push(input::open(path)?);
        }
    }

    for reader in readers {
        if cli.decode {
            decode_documents(reader, &mut out, delimiter, &indices)?;
        } else {
            encode_documents(reader, &mut out, delimiter, &indices)?;
        }
    }

    out.flush()?;
    Ok(())
}
