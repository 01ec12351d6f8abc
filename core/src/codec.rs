use std::io::{BufRead, Write};

use anyhow::{ensure, Result};

use crate::base64;

/// Walks a sorted list of requested document indices.
pub struct Selector<'a> {
    indices: &'a [usize],
    pos: usize,
}

impl<'a> Selector<'a> {
    pub fn new(indices: &'a [usize]) -> Self {
        Self { indices, pos: 0 }
    }

    /// Whether the document at `index` should be emitted. An empty index
    /// list selects everything.
    pub fn wants(&mut self, index: usize) -> bool {
        if self.indices.is_empty() {
            return true;
        }
        if self.pos < self.indices.len() && self.indices[self.pos] == index {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// True once every requested index has been emitted, allowing an early
    /// stop. Never true when everything is selected.
    pub fn exhausted(&self) -> bool {
        !self.indices.is_empty() && self.pos == self.indices.len()
    }
}

/// Parse `N` or `N-M` into indices; anything else is a file name.
pub fn parse_range(arg: &str, indices: &mut Vec<usize>) -> Result<bool> {
    if let Ok(single) = arg.parse::<usize>() {
        indices.push(single);
        return Ok(true);
    }
    if let Some((start, end)) = arg.split_once('-') {
        if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
            ensure!(
                start <= end,
                "cannot understand {arg}: {start} is larger than {end}"
            );
            indices.extend(start..=end);
            return Ok(true);
        }
    }
    Ok(false)
}

/// Decode base64 document lines, writing each selected body followed by the
/// delimiter. Document indices are 1-based line numbers, per input.
pub fn decode_documents<R, W>(
    input: R,
    out: &mut W,
    delimiter: u8,
    indices: &[usize],
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut selector = Selector::new(indices);

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        if !selector.wants(number + 1) {
            continue;
        }
        let body = base64::decode(&line)?;
        out.write_all(&body)?;
        out.write_all(&[delimiter])?;
        if selector.exhausted() {
            break;
        }
    }

    Ok(())
}

/// Read plain text documents — blank-line separated when the delimiter is a
/// newline, otherwise one per delimiter byte — and emit each selected one as
/// a base64 line.
pub fn encode_documents<R, W>(
    mut input: R,
    out: &mut W,
    delimiter: u8,
    indices: &[usize],
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut selector = Selector::new(indices);
    let mut index = 0usize;
    let mut eof = false;

    while !eof {
        index += 1;
        let mut document = Vec::new();

        if delimiter == b'\n' {
            // Blank-line separated: gather lines until the next empty one.
            loop {
                let mut line = Vec::new();
                if input.read_until(b'\n', &mut line)? == 0 {
                    eof = true;
                    break;
                }
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.is_empty() {
                    break;
                }
                document.extend_from_slice(&line);
                document.push(b'\n');
            }
        } else {
            let mut chunk = Vec::new();
            if input.read_until(delimiter, &mut chunk)? == 0 {
                eof = true;
            } else {
                if chunk.last() == Some(&delimiter) {
                    chunk.pop();
                }
                document = chunk;
            }
        }

        // Nothing left and nothing read: not a document.
        if eof && document.is_empty() {
            break;
        }
        if !selector.wants(index) {
            continue;
        }
        writeln!(out, "{}", base64::encode(&document))?;
        if selector.exhausted() {
            break;
        }
    }

    Ok(())
}
