use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;

use crate::base64;

/// Capacity of the line-count queue between the feeder and the reader.
const LINE_COUNT_QUEUE_SIZE: usize = 128;

/// Feed decoded documents to a child process and re-encode its output.
///
/// The feeder publishes each document's internal line count before writing
/// the text to the child, so the reader can start collecting the child's
/// output while the document is still being fed. A count of zero tells the
/// reader the input is finished.
pub fn filter<R, W, CI, CO>(input: R, output: W, child_in: CI, child_out: CO) -> Result<()>
where
    R: BufRead + Send,
    W: Write + Send,
    CI: Write + Send,
    CO: Read + Send,
{
    let (counts_tx, counts_rx) = bounded::<usize>(LINE_COUNT_QUEUE_SIZE);

    thread::scope(|s| -> Result<()> {
        let feeder = s.spawn(move || -> Result<()> {
            let mut child_in = BufWriter::new(child_in);

            for line in input.lines() {
                let mut document = base64::decode(&line?)?;
                // The document must end with a newline so the next one
                // starts on its own line and the line count stays honest.
                if document.last() != Some(&b'\n') {
                    document.push(b'\n');
                }
                let line_count = document.iter().filter(|&&b| b == b'\n').count();

                counts_tx.send(line_count).context("reader stopped early")?;
                child_in.write_all(&document)?;
            }

            child_in.flush()?;
            // Dropping the handle closes the child's stdin.
            drop(child_in);
            counts_tx.send(0).context("reader stopped early")?;
            Ok(())
        });

        let reader = s.spawn(move || -> Result<()> {
            let mut child_out = BufReader::new(child_out);
            let mut output = BufWriter::new(output);
            let mut document = Vec::new();

            loop {
                let line_count = counts_rx.recv().context("feeder stopped early")?;
                if line_count == 0 {
                    break;
                }

                document.clear();
                for _ in 0..line_count {
                    if child_out.read_until(b'\n', &mut document)? == 0 {
                        bail!("child closed stdout before producing {line_count} lines");
                    }
                    if document.last() != Some(&b'\n') {
                        document.push(b'\n');
                    }
                }

                writeln!(output, "{}", base64::encode(&document))?;
            }

            output.flush()?;
            Ok(())
        });

        feeder.join().expect("feeder thread panicked")?;
        reader.join().expect("reader thread panicked")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::process::{Command, Stdio};

    fn spawn_cat() -> std::process::Child {
        Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .expect("cat should be available")
    }

    #[test]
    fn cat_round_trips_documents() {
        let mut child = spawn_cat();
        let child_in = child.stdin.take().unwrap();
        let child_out = child.stdout.take().unwrap();

        let docs: [&[u8]; 3] = [b"single line\n", b"no trailing newline", b"two\nlines\n"];
        let input: String = docs
            .iter()
            .map(|d| format!("{}\n", base64::encode(d)))
            .collect();

        let mut output = Vec::new();
        filter(Cursor::new(input), &mut output, child_in, child_out).unwrap();
        assert!(child.wait().unwrap().success());

        let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(base64::decode(lines[0]).unwrap(), b"single line\n");
        // The missing trailing newline is normalized on the way in.
        assert_eq!(base64::decode(lines[1]).unwrap(), b"no trailing newline\n");
        assert_eq!(base64::decode(lines[2]).unwrap(), b"two\nlines\n");
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let mut child = spawn_cat();
        let child_in = child.stdin.take().unwrap();
        let child_out = child.stdout.take().unwrap();

        let mut output = Vec::new();
        filter(Cursor::new(String::new()), &mut output, child_in, child_out).unwrap();
        child.wait().unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn invalid_base64_fails() {
        let mut child = spawn_cat();
        let child_in = child.stdin.take().unwrap();
        let child_out = child.stdout.take().unwrap();

        let mut output = Vec::new();
        let result = filter(
            Cursor::new("@@not-base64@@\n".to_string()),
            &mut output,
            child_in,
            child_out,
        );
        child.wait().unwrap();
        assert!(result.is_err());
    }
}
