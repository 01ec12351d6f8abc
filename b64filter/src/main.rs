use std::io::{self, BufReader};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Parser;
use docalign_core::pipefilter;

#[derive(Parser)]
#[command(name = "b64filter")]
#[command(
    about = "Pipe base64-encoded documents through a line-oriented child process",
    long_about = None
)]
struct Cli {
    /// Child command and its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(1);
    });

    let (program, args) = cli.command.split_first().expect("command is required");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("cannot start {program}"))?;
    let child_in = child.stdin.take().expect("child stdin is piped");
    let child_out = child.stdout.take().expect("child stdout is piped");

    let result = pipefilter::filter(
        BufReader::new(io::stdin()),
        io::stdout(),
        child_in,
        child_out,
    );

    let status = child.wait().context("waiting for the child failed")?;
    result?;
    std::process::exit(status.code().unwrap_or(1));
}
