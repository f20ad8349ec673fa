mod args;
mod output;

use std::fs::File;
use std::io::{self, BufReader, Write};

use anyhow::{Context, Result};
use mailverify_lib::{Verifier, read_addresses, run_batch};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;
use crate::output::{Format, ReportSink};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mailverify_lib={level},mailverify_cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let format = Format::from_flag(&cli.format)?;
    let options = cli.probe_options()?;
    let jobs = cli.jobs()?;

    let input = File::open(&cli.input)
        .with_context(|| format!("open input {}", cli.input.display()))?;
    let addresses = read_addresses(BufReader::new(input))
        .with_context(|| format!("read {}", cli.input.display()))?;
    tracing::info!(count = addresses.len(), jobs = jobs.get(), "addresses loaded");

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("create report {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = ReportSink::new(format, writer)?;

    let verifier = Verifier::system(options, cli.dns_timeout()?).context("init DNS resolver")?;

    let mut valid = 0usize;
    let total = run_batch(
        &addresses,
        jobs,
        |address| {
            let result = verifier.verify(address);
            tracing::info!(
                address,
                valid = result.valid,
                error = result.error.as_str(),
                "verified"
            );
            result
        },
        |result| {
            if result.valid {
                valid += 1;
            }
            sink.write(&result).context("write report")
        },
    )?;

    tracing::info!(total, valid, invalid = total - valid, "done");
    Ok(())
}
