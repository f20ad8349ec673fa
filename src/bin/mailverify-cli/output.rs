use std::io::Write;

use anyhow::{Result, bail};
use mailverify_lib::{ReportWriter, VerificationResult};

pub enum Format {
    Csv,
    Ndjson,
}

impl Format {
    pub fn from_flag(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Self::Csv),
            "ndjson" if cfg!(feature = "with-serde") => Ok(Self::Ndjson),
            "ndjson" => bail!("format=ndjson nécessite la feature 'with-serde'"),
            other => bail!("unknown --format '{other}', use: csv|ndjson"),
        }
    }
}

/// Report destination; every row is flushed before the next address is
/// written so an interrupted run keeps its progress.
pub enum ReportSink<W: Write> {
    Csv(ReportWriter<W>),
    Ndjson(W),
}

impl<W: Write> ReportSink<W> {
    pub fn new(format: Format, writer: W) -> Result<Self> {
        Ok(match format {
            Format::Csv => Self::Csv(ReportWriter::new(writer)?),
            Format::Ndjson => Self::Ndjson(writer),
        })
    }

    pub fn write(&mut self, result: &VerificationResult) -> Result<()> {
        match self {
            Self::Csv(writer) => writer.write_result(result)?,
            Self::Ndjson(writer) => write_ndjson(writer, result)?,
        }
        Ok(())
    }
}

#[cfg(feature = "with-serde")]
fn write_ndjson<W: Write>(writer: &mut W, result: &VerificationResult) -> Result<()> {
    serde_json::to_writer(&mut *writer, result)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson<W: Write>(_: &mut W, _: &VerificationResult) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}
