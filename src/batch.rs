//! Batch driver: address list in, ordered CSV report out.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;

use crate::verify::VerificationResult;

pub const REPORT_HEADER: [&str; 3] = ["email", "valid", "error"];

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read addresses: {source}")]
    Input {
        #[source]
        source: io::Error,
    },
    #[error("failed to write report: {source}")]
    Report {
        #[source]
        source: csv::Error,
    },
}

impl From<csv::Error> for BatchError {
    fn from(source: csv::Error) -> Self {
        Self::Report { source }
    }
}

/// Reads one address per line. Lines are trimmed, blank ones skipped, and
/// invalid UTF-8 is replaced rather than rejected so the line still shows up
/// in the report.
pub fn read_addresses<R: BufRead>(reader: R) -> Result<Vec<String>, BatchError> {
    let mut addresses = Vec::new();
    for line in reader.split(b'\n') {
        let line = line.map_err(|source| BatchError::Input { source })?;
        let line = String::from_utf8_lossy(&line);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            addresses.push(trimmed.to_string());
        }
    }
    Ok(addresses)
}

/// CSV report sink. The header goes out on construction and every row is
/// flushed as soon as it is written.
pub struct ReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Result<Self, BatchError> {
        let mut inner = csv::Writer::from_writer(writer);
        inner.write_record(REPORT_HEADER)?;
        inner.flush().map_err(csv::Error::from)?;
        Ok(Self { inner })
    }

    pub fn write_result(&mut self, result: &VerificationResult) -> Result<(), BatchError> {
        self.inner.write_record([
            result.address.as_str(),
            if result.valid { "true" } else { "false" },
            result.error.as_str(),
        ])?;
        self.inner.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, BatchError> {
        self.inner
            .into_inner()
            .map_err(|err| BatchError::from(csv::Error::from(err.into_error())))
    }
}

/// Verifies every address with `verify` and hands each result to `sink` in
/// input order.
///
/// With more than one job, addresses are pulled by worker threads and results
/// are re-sequenced before reaching `sink`, so output order never depends on
/// which host answered first. The first `sink` error stops the batch and is
/// returned as is. Returns the number of results delivered.
pub fn run_batch<V, S, E>(
    addresses: &[String],
    jobs: NonZeroUsize,
    verify: V,
    mut sink: S,
) -> Result<usize, E>
where
    V: Fn(&str) -> VerificationResult + Sync,
    S: FnMut(VerificationResult) -> Result<(), E>,
{
    let jobs = jobs.get().min(addresses.len().max(1));
    if jobs == 1 {
        for address in addresses {
            sink(verify(address.as_str()))?;
        }
        return Ok(addresses.len());
    }

    let next = AtomicUsize::new(0);
    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        for _ in 0..jobs {
            let tx = tx.clone();
            let (next, verify) = (&next, &verify);
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(address) = addresses.get(idx) else {
                        break;
                    };
                    if tx.send((idx, verify(address.as_str()))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut pending = BTreeMap::new();
        let mut written = 0;
        for (idx, result) in rx {
            pending.insert(idx, result);
            while let Some(result) = pending.remove(&written) {
                if let Err(err) = sink(result) {
                    // in-flight verifications finish and are dropped
                    next.store(addresses.len(), Ordering::Relaxed);
                    return Err(err);
                }
                written += 1;
            }
        }
        Ok(written)
    })
}
