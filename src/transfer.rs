//! Streamed archive downloads.
//!
//! Patch archives are fetched over HTTPS and written to disk in fixed-size
//! chunks, so a multi-hundred-megabyte archive never sits in memory whole.
//! There is no retry and no resumption: a failed transfer is reported as
//! [`AtelierError::TransferFailed`] and a re-attempt starts from zero.

use crate::error::{AtelierError, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Transfer buffer size.
const CHUNK_SIZE: usize = 8 * 1024;

/// One download: where from, where to, and an optional size hint.
///
/// The size hint feeds progress logging only; it is never used to verify
/// the payload. Jobs are created per download and discarded afterwards.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Source URL.
    pub url: String,
    /// Destination file path.
    pub dest: PathBuf,
    /// Expected body size in bytes, if the caller knows it.
    pub expected_size: Option<u64>,
}

impl TransferJob {
    /// Create a job with no size hint.
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            expected_size: None,
        }
    }
}

/// The seam between the orchestrator and the network.
///
/// Production code uses [`TransferService`]; orchestrator tests substitute
/// an implementation that writes a canned archive or fails.
pub trait ArchiveFetcher: Send + Sync {
    /// Download the job's URL to its destination, returning bytes written.
    fn fetch(&self, job: &TransferJob) -> Result<u64>;
}

/// Downloads archives over HTTP(S) with a blocking client.
pub struct TransferService {
    client: reqwest::blocking::Client,
}

impl TransferService {
    /// Create a service with a connect timeout but no overall deadline,
    /// so large archives run to completion or hard failure.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn transfer_failed(job: &TransferJob, message: impl std::fmt::Display) -> AtelierError {
        AtelierError::TransferFailed {
            url: job.url.clone(),
            message: message.to_string(),
        }
    }
}

impl Default for TransferService {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher for TransferService {
    fn fetch(&self, job: &TransferJob) -> Result<u64> {
        tracing::info!(url = %job.url, dest = %job.dest.display(), "downloading");

        let mut response = self
            .client
            .get(&job.url)
            .send()
            .map_err(|e| Self::transfer_failed(job, e))?;

        if !response.status().is_success() {
            return Err(Self::transfer_failed(
                job,
                format!("HTTP {}", response.status()),
            ));
        }

        // The file handle lives exactly as long as this scope; every exit
        // path below, including network failure mid-body, closes it.
        let mut file = File::create(&job.dest).map_err(|e| Self::transfer_failed(job, e))?;
        let mut buf = [0u8; CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| Self::transfer_failed(job, e))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .map_err(|e| Self::transfer_failed(job, e))?;
            written += n as u64;
        }
        file.flush().map_err(|e| Self::transfer_failed(job, e))?;

        match job.expected_size {
            Some(expected) => {
                tracing::info!(bytes = written, expected, "download complete")
            }
            None => tracing::info!(bytes = written, "download complete"),
        }
        Ok(written)
    }
}
