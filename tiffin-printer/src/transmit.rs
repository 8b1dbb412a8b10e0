//! Transmission pipeline
//!
//! BLE printers accept small writes and have tiny receive buffers, so a job is
//! split into fixed-size chunks written strictly in order. Each write is
//! awaited and followed by a pause; the last one by a longer settle pause so
//! the printer can drain its buffer before the link is reused.

use crate::ble::{ConnectionManager, PrinterDevice};
use crate::error::{PrintResult, TransmissionError};
use shared::models::{PrintJob, PrintJobKind};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Bytes per BLE write (default ATT MTU minus header)
pub const CHUNK_SIZE: usize = 20;

/// Pause after every chunk
pub const CHUNK_DELAY_MS: u64 = 20;

/// Pause after the last chunk
pub const SETTLE_DELAY_MS: u64 = 500;

/// Bound on a single chunk write
pub const WRITE_TIMEOUT_MS: u64 = 2000;

/// Pacing configuration
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub settle_delay: Duration,
    pub write_timeout: Duration,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            write_timeout: Duration::from_millis(WRITE_TIMEOUT_MS),
        }
    }
}

/// Outcome of a completed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitReport {
    pub kind: PrintJobKind,
    pub bytes: usize,
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Sends print jobs to the connected printer, one job at a time
pub struct TransmissionPipeline {
    manager: ConnectionManager,
    config: TransmitConfig,
    in_flight: tokio::sync::Mutex<()>,
}

impl TransmissionPipeline {
    pub fn new(manager: ConnectionManager, config: TransmitConfig) -> Self {
        Self {
            manager,
            config,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Send a job; the job is consumed whether or not it succeeds
    ///
    /// No chunk is ever retried: a partial job cannot be resumed on a thermal
    /// printer, so failures are reported and the caller decides.
    #[instrument(skip(self, job), fields(kind = %job.kind(), bytes = job.len()))]
    pub async fn transmit(&self, job: PrintJob) -> PrintResult<TransmitReport> {
        let _in_flight = self
            .in_flight
            .try_lock()
            .map_err(|_| TransmissionError::Busy)?;

        let device = self
            .manager
            .connected_device()
            .ok_or(TransmissionError::NotConnected)?;

        let kind = job.kind();
        let payload = job.into_payload();
        let started = Instant::now();
        let chunks = self.send_chunks(&device, &payload).await?;

        let report = TransmitReport {
            kind,
            bytes: payload.len(),
            chunks,
            elapsed: started.elapsed(),
        };
        info!(
            device_id = %device.id,
            chunks = report.chunks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Print job sent"
        );
        Ok(report)
    }

    async fn send_chunks(
        &self,
        device: &PrinterDevice,
        payload: &[u8],
    ) -> Result<usize, TransmissionError> {
        let total = payload.len();
        let mut written = 0;
        let mut sent = 0;

        for (index, chunk) in payload.chunks(self.config.chunk_size.max(1)).enumerate() {
            if !self.manager.is_link_up(&device.id).await {
                warn!(device_id = %device.id, written, total, "Link lost during transfer");
                return Err(TransmissionError::LostDuringTransfer { written, total });
            }

            match tokio::time::timeout(
                self.config.write_timeout,
                self.manager.write_chunk(device, chunk),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if !self.manager.is_link_up(&device.id).await {
                        warn!(
                            device_id = %device.id,
                            written,
                            total,
                            error = %e,
                            "Link lost during write"
                        );
                        return Err(TransmissionError::LostDuringTransfer { written, total });
                    }
                    warn!(device_id = %device.id, chunk = index, error = %e, "Chunk write failed");
                    return Err(TransmissionError::WriteFailed {
                        chunk: index,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(device_id = %device.id, chunk = index, "Chunk write timed out");
                    return Err(TransmissionError::WriteTimeout { chunk: index });
                }
            }

            written += chunk.len();
            sent += 1;
            tokio::time::sleep(self.config.chunk_delay).await;
        }

        if sent > 0 {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        debug!(device_id = %device.id, written, chunks = sent, "Payload written");
        Ok(sent)
    }
}
