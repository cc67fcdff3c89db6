//! Streaming Error Sink (C8): buffered-in-memory or batched-to-disk output.
//!
//! The streaming writer's release discipline mirrors the RAII handle-release
//! pattern applied to every OGR C pointer (`Drop for Dataset`,
//! `Drop for Geometry`). Here there is only a plain `std::fs::File` to
//! release, so a `Drop` impl plus an explicit `finalize` covers every exit
//! path (normal, error, cancellation).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error_record::{Severity, ValidationError};
use crate::errors::EngineError;

const BATCH_SIZE: usize = 1000;

/// What `ErrorSink::finalize` hands back to the Orchestrator.
pub struct SinkOutcome {
    /// Populated in buffered mode; always empty in streaming mode.
    pub errors: Vec<ValidationError>,
    pub error_count: u64,
    pub warning_count: u64,
}

fn classify(counts: (&AtomicU64, &AtomicU64), severity: Severity) {
    match severity {
        Severity::Error => {
            counts.0.fetch_add(1, Ordering::Relaxed);
        }
        Severity::Warning => {
            counts.1.fetch_add(1, Ordering::Relaxed);
        }
        Severity::Info => {}
    }
}

/// Owns the append-only file handle and the running totals. Producers push
/// through a mutex-guarded pending buffer; flushing copies the batch out
/// before releasing the lock, bounding the critical section to the copy.
pub struct StreamingErrorWriter {
    pending: Mutex<Vec<ValidationError>>,
    writer: Mutex<BufWriter<File>>,
    error_count: AtomicU64,
    warning_count: AtomicU64,
}

impl StreamingErrorWriter {
    pub fn create(path: &str) -> Result<Self, EngineError> {
        let file = File::create(path).map_err(|source| EngineError::OpenSink {
            path: path.to_string(),
            source,
        })?;
        Ok(StreamingErrorWriter {
            pending: Mutex::new(Vec::with_capacity(BATCH_SIZE)),
            writer: Mutex::new(BufWriter::new(file)),
            error_count: AtomicU64::new(0),
            warning_count: AtomicU64::new(0),
        })
    }

    pub fn push(&self, error: ValidationError) {
        classify((&self.error_count, &self.warning_count), error.severity);
        let batch = {
            let mut pending = self.pending.lock().expect("sink pending mutex poisoned");
            pending.push(error);
            if pending.len() >= BATCH_SIZE {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            self.write_batch(&batch);
        }
    }

    fn write_batch(&self, batch: &[ValidationError]) {
        let mut writer = self.writer.lock().expect("sink writer mutex poisoned");
        for record in batch {
            match serde_json::to_string(record) {
                Ok(line) => {
                    if let Err(e) = writeln!(writer, "{line}") {
                        log::warn!("failed to write validation error record: {e}");
                    }
                }
                Err(e) => log::warn!("failed to serialize validation error record: {e}"),
            }
        }
        if let Err(e) = writer.flush() {
            log::warn!("failed to flush streaming error sink: {e}");
        }
    }

    pub fn finalize(&self) -> (u64, u64) {
        let tail = {
            let mut pending = self.pending.lock().expect("sink pending mutex poisoned");
            std::mem::take(&mut *pending)
        };
        if !tail.is_empty() {
            self.write_batch(&tail);
        }
        (
            self.error_count.load(Ordering::Relaxed),
            self.warning_count.load(Ordering::Relaxed),
        )
    }
}

impl Drop for StreamingErrorWriter {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.lock() {
            if !pending.is_empty() {
                log::warn!(
                    "streaming error sink dropped with {} unflushed record(s); call finalize() first",
                    pending.len()
                );
            }
        }
    }
}

/// The Scanner/Orchestrator's uniform error destination, selected once per
/// `validate()` call.
pub enum ErrorSink {
    Buffered(Mutex<Vec<ValidationError>>),
    Streaming(StreamingErrorWriter),
}

impl ErrorSink {
    pub fn buffered() -> Self {
        ErrorSink::Buffered(Mutex::new(Vec::new()))
    }

    pub fn streaming(path: &str) -> Result<Self, EngineError> {
        Ok(ErrorSink::Streaming(StreamingErrorWriter::create(path)?))
    }

    pub fn push(&self, error: ValidationError) {
        match self {
            ErrorSink::Buffered(buf) => {
                buf.lock().expect("sink buffer mutex poisoned").push(error);
            }
            ErrorSink::Streaming(writer) => writer.push(error),
        }
    }

    pub fn finalize(self) -> SinkOutcome {
        match self {
            ErrorSink::Buffered(buf) => {
                let errors = buf.into_inner().expect("sink buffer mutex poisoned");
                let error_count = errors.iter().filter(|e| e.severity == Severity::Error).count() as u64;
                let warning_count = errors.iter().filter(|e| e.severity == Severity::Warning).count() as u64;
                SinkOutcome {
                    errors,
                    error_count,
                    warning_count,
                }
            }
            ErrorSink::Streaming(writer) => {
                let (error_count, warning_count) = writer.finalize();
                SinkOutcome {
                    errors: Vec::new(),
                    error_count,
                    warning_count,
                }
            }
        }
    }
}
