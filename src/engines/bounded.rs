//! Timeout wrapper for OCR engines
//!
//! OCR calls can stall on degenerate input. `BoundedEngine` runs each call on
//! a worker thread and gives up after a fixed duration. A timed-out worker is
//! detached and finishes in the background; its result is discarded. At most
//! `worker_limit` workers may be alive at once, so stalled calls cannot pile up.

use crate::engine::{OcrData, OcrEngine};
use crate::error::VisionError;
use image::GrayImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Default cap on live OCR workers, stalled ones included
pub const DEFAULT_WORKER_LIMIT: usize = 4;

pub struct BoundedEngine {
    inner: Arc<dyn OcrEngine>,
    timeout: Duration,
    worker_limit: usize,
    running: Arc<AtomicUsize>,
}

/// Holds one slot of the worker count until the worker exits
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BoundedEngine {
    pub fn new(inner: Arc<dyn OcrEngine>, timeout: Duration) -> Self {
        Self::with_worker_limit(inner, timeout, DEFAULT_WORKER_LIMIT)
    }

    pub fn with_worker_limit(inner: Arc<dyn OcrEngine>, timeout: Duration, worker_limit: usize) -> Self {
        Self {
            inner,
            timeout,
            worker_limit: worker_limit.max(1),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Workers still alive, including ones whose caller already timed out
    pub fn running_workers(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn claim_slot(&self) -> Result<WorkerSlot, VisionError> {
        self.running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.worker_limit).then_some(n + 1)
            })
            .map(|_| WorkerSlot(Arc::clone(&self.running)))
            .map_err(|n| {
                VisionError::Ocr(format!(
                    "{} has {} stalled worker(s) still running; refusing new work",
                    self.inner.name(),
                    n
                ))
            })
    }
}

impl OcrEngine for BoundedEngine {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn description(&self) -> &'static str {
        self.inner.description()
    }

    fn extract(&self, image: &GrayImage) -> Result<OcrData, VisionError> {
        let slot = self.claim_slot()?;
        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.inner);
        let image = image.clone();

        thread::Builder::new()
            .name(format!("ocr-{}", engine.name()))
            .spawn(move || {
                let _slot = slot;
                // The receiver is gone if we already timed out
                let _ = tx.send(engine.extract(&image));
            })
            .map_err(|e| VisionError::Ocr(format!("Failed to start OCR worker: {}", e)))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "{} timed out after {:?}; {} of {} worker(s) still running",
                    self.inner.name(),
                    self.timeout,
                    self.running_workers(),
                    self.worker_limit
                );
                Err(VisionError::Ocr(format!(
                    "{} did not finish within {:?}",
                    self.inner.name(),
                    self.timeout
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(VisionError::Ocr(format!(
                "{} worker exited without a result",
                self.inner.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEngine(Duration);

    impl OcrEngine for SlowEngine {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn description(&self) -> &'static str {
            "sleeps before answering"
        }

        fn extract(&self, _image: &GrayImage) -> Result<OcrData, VisionError> {
            thread::sleep(self.0);
            let mut data = OcrData::default();
            data.push("DONE", 80, 0, 0, 1, 1);
            Ok(data)
        }
    }

    struct PanickingEngine;

    impl OcrEngine for PanickingEngine {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn description(&self) -> &'static str {
            "panics"
        }

        fn extract(&self, _image: &GrayImage) -> Result<OcrData, VisionError> {
            panic!("engine bug")
        }
    }

    #[test]
    fn test_fast_engine_result_passes_through() {
        let engine = BoundedEngine::new(Arc::new(SlowEngine(Duration::ZERO)), Duration::from_secs(5));
        let data = engine.extract(&GrayImage::new(4, 4)).unwrap();
        assert_eq!(data.text, vec!["DONE".to_string()]);
        assert_eq!(engine.name(), "slow");
    }

    #[test]
    fn test_stalled_engine_times_out() {
        let engine = BoundedEngine::new(
            Arc::new(SlowEngine(Duration::from_secs(2))),
            Duration::from_millis(50),
        );
        let result = engine.extract(&GrayImage::new(4, 4));
        assert!(matches!(result, Err(VisionError::Ocr(msg)) if msg.contains("did not finish")));
    }

    #[test]
    fn test_stalled_workers_are_capped() {
        let engine = BoundedEngine::with_worker_limit(
            Arc::new(SlowEngine(Duration::from_millis(400))),
            Duration::from_millis(20),
            1,
        );

        let first = engine.extract(&GrayImage::new(4, 4));
        assert!(matches!(first, Err(VisionError::Ocr(msg)) if msg.contains("did not finish")));
        assert_eq!(engine.running_workers(), 1);

        let second = engine.extract(&GrayImage::new(4, 4));
        assert!(matches!(second, Err(VisionError::Ocr(msg)) if msg.contains("stalled")));

        // The detached worker releases its slot when it finally returns
        thread::sleep(Duration::from_millis(1000));
        assert_eq!(engine.running_workers(), 0);
    }

    #[test]
    fn test_panicking_engine_becomes_ocr_error() {
        let engine = BoundedEngine::new(Arc::new(PanickingEngine), Duration::from_secs(5));
        let result = engine.extract(&GrayImage::new(4, 4));
        assert!(matches!(result, Err(VisionError::Ocr(_))));
        // Unwinding drops the slot
        assert_eq!(engine.running_workers(), 0);
    }
}
