//! Background Frame Analyzer
//!
//! Runs a [`PlateScanner`] on a dedicated thread. Frames arrive faster than
//! OCR can process them, so only the most recent pending frame is kept: a new
//! frame replaces one that is still waiting and the replaced frame is counted
//! as dropped.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::analysis::{PlateDetection, PlateScanner};
use crate::capture::frame::PlanarFrame;

/// Counters for a running analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzerStats {
    /// Frames handed to [`FrameAnalyzer::submit`]
    pub submitted: u64,
    /// Frames scanned without error
    pub processed: u64,
    /// Frames replaced by a newer frame before the worker reached them
    pub dropped: u64,
    /// Frames whose scan failed
    pub failed: u64,
    /// Plates reported
    pub detections: u64,
}

/// Keep-latest frame queue in front of a scanner thread
pub struct FrameAnalyzer {
    frame_tx: Option<Sender<PlanarFrame>>,
    /// Second handle on the frame queue, used to evict a stale pending frame
    stale_rx: Receiver<PlanarFrame>,
    detection_rx: Receiver<PlateDetection>,
    stats: Arc<RwLock<AnalyzerStats>>,
    worker: Option<JoinHandle<()>>,
}

impl FrameAnalyzer {
    /// Move `scanner` onto a worker thread and start accepting frames
    pub fn spawn(mut scanner: PlateScanner) -> Result<Self> {
        let (frame_tx, frame_rx) = bounded::<PlanarFrame>(1);
        let (detection_tx, detection_rx) = unbounded();
        let stats = Arc::new(RwLock::new(AnalyzerStats::default()));

        let worker_stats = stats.clone();
        let worker_rx = frame_rx.clone();
        let worker = std::thread::Builder::new()
            .name("plate-analyzer".to_string())
            .spawn(move || {
                info!("Analyzer thread starting...");
                for frame in worker_rx.iter() {
                    match scanner.scan(&frame) {
                        Ok(detections) => {
                            let mut stats = worker_stats.write();
                            stats.processed += 1;
                            stats.detections += detections.len() as u64;
                            drop(stats);

                            for detection in detections {
                                // Nobody listening is fine
                                let _ = detection_tx.send(detection);
                            }
                        }
                        Err(e) => {
                            worker_stats.write().failed += 1;
                            warn!("Frame analysis failed: {}", e);
                        }
                    }
                }
                info!("Analyzer thread exiting...");
            })
            .context("Failed to spawn analyzer thread")?;

        Ok(Self {
            frame_tx: Some(frame_tx),
            stale_rx: frame_rx,
            detection_rx,
            stats,
            worker: Some(worker),
        })
    }

    /// Queue a frame for analysis, replacing any frame still waiting.
    ///
    /// Returns `false` if the frame was not queued.
    pub fn submit(&self, frame: PlanarFrame) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        if self.worker.as_ref().is_some_and(|h| h.is_finished()) {
            warn!("Analyzer thread is gone; frame discarded");
            return false;
        }
        self.stats.write().submitted += 1;

        let frame = match tx.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(frame)) => frame,
            Err(TrySendError::Disconnected(_)) => {
                warn!("Analyzer queue disconnected; frame discarded");
                return false;
            }
        };

        if self.stale_rx.try_recv().is_ok() {
            self.stats.write().dropped += 1;
            trace!("Dropped stale pending frame");
        }

        match tx.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                self.stats.write().dropped += 1;
                false
            }
        }
    }

    /// Receiver for plates found by the worker
    pub fn detections(&self) -> Receiver<PlateDetection> {
        self.detection_rx.clone()
    }

    pub fn stats(&self) -> AnalyzerStats {
        *self.stats.read()
    }

    /// Stop accepting frames, finish the pending one and join the worker
    pub fn shutdown(mut self) -> AnalyzerStats {
        self.stop();
        self.stats()
    }

    fn stop(&mut self) {
        // Closing the queue ends the worker loop once it drains
        self.frame_tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Analyzer thread panicked");
            }
            debug!("Analyzer stopped: {:?}", self.stats());
        }
    }
}

impl Drop for FrameAnalyzer {
    fn drop(&mut self) {
        self.stop();
    }
}
