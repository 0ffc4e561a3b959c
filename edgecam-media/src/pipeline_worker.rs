//! Dedicated pipeline thread: latest captured image → process → display copy.
//!
//! The camera side posts [`CapturedImage`]s into an input mailbox; older
//! images that were not picked up yet are dropped. The worker owns the
//! [`FramePipeline`] exclusively, processes each image in the current mode
//! and posts an owned [`DisplayFrame`] copy to the display mailbox, where the
//! renderer picks up the newest one on its own schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::frame_pipeline::{FramePipeline, ModeSwitch, PipelineMetrics};
use crate::mailbox::{FrameMailbox, Posted, Recv};
use crate::video_types::{CapturedImage, DisplayFrame};

/// How long the worker waits for a frame before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from starting or stopping the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("pipeline thread panicked")]
    Panicked,
}

/// Handle to the running pipeline thread.
pub struct PipelineWorker {
    input: Arc<FrameMailbox<CapturedImage>>,
    mode: ModeSwitch,
    metrics: Arc<PipelineMetrics>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<FramePipeline>>,
}

impl PipelineWorker {
    /// Move `pipeline` onto a new thread reading from `input` and writing to
    /// `display`.
    pub fn spawn(
        pipeline: FramePipeline,
        input: Arc<FrameMailbox<CapturedImage>>,
        display: Arc<FrameMailbox<DisplayFrame>>,
    ) -> Result<Self, WorkerError> {
        let mode = pipeline.mode_switch();
        let metrics = Arc::clone(pipeline.metrics());
        let stop = Arc::new(AtomicBool::new(false));

        let handle = std::thread::Builder::new()
            .name("edgecam-pipeline".into())
            .spawn({
                let input = Arc::clone(&input);
                let stop = Arc::clone(&stop);
                move || worker_loop(pipeline, input, display, stop)
            })?;

        tracing::info!(mode = ?mode.get(), "pipeline worker started");

        Ok(Self {
            input,
            mode,
            metrics,
            stop,
            handle: Some(handle),
        })
    }

    /// Handle for switching the processing mode.
    pub fn mode_switch(&self) -> ModeSwitch {
        self.mode.clone()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Captured images replaced before the worker could take them.
    pub fn frames_dropped(&self) -> u64 {
        self.input.dropped()
    }

    /// Stop the thread and hand the pipeline (and its buffers) back.
    ///
    /// Any frame in flight is finished first; frames still waiting in the
    /// input mailbox are processed before the thread exits.
    pub fn stop(mut self) -> Result<FramePipeline, WorkerError> {
        tracing::info!("stopping pipeline worker");
        self.signal_stop();
        let pipeline = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked)?,
            None => return Err(WorkerError::Panicked),
        };
        tracing::info!(
            frames = self.metrics.frames_processed.load(Ordering::Relaxed),
            dropped = self.frames_dropped(),
            "pipeline worker stopped"
        );
        Ok(pipeline)
    }

    fn signal_stop(&self) {
        self.input.close();
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.signal_stop();
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    mut pipeline: FramePipeline,
    input: Arc<FrameMailbox<CapturedImage>>,
    display: Arc<FrameMailbox<DisplayFrame>>,
    stop: Arc<AtomicBool>,
) -> FramePipeline {
    let mut spare: Option<DisplayFrame> = None;
    let mut sequence = 0u64;

    tracing::debug!("pipeline loop started");

    loop {
        let image = match input.recv_timeout(POLL_INTERVAL) {
            Recv::Item(image) => image,
            Recv::Timeout => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                continue;
            }
            Recv::Closed => break,
        };

        let processed = pipeline.process(&image.frame());
        if !processed.status.is_complete() {
            tracing::debug!(status = ?processed.status, sequence, "degraded frame");
        }

        let mut out = spare.take().unwrap_or_default();
        processed.copy_into(&mut out);
        out.sequence = sequence;
        sequence += 1;

        match display.post(out) {
            Posted::Delivered => {}
            Posted::Replaced(old) => {
                tracing::trace!(sequence = old.sequence, "display skipped frame");
                spare = Some(old);
            }
            Posted::Closed(_) => {
                tracing::debug!("display mailbox closed");
                break;
            }
        }
    }

    tracing::debug!(frames = sequence, "pipeline loop ended");
    pipeline
}
