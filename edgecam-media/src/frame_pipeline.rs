//! Per-frame pipeline: plane extraction → Sobel edge filter, or raw NV21
//! passthrough.
//!
//! `FramePipeline` owns one set of [`PipelineBuffers`] for its whole life.
//! Every call overwrites the output buffer in place and returns a
//! [`ProcessedFrame`] borrowing it, so the next call cannot start while the
//! previous result is still borrowed. Callers that hand the frame to another
//! thread copy it out first (see [`ProcessedFrame::copy_into`]).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::chroma::pack_raw;
use crate::edge_filter::{detect_edges, EdgeStats, EDGE_THRESHOLD};
use crate::planes::PipelineBuffers;
use crate::video_types::{CapturedFrame, DisplayFrame, FrameStatus, PixelFormat};

/// Largest frame width the pipeline processes.
pub const MAX_WIDTH: u32 = 1280;

/// Largest frame height the pipeline processes.
pub const MAX_HEIGHT: u32 = 720;

/// Errors when constructing a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}

/// Configuration for the frame pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: MAX_WIDTH,
            height: MAX_HEIGHT,
        }
    }
}

/// What the pipeline does with the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Luma-only binary edge mask.
    #[default]
    EdgeDetection,
    /// Luma plus NV21 chroma, unfiltered.
    Raw,
}

/// Shared handle for switching the pipeline mode from another thread.
///
/// The pipeline reads the mode once at the start of each frame, so a switch
/// takes effect on the frame after the one in flight.
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch {
    raw: Arc<AtomicBool>,
}

impl ModeSwitch {
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            raw: Arc::new(AtomicBool::new(mode == ProcessingMode::Raw)),
        }
    }

    pub fn set(&self, mode: ProcessingMode) {
        self.raw.store(mode == ProcessingMode::Raw, Ordering::Relaxed);
        tracing::info!(?mode, "processing mode changed");
    }

    pub fn get(&self) -> ProcessingMode {
        if self.raw.load(Ordering::Relaxed) {
            ProcessingMode::Raw
        } else {
            ProcessingMode::EdgeDetection
        }
    }

    /// Flip between edge detection and raw, returning the new mode.
    pub fn toggle(&self) -> ProcessingMode {
        let was_raw = self.raw.fetch_xor(true, Ordering::Relaxed);
        let mode = if was_raw {
            ProcessingMode::EdgeDetection
        } else {
            ProcessingMode::Raw
        };
        tracing::info!(?mode, "processing mode toggled");
        mode
    }
}

/// Counters exposed for observability and test assertions.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub frames_processed: AtomicU64,
    pub frames_filtered: AtomicU64,
    pub frames_raw: AtomicU64,
    pub frames_truncated: AtomicU64,
    pub frames_aborted: AtomicU64,
}

impl PipelineMetrics {
    fn record(&self, filtered: bool, status: FrameStatus) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        if filtered {
            self.frames_filtered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames_raw.fetch_add(1, Ordering::Relaxed);
        }
        match status {
            FrameStatus::Complete => {}
            FrameStatus::Truncated => {
                self.frames_truncated.fetch_add(1, Ordering::Relaxed);
            }
            FrameStatus::Aborted => {
                self.frames_aborted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// The result of one pipeline call, borrowing the pipeline's output buffer.
#[derive(Debug, Clone, Copy)]
pub struct ProcessedFrame<'a> {
    /// The whole output buffer (`width * height * 3 / 2` bytes).
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// `true` for an edge mask, `false` for raw NV21.
    pub filtered: bool,
    pub status: FrameStatus,
    /// Present for filtered frames.
    pub edge_stats: Option<EdgeStats>,
}

impl<'a> ProcessedFrame<'a> {
    /// The luma region (or edge mask) of the output.
    pub fn luma(&self) -> &'a [u8] {
        let len = (self.width as usize * self.height as usize).min(self.data.len());
        &self.data[..len]
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::of_output(self.filtered)
    }

    /// Copy this frame into `dst`, reusing its allocation.
    pub fn copy_into(&self, dst: &mut DisplayFrame) {
        dst.data.clear();
        dst.data.extend_from_slice(self.data);
        dst.width = self.width;
        dst.height = self.height;
        dst.filtered = self.filtered;
        dst.status = self.status;
    }
}

/// Reusable single-frame processor.
#[derive(Debug)]
pub struct FramePipeline {
    width: usize,
    height: usize,
    buffers: PipelineBuffers,
    mode: ModeSwitch,
    metrics: Arc<PipelineMetrics>,
}

impl FramePipeline {
    /// Allocate a pipeline for frames of the configured size.
    ///
    /// Dimensions above [`MAX_WIDTH`] x [`MAX_HEIGHT`] are clamped; larger
    /// frames are then clamped plane by plane at copy time.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        if config.width == 0 || config.height == 0 {
            return Err(PipelineError::EmptyFrame {
                width: config.width,
                height: config.height,
            });
        }

        let width = config.width.min(MAX_WIDTH) as usize;
        let height = config.height.min(MAX_HEIGHT) as usize;

        tracing::info!(
            requested_width = config.width,
            requested_height = config.height,
            width,
            height,
            threshold = EDGE_THRESHOLD,
            "frame pipeline created"
        );

        Ok(Self {
            width,
            height,
            buffers: PipelineBuffers::new(width, height),
            mode: ModeSwitch::default(),
            metrics: Arc::new(PipelineMetrics::default()),
        })
    }

    /// Effective processing dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    /// Handle for switching modes from another thread.
    pub fn mode_switch(&self) -> ModeSwitch {
        self.mode.clone()
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode.get()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn buffers(&self) -> &PipelineBuffers {
        &self.buffers
    }

    /// Process one frame in the current mode.
    pub fn process(&mut self, frame: &CapturedFrame<'_>) -> ProcessedFrame<'_> {
        match self.mode.get() {
            ProcessingMode::EdgeDetection => self.process_edge_detection(frame),
            ProcessingMode::Raw => self.raw_frame(frame),
        }
    }

    /// Extract the planes, run the edge filter and copy the mask into the
    /// first `width * height` bytes of the output. The chroma region of the
    /// output is left as it was.
    pub fn process_edge_detection(&mut self, frame: &CapturedFrame<'_>) -> ProcessedFrame<'_> {
        self.check_dimensions(frame);
        let extraction = self.buffers.extract(frame);

        let (luma, output) = self.buffers.luma_and_output_mut();
        let outcome = detect_edges(luma, self.width, self.height);
        output[..luma.len()].copy_from_slice(luma);

        let status = if outcome.aborted {
            FrameStatus::Aborted
        } else if extraction.luma.is_short() {
            FrameStatus::Truncated
        } else {
            FrameStatus::Complete
        };

        let stats = outcome.stats;
        tracing::debug!(
            edges = stats.edge_pixels,
            total = stats.total_pixels,
            edge_percent = format_args!("{:.2}", stats.edge_percent()),
            min = stats.min_magnitude,
            max = stats.max_magnitude,
            avg = format_args!("{:.2}", stats.avg_magnitude()),
            ?status,
            "edge detection frame processed"
        );

        self.metrics.record(true, status);
        ProcessedFrame {
            data: self.buffers.output(),
            width: self.width as u32,
            height: self.height as u32,
            filtered: true,
            status,
            edge_stats: Some(stats),
        }
    }

    /// Pack the frame's planes directly into the output as luma + NV21
    /// chroma, bypassing the extraction buffers.
    pub fn raw_frame(&mut self, frame: &CapturedFrame<'_>) -> ProcessedFrame<'_> {
        self.check_dimensions(frame);
        let pack = pack_raw(frame, self.buffers.output_mut(), self.width, self.height);

        tracing::debug!(
            layout = ?pack.layout,
            chroma_pairs = pack.chroma_pairs,
            status = ?pack.status,
            "raw frame processed"
        );

        self.metrics.record(false, pack.status);
        ProcessedFrame {
            data: self.buffers.output(),
            width: self.width as u32,
            height: self.height as u32,
            filtered: false,
            status: pack.status,
            edge_stats: None,
        }
    }

    fn check_dimensions(&self, frame: &CapturedFrame<'_>) {
        if frame.width as usize != self.width || frame.height as usize != self.height {
            tracing::trace!(
                frame_width = frame.width,
                frame_height = frame.height,
                width = self.width,
                height = self.height,
                "frame size differs from pipeline, planes will be clamped"
            );
        }
    }
}
