//! Fixed-size frame buffers and plane extraction.
//!
//! `PipelineBuffers` is allocated once from the pipeline dimensions and then
//! reused for every frame. Source planes are copied with a silent clamp: the
//! number of bytes copied is `min(available, capacity)`, and whatever is not
//! overwritten keeps its previous content.

use crate::video_types::CapturedFrame;

/// Result of copying one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneCopy {
    /// Bytes written into the destination.
    pub copied: usize,
    /// Destination capacity.
    pub capacity: usize,
}

impl PlaneCopy {
    /// The source had fewer bytes than the destination holds.
    pub fn is_short(&self) -> bool {
        self.copied < self.capacity
    }
}

/// Per-plane copy results for one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extraction {
    pub luma: PlaneCopy,
    pub chroma_a: PlaneCopy,
    pub chroma_b: PlaneCopy,
}

/// Copy as much of `src` into the front of `dst` as fits.
pub(crate) fn copy_clamped(src: &[u8], dst: &mut [u8]) -> PlaneCopy {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    PlaneCopy {
        copied: n,
        capacity: dst.len(),
    }
}

/// Reusable luma, chroma and output buffers for one frame size.
#[derive(Debug, Clone)]
pub struct PipelineBuffers {
    width: usize,
    height: usize,
    luma: Vec<u8>,
    chroma_a: Vec<u8>,
    chroma_b: Vec<u8>,
    output: Vec<u8>,
}

impl PipelineBuffers {
    /// Allocate buffers for a `width` x `height` 4:2:0 frame.
    pub fn new(width: usize, height: usize) -> Self {
        let luma_len = width * height;
        Self {
            width,
            height,
            luma: vec![0; luma_len],
            chroma_a: vec![0; luma_len / 4],
            chroma_b: vec![0; luma_len / 4],
            output: vec![0; luma_len * 3 / 2],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Copy the three planes of `frame` into the internal buffers.
    pub fn extract(&mut self, frame: &CapturedFrame<'_>) -> Extraction {
        let extraction = Extraction {
            luma: copy_clamped(frame.luma.data, &mut self.luma),
            chroma_a: copy_clamped(frame.chroma_a.data, &mut self.chroma_a),
            chroma_b: copy_clamped(frame.chroma_b.data, &mut self.chroma_b),
        };

        tracing::trace!(
            luma = extraction.luma.copied,
            luma_capacity = extraction.luma.capacity,
            chroma_a = extraction.chroma_a.copied,
            chroma_b = extraction.chroma_b.copied,
            chroma_capacity = extraction.chroma_a.capacity,
            "planes extracted"
        );

        extraction
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    pub fn chroma_a(&self) -> &[u8] {
        &self.chroma_a
    }

    pub fn chroma_b(&self) -> &[u8] {
        &self.chroma_b
    }

    /// The output buffer handed to the display (`width * height * 3 / 2`).
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub(crate) fn output_mut(&mut self) -> &mut [u8] {
        &mut self.output
    }

    /// Borrow the luma buffer and the output buffer mutably at the same time.
    pub(crate) fn luma_and_output_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        (&mut self.luma, &mut self.output)
    }
}
