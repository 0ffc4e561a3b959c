//! Raw passthrough: luma plus NV21-interleaved chroma.
//!
//! Both source layouts produce the same output ordering, `V,U` per chroma
//! sample pair:
//!
//! - **Planar** (chroma pixel stride 1): sample `i` of plane B (V) and plane
//!   A (U) are written as one pair.
//! - **Semi-planar** (any other stride): plane A holds `U0,V0,U1,V1,…`; each
//!   complete pair is written with its bytes swapped. Aliased NV12 memory
//!   exposes only `2n-1` bytes in plane A, so its last pair is left as it
//!   was and the pack reports [`FrameStatus::Truncated`].

use crate::planes::copy_clamped;
use crate::video_types::{CapturedFrame, FrameStatus};

/// Chroma layout of a source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaLayout {
    /// U and V in separate, tightly packed planes.
    Planar,
    /// U and V interleaved in one buffer.
    SemiPlanar,
}

impl ChromaLayout {
    /// Derive the layout from the first chroma plane's pixel stride.
    pub fn from_pixel_stride(pixel_stride: usize) -> Self {
        if pixel_stride == 1 {
            ChromaLayout::Planar
        } else {
            ChromaLayout::SemiPlanar
        }
    }
}

/// Summary of one raw pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPack {
    pub layout: ChromaLayout,
    /// Luma bytes copied to the front of the output.
    pub luma_copied: usize,
    /// `V,U` pairs written after the luma region.
    pub chroma_pairs: usize,
    pub status: FrameStatus,
}

/// Write `frame` into `output` as luma followed by `V,U` interleaved chroma.
///
/// `output` is expected to hold `width * height * 3 / 2` bytes; every copy is
/// clamped to it. Bytes that could not be filled keep their old content and
/// the pack is reported as [`FrameStatus::Truncated`].
pub fn pack_raw(
    frame: &CapturedFrame<'_>,
    output: &mut [u8],
    width: usize,
    height: usize,
) -> RawPack {
    let luma_len = (width * height).min(output.len());
    let luma_copied = copy_clamped(frame.luma.data, output).copied;

    let chroma = &mut output[luma_len..];
    let wanted_pairs = chroma.len() / 2;
    let layout = ChromaLayout::from_pixel_stride(frame.chroma_a.pixel_stride);
    let chroma_pairs = match layout {
        ChromaLayout::Planar => {
            interleave_planar(frame.chroma_a.data, frame.chroma_b.data, chroma)
        }
        ChromaLayout::SemiPlanar => swap_semi_planar(frame.chroma_a.data, chroma),
    };

    let status = if luma_copied < luma_len || chroma_pairs < wanted_pairs {
        FrameStatus::Truncated
    } else {
        FrameStatus::Complete
    };

    tracing::trace!(
        ?layout,
        luma_copied,
        chroma_pairs,
        wanted_pairs,
        ?status,
        "raw frame packed"
    );

    RawPack {
        layout,
        luma_copied,
        chroma_pairs,
        status,
    }
}

/// Interleave separate U and V planes as `V,U` pairs.
fn interleave_planar(u_plane: &[u8], v_plane: &[u8], out: &mut [u8]) -> usize {
    let mut pairs = 0;
    for ((dst, &u), &v) in out.chunks_exact_mut(2).zip(u_plane).zip(v_plane) {
        dst[0] = v;
        dst[1] = u;
        pairs += 1;
    }
    pairs
}

/// Swap each `U,V` pair of an interleaved plane into `V,U`.
///
/// Stops at `min(uv.len() / 2, out.len() / 2)` pairs; a dangling odd byte
/// is ignored.
fn swap_semi_planar(uv: &[u8], out: &mut [u8]) -> usize {
    let mut pairs = 0;
    for (dst, src) in out.chunks_exact_mut(2).zip(uv.chunks_exact(2)) {
        dst[0] = src[1];
        dst[1] = src[0];
        pairs += 1;
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video_types::CapturedImage;

    fn output_for(width: usize, height: usize) -> Vec<u8> {
        vec![0xAA; width * height * 3 / 2]
    }

    #[test]
    fn layout_from_stride() {
        assert_eq!(ChromaLayout::from_pixel_stride(1), ChromaLayout::Planar);
        assert_eq!(ChromaLayout::from_pixel_stride(2), ChromaLayout::SemiPlanar);
        assert_eq!(ChromaLayout::from_pixel_stride(0), ChromaLayout::SemiPlanar);
    }

    #[test]
    fn planar_source_is_interleaved_v_first() {
        let image = CapturedImage::planar(4, 2, vec![1; 8], vec![10, 11], vec![20, 21]);
        let mut out = output_for(4, 2);

        let pack = pack_raw(&image.frame(), &mut out, 4, 2);

        assert_eq!(pack.layout, ChromaLayout::Planar);
        assert_eq!(pack.status, FrameStatus::Complete);
        assert_eq!(&out[..8], &[1; 8]);
        assert_eq!(&out[8..], &[20, 10, 21, 11]);
    }

    #[test]
    fn semi_planar_pairs_are_swapped() {
        let mut image = CapturedImage::semi_planar(4, 4, vec![0; 16], Vec::new());
        image.chroma_a.data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut out = output_for(4, 4);

        let pack = pack_raw(&image.frame(), &mut out, 4, 4);

        assert_eq!(pack.layout, ChromaLayout::SemiPlanar);
        assert_eq!(pack.chroma_pairs, 4);
        assert_eq!(&out[16..], &[2, 1, 4, 3, 6, 5, 8, 7]);
        assert_eq!(pack.status, FrameStatus::Complete);
    }

    #[test]
    fn aliased_semi_planar_tail_is_left_stale() {
        let uv = vec![10, 20, 11, 21, 12, 22, 13, 23];
        let image = CapturedImage::semi_planar(4, 4, vec![5; 16], uv);
        let mut out = output_for(4, 4);

        let pack = pack_raw(&image.frame(), &mut out, 4, 4);

        assert_eq!(&out[16..], &[20, 10, 21, 11, 22, 12, 0xAA, 0xAA]);
        assert_eq!(pack.chroma_pairs, 3);
        assert_eq!(pack.status, FrameStatus::Truncated);
    }

    #[test]
    fn dangling_u_sample_is_not_paired_with_plane_b() {
        let mut image = CapturedImage::semi_planar(4, 2, vec![0; 8], Vec::new());
        image.chroma_a.data = vec![10, 20, 11];
        image.chroma_b.data = vec![20, 11, 21];
        let mut out = output_for(4, 2);

        let pack = pack_raw(&image.frame(), &mut out, 4, 2);

        assert_eq!(&out[8..], &[20, 10, 0xAA, 0xAA]);
        assert_eq!(pack.chroma_pairs, 1);
        assert_eq!(pack.status, FrameStatus::Truncated);
    }

    #[test]
    fn oversized_semi_planar_source_stops_at_capacity() {
        let mut image = CapturedImage::semi_planar(2, 2, vec![0; 4], Vec::new());
        image.chroma_a.data = vec![1, 2, 3, 4, 5, 6];
        let mut out = output_for(2, 2);

        let pack = pack_raw(&image.frame(), &mut out, 2, 2);

        assert_eq!(out.len(), 6);
        assert_eq!(&out[4..], &[2, 1]);
        assert_eq!(pack.chroma_pairs, 1);
    }

    #[test]
    fn short_chroma_is_truncated() {
        let image = CapturedImage::planar(4, 4, vec![1; 16], vec![10], vec![20, 21, 22, 23]);
        let mut out = output_for(4, 4);

        let pack = pack_raw(&image.frame(), &mut out, 4, 4);

        assert_eq!(pack.status, FrameStatus::Truncated);
        assert_eq!(pack.chroma_pairs, 1);
        assert_eq!(&out[16..18], &[20, 10]);
        assert!(out[18..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn short_luma_is_truncated() {
        let image = CapturedImage::planar(2, 2, vec![1, 2], vec![10], vec![20]);
        let mut out = output_for(2, 2);

        let pack = pack_raw(&image.frame(), &mut out, 2, 2);

        assert_eq!(pack.status, FrameStatus::Truncated);
        assert_eq!(pack.luma_copied, 2);
        assert_eq!(out, vec![1, 2, 0xAA, 0xAA, 20, 10]);
    }

    #[test]
    fn oversized_luma_is_overwritten_by_chroma() {
        let image = CapturedImage::planar(2, 2, vec![7; 6], vec![10], vec![20]);
        let mut out = output_for(2, 2);

        let pack = pack_raw(&image.frame(), &mut out, 2, 2);

        assert_eq!(pack.luma_copied, 6);
        assert_eq!(out, vec![7, 7, 7, 7, 20, 10]);
        assert_eq!(pack.status, FrameStatus::Complete);
    }
}
