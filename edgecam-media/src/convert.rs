//! Conversion of pipeline output to RGBA for display surfaces that expect
//! packed RGB textures.

use thiserror::Error;

use crate::video_types::DisplayFrame;

/// Errors when converting a frame buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("buffer too small for {width}x{height}: need {expected} bytes, got {actual}")]
    BufferTooSmall {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

fn ensure_len(
    data: &[u8],
    width: u32,
    height: u32,
    expected: usize,
) -> Result<(), ConvertError> {
    if data.len() < expected {
        return Err(ConvertError::BufferTooSmall {
            width,
            height,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Expand a luma-only buffer to opaque gray RGBA.
pub fn luma_to_rgba(luma: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let n = width as usize * height as usize;
    ensure_len(luma, width, height, n)?;

    let mut rgba = Vec::with_capacity(n * 4);
    for &y in &luma[..n] {
        rgba.extend_from_slice(&[y, y, y, 255]);
    }
    Ok(rgba)
}

/// Convert NV21 (Y plane followed by `V,U` interleaved chroma) to RGBA.
///
/// The chroma grid is `width / 2` x `height / 2`, matching the pipeline's
/// 4:2:0 buffers; the last row or column of an odd-sized frame reuses the
/// nearest chroma sample, and a frame too narrow for any chroma is gray.
pub fn nv21_to_rgba(nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let w = width as usize;
    let h = height as usize;
    let y_size = w * h;
    let uv_w = w / 2;
    let uv_h = h / 2;
    ensure_len(nv21, width, height, y_size + uv_w * uv_h * 2)?;

    let (y_plane, vu_plane) = nv21.split_at(y_size);
    let mut rgba = vec![255u8; y_size * 4];

    for row in 0..h {
        for col in 0..w {
            let y = f32::from(y_plane[row * w + col]);
            let (v, u) = if uv_w == 0 || uv_h == 0 {
                (0.0, 0.0)
            } else {
                let vu_idx = ((row / 2).min(uv_h - 1) * uv_w + (col / 2).min(uv_w - 1)) * 2;
                (
                    f32::from(vu_plane[vu_idx]) - 128.0,
                    f32::from(vu_plane[vu_idx + 1]) - 128.0,
                )
            };

            let out_idx = (row * w + col) * 4;
            rgba[out_idx] = (y + 1.402 * v).round().clamp(0.0, 255.0) as u8;
            rgba[out_idx + 1] = (y - 0.344 * u - 0.714 * v).round().clamp(0.0, 255.0) as u8;
            rgba[out_idx + 2] = (y + 1.772 * u).round().clamp(0.0, 255.0) as u8;
            // alpha already 255
        }
    }

    Ok(rgba)
}

impl DisplayFrame {
    /// Convert to RGBA: edge masks as gray, raw frames from NV21.
    pub fn to_rgba(&self) -> Result<Vec<u8>, ConvertError> {
        if self.filtered {
            luma_to_rgba(&self.data, self.width, self.height)
        } else {
            nv21_to_rgba(&self.data, self.width, self.height)
        }
    }
}
