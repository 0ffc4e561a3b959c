//! Sobel edge detection over an 8-bit luma plane.
//!
//! - Convolves the 3×3 Sobel kernel pair over every interior pixel.
//! - Magnitude is `floor(sqrt(gx² + gy²))` in integer arithmetic.
//! - Pixels with magnitude above [`EDGE_THRESHOLD`] become [`EDGE`] (black),
//!   all other interior pixels become [`BACKGROUND`] (white).
//! - The one-pixel frame border is never written.
//!
//! The pass runs in place in row-major order, so a pixel's upper and left
//! neighbours have already been replaced by their 0/255 classification when
//! its gradient is taken.
//!
//! Complexity: O(W·H) per pass, no extra memory.

type Kernel3 = [[i32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Gradient magnitude above which a pixel is classified as an edge.
pub const EDGE_THRESHOLD: u32 = 750;

/// Output value for edge pixels.
pub const EDGE: u8 = 0;

/// Output value for background pixels.
pub const BACKGROUND: u8 = 255;

/// Aggregate statistics of one filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeStats {
    /// Interior pixels classified as edges.
    pub edge_pixels: u32,
    /// Interior pixels classified in total.
    pub total_pixels: u32,
    /// Smallest magnitude seen (0 when no pixel was classified).
    pub min_magnitude: u32,
    /// Largest magnitude seen.
    pub max_magnitude: u32,
    /// Sum of all magnitudes.
    pub sum_magnitude: u64,
}

impl EdgeStats {
    fn record(&mut self, magnitude: u32, is_edge: bool) {
        if self.total_pixels == 0 {
            self.min_magnitude = magnitude;
        } else {
            self.min_magnitude = self.min_magnitude.min(magnitude);
        }
        self.max_magnitude = self.max_magnitude.max(magnitude);
        self.sum_magnitude += u64::from(magnitude);
        self.total_pixels += 1;
        if is_edge {
            self.edge_pixels += 1;
        }
    }

    /// Mean magnitude, or 0 for an empty pass.
    pub fn avg_magnitude(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.sum_magnitude as f64 / f64::from(self.total_pixels)
    }

    /// Share of classified pixels that are edges, in percent.
    pub fn edge_percent(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        f64::from(self.edge_pixels) * 100.0 / f64::from(self.total_pixels)
    }
}

/// Result of [`detect_edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeOutcome {
    pub stats: EdgeStats,
    /// The scan stopped early because the buffer is smaller than
    /// `width * height`.
    pub aborted: bool,
}

/// Sobel gradient magnitude of a 3×3 neighbourhood, truncated to an integer.
pub fn sobel_magnitude(n: &[[u8; 3]; 3]) -> u32 {
    let mut gx = 0i32;
    let mut gy = 0i32;
    for (ky, row) in n.iter().enumerate() {
        for (kx, &sample) in row.iter().enumerate() {
            let v = i32::from(sample);
            gx += SOBEL_KERNEL_X[ky][kx] * v;
            gy += SOBEL_KERNEL_Y[ky][kx] * v;
        }
    }
    // |gx|, |gy| <= 1020, so the squared sum stays well inside u32.
    ((gx * gx + gy * gy) as u32).isqrt()
}

/// Map a magnitude to the binary mask value.
pub fn classify(magnitude: u32) -> u8 {
    if magnitude > EDGE_THRESHOLD {
        EDGE
    } else {
        BACKGROUND
    }
}

fn neighbourhood(luma: &[u8], width: usize, x: usize, y: usize) -> [[u8; 3]; 3] {
    let at = |row: usize, col: usize| luma[row * width + col];
    [
        [at(y - 1, x - 1), at(y - 1, x), at(y - 1, x + 1)],
        [at(y, x - 1), at(y, x), at(y, x + 1)],
        [at(y + 1, x - 1), at(y + 1, x), at(y + 1, x + 1)],
    ]
}

/// Classify every interior pixel of `luma` (`width` x `height`) in place.
pub fn detect_edges(luma: &mut [u8], width: usize, height: usize) -> EdgeOutcome {
    let mut outcome = EdgeOutcome::default();
    if width < 3 || height < 3 {
        return outcome;
    }

    'rows: for y in 1..height - 1 {
        for x in 1..width - 1 {
            // The bottom-right neighbour is the furthest sample read.
            if (y + 1) * width + x + 1 >= luma.len() {
                outcome.aborted = true;
                break 'rows;
            }
            let magnitude = sobel_magnitude(&neighbourhood(luma, width, x, y));
            let value = classify(magnitude);
            luma[y * width + x] = value;
            outcome.stats.record(magnitude, value == EDGE);
        }
    }

    if outcome.aborted {
        tracing::warn!(
            width,
            height,
            len = luma.len(),
            classified = outcome.stats.total_pixels,
            "luma buffer smaller than frame dimensions, edge scan aborted"
        );
    }

    outcome
}
