//! Synthetic camera: renders a moving test pattern into YUV 4:2:0 images
//! and posts them to the pipeline's input mailbox at a fixed frame rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use edgecam_media::mailbox::Posted;
use edgecam_media::{CapturedImage, FrameMailbox};

use crate::settings::FeedLayout;

const BACKGROUND_LUMA: u8 = 40;
const BAR_LUMA: u8 = 220;

/// Render frame number `index` of the test pattern.
///
/// A bright vertical bar slides across a dark background; chroma is a
/// horizontal U ramp and a vertical V ramp.
pub fn render_pattern(width: u32, height: u32, layout: FeedLayout, index: u64) -> CapturedImage {
    let w = width as usize;
    let h = height as usize;
    let bar_width = (w / 8).max(1);
    let bar_start = (index as usize * 4) % w.max(1);

    let mut y = vec![BACKGROUND_LUMA; w * h];
    for row in y.chunks_exact_mut(w.max(1)) {
        for x in 0..bar_width {
            row[(bar_start + x) % w] = BAR_LUMA;
        }
    }

    let cw = w / 2;
    let ch = h / 2;
    let mut u = Vec::with_capacity(cw * ch);
    let mut v = Vec::with_capacity(cw * ch);
    for row in 0..ch {
        for col in 0..cw {
            u.push(ramp(col, cw));
            v.push(ramp(row, ch));
        }
    }

    match layout {
        FeedLayout::Planar => CapturedImage::planar(width, height, y, u, v),
        FeedLayout::SemiPlanar => {
            let uv = u.iter().zip(&v).flat_map(|(&u, &v)| [u, v]).collect();
            CapturedImage::semi_planar(width, height, y, uv)
        }
    }
}

fn ramp(pos: usize, len: usize) -> u8 {
    if len <= 1 {
        return 128;
    }
    (64 + pos * 128 / (len - 1)) as u8
}

/// Handle to the running synthetic camera thread.
pub struct SyntheticCamera {
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    /// Start producing frames into `output`.
    pub fn start(
        width: u32,
        height: u32,
        layout: FeedLayout,
        frame_rate: u32,
        output: Arc<FrameMailbox<CapturedImage>>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let period = Duration::from_secs(1) / frame_rate.max(1);

        let handle = std::thread::Builder::new()
            .name("edgecam-camera".into())
            .spawn({
                let stop = Arc::clone(&stop);
                let frames = Arc::clone(&frames);
                move || {
                    tracing::info!(width, height, ?layout, frame_rate, "synthetic camera started");
                    let mut next = Instant::now();
                    while !stop.load(Ordering::Relaxed) {
                        let index = frames.load(Ordering::Relaxed);
                        let image = render_pattern(width, height, layout, index);
                        if let Posted::Closed(_) = output.post(image) {
                            tracing::debug!("pipeline input closed");
                            break;
                        }
                        frames.fetch_add(1, Ordering::Relaxed);

                        next += period;
                        let now = Instant::now();
                        if next > now {
                            std::thread::sleep(next - now);
                        } else {
                            next = now;
                        }
                    }
                    tracing::info!(
                        frames = frames.load(Ordering::Relaxed),
                        "synthetic camera stopped"
                    );
                }
            })
            .context("failed to spawn camera thread")?;

        Ok(Self {
            stop,
            frames,
            handle: Some(handle),
        })
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) -> Result<u64> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("camera thread panicked"))?;
        }
        Ok(self.frames())
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
