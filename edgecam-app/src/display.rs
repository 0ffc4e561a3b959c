//! Display consumer: picks up the newest processed frame on its own refresh
//! schedule and converts it to RGBA, the way a render surface would before
//! uploading a texture.

use std::sync::Arc;
use std::time::Duration;

use edgecam_media::{DisplayFrame, FrameMailbox};
use tokio::sync::watch;

/// What the display loop saw over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayStats {
    /// Refresh ticks.
    pub ticks: u64,
    /// Frames converted and presented.
    pub presented: u64,
    /// Presented frames that were edge masks.
    pub filtered: u64,
    /// Presented frames that were truncated or aborted.
    pub degraded: u64,
    /// Frames whose conversion failed.
    pub failed: u64,
    /// Sequence number of the last presented frame.
    pub last_sequence: Option<u64>,
}

/// Run until `shutdown` flips to `true` or its sender is dropped.
///
/// On each tick the newest frame (if any) is taken from `frames`; frames the
/// pipeline posted in between are never seen here.
pub async fn display_loop(
    frames: Arc<FrameMailbox<DisplayFrame>>,
    refresh_rate: u32,
    mut shutdown: watch::Receiver<bool>,
) -> DisplayStats {
    let period = Duration::from_secs(1) / refresh_rate.max(1);
    let mut refresh = tokio::time::interval(period);
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut report = tokio::time::interval(Duration::from_secs(1));
    report.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    report.tick().await;

    let mut stats = DisplayStats::default();
    let mut rgba_bytes = 0usize;

    tracing::debug!(refresh_rate, "display loop started");

    loop {
        tokio::select! {
            biased;
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    tracing::debug!("display loop shutdown");
                    break;
                }
            }
            _ = refresh.tick() => {
                stats.ticks += 1;
                let Some(frame) = frames.take() else {
                    continue;
                };
                match frame.to_rgba() {
                    Ok(rgba) => {
                        rgba_bytes = rgba.len();
                        stats.presented += 1;
                        if frame.filtered {
                            stats.filtered += 1;
                        }
                        if !frame.status.is_complete() {
                            stats.degraded += 1;
                        }
                        stats.last_sequence = Some(frame.sequence);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            error = %e,
                            sequence = frame.sequence,
                            "frame conversion failed"
                        );
                    }
                }
            }
            _ = report.tick() => {
                tracing::info!(
                    presented = stats.presented,
                    filtered = stats.filtered,
                    degraded = stats.degraded,
                    last_sequence = ?stats.last_sequence,
                    rgba_bytes,
                    "display stats"
                );
            }
        }
    }

    // Let the pipeline see the display is gone.
    frames.close();
    stats
}
