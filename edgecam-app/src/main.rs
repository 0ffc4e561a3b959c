mod display;
mod feed;
pub mod settings;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use edgecam_media::{
    DisplayFrame, FrameMailbox, FramePipeline, ModeSwitch, PipelineWorker, ProcessingMode,
};
use settings::Settings;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Flip the processing mode every `every` until shutdown.
async fn mode_toggle_loop(
    switch: ModeSwitch,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    return;
                }
            }
            _ = interval.tick() => {
                switch.toggle();
            }
        }
    }
}

/// Resolve when the session should end: Ctrl-C, or after `run_secs` if set.
async fn wait_for_shutdown(run_secs: u64) -> Result<()> {
    if run_secs == 0 {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        tracing::info!("Ctrl-C received");
        return Ok(());
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("Ctrl-C received");
        }
        _ = tokio::time::sleep(Duration::from_secs(run_secs)) => {
            tracing::info!(run_secs, "run time elapsed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("edgecam starting");

    let settings = Settings::load();
    if let Err(e) = settings.save() {
        tracing::error!(error = %e, "failed to save settings");
    }
    let pipeline =
        FramePipeline::new(settings.pipeline_config()).context("failed to create pipeline")?;
    let (width, height) = pipeline.dimensions();
    pipeline
        .mode_switch()
        .set(ProcessingMode::from(settings.initial_mode));

    let input = Arc::new(FrameMailbox::new());
    let output: Arc<FrameMailbox<DisplayFrame>> = Arc::new(FrameMailbox::new());

    let worker = PipelineWorker::spawn(pipeline, Arc::clone(&input), Arc::clone(&output))
        .context("failed to start pipeline worker")?;
    let camera = feed::SyntheticCamera::start(
        width,
        height,
        settings.chroma_layout,
        settings.frame_rate,
        Arc::clone(&input),
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let display = tokio::spawn(display::display_loop(
        Arc::clone(&output),
        settings.display_rate,
        shutdown_rx.clone(),
    ));
    let toggle = (settings.toggle_every_secs > 0).then(|| {
        tokio::spawn(mode_toggle_loop(
            worker.mode_switch(),
            Duration::from_secs(settings.toggle_every_secs),
            shutdown_rx,
        ))
    });

    wait_for_shutdown(settings.run_secs).await?;

    let captured = camera.stop()?;
    let pipeline = tokio::task::spawn_blocking(move || worker.stop())
        .await
        .context("pipeline stop task failed")?
        .context("failed to stop pipeline worker")?;

    let _ = shutdown_tx.send(true);
    if let Some(toggle) = toggle {
        toggle.await.context("mode toggle task failed")?;
    }
    let stats = display.await.context("display task failed")?;

    let metrics = pipeline.metrics();
    tracing::info!(
        captured,
        dropped_before_pipeline = input.dropped(),
        processed = metrics.frames_processed.load(Ordering::Relaxed),
        filtered = metrics.frames_filtered.load(Ordering::Relaxed),
        raw = metrics.frames_raw.load(Ordering::Relaxed),
        truncated = metrics.frames_truncated.load(Ordering::Relaxed),
        aborted = metrics.frames_aborted.load(Ordering::Relaxed),
        display_ticks = stats.ticks,
        presented = stats.presented,
        presented_filtered = stats.filtered,
        presented_degraded = stats.degraded,
        conversion_failures = stats.failed,
        last_sequence = ?stats.last_sequence,
        skipped_by_display = output.dropped(),
        "edgecam stopped"
    );

    Ok(())
}
