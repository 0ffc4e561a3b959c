//! Integration tests for the per-frame pipeline: edge detection scenarios,
//! raw passthrough ordering, and clamping of malformed planes.

use edgecam_media::edge_filter::{BACKGROUND, EDGE};
use edgecam_media::frame_pipeline::{FramePipeline, PipelineConfig};
use edgecam_media::video_types::{CapturedImage, FrameStatus, PixelFormat};

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn pipeline(width: u32, height: u32) -> FramePipeline {
    FramePipeline::new(PipelineConfig { width, height }).expect("pipeline creation failed")
}

fn image_from_luma(width: u32, height: u32, luma: Vec<u8>) -> CapturedImage {
    let chroma = (width * height / 4) as usize;
    CapturedImage::planar(width, height, luma, vec![128; chroma], vec![128; chroma])
}

/// Deterministic pseudo-random luma plane.
fn noise(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

fn interior(width: usize, height: usize) -> impl Iterator<Item = usize> {
    (1..height.saturating_sub(1))
        .flat_map(move |y| (1..width.saturating_sub(1)).map(move |x| y * width + x))
}

#[test]
fn uniform_frame_is_all_background() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let image = image_from_luma(4, 4, vec![128; 16]);

    let frame = pipeline.process_edge_detection(&image.frame());

    assert!(frame.filtered);
    assert_eq!(frame.status, FrameStatus::Complete);
    for idx in interior(4, 4) {
        assert_eq!(frame.data[idx], BACKGROUND, "pixel {idx}");
    }
    let stats = frame.edge_stats.expect("filtered frames carry stats");
    assert_eq!(stats.total_pixels, 4);
    assert_eq!(stats.edge_pixels, 0);
    assert!(stats.max_magnitude <= 750);
}

#[test]
fn dark_frame_picks_up_edges_from_rewritten_rows() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let image = image_from_luma(4, 4, vec![0; 16]);

    let frame = pipeline.process_edge_detection(&image.frame());

    let interior: Vec<u8> = interior(4, 4).map(|idx| frame.data[idx]).collect();
    assert_eq!(interior, vec![BACKGROUND, BACKGROUND, EDGE, EDGE]);
    assert_eq!(frame.edge_stats.unwrap().max_magnitude, 806);
}

#[test]
fn vertical_step_is_detected() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let luma = [0, 0, 255, 255].repeat(4);
    let image = image_from_luma(4, 4, luma);

    let frame = pipeline.process_edge_detection(&image.frame());

    for idx in interior(4, 4) {
        assert_eq!(frame.data[idx], EDGE, "pixel {idx}");
    }
    let stats = frame.edge_stats.unwrap();
    assert_eq!(stats.edge_pixels, 4);
    assert!(stats.min_magnitude > 750);
}

#[test]
fn frame_without_interior_is_copied_verbatim() {
    init_test_tracing();
    let mut pipeline = pipeline(2, 2);
    let image = image_from_luma(2, 2, vec![3, 50, 200, 7]);

    let frame = pipeline.process_edge_detection(&image.frame());

    assert_eq!(frame.luma(), &[3, 50, 200, 7]);
    assert_eq!(frame.edge_stats.unwrap().total_pixels, 0);
    assert_eq!(frame.status, FrameStatus::Complete);
}

#[test]
fn interior_output_is_binary_and_border_preserved() {
    init_test_tracing();
    let (width, height) = (17u32, 11u32);
    let mut pipeline = pipeline(width, height);

    for seed in 1..6 {
        let luma = noise(width, height, seed);
        let image = image_from_luma(width, height, luma.clone());
        let frame = pipeline.process_edge_detection(&image.frame());
        let (w, h) = (width as usize, height as usize);

        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                let value = frame.data[idx];
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                    assert_eq!(value, luma[idx], "border ({x},{y}) seed {seed}");
                } else {
                    assert!(value == EDGE || value == BACKGROUND, "({x},{y}) = {value}");
                }
            }
        }
    }
}

#[test]
fn edge_mode_leaves_chroma_region_stale() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let image = CapturedImage::planar(4, 4, vec![90; 16], vec![10; 4], vec![20; 4]);

    let chroma_before = pipeline.raw_frame(&image.frame()).data[16..].to_vec();
    assert_eq!(chroma_before, vec![20, 10, 20, 10, 20, 10, 20, 10]);

    let frame = pipeline.process_edge_detection(&image.frame());
    assert_eq!(&frame.data[16..], chroma_before.as_slice());
    assert_eq!(frame.format(), PixelFormat::Gray8);
}

#[test]
fn raw_passthrough_is_idempotent_for_planar_chroma() {
    init_test_tracing();
    let (width, height) = (8u32, 6u32);
    let mut pipeline = pipeline(width, height);
    let image = CapturedImage::planar(
        width,
        height,
        noise(width, height, 9),
        noise(4, 3, 10),
        noise(4, 3, 11),
    );

    let first = pipeline.raw_frame(&image.frame()).data.to_vec();
    let second = pipeline.raw_frame(&image.frame());

    assert_eq!(first, second.data);
    assert_eq!(second.status, FrameStatus::Complete);
    assert_eq!(second.data.len(), (width * height * 3 / 2) as usize);
}

#[test]
fn semi_planar_chroma_is_emitted_v_first() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    // U0 V0 U1 V1 U2 V2 U3 V3
    let uv = vec![10, 20, 11, 21, 12, 22, 13, 23];
    let image = CapturedImage::semi_planar(4, 4, vec![0; 16], uv);

    let frame = pipeline.raw_frame(&image.frame());

    assert!(!frame.filtered);
    // Plane A ends on a lone U sample, so the last pair keeps its old bytes.
    assert_eq!(&frame.data[16..], &[20, 10, 21, 11, 22, 12, 0, 0]);
    assert_eq!(frame.status, FrameStatus::Truncated);
}

#[test]
fn planar_and_semi_planar_sources_agree() {
    init_test_tracing();
    let (width, height) = (6u32, 4u32);
    let y = noise(width, height, 3);
    let u = noise(3, 2, 4);
    let v = noise(3, 2, 5);
    let uv: Vec<u8> = u.iter().zip(&v).flat_map(|(&u, &v)| [u, v]).collect();

    let planar = CapturedImage::planar(width, height, y.clone(), u, v);
    let semi = CapturedImage::semi_planar(width, height, y, uv);

    let mut pipeline = pipeline(width, height);
    let from_planar = pipeline.raw_frame(&planar.frame()).data.to_vec();
    let from_semi = pipeline.raw_frame(&semi.frame());

    // All but the final pair come from the semi-planar source; the final
    // pair is still the planar frame's.
    assert_eq!(from_semi.status, FrameStatus::Truncated);
    assert_eq!(from_planar, from_semi.data);

    let mut fresh = crate::pipeline(width, height);
    let only_semi = fresh.raw_frame(&semi.frame());
    let len = only_semi.data.len();
    assert_eq!(&only_semi.data[..len - 2], &from_planar[..len - 2]);
    assert_eq!(&only_semi.data[len - 2..], &[0, 0]);
}

#[test]
fn short_luma_plane_is_clamped() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let full = image_from_luma(4, 4, vec![40; 16]);
    pipeline.process_edge_detection(&full.frame());

    let short = image_from_luma(4, 4, vec![200; 6]);
    let frame = pipeline.process_edge_detection(&short.frame());

    assert_eq!(frame.status, FrameStatus::Truncated);
    drop(frame);

    let luma = pipeline.buffers().luma();
    assert_eq!(&luma[..4], &[200; 4]);
    // Bytes past the short plane keep the previous frame's values.
    assert_eq!(&luma[12..], &[40; 4]);
    assert_eq!(luma[7], 40);
}

#[test]
fn oversized_planes_are_clamped() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let image = CapturedImage::planar(4, 4, vec![128; 64], vec![1; 64], vec![2; 64]);

    let frame = pipeline.process_edge_detection(&image.frame());
    assert_eq!(frame.status, FrameStatus::Complete);
    assert_eq!(frame.data.len(), 24);

    let raw = pipeline.raw_frame(&image.frame());
    assert_eq!(raw.status, FrameStatus::Complete);
    assert_eq!(&raw.data[16..], &[2, 1, 2, 1, 2, 1, 2, 1]);
}

#[test]
fn larger_camera_frame_is_processed_at_pipeline_size() {
    init_test_tracing();
    let mut pipeline = pipeline(4, 4);
    let image = image_from_luma(8, 8, vec![128; 64]);

    let frame = pipeline.process_edge_detection(&image.frame());

    assert_eq!((frame.width, frame.height), (4, 4));
    assert_eq!(frame.data.len(), 24);
}
