//! Camera frame pipeline: plane extraction, Sobel edge detection, NV21
//! packing, and the thread handoff between capture and display.

pub mod chroma;
pub mod convert;
pub mod edge_filter;
pub mod frame_pipeline;
pub mod mailbox;
pub mod pipeline_worker;
pub mod planes;
pub mod video_types;

pub use frame_pipeline::{
    FramePipeline, ModeSwitch, PipelineConfig, ProcessedFrame, ProcessingMode,
};
pub use mailbox::FrameMailbox;
pub use pipeline_worker::PipelineWorker;
pub use video_types::{CapturedFrame, CapturedImage, DisplayFrame, FrameStatus, PlaneRef};
