//! Shared types for captured and processed frames.

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Luma only, one byte per pixel.
    Gray8,
    /// NV21 (YUV 4:2:0 semi-planar, chroma interleaved V then U).
    Nv21,
}

impl PixelFormat {
    /// Layout of a pipeline output buffer: an edge mask is luma only.
    pub fn of_output(filtered: bool) -> Self {
        if filtered {
            PixelFormat::Gray8
        } else {
            PixelFormat::Nv21
        }
    }
}

/// Outcome of processing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameStatus {
    /// Every byte of the produced region was written from the current frame.
    #[default]
    Complete,
    /// A source plane was shorter than its destination; part of the buffer
    /// still holds data from an earlier frame.
    Truncated,
    /// The edge filter stopped early because the buffer disagreed with the
    /// frame dimensions.
    Aborted,
}

impl FrameStatus {
    pub fn is_complete(self) -> bool {
        self == FrameStatus::Complete
    }
}

/// Borrowed view of one plane of a captured frame.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    /// Plane bytes available for reading.
    pub data: &'a [u8],
    /// Byte distance between consecutive samples (1 = tightly packed).
    pub pixel_stride: usize,
}

impl<'a> PlaneRef<'a> {
    pub fn new(data: &'a [u8], pixel_stride: usize) -> Self {
        Self { data, pixel_stride }
    }

    /// Number of bytes that can be read from this plane.
    pub fn available(&self) -> usize {
        self.data.len()
    }
}

/// A YUV 4:2:0 frame as handed over by the camera.
///
/// Only valid for the duration of a single pipeline call; the pipeline
/// copies what it needs and never keeps the borrow.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Y plane.
    pub luma: PlaneRef<'a>,
    /// First chroma plane (U).
    pub chroma_a: PlaneRef<'a>,
    /// Second chroma plane (V).
    pub chroma_b: PlaneRef<'a>,
}

/// Owned plane storage backing a [`CapturedImage`].
#[derive(Debug, Clone, Default)]
pub struct PlaneBuf {
    pub data: Vec<u8>,
    pub pixel_stride: usize,
}

impl PlaneBuf {
    fn view(&self) -> PlaneRef<'_> {
        PlaneRef::new(&self.data, self.pixel_stride)
    }
}

/// An owned captured frame that can be moved between threads.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub luma: PlaneBuf,
    pub chroma_a: PlaneBuf,
    pub chroma_b: PlaneBuf,
}

impl CapturedImage {
    /// Build an image from three separate, tightly packed planes.
    pub fn planar(width: u32, height: u32, y: Vec<u8>, u: Vec<u8>, v: Vec<u8>) -> Self {
        Self {
            width,
            height,
            luma: PlaneBuf {
                data: y,
                pixel_stride: 1,
            },
            chroma_a: PlaneBuf {
                data: u,
                pixel_stride: 1,
            },
            chroma_b: PlaneBuf {
                data: v,
                pixel_stride: 1,
            },
        }
    }

    /// Build an image from a luma plane and one interleaved `U,V` chroma plane.
    ///
    /// The chroma planes are laid out the way camera HALs expose NV12 memory
    /// through a three-plane API: plane A starts at the first U sample, plane
    /// B at the first V sample, both with a pixel stride of 2. Each plane
    /// therefore sees one byte less than the interleaved buffer.
    pub fn semi_planar(width: u32, height: u32, y: Vec<u8>, uv: Vec<u8>) -> Self {
        let a = uv[..uv.len().saturating_sub(1)].to_vec();
        let b = uv.get(1..).map(<[u8]>::to_vec).unwrap_or_default();
        Self {
            width,
            height,
            luma: PlaneBuf {
                data: y,
                pixel_stride: 1,
            },
            chroma_a: PlaneBuf {
                data: a,
                pixel_stride: 2,
            },
            chroma_b: PlaneBuf {
                data: b,
                pixel_stride: 2,
            },
        }
    }

    /// Borrow this image as a [`CapturedFrame`].
    pub fn frame(&self) -> CapturedFrame<'_> {
        CapturedFrame {
            width: self.width,
            height: self.height,
            luma: self.luma.view(),
            chroma_a: self.chroma_a.view(),
            chroma_b: self.chroma_b.view(),
        }
    }
}

/// An owned copy of a processed frame, safe to hand to a display thread.
#[derive(Debug, Clone, Default)]
pub struct DisplayFrame {
    /// Frame bytes (`width * height * 3 / 2`).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// `true` if the luma region holds an edge mask rather than camera data.
    pub filtered: bool,
    /// Status of the frame this copy was taken from.
    pub status: FrameStatus,
    /// Position of the frame in the worker's output sequence.
    pub sequence: u64,
}

impl DisplayFrame {
    pub fn format(&self) -> PixelFormat {
        PixelFormat::of_output(self.filtered)
    }
}
