//! # Block Decoder Seam
//!
//! Unified interface over stateful packet-in / image-out codecs.
//!
//! A decoder consumes one compressed packet at a time and exposes a pull
//! iterator over decoded images; codecs are free to buffer internally
//! (several packets in before the first image comes out). The built-in
//! backend handles raw planar payloads, which keeps the whole pipeline
//! runnable without native codec bindings; compressed codecs plug in
//! through [`BlockDecoder`].

use thiserror::Error;

use crate::convert::PlanarView;
use crate::demux::fourcc_string;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("decoder init failed: {0}")]
    InitFailed(String),
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

// ============================================================================
// Codecs
// ============================================================================

// Fourccs as they appear in IVF headers, little-endian
const VP80: u32 = 0x30385056; // "VP80"
const VP90: u32 = 0x30395056; // "VP90"
const AV01: u32 = 0x31305641; // "AV01"
const I420: u32 = 0x30323449; // "I420" - raw planar YUV
const YV12: u32 = 0x32315659; // "YV12" - raw planar, U/V swapped

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Vp8,
    Vp9,
    Av1,
    RawI420,
    RawYv12,
}

impl Codec {
    pub fn from_fourcc(fourcc: u32) -> Option<Self> {
        match fourcc {
            VP80 => Some(Codec::Vp8),
            VP90 => Some(Codec::Vp9),
            AV01 => Some(Codec::Av1),
            I420 => Some(Codec::RawI420),
            YV12 => Some(Codec::RawYv12),
            _ => None,
        }
    }
}

// ============================================================================
// Decoded Image
// ============================================================================

/// One plane of a decoded image.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    pub stride: usize,
}

/// Decoded 4:2:0 picture: luma plane plus two quarter-size chroma
/// planes, each with its own stride. Owned by the caller once pulled
/// from the decoder.
#[derive(Debug, Clone)]
pub struct PlanarImage {
    pub width: usize,
    pub height: usize,
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

impl PlanarImage {
    /// Borrow the planes for pixel conversion.
    pub fn view(&self) -> PlanarView<'_> {
        PlanarView {
            y: &self.y.data,
            y_stride: self.y.stride,
            u: &self.u.data,
            u_stride: self.u.stride,
            v: &self.v.data,
            v_stride: self.v.stride,
        }
    }
}

// ============================================================================
// Decoder Seam
// ============================================================================

/// Stateful block decoder: packets in, planar images out.
pub trait BlockDecoder: Send {
    fn codec(&self) -> Codec;

    /// Submit one compressed packet. An error here is per-packet; the
    /// decoder stays usable for the next one.
    fn decode(&mut self, data: &[u8]) -> Result<(), DecodeError>;

    /// Pull the next decoded image, if one is ready. Codecs with
    /// internal buffering may return None for several packets before
    /// images start flowing.
    fn next_image(&mut self) -> Option<PlanarImage>;

    /// Extra diagnostic detail for the most recent decode failure.
    fn error_detail(&self) -> Option<String>;

    /// Drop any buffered state, keeping the decoder usable.
    fn reset(&mut self);

    fn name(&self) -> &str;
}

/// Build a decoder for the codec a container declares.
pub fn create_decoder(
    codec: Codec,
    width: u32,
    height: u32,
) -> Result<Box<dyn BlockDecoder>, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InitFailed(format!(
            "bad picture dimensions {width}x{height}"
        )));
    }
    match codec {
        Codec::RawI420 => Ok(Box::new(RawYuvDecoder::new(codec, width, height, false))),
        Codec::RawYv12 => Ok(Box::new(RawYuvDecoder::new(codec, width, height, true))),
        Codec::Vp8 | Codec::Vp9 | Codec::Av1 => Err(DecodeError::UnsupportedCodec(format!(
            "{codec:?} needs an external decoder backend"
        ))),
    }
}

/// Decoder for a fourcc straight out of a container header.
pub fn create_decoder_for_fourcc(
    fourcc: u32,
    width: u32,
    height: u32,
) -> Result<Box<dyn BlockDecoder>, DecodeError> {
    let codec = Codec::from_fourcc(fourcc)
        .ok_or_else(|| DecodeError::UnsupportedCodec(fourcc_string(fourcc)))?;
    create_decoder(codec, width, height)
}

// ============================================================================
// Raw Planar Decoder
// ============================================================================

/// "Decoder" for uncompressed I420/YV12 payloads: each packet is one
/// complete picture. Useful for synthetic clips and as the reference
/// backend for exercising the decode pipeline.
pub struct RawYuvDecoder {
    codec: Codec,
    width: usize,
    height: usize,
    swap_uv: bool,
    pending: Option<PlanarImage>,
    last_detail: Option<String>,
}

impl RawYuvDecoder {
    pub fn new(codec: Codec, width: u32, height: u32, swap_uv: bool) -> Self {
        Self {
            codec,
            width: width as usize,
            height: height as usize,
            swap_uv,
            pending: None,
            last_detail: None,
        }
    }

    fn luma_size(&self) -> usize {
        self.width * self.height
    }

    fn chroma_stride(&self) -> usize {
        self.width.div_ceil(2)
    }

    fn chroma_size(&self) -> usize {
        self.chroma_stride() * self.height.div_ceil(2)
    }
}

impl BlockDecoder for RawYuvDecoder {
    fn codec(&self) -> Codec {
        self.codec
    }

    fn decode(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let expected = self.luma_size() + 2 * self.chroma_size();
        if data.len() < expected {
            self.last_detail = Some(format!(
                "packet holds {} bytes, picture needs {}",
                data.len(),
                expected
            ));
            return Err(DecodeError::DecodeFailed("short raw planar payload".into()));
        }
        self.last_detail = None;

        let luma = self.luma_size();
        let chroma = self.chroma_size();
        let first = Plane {
            data: data[luma..luma + chroma].to_vec(),
            stride: self.chroma_stride(),
        };
        let second = Plane {
            data: data[luma + chroma..luma + 2 * chroma].to_vec(),
            stride: self.chroma_stride(),
        };
        let (u, v) = if self.swap_uv {
            (second, first)
        } else {
            (first, second)
        };

        self.pending = Some(PlanarImage {
            width: self.width,
            height: self.height,
            y: Plane {
                data: data[..luma].to_vec(),
                stride: self.width,
            },
            u,
            v,
        });
        Ok(())
    }

    fn next_image(&mut self) -> Option<PlanarImage> {
        self.pending.take()
    }

    fn error_detail(&self) -> Option<String> {
        self.last_detail.clone()
    }

    fn reset(&mut self) {
        self.pending = None;
        self.last_detail = None;
    }

    fn name(&self) -> &str {
        "raw-yuv"
    }
}

// ============================================================================
// Tests
// ============================================================================
