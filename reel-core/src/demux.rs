// IVF DEMUXER - Pure Rust IVF Parser
//
// IVF is the thin container the VP8/VP9/AV1 reference tools use.
// 32-byte file header, 12-byte frame headers, nothing else.
// Good carrier for block-codec bitstreams and raw planar payloads.

use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DemuxError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an IVF stream")]
    NotIvf,
    #[error("unsupported IVF version {0}")]
    UnsupportedVersion(u16),
    #[error("truncated packet at frame {0}")]
    TruncatedPacket(u64),
    #[error("seek past end of stream (frame {0})")]
    SeekPastEnd(u64),
    #[error("stream carries no usable timebase")]
    BadTimebase,
}

// ============================================================================
// Demuxer Seam
// ============================================================================

/// One compressed frame worth of container payload.
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Bytes,
    /// Position of this packet in container order.
    pub frame_index: u64,
    /// Container timestamp, in timebase units.
    pub pts: u64,
}

/// Frame rate as the container's rational, kept exact so frame timing
/// can be derived without float accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub numerator: u32,
    pub denominator: u32,
}

impl Framerate {
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// Container demuxing seam: per-packet read, rewind, random access,
/// stream metadata.
pub trait Demuxer: Send {
    /// Next compressed packet, or Ok(None) at end of stream.
    fn read_packet(&mut self) -> Result<Option<Packet>, DemuxError>;

    /// Back to the first packet.
    fn rewind(&mut self) -> Result<(), DemuxError>;

    /// Reposition so the next `read_packet` returns frame `index`.
    fn seek_to_frame(&mut self, index: u64) -> Result<(), DemuxError>;

    /// Frame rate as declared by (or derived from) the container.
    fn guess_framerate(&self) -> Result<Framerate, DemuxError>;

    /// Total frame count, scanning the stream if the container header
    /// does not carry one.
    fn guess_frame_count(&mut self) -> Result<u64, DemuxError>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fourcc(&self) -> u32;
    fn name(&self) -> &str;
}

// ============================================================================
// IVF Constants
// ============================================================================

const DKIF: [u8; 4] = *b"DKIF";
const FILE_HEADER_LEN: usize = 32;
const FRAME_HEADER_LEN: usize = 12;

/// True when the head bytes look like an IVF file. Used by the clip
/// registry to pick a container variant.
pub fn probe_ivf(head: &[u8]) -> bool {
    head.len() >= 4 && head[..4] == DKIF
}

/// Render a fourcc for log messages, falling back to hex for
/// unprintable codes.
pub fn fourcc_string(fourcc: u32) -> String {
    let bytes = fourcc.to_le_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        format!("{fourcc:#010x}")
    }
}

// ============================================================================
// IVF Demuxer
// ============================================================================

#[derive(Debug)]
pub struct IvfDemuxer<R: Read + Seek> {
    reader: R,
    fourcc: u32,
    width: u16,
    height: u16,
    /// Timebase: `rate / scale` frames per second.
    rate: u32,
    scale: u32,
    /// Frame count from the file header; 0 means unknown.
    frame_count_hint: u32,
    data_start: u64,
    next_index: u64,
}

impl<R: Read + Seek> IvfDemuxer<R> {
    pub fn new(mut reader: R) -> Result<Self, DemuxError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; FILE_HEADER_LEN];
        reader.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DemuxError::NotIvf
            } else {
                DemuxError::Io(e)
            }
        })?;

        if header[..4] != DKIF {
            return Err(DemuxError::NotIvf);
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != 0 {
            return Err(DemuxError::UnsupportedVersion(version));
        }
        let header_len = u16::from_le_bytes([header[6], header[7]]) as u64;
        let data_start = header_len.max(FILE_HEADER_LEN as u64);

        reader.seek(SeekFrom::Start(data_start))?;
        Ok(Self {
            fourcc: u32::from_le_bytes([header[8], header[9], header[10], header[11]]),
            width: u16::from_le_bytes([header[12], header[13]]),
            height: u16::from_le_bytes([header[14], header[15]]),
            rate: u32::from_le_bytes([header[16], header[17], header[18], header[19]]),
            scale: u32::from_le_bytes([header[20], header[21], header[22], header[23]]),
            frame_count_hint: u32::from_le_bytes([header[24], header[25], header[26], header[27]]),
            data_start,
            next_index: 0,
            reader,
        })
    }

    /// Read a 12-byte frame header. Ok(None) on a clean end of stream.
    fn read_frame_header(&mut self) -> Result<Option<(u32, u64)>, DemuxError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let mut filled = 0;
        while filled < FRAME_HEADER_LEN {
            let n = self.reader.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_HEADER_LEN {
            return Err(DemuxError::TruncatedPacket(self.next_index));
        }
        let size = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let pts = u64::from_le_bytes([
            header[4], header[5], header[6], header[7], header[8], header[9], header[10],
            header[11],
        ]);
        Ok(Some((size, pts)))
    }
}

impl<R: Read + Seek + Send> Demuxer for IvfDemuxer<R> {
    fn read_packet(&mut self) -> Result<Option<Packet>, DemuxError> {
        let Some((size, pts)) = self.read_frame_header()? else {
            return Ok(None);
        };
        let mut payload = vec![0u8; size as usize];
        self.reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DemuxError::TruncatedPacket(self.next_index)
            } else {
                DemuxError::Io(e)
            }
        })?;
        let packet = Packet {
            data: Bytes::from(payload),
            frame_index: self.next_index,
            pts,
        };
        self.next_index += 1;
        Ok(Some(packet))
    }

    fn rewind(&mut self) -> Result<(), DemuxError> {
        self.reader.seek(SeekFrom::Start(self.data_start))?;
        self.next_index = 0;
        Ok(())
    }

    fn seek_to_frame(&mut self, index: u64) -> Result<(), DemuxError> {
        if index < self.next_index {
            self.rewind()?;
        }
        while self.next_index < index {
            let Some((size, _)) = self.read_frame_header()? else {
                return Err(DemuxError::SeekPastEnd(index));
            };
            self.reader.seek(SeekFrom::Current(size as i64))?;
            self.next_index += 1;
        }
        Ok(())
    }

    fn guess_framerate(&self) -> Result<Framerate, DemuxError> {
        if self.rate == 0 || self.scale == 0 {
            return Err(DemuxError::BadTimebase);
        }
        Ok(Framerate {
            numerator: self.rate,
            denominator: self.scale,
        })
    }

    fn guess_frame_count(&mut self) -> Result<u64, DemuxError> {
        if self.frame_count_hint > 0 {
            return Ok(self.frame_count_hint as u64);
        }
        // Header count missing; walk the frame headers once.
        self.rewind()?;
        let mut count = 0u64;
        while let Some((size, _)) = self.read_frame_header()? {
            self.reader.seek(SeekFrom::Current(size as i64))?;
            self.next_index += 1;
            count += 1;
        }
        self.rewind()?;
        Ok(count)
    }

    fn width(&self) -> u32 {
        self.width as u32
    }

    fn height(&self) -> u32 {
        self.height as u32
    }

    fn fourcc(&self) -> u32 {
        self.fourcc
    }

    fn name(&self) -> &str {
        "ivf"
    }
}

// ============================================================================
// Tests
// ============================================================================
