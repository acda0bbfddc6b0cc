//! Named clip variants.
//!
//! Container support is pluggable: each variant pairs a cheap head-bytes
//! probe with a constructor. `open_clip` sniffs the stream and hands it
//! to the first variant that recognizes it, so hosts create clips
//! without knowing container types up front.

use std::io::{Read, Seek, SeekFrom};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::clip::{ClipError, ClipSettings, VideoClip};
use crate::demux::{probe_ivf, DemuxError, IvfDemuxer};

/// Seekable byte stream a clip can be opened from.
pub trait ClipSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ClipSource for T {}

/// Concrete reader over a boxed source, so demuxers generic on
/// `Read + Seek` can sit on top of a trait object.
pub struct SourceReader(Box<dyn ClipSource>);

impl SourceReader {
    pub fn new(source: Box<dyn ClipSource>) -> Self {
        Self(source)
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.0.seek(pos)
    }
}

/// One registered container variant.
#[derive(Clone, Copy)]
pub struct ClipVariant {
    pub name: &'static str,
    /// Decides from the first bytes of the stream whether this variant
    /// can handle it.
    pub probe: fn(&[u8]) -> bool,
    pub open: fn(SourceReader, ClipSettings) -> Result<VideoClip, ClipError>,
}

fn open_ivf(source: SourceReader, settings: ClipSettings) -> Result<VideoClip, ClipError> {
    let demuxer = IvfDemuxer::new(source)?;
    VideoClip::load(Box::new(demuxer), settings)
}

static VARIANTS: Lazy<RwLock<Vec<ClipVariant>>> = Lazy::new(|| {
    RwLock::new(vec![ClipVariant {
        name: "ivf",
        probe: probe_ivf,
        open: open_ivf,
    }])
});

/// Add a container variant. Later registrations win ties by being
/// probed first.
pub fn register_variant(variant: ClipVariant) {
    VARIANTS.write().insert(0, variant);
}

pub fn variant_names() -> Vec<&'static str> {
    VARIANTS.read().iter().map(|v| v.name).collect()
}

/// Open a clip from a seekable stream, dispatching on the container's
/// magic bytes.
pub fn open_clip(
    source: Box<dyn ClipSource>,
    settings: ClipSettings,
) -> Result<VideoClip, ClipError> {
    let mut reader = SourceReader::new(source);
    let mut head = [0u8; 16];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..]).map_err(DemuxError::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    reader.seek(SeekFrom::Start(0)).map_err(DemuxError::Io)?;

    let variant = {
        let variants = VARIANTS.read();
        variants
            .iter()
            .find(|v| (v.probe)(&head[..filled]))
            .copied()
    };
    match variant {
        Some(variant) => {
            tracing::debug!(variant = variant.name, "container recognized");
            (variant.open)(reader, settings)
        }
        None => {
            tracing::error!("no registered variant recognizes this container");
            Err(ClipError::UnknownContainer)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
