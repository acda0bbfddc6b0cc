//! Synchronized audio packet hand-off.
//!
//! Audio decoding happens elsewhere; decoded packets land here with their
//! presentation time and are flushed to the attached sink once the
//! playback clock catches up to them.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// External audio output seam. Implementations mix or queue the samples
/// for device playback.
pub trait AudioSink: Send {
    /// Hand over interleaved f32 samples for playback.
    fn queue_samples(&mut self, samples: &[f32]);
}

/// Decoded audio packet with its presentation time in seconds.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub samples: Vec<f32>,
    pub start_time: f64,
}

/// Time-ordered queue of decoded audio packets. The mutex is held only
/// while packets are moved in or out, never across sink calls.
pub struct AudioPacketQueue {
    packets: Mutex<VecDeque<AudioPacket>>,
}

impl AudioPacketQueue {
    pub fn new() -> Self {
        Self {
            packets: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, packet: AudioPacket) {
        self.packets.lock().push_back(packet);
    }

    /// Deliver every packet whose presentation time is at or before
    /// `now` to the sink, in order. Returns the number of packets
    /// flushed.
    pub fn flush_synchronized(&self, sink: &mut dyn AudioSink, now: f64) -> usize {
        let due: Vec<AudioPacket> = {
            let mut packets = self.packets.lock();
            let mut due = Vec::new();
            while packets.front().is_some_and(|p| p.start_time <= now) {
                if let Some(packet) = packets.pop_front() {
                    due.push(packet);
                }
            }
            due
        };
        let count = due.len();
        for packet in due {
            sink.queue_samples(&packet.samples);
        }
        count
    }

    pub fn clear(&self) {
        self.packets.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.lock().is_empty()
    }
}

impl Default for AudioPacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
