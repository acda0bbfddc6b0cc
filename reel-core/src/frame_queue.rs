//! # Frame Queue - Bounded Output Frame Cache
//!
//! Fixed pool of reusable display frames decoupling decode rate from
//! render rate:
//! - `request_empty` hands the producer a free slot, or nothing when all
//!   slots are in flight (backpressure, not an error)
//! - `submit` publishes a filled slot in decode order
//! - the consumer pops ready frames and recycles them back into the pool
//!
//! ```text
//! ┌─────────┐ request_empty ┌────────────┐  pop_ready  ┌──────────┐
//! │ Decoder │──────────────►│ FrameQueue │────────────►│ Renderer │
//! └─────────┘    submit     └────────────┘   recycle   └──────────┘
//! ```
//!
//! All operations return immediately; a full queue never blocks the
//! producer and an empty queue never blocks the consumer.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Output Frame
// ============================================================================

/// One display-ready frame slot. The pixel buffer is allocated once when
/// the queue is built and reused for the lifetime of the clip.
#[derive(Debug)]
pub struct OutputFrame {
    /// Presentation time in seconds, an exact multiple of the frame
    /// duration.
    pub time_to_display: f64,
    /// Playback loop pass this frame belongs to.
    pub iteration: u32,
    /// Index of the frame within its loop pass.
    pub frame_index: u64,
    /// Packed pixels, `stride * height * bytes_per_pixel` in size.
    pub data: Vec<u8>,
}

impl OutputFrame {
    fn new(buffer_size: usize) -> Self {
        Self {
            time_to_display: 0.0,
            iteration: 0,
            frame_index: 0,
            data: vec![0u8; buffer_size],
        }
    }

    /// Clear the stamps, keep the allocation.
    fn clear(&mut self) {
        self.time_to_display = 0.0;
        self.iteration = 0;
        self.frame_index = 0;
    }
}

// ============================================================================
// Frame Queue
// ============================================================================

/// Bounded producer/consumer pool of `OutputFrame` slots.
pub struct FrameQueue {
    capacity: usize,
    frame_bytes: usize,
    pool: Mutex<Vec<OutputFrame>>,
    ready: Mutex<VecDeque<OutputFrame>>,
    submitted: AtomicU64,
    popped: AtomicU64,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Build a queue of `capacity` slots, each holding `frame_bytes` of
    /// pixel data.
    pub fn new(capacity: usize, frame_bytes: usize) -> Self {
        let capacity = capacity.max(1);
        let mut pool = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            pool.push(OutputFrame::new(frame_bytes));
        }
        Self {
            capacity,
            frame_bytes,
            pool: Mutex::new(pool),
            ready: Mutex::new(VecDeque::with_capacity(capacity)),
            submitted: AtomicU64::new(0),
            popped: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Producer API
    // ========================================================================

    /// Take a free slot, or None when every slot is either ready or in
    /// flight. The caller fills it and either `submit`s or `recycle`s it.
    pub fn request_empty(&self) -> Option<OutputFrame> {
        self.pool.lock().pop()
    }

    /// Publish a filled slot to the consumer, FIFO in decode order.
    pub fn submit(&self, frame: OutputFrame) {
        self.ready.lock().push_back(frame);
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Hand a slot back unused.
    pub fn recycle(&self, mut frame: OutputFrame) {
        frame.clear();
        self.pool.lock().push(frame);
    }

    // ========================================================================
    // Consumer API
    // ========================================================================

    /// Presentation time of the next ready frame, if any.
    pub fn first_ready_time(&self) -> Option<f64> {
        self.ready.lock().front().map(|f| f.time_to_display)
    }

    /// Pop the next ready frame regardless of its timestamp.
    pub fn pop_ready(&self) -> Option<OutputFrame> {
        let frame = self.ready.lock().pop_front();
        if frame.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Pop the latest frame due at clock time `now`, recycling any older
    /// due frames the consumer fell behind on. Returns None when nothing
    /// is due yet.
    pub fn pop_due(&self, now: f64) -> Option<OutputFrame> {
        let mut stale = Vec::new();
        let due = {
            let mut ready = self.ready.lock();
            let mut due: Option<OutputFrame> = None;
            while ready.front().is_some_and(|f| f.time_to_display <= now) {
                if let Some(frame) = ready.pop_front() {
                    if let Some(previous) = due.replace(frame) {
                        stale.push(previous);
                    }
                }
            }
            due
        };
        for frame in stale {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.recycle(frame);
        }
        if due.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        due
    }

    // ========================================================================
    // Control / Status API
    // ========================================================================

    /// Evict every ready frame back into the pool. Used when a seek makes
    /// pre-decoded frames stale.
    pub fn reset(&self) {
        let drained: Vec<OutputFrame> = {
            let mut ready = self.ready.lock();
            ready.drain(..).collect()
        };
        for frame in drained {
            self.recycle(frame);
        }
    }

    pub fn ready_count(&self) -> usize {
        self.ready.lock().len()
    }

    pub fn free_count(&self) -> usize {
        self.pool.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            ready: self.ready_count(),
            free: self.free_count(),
            submitted: self.submitted.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Queue counters snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub capacity: usize,
    pub ready: usize,
    pub free: usize,
    pub submitted: u64,
    pub popped: u64,
    pub dropped: u64,
}

// ============================================================================
// Tests
// ============================================================================
