//! Looping playback segments shared with the render callback.
//!
//! The producer hands over fully written, immutable segments; the render
//! side never sees a segment that is still being filled. Scheduled segments
//! play in order, each swap happening at a loop boundary so successive
//! segments join without a gap. The last segment repeats while nothing else
//! is queued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::utils::lock_unpoisoned;

/// Segments waiting behind the current one. When full, the oldest waiting
/// segment is discarded.
pub const MAX_PENDING_SEGMENTS: usize = 64;

#[derive(Default)]
struct QueueState {
    current: Option<Arc<[f32]>>,
    pending: VecDeque<Arc<[f32]>>,
    /// Fractional read position inside `current`
    cursor: f64,
}

impl QueueState {
    fn promote_pending(&mut self) {
        if let Some(next) = self.pending.pop_front() {
            self.current = Some(next);
        }
    }

    fn next_sample(&mut self, step: f64) -> f32 {
        if self.current.is_none() {
            self.promote_pending();
            self.cursor = 0.0;
        }
        let Some(segment) = self.current.clone() else {
            return 0.0;
        };

        let index = self.cursor as usize;
        let frac = (self.cursor - index as f64) as f32;
        let a = segment[index];
        // Past the last sample, lean toward whatever plays next
        let b = match segment.get(index + 1) {
            Some(b) => *b,
            None => self.pending.front().map_or(segment[0], |next| next[0]),
        };
        let value = a + (b - a) * frac;

        self.cursor += step;
        while let Some(len) = self.current.as_ref().map(|s| s.len() as f64) {
            if self.cursor < len {
                break;
            }
            self.cursor -= len;
            self.promote_pending();
        }
        value
    }
}

#[derive(Default)]
pub struct SegmentQueue {
    state: Mutex<QueueState>,
}

impl SegmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        lock_unpoisoned(&self.state)
    }

    /// Appends `segment` after everything already scheduled. Empty segments
    /// are ignored.
    pub fn schedule(&self, segment: Arc<[f32]>) {
        if segment.is_empty() {
            return;
        }
        let mut state = self.lock();
        if state.current.is_none() {
            state.current = Some(segment);
            state.cursor = 0.0;
            return;
        }
        if state.pending.len() >= MAX_PENDING_SEGMENTS {
            state.pending.pop_front();
            debug!("Playback queue full, dropped oldest waiting segment");
        }
        state.pending.push_back(segment);
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.current.is_none() && state.pending.is_empty()
    }

    /// Segments scheduled but not yet reached
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Fills an interleaved output buffer of `channels` channels. `step` is
    /// the source-to-device sample-rate ratio; every channel gets the same
    /// mono sample. Silence is written while nothing has been scheduled.
    pub fn render(&self, out: &mut [f32], channels: usize, step: f64) {
        let channels = channels.max(1);
        let mut state = self.lock();
        for frame in out.chunks_mut(channels) {
            let value = state.next_sample(step);
            frame.fill(value);
        }
    }
}
