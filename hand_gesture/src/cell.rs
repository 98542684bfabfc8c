//! Latest-value handoff between the capture thread and the game loop.
//!
//! The producer overwrites; the consumer takes. Only the most recent frame is
//! kept, so a slow consumer never sees a backlog, and the game thread never
//! blocks on capture.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::frame::HandFrame;

#[derive(Debug, Default)]
struct Slot {
    frame:       Option<HandFrame>,
    published:   u64,
    overwritten: u64,
}

/// Single-slot frame cell, cheap to clone (shared handle).
#[derive(Clone, Debug, Default)]
pub struct FrameCell {
    inner: Arc<Mutex<Slot>>,
}

impl FrameCell {
    pub fn new() -> Self {
        FrameCell::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicked producer leaves a valid frame behind; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the pending frame.
    pub fn publish(&self, frame: HandFrame) {
        let mut slot = self.lock();
        if slot.frame.is_some() {
            slot.overwritten += 1;
        }
        slot.frame = Some(frame);
        slot.published += 1;
    }

    /// Take the pending frame, if a new one arrived since the last take.
    pub fn take(&self) -> Option<HandFrame> {
        self.lock().frame.take()
    }

    /// (frames published, frames overwritten before being taken).
    pub fn stats(&self) -> (u64, u64) {
        let slot = self.lock();
        (slot.published, slot.overwritten)
    }
}
