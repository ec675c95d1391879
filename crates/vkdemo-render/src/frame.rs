// SPDX-License-Identifier: CEPL-1.0

/// Fixed-size ring of per-frame slots, advanced once per presented frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameRing {
    index: usize,
    len: usize,
}

impl FrameRing {
    /// `len` is clamped to at least one slot.
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len: len.max(1),
        }
    }

    pub fn current(&self) -> usize {
        self.index
    }

    /// Move to the next slot and return it.
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % self.len;
        self.index
    }
}

/// Monotonic source of timeline-semaphore signal values.
///
/// Starts at zero (the semaphores' initial value); the first value handed out is 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimelineCounter {
    value: u64,
}

impl TimelineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value handed out, or 0 if none yet.
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn next_value(&mut self) -> u64 {
        self.value += 1;
        self.value
    }
}
