use crate::frame::Frame;
use std::collections::VecDeque;
use std::sync::Arc;

pub const HISTORY_CAPACITY: usize = 60;

/// Bounded, insertion-ordered store of recent frames, addressed by age.
/// Age 0 is the most recently pushed entry.
#[derive(Debug, Default)]
pub struct FrameHistory {
    frames: VecDeque<Arc<Frame>>,
}

impl FrameHistory {
    pub fn new() -> Self {
        FrameHistory {
            frames: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, frame: Arc<Frame>) {
        if self.frames.len() == HISTORY_CAPACITY {
            self.frames.pop_back();
        }
        self.frames.push_front(frame);
    }

    pub fn get(&self, age: usize) -> Option<Arc<Frame>> {
        self.frames.get(age).cloned()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
