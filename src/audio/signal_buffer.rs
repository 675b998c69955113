// SignalBuffer - reassembles irregular capture blocks into fixed analysis windows
//
// Capture callbacks deliver blocks of whatever size the device chooses. The
// estimators need exactly N contiguous samples, so blocks are appended at a
// write cursor until the window is full. A full window is handed out once
// and the cursor returns to zero. Samples that do not fit in the remaining
// space of a call are dropped rather than wrapped into the next window.

use super::level::rms;

/// Result of pushing one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockOutput<'a> {
    /// RMS of the whole incoming block, including any truncated tail
    pub rms: f32,
    /// Completed analysis window, if this block filled it
    pub window: Option<&'a [f32]>,
}

/// Fixed-capacity window accumulator
///
/// The backing storage is allocated once in [`SignalBuffer::new`]; `push`
/// never allocates.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    samples: Vec<f32>,
    cursor: usize,
}

impl SignalBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Samples accumulated toward the next window
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Append a block, returning its RMS and the completed window if any.
    ///
    /// # Arguments
    /// * `block` - Captured samples of any length
    ///
    /// # Returns
    /// The window slice borrows the buffer and is valid until the next push
    pub fn push(&mut self, block: &[f32]) -> BlockOutput<'_> {
        let level = rms(block);
        let capacity = self.samples.len();
        let take = block.len().min(capacity - self.cursor);
        self.samples[self.cursor..self.cursor + take].copy_from_slice(&block[..take]);
        self.cursor += take;

        if capacity > 0 && self.cursor == capacity {
            self.cursor = 0;
            BlockOutput {
                rms: level,
                window: Some(&self.samples),
            }
        } else {
            BlockOutput {
                rms: level,
                window: None,
            }
        }
    }

    /// Discard any partial window
    pub fn clear(&mut self) {
        self.cursor = 0;
    }
}
