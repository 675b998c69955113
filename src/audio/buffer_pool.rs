// BufferPool - lock-free block pool with dual SPSC queues
//
// Implements an object pool pattern using two lock-free SPSC (Single Producer Single Consumer)
// ring buffers to move capture blocks from the audio callback to the analysis thread without
// allocating on the audio thread.
//
// Architecture:
// - DATA_QUEUE: Capture thread pushes filled blocks, analysis thread consumes
// - POOL_QUEUE: Analysis thread returns drained blocks, capture thread recycles
//
// Block flow:
// 1. Capture thread pops an empty block from POOL_QUEUE
// 2. Capture thread copies the callback's samples into it (recording the valid length)
// 3. Capture thread pushes the block to DATA_QUEUE
// 4. Analysis thread pops the block from DATA_QUEUE and feeds the analyzer
// 5. Analysis thread pushes the block back to POOL_QUEUE

use rtrb::{Consumer, Producer};

use crate::config::AudioConfig;

/// Configuration constants for buffer pool
pub const DEFAULT_BUFFER_COUNT: usize = 32;
pub const DEFAULT_BLOCK_CAPACITY: usize = 512;

/// Pre-allocated capture block.
///
/// Devices may deliver fewer samples than the block can hold, so the block
/// tracks how many of its samples are valid.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    samples: Vec<f32>,
    len: usize,
}

impl AudioBlock {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            len: 0,
        }
    }

    /// Copy `input` into the block, truncating to capacity.
    ///
    /// # Returns
    /// Number of samples copied
    pub fn fill_from(&mut self, input: &[f32]) -> usize {
        let count = input.len().min(self.samples.len());
        self.samples[..count].copy_from_slice(&input[..count]);
        self.len = count;
        count
    }

    /// Valid samples
    pub fn as_slice(&self) -> &[f32] {
        &self.samples[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }
}

/// Queue ends owned by the capture callback
pub struct CaptureChannels {
    /// Sends filled blocks to the analysis thread
    pub data_producer: Producer<AudioBlock>,
    /// Retrieves empty blocks for reuse
    pub pool_consumer: Consumer<AudioBlock>,
}

impl CaptureChannels {
    /// Copy one callback's samples into a pooled block and queue it.
    ///
    /// Never blocks or allocates. Returns `false` if no empty block was
    /// available or the data queue was full; the samples are dropped.
    pub fn send(&mut self, samples: &[f32]) -> bool {
        let Ok(mut block) = self.pool_consumer.pop() else {
            return false;
        };
        block.fill_from(samples);
        self.data_producer.push(block).is_ok()
    }
}

/// Queue ends owned by the analysis thread
pub struct AnalysisChannels {
    /// Receives filled blocks from the capture thread
    pub data_consumer: Consumer<AudioBlock>,
    /// Returns drained blocks to the pool
    pub pool_producer: Producer<AudioBlock>,
}

/// All four queue ends, as created by [`BufferPool::new`]
pub struct BufferPoolChannels {
    /// Producer for sending filled audio blocks to analysis thread
    pub data_producer: Producer<AudioBlock>,
    /// Consumer for receiving filled audio blocks in analysis thread
    pub data_consumer: Consumer<AudioBlock>,
    /// Producer for returning empty blocks from analysis thread
    pub pool_producer: Producer<AudioBlock>,
    /// Consumer for retrieving empty blocks in capture thread
    pub pool_consumer: Consumer<AudioBlock>,
}

impl BufferPoolChannels {
    /// Separate the capture-side and analysis-side ends
    pub fn split(self) -> (CaptureChannels, AnalysisChannels) {
        (
            CaptureChannels {
                data_producer: self.data_producer,
                pool_consumer: self.pool_consumer,
            },
            AnalysisChannels {
                data_consumer: self.data_consumer,
                pool_producer: self.pool_producer,
            },
        )
    }
}

/// Lock-free block pool using dual SPSC ring buffers
///
/// Pre-allocates a fixed number of blocks and circulates them through two
/// lock-free queues. All heap allocation happens during initialization.
///
/// # Example
/// ```ignore
/// let (mut capture, mut analysis) = BufferPool::new(32, 512).split();
///
/// // In capture callback:
/// capture.send(&samples);
///
/// // In analysis thread:
/// if let Ok(block) = analysis.data_consumer.pop() {
///     analyzer.process_block(block.as_slice());
///     analysis.pool_producer.push(block).ok();
/// }
/// ```
pub struct BufferPool;

impl BufferPool {
    /// Create a pool with `block_count` blocks of `block_capacity` samples each
    ///
    /// # Panics
    /// Panics if block_count is 0 or block_capacity is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(block_count: usize, block_capacity: usize) -> BufferPoolChannels {
        assert!(block_count > 0, "block_count must be greater than 0");
        assert!(block_capacity > 0, "block_capacity must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(block_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(block_count);

        // Pool queue capacity equals the block count, so every push fits
        for _ in 0..block_count {
            if pool_producer
                .push(AudioBlock::with_capacity(block_capacity))
                .is_err()
            {
                break;
            }
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
        }
    }

    /// Pool sized from the audio section; zero sizes fall back to the defaults
    pub fn from_config(config: &AudioConfig) -> BufferPoolChannels {
        let count = match config.buffer_pool_size {
            0 => DEFAULT_BUFFER_COUNT,
            n => n,
        };
        let capacity = match config.block_size {
            0 => DEFAULT_BLOCK_CAPACITY,
            n => n,
        };
        Self::new(count, capacity)
    }
}
