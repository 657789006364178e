use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Transport seam: hands out contiguous space for encoded commands and ships it on flush.
///
/// Implementations decide where the bytes go (shared memory, a pipe, an in-process queue). The
/// codec never holds a region across calls, so an implementation may recycle its buffer after
/// every `flush`.
pub trait CommandSerializer: Send {
    /// Returns exactly `size` writable bytes, or `None` when the transport cannot provide them.
    fn get_cmd_space(&mut self, size: usize) -> Option<&mut [u8]>;

    /// Ships everything written since the previous flush. Returns `false` on transport failure.
    fn flush(&mut self) -> bool;

    /// Largest region `get_cmd_space` can return. Larger commands are chunked.
    fn maximum_allocation_size(&self) -> usize;

    /// Called when a command could not be serialized and was dropped.
    fn on_serialize_error(&mut self) {}
}

//region Buffered

/// Queue of flushed frames shared between a [`BufferedCommandSerializer`] and whoever delivers
/// the bytes to the peer.
#[derive(Debug, Clone, Default)]
pub struct FlushedCommands {
    frames: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl FlushedCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_front(&self) -> Option<Vec<u8>> {
        self.frames.lock().pop_front()
    }

    /// Takes every queued frame, oldest first.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.frames.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    fn push_back(&self, frame: Vec<u8>) {
        self.frames.lock().push_back(frame);
    }
}

/// In-memory transport: commands accumulate in a growable buffer and each flush moves them to a
/// [`FlushedCommands`] queue as one frame.
///
/// # Example
/// ```
/// use webnn_serialization::{BufferedCommandSerializer, CommandSerializer};
///
/// let mut serializer = BufferedCommandSerializer::new(1024);
/// let frames = serializer.flushed_commands();
/// serializer.get_cmd_space(16).unwrap().fill(7);
/// assert!(serializer.flush());
/// assert_eq!(frames.drain(), vec![vec![7u8; 16]]);
/// ```
#[derive(Debug)]
pub struct BufferedCommandSerializer {
    buffer: Vec<u8>,
    maximum_allocation_size: usize,
    flushed: FlushedCommands,
    serialize_error_count: usize,
}

impl BufferedCommandSerializer {
    pub fn new(maximum_allocation_size: usize) -> Self {
        Self::with_flushed_commands(maximum_allocation_size, FlushedCommands::new())
    }

    pub fn with_flushed_commands(maximum_allocation_size: usize, flushed: FlushedCommands) -> Self {
        Self {
            buffer: Vec::new(),
            maximum_allocation_size,
            flushed,
            serialize_error_count: 0,
        }
    }

    /// Handle to the queue this serializer flushes into.
    pub fn flushed_commands(&self) -> FlushedCommands {
        self.flushed.clone()
    }

    pub fn get_number_of_pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_serialize_error_count(&self) -> usize {
        self.serialize_error_count
    }
}

impl CommandSerializer for BufferedCommandSerializer {
    fn get_cmd_space(&mut self, size: usize) -> Option<&mut [u8]> {
        if size > self.maximum_allocation_size {
            return None;
        }
        let start = self.buffer.len();
        self.buffer.resize(start + size, 0);
        Some(&mut self.buffer[start..])
    }

    fn flush(&mut self) -> bool {
        if !self.buffer.is_empty() {
            self.flushed.push_back(std::mem::take(&mut self.buffer));
        }
        true
    }

    fn maximum_allocation_size(&self) -> usize {
        self.maximum_allocation_size
    }

    fn on_serialize_error(&mut self) {
        self.serialize_error_count += 1;
    }
}

//endregion

//region Noop

/// Sink that accepts and discards everything. Installed when a client disconnects so that
/// later calls on live proxies are harmless.
#[derive(Debug, Default)]
pub struct NoopCommandSerializer {
    scratch: Vec<u8>,
}

impl NoopCommandSerializer {
    /// Keeps the scratch buffer bounded. Larger commands arrive here as chunks.
    pub const MAXIMUM_ALLOCATION_SIZE: usize = 64 * 1024;
}

impl CommandSerializer for NoopCommandSerializer {
    fn get_cmd_space(&mut self, size: usize) -> Option<&mut [u8]> {
        if size > Self::MAXIMUM_ALLOCATION_SIZE {
            return None;
        }
        self.scratch.resize(size, 0);
        Some(&mut self.scratch[..size])
    }

    fn flush(&mut self) -> bool {
        true
    }

    fn maximum_allocation_size(&self) -> usize {
        Self::MAXIMUM_ALLOCATION_SIZE
    }
}

//endregion
