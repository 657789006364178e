use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{WireError, WireResult};

/// Caller owned output memory registered with [`NamedOutputs::set_output`].
///
/// The client keeps a clone of the view and writes compute results into
/// `buffer[byte_offset..byte_offset + byte_length]` when they arrive. The caller reads them back
/// through its own clone.
///
/// [`NamedOutputs::set_output`]: crate::client::NamedOutputs::set_output
#[derive(Debug, Clone)]
pub struct ArrayBufferView {
    buffer: Arc<Mutex<Vec<u8>>>,
    byte_offset: usize,
    byte_length: usize,
}

impl ArrayBufferView {
    /// A view covering a new zeroed buffer of `byte_length` bytes.
    pub fn new(byte_length: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(vec![0u8; byte_length])),
            byte_offset: 0,
            byte_length,
        }
    }

    /// A view over part of an existing shared buffer.
    pub fn with_buffer(buffer: Arc<Mutex<Vec<u8>>>, byte_offset: usize, byte_length: usize) -> Self {
        Self {
            buffer,
            byte_offset,
            byte_length,
        }
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn buffer(&self) -> &Arc<Mutex<Vec<u8>>> {
        &self.buffer
    }

    /// Copy of the bytes the view covers. Empty if the view no longer fits its buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let Some(end) = self.byte_offset.checked_add(self.byte_length) else {
            return Vec::new();
        };
        let buffer = self.buffer.lock();
        buffer
            .get(self.byte_offset..end)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// Writes `source[source_offset..source_offset + length]` to the start of the view.
    pub(crate) fn try_copy_from(
        &self,
        source: &[u8],
        source_offset: u64,
        length: u64,
    ) -> WireResult<()> {
        let out_of_bounds = || {
            WireError::FatalStream(format!(
                "Output of {} bytes at offset {} does not fit source of {} bytes and view of {} bytes",
                length,
                source_offset,
                source.len(),
                self.byte_length
            ))
        };
        let start = usize::try_from(source_offset).map_err(|_| out_of_bounds())?;
        let length = usize::try_from(length).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(length).ok_or_else(out_of_bounds)?;
        let data = source.get(start..end).ok_or_else(out_of_bounds)?;
        if length > self.byte_length {
            return Err(out_of_bounds());
        }

        let target_end = self
            .byte_offset
            .checked_add(length)
            .ok_or_else(out_of_bounds)?;
        let mut buffer = self.buffer.lock();
        let target = buffer
            .get_mut(self.byte_offset..target_end)
            .ok_or_else(out_of_bounds)?;
        target.copy_from_slice(data);
        Ok(())
    }
}
