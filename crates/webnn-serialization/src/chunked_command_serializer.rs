use tracing::{error, trace};

use crate::command_header::CommandHeader;
use crate::command_serializer::CommandSerializer;
use crate::wire_byte_cursor::WireByteWriter;
use crate::wire_command_set::WireCommandSet;
use webnn_structures::WebnnDataError;

/// Encodes commands into a [`CommandSerializer`], splitting anything larger than the transport's
/// maximum allocation into chunk frames.
///
/// A chunk frame is `header(CHUNK_COMMAND_ID) | total_size u64 | payload`. The receiving
/// [`ChunkedCommandHandler`](crate::ChunkedCommandHandler) reassembles the frames before
/// decoding, so nothing above the codec ever sees them.
pub struct ChunkedCommandSerializer {
    serializer: Box<dyn CommandSerializer>,
    scratch: Vec<u8>,
}

impl ChunkedCommandSerializer {
    pub fn new(serializer: Box<dyn CommandSerializer>) -> Self {
        Self {
            serializer,
            scratch: Vec::new(),
        }
    }

    /// Swaps the transport, returning the previous one.
    pub fn replace_serializer(
        &mut self,
        serializer: Box<dyn CommandSerializer>,
    ) -> Box<dyn CommandSerializer> {
        std::mem::replace(&mut self.serializer, serializer)
    }

    pub fn maximum_allocation_size(&self) -> usize {
        self.serializer.maximum_allocation_size()
    }

    pub fn flush(&mut self) -> bool {
        self.serializer.flush()
    }

    /// Serializes one command. Returns `false`, after notifying the transport, when the command
    /// could not be written; the command is dropped in that case.
    pub fn serialize_command<C: WireCommandSet>(&mut self, command: &C) -> bool {
        let size = command.get_command_byte_count();
        let result = if size <= self.serializer.maximum_allocation_size() {
            self.try_serialize_whole(command, size)
        } else {
            self.try_serialize_chunked(command, size)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "Failed to serialize {} command {}: {}",
                    C::DIRECTION,
                    command.command_id(),
                    err
                );
                self.serializer.on_serialize_error();
                false
            }
        }
    }

    fn try_serialize_whole<C: WireCommandSet>(
        &mut self,
        command: &C,
        size: usize,
    ) -> Result<(), WebnnDataError> {
        let space = self.serializer.get_cmd_space(size).ok_or_else(|| {
            WebnnDataError::SerializationError(format!(
                "Transport could not provide {} bytes",
                size
            ))
        })?;
        command.try_serialize_into(space)
    }

    fn try_serialize_chunked<C: WireCommandSet>(
        &mut self,
        command: &C,
        size: usize,
    ) -> Result<(), WebnnDataError> {
        let maximum = self.serializer.maximum_allocation_size();
        if maximum <= CommandHeader::CHUNK_FRAME_OVERHEAD_BYTE_COUNT {
            return Err(WebnnDataError::SerializationError(format!(
                "Maximum allocation size {} cannot carry a chunk frame",
                maximum
            )));
        }
        let chunk_payload_limit = maximum - CommandHeader::CHUNK_FRAME_OVERHEAD_BYTE_COUNT;

        self.scratch.clear();
        self.scratch.resize(size, 0);
        command.try_serialize_into(&mut self.scratch)?;

        let mut chunk_count = 0usize;
        for payload in self.scratch.chunks(chunk_payload_limit) {
            let frame_size = CommandHeader::CHUNK_FRAME_OVERHEAD_BYTE_COUNT + payload.len();
            let space = self.serializer.get_cmd_space(frame_size).ok_or_else(|| {
                WebnnDataError::SerializationError(format!(
                    "Transport could not provide {} bytes for a chunk",
                    frame_size
                ))
            })?;
            let mut writer = WireByteWriter::new(space);
            CommandHeader::new(frame_size as u64, CommandHeader::CHUNK_COMMAND_ID)
                .try_serialize_to(&mut writer)?;
            writer.try_write_u64(size as u64)?;
            writer.try_write_raw(payload)?;
            chunk_count += 1;
        }
        trace!(
            "Split {} command {} of {} bytes into {} chunks",
            C::DIRECTION,
            command.command_id(),
            size,
            chunk_count
        );
        self.scratch.clear();
        Ok(())
    }
}

impl std::fmt::Debug for ChunkedCommandSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedCommandSerializer")
            .field("maximum_allocation_size", &self.maximum_allocation_size())
            .finish()
    }
}
