use tracing::trace;

use crate::command_header::CommandHeader;
use crate::wire_byte_cursor::WireByteReader;
use crate::wire_command_set::WireCommandSet;
use webnn_structures::WebnnDataError;

/// Walks a received byte stream command by command, reassembling chunk frames, and hands each
/// decoded command to a dispatcher.
///
/// Any framing or decoding error, and any dispatcher error, aborts the rest of the stream: the
/// true length of a malformed command cannot be trusted, so nothing after it can be either. A
/// chunked command may span several calls to [`handle_commands`](Self::handle_commands).
#[derive(Debug, Default)]
pub struct ChunkedCommandHandler {
    chunked_command: Vec<u8>,
    chunked_command_size: usize,
}

impl ChunkedCommandHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a chunked command has started but not all of its bytes have arrived.
    pub fn is_receiving_chunks(&self) -> bool {
        self.chunked_command_size != 0
    }

    /// Decodes every command in `bytes` and calls `dispatch` on each, in stream order.
    ///
    /// # Example
    /// ```
    /// use webnn_serialization::{ChunkedCommandHandler, WireCommand, WireCommandSet};
    /// use webnn_structures::ObjectType;
    ///
    /// let command = WireCommand::DestroyObject { object_type: ObjectType::Graph, object_id: 4 };
    /// let mut bytes = vec![0u8; command.get_command_byte_count()];
    /// command.try_serialize_into(&mut bytes).unwrap();
    ///
    /// let mut handler = ChunkedCommandHandler::new();
    /// let mut received = Vec::new();
    /// handler
    ///     .handle_commands::<WireCommand, _, webnn_structures::WebnnDataError>(&bytes, |c| {
    ///         received.push(c);
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(received, vec![command]);
    /// ```
    pub fn handle_commands<C, F, E>(&mut self, bytes: &[u8], mut dispatch: F) -> Result<(), E>
    where
        C: WireCommandSet,
        F: FnMut(C) -> Result<(), E>,
        E: From<WebnnDataError>,
    {
        let result = self.handle_commands_impl(bytes, &mut dispatch);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn handle_commands_impl<C, F, E>(&mut self, bytes: &[u8], dispatch: &mut F) -> Result<(), E>
    where
        C: WireCommandSet,
        F: FnMut(C) -> Result<(), E>,
        E: From<WebnnDataError>,
    {
        let mut offset = 0usize;
        while offset < bytes.len() {
            let remaining = &bytes[offset..];
            let header = CommandHeader::try_read_from(remaining)?;
            let size = header.try_get_checked_size(remaining.len())?;
            let command_bytes = &remaining[..size];

            if header.is_chunk() {
                if self.try_append_chunk(&command_bytes[CommandHeader::BYTE_COUNT..])? {
                    let assembled = std::mem::take(&mut self.chunked_command);
                    self.chunked_command_size = 0;
                    let command = C::try_deserialize_from_bytes(&assembled);
                    // Keep the allocation for the next chunked command.
                    self.chunked_command = assembled;
                    self.chunked_command.clear();
                    dispatch(command?)?;
                }
            } else {
                if self.is_receiving_chunks() {
                    return Err(WebnnDataError::DeserializationError(format!(
                        "{} command {} arrived in the middle of a chunked command",
                        C::DIRECTION,
                        header.command_id
                    ))
                    .into());
                }
                dispatch(C::try_deserialize_from_bytes(command_bytes)?)?;
            }
            offset += size;
        }
        Ok(())
    }

    /// Appends one chunk payload. Returns `true` once the whole command has been assembled.
    fn try_append_chunk(&mut self, chunk: &[u8]) -> Result<bool, WebnnDataError> {
        let mut reader = WireByteReader::new(chunk);
        let total_size = reader.try_read_usize()?;
        let payload = &chunk[reader.position()..];

        if self.is_receiving_chunks() {
            if total_size != self.chunked_command_size {
                return Err(WebnnDataError::DeserializationError(format!(
                    "Chunk declares a total of {} bytes, expected {}",
                    total_size, self.chunked_command_size
                )));
            }
        } else {
            if total_size < CommandHeader::BYTE_COUNT {
                return Err(WebnnDataError::DeserializationError(format!(
                    "Chunked command of {} bytes cannot hold a header",
                    total_size
                )));
            }
            self.chunked_command_size = total_size;
            self.chunked_command.clear();
        }

        let assembled_size = self.chunked_command.len() + payload.len();
        if assembled_size > self.chunked_command_size {
            return Err(WebnnDataError::DeserializationError(format!(
                "Chunks overflow the declared command size {} (got {})",
                self.chunked_command_size, assembled_size
            )));
        }
        self.chunked_command.extend_from_slice(payload);
        trace!(
            "Received chunk, {} of {} bytes assembled",
            self.chunked_command.len(),
            self.chunked_command_size
        );
        Ok(self.chunked_command.len() == self.chunked_command_size)
    }

    fn reset(&mut self) {
        self.chunked_command.clear();
        self.chunked_command_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireCommand;
    use webnn_structures::ObjectType;

    fn encode(command: &WireCommand) -> Vec<u8> {
        let mut bytes = vec![0u8; command.get_command_byte_count()];
        command.try_serialize_into(&mut bytes).unwrap();
        bytes
    }

    fn chunk_frame(total_size: u64, payload: &[u8]) -> Vec<u8> {
        let size = CommandHeader::CHUNK_FRAME_OVERHEAD_BYTE_COUNT + payload.len();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(size as u64).to_le_bytes());
        bytes.extend_from_slice(&CommandHeader::CHUNK_COMMAND_ID.to_le_bytes());
        bytes.extend_from_slice(&total_size.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_chunks_across_calls_are_reassembled() {
        let command = WireCommand::DestroyObject {
            object_type: ObjectType::Operand,
            object_id: 9,
        };
        let encoded = encode(&command);
        let (first, second) = encoded.split_at(5);

        let mut handler = ChunkedCommandHandler::new();
        let mut received = Vec::new();
        handler
            .handle_commands::<WireCommand, _, WebnnDataError>(
                &chunk_frame(encoded.len() as u64, first),
                |c| {
                    received.push(c);
                    Ok(())
                },
            )
            .unwrap();
        assert!(received.is_empty());
        assert!(handler.is_receiving_chunks());

        handler
            .handle_commands::<WireCommand, _, WebnnDataError>(
                &chunk_frame(encoded.len() as u64, second),
                |c| {
                    received.push(c);
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(received, vec![command]);
        assert!(!handler.is_receiving_chunks());
    }

    #[test]
    fn test_overflowing_chunk_is_fatal() {
        let mut handler = ChunkedCommandHandler::new();
        let result = handler.handle_commands::<WireCommand, _, WebnnDataError>(
            &chunk_frame(12, &[0u8; 13]),
            |_| Ok(()),
        );
        assert!(result.is_err());
        assert!(!handler.is_receiving_chunks());
    }

    #[test]
    fn test_plain_command_inside_chunk_sequence_is_fatal() {
        let command = WireCommand::DestroyObject {
            object_type: ObjectType::Operand,
            object_id: 9,
        };
        let encoded = encode(&command);
        let mut stream = chunk_frame(encoded.len() as u64, &encoded[..4]);
        stream.extend_from_slice(&encoded);

        let mut handler = ChunkedCommandHandler::new();
        let result =
            handler.handle_commands::<WireCommand, _, WebnnDataError>(&stream, |_| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn test_dispatch_failure_stops_the_stream() {
        let command = WireCommand::DestroyObject {
            object_type: ObjectType::Graph,
            object_id: 1,
        };
        let mut stream = encode(&command);
        stream.extend_from_slice(&encode(&command));

        let mut handler = ChunkedCommandHandler::new();
        let mut calls = 0;
        let result = handler.handle_commands::<WireCommand, _, WebnnDataError>(&stream, |_| {
            calls += 1;
            Err(WebnnDataError::BadParameters("rejected".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
