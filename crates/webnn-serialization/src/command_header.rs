use crate::wire_byte_cursor::{WireByteReader, WireByteWriter};
use webnn_structures::WebnnDataError;

/// Fixed prefix of every command in either direction.
///
/// # Format
/// - `command_size` (8 bytes): size of the whole command, header included
/// - `command_id` (4 bytes): discriminant inside the direction's command set
///
/// # Example
/// ```
/// use webnn_serialization::CommandHeader;
///
/// let header = CommandHeader::new(20, 3);
/// let mut bytes = [0u8; CommandHeader::BYTE_COUNT];
/// header.try_write_to(&mut bytes).unwrap();
/// assert_eq!(CommandHeader::try_read_from(&bytes).unwrap(), header);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub command_size: u64,
    pub command_id: u32,
}

impl CommandHeader {
    pub const BYTE_COUNT: usize = 12; // 1 u64, 1 u32

    /// Command id reserved in both directions for transport-level chunk frames.
    pub const CHUNK_COMMAND_ID: u32 = u32::MAX;

    /// A chunk frame carries the total size of the reassembled command after its header.
    pub const CHUNK_FRAME_OVERHEAD_BYTE_COUNT: usize = Self::BYTE_COUNT + 8;

    pub const fn new(command_size: u64, command_id: u32) -> Self {
        Self {
            command_size,
            command_id,
        }
    }

    pub fn is_chunk(&self) -> bool {
        self.command_id == Self::CHUNK_COMMAND_ID
    }

    pub fn try_read_from(bytes: &[u8]) -> Result<Self, WebnnDataError> {
        if bytes.len() < Self::BYTE_COUNT {
            return Err(WebnnDataError::DeserializationError(format!(
                "Only {} bytes remain, a command header needs {}",
                bytes.len(),
                Self::BYTE_COUNT
            )));
        }
        let mut reader = WireByteReader::new(bytes);
        Ok(Self {
            command_size: reader.try_read_u64()?,
            command_id: reader.try_read_u32()?,
        })
    }

    pub fn try_write_to(&self, bytes: &mut [u8]) -> Result<(), WebnnDataError> {
        let mut writer = WireByteWriter::new(bytes);
        self.try_serialize_to(&mut writer)
    }

    pub fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        writer.try_write_u64(self.command_size)?;
        writer.try_write_u32(self.command_id)
    }

    /// Size of this command as a `usize`, checked against the header size and the bytes that
    /// are actually available.
    pub fn try_get_checked_size(&self, available: usize) -> Result<usize, WebnnDataError> {
        let size = usize::try_from(self.command_size).map_err(|_| {
            WebnnDataError::DeserializationError(format!(
                "Command size {} does not fit this platform",
                self.command_size
            ))
        })?;
        if size < Self::BYTE_COUNT {
            return Err(WebnnDataError::DeserializationError(format!(
                "Command size {} is smaller than its own header",
                size
            )));
        }
        if size > available {
            return Err(WebnnDataError::DeserializationError(format!(
                "Command {} declares {} bytes but only {} remain",
                self.command_id, size, available
            )));
        }
        Ok(size)
    }
}
