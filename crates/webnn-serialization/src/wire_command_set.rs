use std::fmt::Debug;

use crate::command_header::CommandHeader;
use crate::wire_byte_cursor::{WireByteReader, WireByteWriter};
use webnn_structures::WebnnDataError;

/// A closed set of commands travelling in one direction.
///
/// Implemented by [`WireCommand`](crate::WireCommand) (client to server) and
/// [`ReturnWireCommand`](crate::ReturnWireCommand) (server to client). The chunked serializer
/// and the command handler are generic over this trait so both directions share one framing
/// implementation, while each decode loop only recognizes its own discriminants.
pub trait WireCommandSet: Sized + Debug {
    /// Name used in log lines and errors.
    const DIRECTION: &'static str;

    fn command_id(&self) -> u32;

    /// Bytes following the header.
    fn get_payload_byte_count(&self) -> usize;

    fn try_serialize_payload(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError>;

    fn try_deserialize_payload(
        command_id: u32,
        reader: &mut WireByteReader<'_>,
    ) -> Result<Self, WebnnDataError>;

    fn get_command_byte_count(&self) -> usize {
        CommandHeader::BYTE_COUNT + self.get_payload_byte_count()
    }

    /// Writes header and payload into `bytes`, which must be exactly the command's size.
    fn try_serialize_into(&self, bytes: &mut [u8]) -> Result<(), WebnnDataError> {
        let size = self.get_command_byte_count();
        if bytes.len() != size {
            return Err(WebnnDataError::InternalError(format!(
                "{} command {} needs {} bytes, was given {}",
                Self::DIRECTION,
                self.command_id(),
                size,
                bytes.len()
            )));
        }
        let mut writer = WireByteWriter::new(bytes);
        CommandHeader::new(size as u64, self.command_id()).try_serialize_to(&mut writer)?;
        self.try_serialize_payload(&mut writer)?;
        if writer.remaining() != 0 {
            return Err(WebnnDataError::InternalError(format!(
                "{} command {} left {} bytes unwritten",
                Self::DIRECTION,
                self.command_id(),
                writer.remaining()
            )));
        }
        Ok(())
    }

    /// Decodes exactly one complete command. Trailing bytes inside the declared size are an error.
    fn try_deserialize_from_bytes(bytes: &[u8]) -> Result<Self, WebnnDataError> {
        let header = CommandHeader::try_read_from(bytes)?;
        let size = header.try_get_checked_size(bytes.len())?;
        let mut reader = WireByteReader::new(&bytes[CommandHeader::BYTE_COUNT..size]);
        let command = Self::try_deserialize_payload(header.command_id, &mut reader)?;
        if reader.remaining() != 0 {
            return Err(WebnnDataError::DeserializationError(format!(
                "{} command {} has {} unread trailing bytes",
                Self::DIRECTION,
                header.command_id,
                reader.remaining()
            )));
        }
        Ok(command)
    }
}
