//! Commands sent from the server back to the client.

use serde::{Deserialize, Serialize};

use crate::wire_byte_cursor::{
    sized_bytes_byte_count, sized_string_byte_count, WireByteReader, WireByteWriter,
};
use crate::wire_command_set::WireCommandSet;
use webnn_structures::{define_wire_enum, ErrorType, ObjectHandle, WebnnDataError};

const HANDLE: usize = ObjectHandle::NUMBER_BYTES;

define_wire_enum! {
    /// Discriminants of the server to client command set.
    pub enum ReturnWireCommandId {
        ContextPopErrorScopeCallback = 0,
        ContextUncapturedErrorCallback = 1,
        ContextComputeCallback = 2,
        ContextComputeResult = 3,
        GraphComputeAsyncCallback = 4,
    }
}

/// One server to client command, delivering the result of an earlier asynchronous request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnWireCommand {
    ContextPopErrorScopeCallback {
        context: ObjectHandle,
        request_serial: u64,
        error_type: ErrorType,
        message: String,
    },
    ContextUncapturedErrorCallback {
        context: ObjectHandle,
        error_type: ErrorType,
        message: String,
    },
    ContextComputeCallback {
        context: ObjectHandle,
        request_serial: u64,
        error_type: ErrorType,
        message: String,
    },
    /// One named output tensor. `buffer[byte_offset..byte_offset + byte_length]` is the result.
    ContextComputeResult {
        named_outputs: ObjectHandle,
        byte_length: u64,
        byte_offset: u64,
        name: String,
        buffer: Vec<u8>,
    },
    GraphComputeAsyncCallback {
        graph: ObjectHandle,
        request_serial: u64,
        error_type: ErrorType,
        message: String,
    },
}

impl ReturnWireCommand {
    pub fn id(&self) -> ReturnWireCommandId {
        match self {
            ReturnWireCommand::ContextPopErrorScopeCallback { .. } => {
                ReturnWireCommandId::ContextPopErrorScopeCallback
            }
            ReturnWireCommand::ContextUncapturedErrorCallback { .. } => {
                ReturnWireCommandId::ContextUncapturedErrorCallback
            }
            ReturnWireCommand::ContextComputeCallback { .. } => {
                ReturnWireCommandId::ContextComputeCallback
            }
            ReturnWireCommand::ContextComputeResult { .. } => {
                ReturnWireCommandId::ContextComputeResult
            }
            ReturnWireCommand::GraphComputeAsyncCallback { .. } => {
                ReturnWireCommandId::GraphComputeAsyncCallback
            }
        }
    }
}

impl WireCommandSet for ReturnWireCommand {
    const DIRECTION: &'static str = "Return";

    fn command_id(&self) -> u32 {
        self.id().as_u32()
    }

    fn get_payload_byte_count(&self) -> usize {
        match self {
            ReturnWireCommand::ContextPopErrorScopeCallback { message, .. }
            | ReturnWireCommand::ContextComputeCallback { message, .. } => {
                HANDLE + 8 + 4 + sized_string_byte_count(message)
            }
            ReturnWireCommand::GraphComputeAsyncCallback { message, .. } => {
                HANDLE + 8 + 4 + sized_string_byte_count(message)
            }
            ReturnWireCommand::ContextUncapturedErrorCallback { message, .. } => {
                HANDLE + 4 + sized_string_byte_count(message)
            }
            ReturnWireCommand::ContextComputeResult { name, buffer, .. } => {
                HANDLE + 16 + sized_string_byte_count(name) + sized_bytes_byte_count(buffer)
            }
        }
    }

    fn try_serialize_payload(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        match self {
            ReturnWireCommand::ContextPopErrorScopeCallback {
                context: target,
                request_serial,
                error_type,
                message,
            }
            | ReturnWireCommand::ContextComputeCallback {
                context: target,
                request_serial,
                error_type,
                message,
            }
            | ReturnWireCommand::GraphComputeAsyncCallback {
                graph: target,
                request_serial,
                error_type,
                message,
            } => {
                writer.try_write_handle(*target)?;
                writer.try_write_u64(*request_serial)?;
                writer.try_write_u32(error_type.as_u32())?;
                writer.try_write_string(message)
            }
            ReturnWireCommand::ContextUncapturedErrorCallback {
                context,
                error_type,
                message,
            } => {
                writer.try_write_handle(*context)?;
                writer.try_write_u32(error_type.as_u32())?;
                writer.try_write_string(message)
            }
            ReturnWireCommand::ContextComputeResult {
                named_outputs,
                byte_length,
                byte_offset,
                name,
                buffer,
            } => {
                writer.try_write_handle(*named_outputs)?;
                writer.try_write_u64(*byte_length)?;
                writer.try_write_u64(*byte_offset)?;
                writer.try_write_string(name)?;
                writer.try_write_bytes(buffer)
            }
        }
    }

    fn try_deserialize_payload(
        command_id: u32,
        reader: &mut WireByteReader<'_>,
    ) -> Result<Self, WebnnDataError> {
        let command = match ReturnWireCommandId::try_from(command_id)? {
            ReturnWireCommandId::ContextPopErrorScopeCallback => {
                ReturnWireCommand::ContextPopErrorScopeCallback {
                    context: reader.try_read_handle()?,
                    request_serial: reader.try_read_u64()?,
                    error_type: ErrorType::try_from(reader.try_read_u32()?)?,
                    message: reader.try_read_string()?,
                }
            }
            ReturnWireCommandId::ContextUncapturedErrorCallback => {
                ReturnWireCommand::ContextUncapturedErrorCallback {
                    context: reader.try_read_handle()?,
                    error_type: ErrorType::try_from(reader.try_read_u32()?)?,
                    message: reader.try_read_string()?,
                }
            }
            ReturnWireCommandId::ContextComputeCallback => {
                ReturnWireCommand::ContextComputeCallback {
                    context: reader.try_read_handle()?,
                    request_serial: reader.try_read_u64()?,
                    error_type: ErrorType::try_from(reader.try_read_u32()?)?,
                    message: reader.try_read_string()?,
                }
            }
            ReturnWireCommandId::ContextComputeResult => ReturnWireCommand::ContextComputeResult {
                named_outputs: reader.try_read_handle()?,
                byte_length: reader.try_read_u64()?,
                byte_offset: reader.try_read_u64()?,
                name: reader.try_read_string()?,
                buffer: reader.try_read_bytes()?,
            },
            ReturnWireCommandId::GraphComputeAsyncCallback => {
                ReturnWireCommand::GraphComputeAsyncCallback {
                    graph: reader.try_read_handle()?,
                    request_serial: reader.try_read_u64()?,
                    error_type: ErrorType::try_from(reader.try_read_u32()?)?,
                    message: reader.try_read_string()?,
                }
            }
        };
        Ok(command)
    }
}
