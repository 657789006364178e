//! Commands sent from the client to the server.

use serde::{Deserialize, Serialize};

use crate::wire_byte_cursor::{
    sized_array_byte_count, sized_bytes_byte_count, sized_string_byte_count, WireByteReader,
    WireByteWriter,
};
use crate::wire_command_set::WireCommandSet;
use crate::wire_serializable::WireSerializable;
use webnn_structures::{
    define_wire_enum, ContextOptions, ErrorFilter, ObjectHandle, ObjectId, ObjectType,
    OperandDescriptor, Operation, WebnnDataError,
};

const HANDLE: usize = ObjectHandle::NUMBER_BYTES;

define_wire_enum! {
    /// Discriminants of the client to server command set.
    pub enum WireCommandId {
        DestroyObject = 0,
        InstanceCreateContext = 1,
        ContextCreateGraphBuilder = 2,
        ContextCreateNamedInputs = 3,
        ContextCreateNamedOperands = 4,
        ContextCreateNamedOutputs = 5,
        ContextPushErrorScope = 6,
        ContextPopErrorScope = 7,
        ContextCompute = 8,
        ContextComputeSync = 9,
        GraphComputeAsync = 10,
        GraphBuilderInput = 11,
        GraphBuilderConstant = 12,
        GraphBuilderOperation = 13,
        GraphBuilderSplit = 14,
        GraphBuilderBuild = 15,
        OperandArrayGetOperand = 16,
        NamedInputsSet = 17,
        NamedOperandsSet = 18,
        NamedOutputsSetOutput = 19,
    }
}

/// One client to server command.
///
/// Fields are laid out on the wire in declaration order. Creation commands carry the handle the
/// client picked for the new object in `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireCommand {
    DestroyObject {
        object_type: ObjectType,
        object_id: ObjectId,
    },
    InstanceCreateContext {
        instance: ObjectHandle,
        result: ObjectHandle,
        options: ContextOptions,
    },
    ContextCreateGraphBuilder {
        context: ObjectHandle,
        result: ObjectHandle,
    },
    ContextCreateNamedInputs {
        context: ObjectHandle,
        result: ObjectHandle,
    },
    ContextCreateNamedOperands {
        context: ObjectHandle,
        result: ObjectHandle,
    },
    ContextCreateNamedOutputs {
        context: ObjectHandle,
        result: ObjectHandle,
    },
    ContextPushErrorScope {
        context: ObjectHandle,
        filter: ErrorFilter,
    },
    ContextPopErrorScope {
        context: ObjectHandle,
        request_serial: u64,
    },
    ContextCompute {
        context: ObjectHandle,
        graph: ObjectHandle,
        request_serial: u64,
        inputs: ObjectHandle,
        outputs: ObjectHandle,
    },
    ContextComputeSync {
        context: ObjectHandle,
        graph: ObjectHandle,
        inputs: ObjectHandle,
        outputs: ObjectHandle,
    },
    GraphComputeAsync {
        graph: ObjectHandle,
        request_serial: u64,
        inputs: ObjectHandle,
        outputs: ObjectHandle,
    },
    GraphBuilderInput {
        graph_builder: ObjectHandle,
        result: ObjectHandle,
        descriptor: OperandDescriptor,
        name: String,
    },
    GraphBuilderConstant {
        graph_builder: ObjectHandle,
        result: ObjectHandle,
        descriptor: OperandDescriptor,
        data: Vec<u8>,
    },
    GraphBuilderOperation {
        graph_builder: ObjectHandle,
        result: ObjectHandle,
        operation: Operation<ObjectHandle>,
    },
    GraphBuilderSplit {
        graph_builder: ObjectHandle,
        result: ObjectHandle,
        input: ObjectHandle,
        axis: i32,
        splits: Vec<u32>,
    },
    GraphBuilderBuild {
        graph_builder: ObjectHandle,
        named_operands: ObjectHandle,
        result: ObjectHandle,
    },
    OperandArrayGetOperand {
        operand_array: ObjectHandle,
        index: u32,
        result: ObjectHandle,
    },
    NamedInputsSet {
        named_inputs: ObjectHandle,
        name: String,
        dimensions: Vec<i32>,
        data: Vec<u8>,
    },
    NamedOperandsSet {
        named_operands: ObjectHandle,
        operand: ObjectHandle,
        name: String,
    },
    NamedOutputsSetOutput {
        named_outputs: ObjectHandle,
        byte_length: u64,
        byte_offset: u64,
        name: String,
    },
}

impl WireCommand {
    pub fn id(&self) -> WireCommandId {
        match self {
            WireCommand::DestroyObject { .. } => WireCommandId::DestroyObject,
            WireCommand::InstanceCreateContext { .. } => WireCommandId::InstanceCreateContext,
            WireCommand::ContextCreateGraphBuilder { .. } => {
                WireCommandId::ContextCreateGraphBuilder
            }
            WireCommand::ContextCreateNamedInputs { .. } => WireCommandId::ContextCreateNamedInputs,
            WireCommand::ContextCreateNamedOperands { .. } => {
                WireCommandId::ContextCreateNamedOperands
            }
            WireCommand::ContextCreateNamedOutputs { .. } => {
                WireCommandId::ContextCreateNamedOutputs
            }
            WireCommand::ContextPushErrorScope { .. } => WireCommandId::ContextPushErrorScope,
            WireCommand::ContextPopErrorScope { .. } => WireCommandId::ContextPopErrorScope,
            WireCommand::ContextCompute { .. } => WireCommandId::ContextCompute,
            WireCommand::ContextComputeSync { .. } => WireCommandId::ContextComputeSync,
            WireCommand::GraphComputeAsync { .. } => WireCommandId::GraphComputeAsync,
            WireCommand::GraphBuilderInput { .. } => WireCommandId::GraphBuilderInput,
            WireCommand::GraphBuilderConstant { .. } => WireCommandId::GraphBuilderConstant,
            WireCommand::GraphBuilderOperation { .. } => WireCommandId::GraphBuilderOperation,
            WireCommand::GraphBuilderSplit { .. } => WireCommandId::GraphBuilderSplit,
            WireCommand::GraphBuilderBuild { .. } => WireCommandId::GraphBuilderBuild,
            WireCommand::OperandArrayGetOperand { .. } => WireCommandId::OperandArrayGetOperand,
            WireCommand::NamedInputsSet { .. } => WireCommandId::NamedInputsSet,
            WireCommand::NamedOperandsSet { .. } => WireCommandId::NamedOperandsSet,
            WireCommand::NamedOutputsSetOutput { .. } => WireCommandId::NamedOutputsSetOutput,
        }
    }
}

impl WireCommandSet for WireCommand {
    const DIRECTION: &'static str = "Client";

    fn command_id(&self) -> u32 {
        self.id().as_u32()
    }

    fn get_payload_byte_count(&self) -> usize {
        match self {
            WireCommand::DestroyObject { .. } => 8,
            WireCommand::InstanceCreateContext { options, .. } => {
                HANDLE * 2 + options.get_number_of_bytes_needed()
            }
            WireCommand::ContextCreateGraphBuilder { .. }
            | WireCommand::ContextCreateNamedInputs { .. }
            | WireCommand::ContextCreateNamedOperands { .. }
            | WireCommand::ContextCreateNamedOutputs { .. } => HANDLE * 2,
            WireCommand::ContextPushErrorScope { .. } => HANDLE + 4,
            WireCommand::ContextPopErrorScope { .. } => HANDLE + 8,
            WireCommand::ContextCompute { .. } => HANDLE * 4 + 8,
            WireCommand::ContextComputeSync { .. } => HANDLE * 4,
            WireCommand::GraphComputeAsync { .. } => HANDLE * 3 + 8,
            WireCommand::GraphBuilderInput {
                descriptor, name, ..
            } => HANDLE * 2 + descriptor.get_number_of_bytes_needed() + sized_string_byte_count(name),
            WireCommand::GraphBuilderConstant {
                descriptor, data, ..
            } => HANDLE * 2 + descriptor.get_number_of_bytes_needed() + sized_bytes_byte_count(data),
            WireCommand::GraphBuilderOperation { operation, .. } => {
                HANDLE * 2 + operation.get_number_of_bytes_needed()
            }
            WireCommand::GraphBuilderSplit { splits, .. } => {
                HANDLE * 3 + 4 + sized_array_byte_count(splits.len())
            }
            WireCommand::GraphBuilderBuild { .. } => HANDLE * 3,
            WireCommand::OperandArrayGetOperand { .. } => HANDLE * 2 + 4,
            WireCommand::NamedInputsSet {
                name,
                dimensions,
                data,
                ..
            } => {
                HANDLE
                    + sized_string_byte_count(name)
                    + sized_array_byte_count(dimensions.len())
                    + sized_bytes_byte_count(data)
            }
            WireCommand::NamedOperandsSet { name, .. } => {
                HANDLE * 2 + sized_string_byte_count(name)
            }
            WireCommand::NamedOutputsSetOutput { name, .. } => {
                HANDLE + 16 + sized_string_byte_count(name)
            }
        }
    }

    fn try_serialize_payload(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        match self {
            WireCommand::DestroyObject {
                object_type,
                object_id,
            } => {
                writer.try_write_u32(object_type.as_u32())?;
                writer.try_write_u32(*object_id)
            }
            WireCommand::InstanceCreateContext {
                instance,
                result,
                options,
            } => {
                writer.try_write_handle(*instance)?;
                writer.try_write_handle(*result)?;
                options.try_serialize_to(writer)
            }
            WireCommand::ContextCreateGraphBuilder { context, result }
            | WireCommand::ContextCreateNamedInputs { context, result }
            | WireCommand::ContextCreateNamedOperands { context, result }
            | WireCommand::ContextCreateNamedOutputs { context, result } => {
                writer.try_write_handle(*context)?;
                writer.try_write_handle(*result)
            }
            WireCommand::ContextPushErrorScope { context, filter } => {
                writer.try_write_handle(*context)?;
                writer.try_write_u32(filter.as_u32())
            }
            WireCommand::ContextPopErrorScope {
                context,
                request_serial,
            } => {
                writer.try_write_handle(*context)?;
                writer.try_write_u64(*request_serial)
            }
            WireCommand::ContextCompute {
                context,
                graph,
                request_serial,
                inputs,
                outputs,
            } => {
                writer.try_write_handle(*context)?;
                writer.try_write_handle(*graph)?;
                writer.try_write_u64(*request_serial)?;
                writer.try_write_handle(*inputs)?;
                writer.try_write_handle(*outputs)
            }
            WireCommand::ContextComputeSync {
                context,
                graph,
                inputs,
                outputs,
            } => {
                writer.try_write_handle(*context)?;
                writer.try_write_handle(*graph)?;
                writer.try_write_handle(*inputs)?;
                writer.try_write_handle(*outputs)
            }
            WireCommand::GraphComputeAsync {
                graph,
                request_serial,
                inputs,
                outputs,
            } => {
                writer.try_write_handle(*graph)?;
                writer.try_write_u64(*request_serial)?;
                writer.try_write_handle(*inputs)?;
                writer.try_write_handle(*outputs)
            }
            WireCommand::GraphBuilderInput {
                graph_builder,
                result,
                descriptor,
                name,
            } => {
                writer.try_write_handle(*graph_builder)?;
                writer.try_write_handle(*result)?;
                descriptor.try_serialize_to(writer)?;
                writer.try_write_string(name)
            }
            WireCommand::GraphBuilderConstant {
                graph_builder,
                result,
                descriptor,
                data,
            } => {
                writer.try_write_handle(*graph_builder)?;
                writer.try_write_handle(*result)?;
                descriptor.try_serialize_to(writer)?;
                writer.try_write_bytes(data)
            }
            WireCommand::GraphBuilderOperation {
                graph_builder,
                result,
                operation,
            } => {
                writer.try_write_handle(*graph_builder)?;
                writer.try_write_handle(*result)?;
                operation.try_serialize_to(writer)
            }
            WireCommand::GraphBuilderSplit {
                graph_builder,
                result,
                input,
                axis,
                splits,
            } => {
                writer.try_write_handle(*graph_builder)?;
                writer.try_write_handle(*result)?;
                writer.try_write_handle(*input)?;
                writer.try_write_i32(*axis)?;
                writer.try_write_u32_array(splits)
            }
            WireCommand::GraphBuilderBuild {
                graph_builder,
                named_operands,
                result,
            } => {
                writer.try_write_handle(*graph_builder)?;
                writer.try_write_handle(*named_operands)?;
                writer.try_write_handle(*result)
            }
            WireCommand::OperandArrayGetOperand {
                operand_array,
                index,
                result,
            } => {
                writer.try_write_handle(*operand_array)?;
                writer.try_write_u32(*index)?;
                writer.try_write_handle(*result)
            }
            WireCommand::NamedInputsSet {
                named_inputs,
                name,
                dimensions,
                data,
            } => {
                writer.try_write_handle(*named_inputs)?;
                writer.try_write_string(name)?;
                writer.try_write_i32_array(dimensions)?;
                writer.try_write_bytes(data)
            }
            WireCommand::NamedOperandsSet {
                named_operands,
                operand,
                name,
            } => {
                writer.try_write_handle(*named_operands)?;
                writer.try_write_handle(*operand)?;
                writer.try_write_string(name)
            }
            WireCommand::NamedOutputsSetOutput {
                named_outputs,
                byte_length,
                byte_offset,
                name,
            } => {
                writer.try_write_handle(*named_outputs)?;
                writer.try_write_u64(*byte_length)?;
                writer.try_write_u64(*byte_offset)?;
                writer.try_write_string(name)
            }
        }
    }

    fn try_deserialize_payload(
        command_id: u32,
        reader: &mut WireByteReader<'_>,
    ) -> Result<Self, WebnnDataError> {
        let command = match WireCommandId::try_from(command_id)? {
            WireCommandId::DestroyObject => WireCommand::DestroyObject {
                object_type: ObjectType::try_from(reader.try_read_u32()?)?,
                object_id: reader.try_read_u32()?,
            },
            WireCommandId::InstanceCreateContext => WireCommand::InstanceCreateContext {
                instance: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
                options: ContextOptions::try_deserialize_from(reader)?,
            },
            WireCommandId::ContextCreateGraphBuilder => WireCommand::ContextCreateGraphBuilder {
                context: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::ContextCreateNamedInputs => WireCommand::ContextCreateNamedInputs {
                context: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::ContextCreateNamedOperands => WireCommand::ContextCreateNamedOperands {
                context: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::ContextCreateNamedOutputs => WireCommand::ContextCreateNamedOutputs {
                context: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::ContextPushErrorScope => WireCommand::ContextPushErrorScope {
                context: reader.try_read_handle()?,
                filter: ErrorFilter::try_from(reader.try_read_u32()?)?,
            },
            WireCommandId::ContextPopErrorScope => WireCommand::ContextPopErrorScope {
                context: reader.try_read_handle()?,
                request_serial: reader.try_read_u64()?,
            },
            WireCommandId::ContextCompute => WireCommand::ContextCompute {
                context: reader.try_read_handle()?,
                graph: reader.try_read_handle()?,
                request_serial: reader.try_read_u64()?,
                inputs: reader.try_read_handle()?,
                outputs: reader.try_read_handle()?,
            },
            WireCommandId::ContextComputeSync => WireCommand::ContextComputeSync {
                context: reader.try_read_handle()?,
                graph: reader.try_read_handle()?,
                inputs: reader.try_read_handle()?,
                outputs: reader.try_read_handle()?,
            },
            WireCommandId::GraphComputeAsync => WireCommand::GraphComputeAsync {
                graph: reader.try_read_handle()?,
                request_serial: reader.try_read_u64()?,
                inputs: reader.try_read_handle()?,
                outputs: reader.try_read_handle()?,
            },
            WireCommandId::GraphBuilderInput => WireCommand::GraphBuilderInput {
                graph_builder: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
                descriptor: OperandDescriptor::try_deserialize_from(reader)?,
                name: reader.try_read_string()?,
            },
            WireCommandId::GraphBuilderConstant => WireCommand::GraphBuilderConstant {
                graph_builder: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
                descriptor: OperandDescriptor::try_deserialize_from(reader)?,
                data: reader.try_read_bytes()?,
            },
            WireCommandId::GraphBuilderOperation => WireCommand::GraphBuilderOperation {
                graph_builder: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
                operation: Operation::try_deserialize_from(reader)?,
            },
            WireCommandId::GraphBuilderSplit => WireCommand::GraphBuilderSplit {
                graph_builder: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
                input: reader.try_read_handle()?,
                axis: reader.try_read_i32()?,
                splits: reader.try_read_u32_array()?,
            },
            WireCommandId::GraphBuilderBuild => WireCommand::GraphBuilderBuild {
                graph_builder: reader.try_read_handle()?,
                named_operands: reader.try_read_handle()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::OperandArrayGetOperand => WireCommand::OperandArrayGetOperand {
                operand_array: reader.try_read_handle()?,
                index: reader.try_read_u32()?,
                result: reader.try_read_handle()?,
            },
            WireCommandId::NamedInputsSet => WireCommand::NamedInputsSet {
                named_inputs: reader.try_read_handle()?,
                name: reader.try_read_string()?,
                dimensions: reader.try_read_i32_array()?,
                data: reader.try_read_bytes()?,
            },
            WireCommandId::NamedOperandsSet => WireCommand::NamedOperandsSet {
                named_operands: reader.try_read_handle()?,
                operand: reader.try_read_handle()?,
                name: reader.try_read_string()?,
            },
            WireCommandId::NamedOutputsSetOutput => WireCommand::NamedOutputsSetOutput {
                named_outputs: reader.try_read_handle()?,
                byte_length: reader.try_read_u64()?,
                byte_offset: reader.try_read_u64()?,
                name: reader.try_read_string()?,
            },
        };
        Ok(command)
    }
}
