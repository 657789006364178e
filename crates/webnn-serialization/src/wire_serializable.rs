use crate::wire_byte_cursor::{sized_array_byte_count, WireByteReader, WireByteWriter};
use webnn_structures::{
    BatchNormOptions, BinaryOperator, Conv2dOptions, ContextOptions, DevicePreference,
    GemmOptions, ObjectHandle, OperandDescriptor, OperandType, Operation, OperationKind,
    Pool2dKind, Pool2dOptions, PowerPreference, ReduceOperator, UnaryOperator, WebnnDataError,
};

/// A structured value that knows its exact encoded size and how to move through a wire cursor.
///
/// Commands compute their full size up front so the transport can hand out one contiguous
/// region, so `get_number_of_bytes_needed` must match what `try_serialize_to` writes.
pub trait WireSerializable: Sized {
    fn get_number_of_bytes_needed(&self) -> usize;

    fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError>;

    fn try_deserialize_from(reader: &mut WireByteReader<'_>) -> Result<Self, WebnnDataError>;
}

impl WireSerializable for OperandDescriptor {
    fn get_number_of_bytes_needed(&self) -> usize {
        4 + sized_array_byte_count(self.dimensions.len())
    }

    fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        writer.try_write_u32(self.operand_type.as_u32())?;
        writer.try_write_i32_array(&self.dimensions)
    }

    fn try_deserialize_from(reader: &mut WireByteReader<'_>) -> Result<Self, WebnnDataError> {
        let operand_type = OperandType::try_from(reader.try_read_u32()?)?;
        let dimensions = reader.try_read_i32_array()?;
        Ok(OperandDescriptor::new(operand_type, dimensions))
    }
}

impl WireSerializable for ContextOptions {
    fn get_number_of_bytes_needed(&self) -> usize {
        ContextOptions::NUMBER_BYTES
    }

    fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        writer.try_write_u32(self.device_preference.as_u32())?;
        writer.try_write_u32(self.power_preference.as_u32())
    }

    fn try_deserialize_from(reader: &mut WireByteReader<'_>) -> Result<Self, WebnnDataError> {
        Ok(ContextOptions {
            device_preference: DevicePreference::try_from(reader.try_read_u32()?)?,
            power_preference: PowerPreference::try_from(reader.try_read_u32()?)?,
        })
    }
}

const HANDLE: usize = ObjectHandle::NUMBER_BYTES;

impl WireSerializable for Pool2dOptions {
    fn get_number_of_bytes_needed(&self) -> usize {
        sized_array_byte_count(self.window_dimensions.len())
            + sized_array_byte_count(self.padding.len())
            + sized_array_byte_count(self.strides.len())
            + sized_array_byte_count(self.dilations.len())
    }

    fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        writer.try_write_i32_array(&self.window_dimensions)?;
        writer.try_write_i32_array(&self.padding)?;
        writer.try_write_i32_array(&self.strides)?;
        writer.try_write_i32_array(&self.dilations)
    }

    fn try_deserialize_from(reader: &mut WireByteReader<'_>) -> Result<Self, WebnnDataError> {
        Ok(Pool2dOptions {
            window_dimensions: reader.try_read_i32_array()?,
            padding: reader.try_read_i32_array()?,
            strides: reader.try_read_i32_array()?,
            dilations: reader.try_read_i32_array()?,
        })
    }
}

/// Layout: `kind u32`, then the variant fields in declaration order. Optional operands are
/// written as the null handle when absent.
impl WireSerializable for Operation<ObjectHandle> {
    fn get_number_of_bytes_needed(&self) -> usize {
        let fields = match self {
            Operation::Unary { .. } => 4 + HANDLE,
            Operation::Binary { .. } => 4 + HANDLE * 2,
            Operation::Clamp { .. } => HANDLE + 8,
            Operation::Conv2d { options, .. } => {
                HANDLE * 2
                    + sized_array_byte_count(options.padding.len())
                    + sized_array_byte_count(options.strides.len())
                    + sized_array_byte_count(options.dilations.len())
                    + 4
                    + HANDLE
            }
            Operation::Pool2d { options, .. } => 4 + HANDLE + options.get_number_of_bytes_needed(),
            Operation::LeakyRelu { .. } => HANDLE + 4,
            Operation::Reshape { new_shape, .. } => HANDLE + sized_array_byte_count(new_shape.len()),
            Operation::Transpose { permutation, .. } => {
                HANDLE + sized_array_byte_count(permutation.len())
            }
            Operation::Concat { inputs, .. } => 4 + inputs.len() * HANDLE + 4,
            Operation::Gemm { .. } => HANDLE * 3 + 4 + 4 + 1 + 1,
            Operation::BatchNorm { .. } => HANDLE * 5 + 4 + 4,
            Operation::Reduce { axes, .. } => 4 + HANDLE + sized_array_byte_count(axes.len()) + 1,
        };
        4 + fields
    }

    fn try_serialize_to(&self, writer: &mut WireByteWriter<'_>) -> Result<(), WebnnDataError> {
        writer.try_write_u32(self.kind().as_u32())?;
        match self {
            Operation::Unary { operator, input } => {
                writer.try_write_u32(operator.as_u32())?;
                writer.try_write_handle(*input)
            }
            Operation::Binary { operator, a, b } => {
                writer.try_write_u32(operator.as_u32())?;
                writer.try_write_handle(*a)?;
                writer.try_write_handle(*b)
            }
            Operation::Clamp {
                input,
                min_value,
                max_value,
            } => {
                writer.try_write_handle(*input)?;
                writer.try_write_f32(*min_value)?;
                writer.try_write_f32(*max_value)
            }
            Operation::Conv2d {
                input,
                filter,
                options,
            } => {
                writer.try_write_handle(*input)?;
                writer.try_write_handle(*filter)?;
                writer.try_write_i32_array(&options.padding)?;
                writer.try_write_i32_array(&options.strides)?;
                writer.try_write_i32_array(&options.dilations)?;
                writer.try_write_i32(options.groups)?;
                writer.try_write_optional_handle(options.bias)
            }
            Operation::Pool2d {
                kind,
                input,
                options,
            } => {
                writer.try_write_u32(kind.as_u32())?;
                writer.try_write_handle(*input)?;
                options.try_serialize_to(writer)
            }
            Operation::LeakyRelu { input, alpha } => {
                writer.try_write_handle(*input)?;
                writer.try_write_f32(*alpha)
            }
            Operation::Reshape { input, new_shape } => {
                writer.try_write_handle(*input)?;
                writer.try_write_i32_array(new_shape)
            }
            Operation::Transpose { input, permutation } => {
                writer.try_write_handle(*input)?;
                writer.try_write_i32_array(permutation)
            }
            Operation::Concat { inputs, axis } => {
                writer.try_write_handle_array(inputs)?;
                writer.try_write_u32(*axis)
            }
            Operation::Gemm { a, b, options } => {
                writer.try_write_handle(*a)?;
                writer.try_write_handle(*b)?;
                writer.try_write_optional_handle(options.c)?;
                writer.try_write_f32(options.alpha)?;
                writer.try_write_f32(options.beta)?;
                writer.try_write_bool(options.a_transpose)?;
                writer.try_write_bool(options.b_transpose)
            }
            Operation::BatchNorm {
                input,
                mean,
                variance,
                options,
            } => {
                writer.try_write_handle(*input)?;
                writer.try_write_handle(*mean)?;
                writer.try_write_handle(*variance)?;
                writer.try_write_optional_handle(options.scale)?;
                writer.try_write_optional_handle(options.bias)?;
                writer.try_write_u32(options.axis)?;
                writer.try_write_f32(options.epsilon)
            }
            Operation::Reduce {
                operator,
                input,
                axes,
                keep_dimensions,
            } => {
                writer.try_write_u32(operator.as_u32())?;
                writer.try_write_handle(*input)?;
                writer.try_write_i32_array(axes)?;
                writer.try_write_bool(*keep_dimensions)
            }
        }
    }

    fn try_deserialize_from(reader: &mut WireByteReader<'_>) -> Result<Self, WebnnDataError> {
        let kind = OperationKind::try_from(reader.try_read_u32()?)?;
        let operation = match kind {
            OperationKind::Unary => Operation::Unary {
                operator: UnaryOperator::try_from(reader.try_read_u32()?)?,
                input: reader.try_read_handle()?,
            },
            OperationKind::Binary => Operation::Binary {
                operator: BinaryOperator::try_from(reader.try_read_u32()?)?,
                a: reader.try_read_handle()?,
                b: reader.try_read_handle()?,
            },
            OperationKind::Clamp => Operation::Clamp {
                input: reader.try_read_handle()?,
                min_value: reader.try_read_f32()?,
                max_value: reader.try_read_f32()?,
            },
            OperationKind::Conv2d => Operation::Conv2d {
                input: reader.try_read_handle()?,
                filter: reader.try_read_handle()?,
                options: Conv2dOptions {
                    padding: reader.try_read_i32_array()?,
                    strides: reader.try_read_i32_array()?,
                    dilations: reader.try_read_i32_array()?,
                    groups: reader.try_read_i32()?,
                    bias: reader.try_read_optional_handle()?,
                },
            },
            OperationKind::Pool2d => Operation::Pool2d {
                kind: Pool2dKind::try_from(reader.try_read_u32()?)?,
                input: reader.try_read_handle()?,
                options: Pool2dOptions::try_deserialize_from(reader)?,
            },
            OperationKind::LeakyRelu => Operation::LeakyRelu {
                input: reader.try_read_handle()?,
                alpha: reader.try_read_f32()?,
            },
            OperationKind::Reshape => Operation::Reshape {
                input: reader.try_read_handle()?,
                new_shape: reader.try_read_i32_array()?,
            },
            OperationKind::Transpose => Operation::Transpose {
                input: reader.try_read_handle()?,
                permutation: reader.try_read_i32_array()?,
            },
            OperationKind::Concat => Operation::Concat {
                inputs: reader.try_read_handle_array()?,
                axis: reader.try_read_u32()?,
            },
            OperationKind::Gemm => Operation::Gemm {
                a: reader.try_read_handle()?,
                b: reader.try_read_handle()?,
                options: GemmOptions {
                    c: reader.try_read_optional_handle()?,
                    alpha: reader.try_read_f32()?,
                    beta: reader.try_read_f32()?,
                    a_transpose: reader.try_read_bool()?,
                    b_transpose: reader.try_read_bool()?,
                },
            },
            OperationKind::BatchNorm => Operation::BatchNorm {
                input: reader.try_read_handle()?,
                mean: reader.try_read_handle()?,
                variance: reader.try_read_handle()?,
                options: BatchNormOptions {
                    scale: reader.try_read_optional_handle()?,
                    bias: reader.try_read_optional_handle()?,
                    axis: reader.try_read_u32()?,
                    epsilon: reader.try_read_f32()?,
                },
            },
            OperationKind::Reduce => Operation::Reduce {
                operator: ReduceOperator::try_from(reader.try_read_u32()?)?,
                input: reader.try_read_handle()?,
                axes: reader.try_read_i32_array()?,
                keep_dimensions: reader.try_read_bool()?,
            },
        };
        Ok(operation)
    }
}
