//! # WebNN Structures
//!
//! The data model shared by the client and server halves of the WebNN wire.
//!
//! - [`ObjectHandle`], [`ObjectType`]: how objects are named across the process boundary
//! - [`OperandDescriptor`], [`Operation`]: what a graph builder is asked to do
//! - [`ErrorType`], [`ErrorFilter`], [`ContextOptions`]: status and configuration values
//! - [`WebnnDataError`]: the error returned by every fallible data operation

mod error;
mod object;
mod operand;
mod operation;
mod status;
mod wire_enum;

pub use error::WebnnDataError;
pub use object::{ObjectGeneration, ObjectHandle, ObjectId, ObjectType};
pub use operand::{OperandDescriptor, OperandType};
pub use operation::{
    BatchNormOptions, BinaryOperator, Conv2dOptions, GemmOptions, Operation, OperationKind,
    Pool2dKind, Pool2dOptions, ReduceOperator, UnaryOperator,
};
pub use status::{ContextOptions, DevicePreference, ErrorFilter, ErrorType, PowerPreference};
