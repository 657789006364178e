use serde::{Deserialize, Serialize};

use crate::define_wire_enum;
use crate::WebnnDataError;

define_wire_enum! {
    /// Element type of an operand.
    pub enum OperandType {
        Float32 = 0,
        Float16 = 1,
        Int32 = 2,
        Uint32 = 3,
        Int8 = 4,
        Uint8 = 5,
    }
}

impl OperandType {
    pub const fn element_byte_count(self) -> usize {
        match self {
            OperandType::Float32 | OperandType::Int32 | OperandType::Uint32 => 4,
            OperandType::Float16 => 2,
            OperandType::Int8 | OperandType::Uint8 => 1,
        }
    }
}

/// Shape and element type of an operand.
///
/// # Example
/// ```
/// use webnn_structures::{OperandDescriptor, OperandType};
///
/// let descriptor = OperandDescriptor::new(OperandType::Float32, vec![2, 2]);
/// assert_eq!(descriptor.try_get_byte_length().unwrap(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandDescriptor {
    pub operand_type: OperandType,
    pub dimensions: Vec<i32>,
}

impl OperandDescriptor {
    pub fn new(operand_type: OperandType, dimensions: Vec<i32>) -> Self {
        Self {
            operand_type,
            dimensions,
        }
    }

    /// Number of elements described, failing on negative dimensions or overflow.
    pub fn try_get_number_elements(&self) -> Result<usize, WebnnDataError> {
        self.dimensions.iter().try_fold(1usize, |count, dimension| {
            let dimension = usize::try_from(*dimension).map_err(|_| {
                WebnnDataError::BadParameters(format!(
                    "Operand dimension {} is negative",
                    dimension
                ))
            })?;
            count.checked_mul(dimension).ok_or_else(|| {
                WebnnDataError::BadParameters("Operand element count overflows".into())
            })
        })
    }

    pub fn try_get_byte_length(&self) -> Result<usize, WebnnDataError> {
        self.try_get_number_elements()?
            .checked_mul(self.operand_type.element_byte_count())
            .ok_or_else(|| WebnnDataError::BadParameters("Operand byte length overflows".into()))
    }
}
