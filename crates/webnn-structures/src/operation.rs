//! Graph builder operators as data.
//!
//! Every operator a graph builder can append is one variant of [`Operation`]. The type is generic
//! over the way operands are named: clients fill it with wire handles, servers map those handles
//! to native ones with [`Operation::try_map_handles`] before calling into the native library.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::define_wire_enum;

define_wire_enum! {
    /// Tag of an [`Operation`] variant on the wire.
    pub enum OperationKind {
        Unary = 0,
        Binary = 1,
        Clamp = 2,
        Conv2d = 3,
        Pool2d = 4,
        LeakyRelu = 5,
        Reshape = 6,
        Transpose = 7,
        Concat = 8,
        Gemm = 9,
        BatchNorm = 10,
        Reduce = 11,
    }
}

define_wire_enum! {
    pub enum UnaryOperator {
        Abs = 0,
        Ceil = 1,
        Cos = 2,
        Exp = 3,
        Floor = 4,
        HardSwish = 5,
        Log = 6,
        Neg = 7,
        Relu = 8,
        Sigmoid = 9,
        Sin = 10,
        Softmax = 11,
        Tan = 12,
        Tanh = 13,
    }
}

define_wire_enum! {
    pub enum BinaryOperator {
        Add = 0,
        Sub = 1,
        Mul = 2,
        Div = 3,
        Max = 4,
        Min = 5,
        Pow = 6,
        Matmul = 7,
    }
}

define_wire_enum! {
    pub enum Pool2dKind {
        Average = 0,
        L2 = 1,
        Max = 2,
    }
}

define_wire_enum! {
    pub enum ReduceOperator {
        L1 = 0,
        L2 = 1,
        Max = 2,
        Mean = 3,
        Min = 4,
        Product = 5,
        Sum = 6,
    }
}

//region Options

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2dOptions<H> {
    /// `[beginning_height, ending_height, beginning_width, ending_width]`
    pub padding: Vec<i32>,
    pub strides: Vec<i32>,
    pub dilations: Vec<i32>,
    pub groups: i32,
    pub bias: Option<H>,
}

impl<H> Default for Conv2dOptions<H> {
    fn default() -> Self {
        Self {
            padding: vec![0, 0, 0, 0],
            strides: vec![1, 1],
            dilations: vec![1, 1],
            groups: 1,
            bias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool2dOptions {
    /// Empty means a global pool over the spatial dimensions.
    pub window_dimensions: Vec<i32>,
    pub padding: Vec<i32>,
    pub strides: Vec<i32>,
    pub dilations: Vec<i32>,
}

impl Default for Pool2dOptions {
    fn default() -> Self {
        Self {
            window_dimensions: Vec::new(),
            padding: vec![0, 0, 0, 0],
            strides: vec![1, 1],
            dilations: vec![1, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemmOptions<H> {
    pub c: Option<H>,
    pub alpha: f32,
    pub beta: f32,
    pub a_transpose: bool,
    pub b_transpose: bool,
}

impl<H> Default for GemmOptions<H> {
    fn default() -> Self {
        Self {
            c: None,
            alpha: 1.0,
            beta: 1.0,
            a_transpose: false,
            b_transpose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNormOptions<H> {
    pub scale: Option<H>,
    pub bias: Option<H>,
    pub axis: u32,
    pub epsilon: f32,
}

impl<H> Default for BatchNormOptions<H> {
    fn default() -> Self {
        Self {
            scale: None,
            bias: None,
            axis: 1,
            epsilon: 1e-5,
        }
    }
}

//endregion

/// One graph builder operator and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation<H> {
    Unary {
        operator: UnaryOperator,
        input: H,
    },
    Binary {
        operator: BinaryOperator,
        a: H,
        b: H,
    },
    Clamp {
        input: H,
        min_value: f32,
        max_value: f32,
    },
    Conv2d {
        input: H,
        filter: H,
        options: Conv2dOptions<H>,
    },
    Pool2d {
        kind: Pool2dKind,
        input: H,
        options: Pool2dOptions,
    },
    LeakyRelu {
        input: H,
        alpha: f32,
    },
    Reshape {
        input: H,
        new_shape: Vec<i32>,
    },
    Transpose {
        input: H,
        permutation: Vec<i32>,
    },
    Concat {
        inputs: Vec<H>,
        axis: u32,
    },
    Gemm {
        a: H,
        b: H,
        options: GemmOptions<H>,
    },
    BatchNorm {
        input: H,
        mean: H,
        variance: H,
        options: BatchNormOptions<H>,
    },
    Reduce {
        operator: ReduceOperator,
        input: H,
        axes: Vec<i32>,
        keep_dimensions: bool,
    },
}

impl<H> Operation<H> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Unary { .. } => OperationKind::Unary,
            Operation::Binary { .. } => OperationKind::Binary,
            Operation::Clamp { .. } => OperationKind::Clamp,
            Operation::Conv2d { .. } => OperationKind::Conv2d,
            Operation::Pool2d { .. } => OperationKind::Pool2d,
            Operation::LeakyRelu { .. } => OperationKind::LeakyRelu,
            Operation::Reshape { .. } => OperationKind::Reshape,
            Operation::Transpose { .. } => OperationKind::Transpose,
            Operation::Concat { .. } => OperationKind::Concat,
            Operation::Gemm { .. } => OperationKind::Gemm,
            Operation::BatchNorm { .. } => OperationKind::BatchNorm,
            Operation::Reduce { .. } => OperationKind::Reduce,
        }
    }

    /// Rebuilds the operation with every operand reference passed through `map`.
    ///
    /// The first failing reference aborts the mapping. Optional references that are absent stay
    /// absent without calling `map`.
    ///
    /// # Example
    /// ```
    /// use webnn_structures::{BinaryOperator, Operation};
    ///
    /// let by_id: Operation<u32> = Operation::Binary { operator: BinaryOperator::Add, a: 1, b: 2 };
    /// let doubled: Result<Operation<u64>, String> = by_id.try_map_handles(|id| Ok(*id as u64 * 2));
    /// assert_eq!(
    ///     doubled.unwrap(),
    ///     Operation::Binary { operator: BinaryOperator::Add, a: 2, b: 4 }
    /// );
    ///
    /// let failed: Result<Operation<u64>, String> = by_id.try_map_handles(|id| Err(format!("{id}")));
    /// assert_eq!(failed.unwrap_err(), "1");
    /// ```
    pub fn try_map_handles<T, E, F>(&self, mut map: F) -> Result<Operation<T>, E>
    where
        F: FnMut(&H) -> Result<T, E>,
    {
        let mapped = match self {
            Operation::Unary { operator, input } => Operation::Unary {
                operator: *operator,
                input: map(input)?,
            },
            Operation::Binary { operator, a, b } => Operation::Binary {
                operator: *operator,
                a: map(a)?,
                b: map(b)?,
            },
            Operation::Clamp {
                input,
                min_value,
                max_value,
            } => Operation::Clamp {
                input: map(input)?,
                min_value: *min_value,
                max_value: *max_value,
            },
            Operation::Conv2d {
                input,
                filter,
                options,
            } => Operation::Conv2d {
                input: map(input)?,
                filter: map(filter)?,
                options: Conv2dOptions {
                    padding: options.padding.clone(),
                    strides: options.strides.clone(),
                    dilations: options.dilations.clone(),
                    groups: options.groups,
                    bias: options.bias.as_ref().map(&mut map).transpose()?,
                },
            },
            Operation::Pool2d {
                kind,
                input,
                options,
            } => Operation::Pool2d {
                kind: *kind,
                input: map(input)?,
                options: options.clone(),
            },
            Operation::LeakyRelu { input, alpha } => Operation::LeakyRelu {
                input: map(input)?,
                alpha: *alpha,
            },
            Operation::Reshape { input, new_shape } => Operation::Reshape {
                input: map(input)?,
                new_shape: new_shape.clone(),
            },
            Operation::Transpose { input, permutation } => Operation::Transpose {
                input: map(input)?,
                permutation: permutation.clone(),
            },
            Operation::Concat { inputs, axis } => Operation::Concat {
                inputs: inputs.iter().map(&mut map).collect::<Result<Vec<_>, E>>()?,
                axis: *axis,
            },
            Operation::Gemm { a, b, options } => Operation::Gemm {
                a: map(a)?,
                b: map(b)?,
                options: GemmOptions {
                    c: options.c.as_ref().map(&mut map).transpose()?,
                    alpha: options.alpha,
                    beta: options.beta,
                    a_transpose: options.a_transpose,
                    b_transpose: options.b_transpose,
                },
            },
            Operation::BatchNorm {
                input,
                mean,
                variance,
                options,
            } => Operation::BatchNorm {
                input: map(input)?,
                mean: map(mean)?,
                variance: map(variance)?,
                options: BatchNormOptions {
                    scale: options.scale.as_ref().map(&mut map).transpose()?,
                    bias: options.bias.as_ref().map(&mut map).transpose()?,
                    axis: options.axis,
                    epsilon: options.epsilon,
                },
            },
            Operation::Reduce {
                operator,
                input,
                axes,
                keep_dimensions,
            } => Operation::Reduce {
                operator: *operator,
                input: map(input)?,
                axes: axes.clone(),
                keep_dimensions: *keep_dimensions,
            },
        };
        Ok(mapped)
    }

    pub fn map_handles<T, F>(&self, mut map: F) -> Operation<T>
    where
        F: FnMut(&H) -> T,
    {
        match self.try_map_handles(|handle| Ok::<T, Infallible>(map(handle))) {
            Ok(operation) => operation,
            Err(never) => match never {},
        }
    }
}
