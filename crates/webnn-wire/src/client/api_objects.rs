//! Client proxies for every wire object type.
//!
//! A proxy is the client handle of a remote object: the shared client state plus the
//! [`ObjectHandle`] the client picked for it. Calls serialize commands and return immediately.
//! Dropping a proxy destroys the remote object.

use std::fmt::{Debug, Formatter};

use futures_channel::{mpsc, oneshot};
use webnn_serialization::WireCommand;
use webnn_structures::{
    BatchNormOptions, BinaryOperator, ContextOptions, Conv2dOptions, ErrorFilter, ErrorType,
    GemmOptions, ObjectHandle, ObjectType, OperandDescriptor, Operation, Pool2dKind,
    Pool2dOptions, ReduceOperator, UnaryOperator,
};

use crate::client::array_buffer_view::ArrayBufferView;
use crate::client::client_state::{
    ContextState, GraphState, NamedOutputsState, OperandArrayState, SharedClientState,
    COMPUTE_DISCONNECTED_MESSAGE, ERROR_SCOPE_DISCONNECTED_MESSAGE,
};
use crate::client::pending_requests::CallbackResult;

macro_rules! define_proxy {
    ($(#[$meta:meta])* $name:ident => $object_type:expr) => {
        $(#[$meta])*
        pub struct $name {
            client: SharedClientState,
            handle: ObjectHandle,
        }

        impl $name {
            pub(crate) fn from_parts(client: SharedClientState, handle: ObjectHandle) -> Self {
                Self { client, handle }
            }

            /// Handle naming this object on the wire.
            pub fn handle(&self) -> ObjectHandle {
                self.handle
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.client.lock().destroy_object($object_type, self.handle);
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.handle)
            }
        }
    };
}

define_proxy!(
    /// Root object. Creates contexts.
    Instance => ObjectType::Instance
);
define_proxy!(
    /// A device context. Owns error scopes and runs compiled graphs.
    Context => ObjectType::Context
);
define_proxy!(GraphBuilder => ObjectType::GraphBuilder);
define_proxy!(
    /// A compiled graph.
    Graph => ObjectType::Graph
);
define_proxy!(Operand => ObjectType::Operand);
define_proxy!(
    /// Result of [`GraphBuilder::split`].
    OperandArray => ObjectType::OperandArray
);
define_proxy!(NamedInputs => ObjectType::NamedInputs);
define_proxy!(NamedOperands => ObjectType::NamedOperands);
define_proxy!(
    /// Output buffers of a compute call, by name.
    NamedOutputs => ObjectType::NamedOutputs
);

/// A receiver that already holds `result`.
fn resolved(result: CallbackResult) -> oneshot::Receiver<CallbackResult> {
    let (sender, receiver) = oneshot::channel();
    let _ = sender.send(result);
    receiver
}

impl Instance {
    pub fn create_context(&self, options: &ContextOptions) -> Context {
        let mut state = self.client.lock();
        let result = state.contexts.new_object(ContextState::default());
        state.serialize_command(&WireCommand::InstanceCreateContext {
            instance: self.handle,
            result,
            options: *options,
        });
        drop(state);
        Context::from_parts(self.client.clone(), result)
    }
}

impl Context {
    pub fn create_graph_builder(&self) -> GraphBuilder {
        let mut state = self.client.lock();
        let result = state.graph_builders.new_object(());
        state.serialize_command(&WireCommand::ContextCreateGraphBuilder {
            context: self.handle,
            result,
        });
        drop(state);
        GraphBuilder::from_parts(self.client.clone(), result)
    }

    pub fn create_named_inputs(&self) -> NamedInputs {
        let mut state = self.client.lock();
        let result = state.named_inputs.new_object(());
        state.serialize_command(&WireCommand::ContextCreateNamedInputs {
            context: self.handle,
            result,
        });
        drop(state);
        NamedInputs::from_parts(self.client.clone(), result)
    }

    pub fn create_named_operands(&self) -> NamedOperands {
        let mut state = self.client.lock();
        let result = state.named_operands.new_object(());
        state.serialize_command(&WireCommand::ContextCreateNamedOperands {
            context: self.handle,
            result,
        });
        drop(state);
        NamedOperands::from_parts(self.client.clone(), result)
    }

    pub fn create_named_outputs(&self) -> NamedOutputs {
        let mut state = self.client.lock();
        let result = state.named_outputs.new_object(NamedOutputsState::default());
        state.serialize_command(&WireCommand::ContextCreateNamedOutputs {
            context: self.handle,
            result,
        });
        drop(state);
        NamedOutputs::from_parts(self.client.clone(), result)
    }

    pub fn push_error_scope(&self, filter: ErrorFilter) {
        let mut state = self.client.lock();
        let Some(context) = state.contexts.get_mut(self.handle) else {
            return;
        };
        context.error_scope_depth += 1;
        state.serialize_command(&WireCommand::ContextPushErrorScope {
            context: self.handle,
            filter,
        });
    }

    /// Pops the innermost error scope.
    ///
    /// Returns `None`, and sends nothing, when no scope is open. The receiver resolves with the
    /// first error the scope captured, or [`ErrorType::NoError`].
    pub fn pop_error_scope(&self) -> Option<oneshot::Receiver<CallbackResult>> {
        let mut state = self.client.lock();
        let disconnected = state.is_disconnected();
        let context = state.contexts.get_mut(self.handle)?;
        if context.error_scope_depth == 0 {
            return None;
        }
        context.error_scope_depth -= 1;

        if disconnected {
            return Some(resolved(CallbackResult::new(
                ErrorType::DeviceLost,
                ERROR_SCOPE_DISCONNECTED_MESSAGE,
            )));
        }
        let (request_serial, receiver) = context.pop_error_scope_requests.add();
        state.serialize_command(&WireCommand::ContextPopErrorScope {
            context: self.handle,
            request_serial,
        });
        Some(receiver)
    }

    pub fn compute(
        &self,
        graph: &Graph,
        inputs: &NamedInputs,
        outputs: &NamedOutputs,
    ) -> oneshot::Receiver<CallbackResult> {
        let mut state = self.client.lock();
        if state.is_disconnected() {
            return resolved(CallbackResult::new(
                ErrorType::DeviceLost,
                COMPUTE_DISCONNECTED_MESSAGE,
            ));
        }
        let Some(context) = state.contexts.get_mut(self.handle) else {
            return resolved(CallbackResult::new(
                ErrorType::DeviceLost,
                COMPUTE_DISCONNECTED_MESSAGE,
            ));
        };
        let (request_serial, receiver) = context.compute_requests.add();
        state.serialize_command(&WireCommand::ContextCompute {
            context: self.handle,
            graph: graph.handle,
            request_serial,
            inputs: inputs.handle,
            outputs: outputs.handle,
        });
        receiver
    }

    /// Computes without a completion. Results still land in the views registered on `outputs`.
    pub fn compute_sync(&self, graph: &Graph, inputs: &NamedInputs, outputs: &NamedOutputs) {
        self.client
            .lock()
            .serialize_command(&WireCommand::ContextComputeSync {
                context: self.handle,
                graph: graph.handle,
                inputs: inputs.handle,
                outputs: outputs.handle,
            });
    }

    /// Errors no error scope captured. Calling this again replaces the previous receiver.
    pub fn uncaptured_errors(&self) -> mpsc::UnboundedReceiver<CallbackResult> {
        let (sender, receiver) = mpsc::unbounded();
        if let Some(context) = self.client.lock().contexts.get_mut(self.handle) {
            context.uncaptured_error_sender = Some(sender);
        }
        receiver
    }
}

impl Graph {
    pub fn compute_async(
        &self,
        inputs: &NamedInputs,
        outputs: &NamedOutputs,
    ) -> oneshot::Receiver<CallbackResult> {
        let mut state = self.client.lock();
        let lost = || CallbackResult::new(ErrorType::DeviceLost, COMPUTE_DISCONNECTED_MESSAGE);
        if state.is_disconnected() {
            return resolved(lost());
        }
        let Some(graph) = state.graphs.get_mut(self.handle) else {
            return resolved(lost());
        };
        let (request_serial, receiver) = graph.compute_requests.add();
        state.serialize_command(&WireCommand::GraphComputeAsync {
            graph: self.handle,
            request_serial,
            inputs: inputs.handle,
            outputs: outputs.handle,
        });
        receiver
    }
}

impl GraphBuilder {
    fn new_operand(&self, make_command: impl FnOnce(ObjectHandle) -> WireCommand) -> Operand {
        let mut state = self.client.lock();
        let result = state.operands.new_object(());
        state.serialize_command(&make_command(result));
        drop(state);
        Operand::from_parts(self.client.clone(), result)
    }

    pub fn input(&self, name: &str, descriptor: &OperandDescriptor) -> Operand {
        self.new_operand(|result| WireCommand::GraphBuilderInput {
            graph_builder: self.handle,
            result,
            descriptor: descriptor.clone(),
            name: name.to_string(),
        })
    }

    /// A constant operand holding a copy of `data`.
    pub fn constant(&self, descriptor: &OperandDescriptor, data: &[u8]) -> Operand {
        self.new_operand(|result| WireCommand::GraphBuilderConstant {
            graph_builder: self.handle,
            result,
            descriptor: descriptor.clone(),
            data: data.to_vec(),
        })
    }

    /// Adds any operator. The named helpers below are shorthands for this.
    pub fn build_operation(&self, operation: &Operation<&Operand>) -> Operand {
        let operation = operation.map_handles(|operand| operand.handle);
        self.new_operand(|result| WireCommand::GraphBuilderOperation {
            graph_builder: self.handle,
            result,
            operation,
        })
    }

    pub fn unary(&self, operator: UnaryOperator, input: &Operand) -> Operand {
        self.build_operation(&Operation::Unary { operator, input })
    }

    pub fn binary(&self, operator: BinaryOperator, a: &Operand, b: &Operand) -> Operand {
        self.build_operation(&Operation::Binary { operator, a, b })
    }

    pub fn add(&self, a: &Operand, b: &Operand) -> Operand {
        self.binary(BinaryOperator::Add, a, b)
    }

    pub fn mul(&self, a: &Operand, b: &Operand) -> Operand {
        self.binary(BinaryOperator::Mul, a, b)
    }

    pub fn matmul(&self, a: &Operand, b: &Operand) -> Operand {
        self.binary(BinaryOperator::Matmul, a, b)
    }

    pub fn relu(&self, input: &Operand) -> Operand {
        self.unary(UnaryOperator::Relu, input)
    }

    pub fn sigmoid(&self, input: &Operand) -> Operand {
        self.unary(UnaryOperator::Sigmoid, input)
    }

    pub fn softmax(&self, input: &Operand) -> Operand {
        self.unary(UnaryOperator::Softmax, input)
    }

    pub fn clamp(&self, input: &Operand, min_value: f32, max_value: f32) -> Operand {
        self.build_operation(&Operation::Clamp {
            input,
            min_value,
            max_value,
        })
    }

    pub fn conv2d(
        &self,
        input: &Operand,
        filter: &Operand,
        options: Conv2dOptions<&Operand>,
    ) -> Operand {
        self.build_operation(&Operation::Conv2d {
            input,
            filter,
            options,
        })
    }

    pub fn pool2d(&self, kind: Pool2dKind, input: &Operand, options: Pool2dOptions) -> Operand {
        self.build_operation(&Operation::Pool2d {
            kind,
            input,
            options,
        })
    }

    pub fn leaky_relu(&self, input: &Operand, alpha: f32) -> Operand {
        self.build_operation(&Operation::LeakyRelu { input, alpha })
    }

    pub fn reshape(&self, input: &Operand, new_shape: &[i32]) -> Operand {
        self.build_operation(&Operation::Reshape {
            input,
            new_shape: new_shape.to_vec(),
        })
    }

    pub fn transpose(&self, input: &Operand, permutation: &[i32]) -> Operand {
        self.build_operation(&Operation::Transpose {
            input,
            permutation: permutation.to_vec(),
        })
    }

    pub fn concat(&self, inputs: &[&Operand], axis: u32) -> Operand {
        self.build_operation(&Operation::Concat {
            inputs: inputs.to_vec(),
            axis,
        })
    }

    pub fn gemm(&self, a: &Operand, b: &Operand, options: GemmOptions<&Operand>) -> Operand {
        self.build_operation(&Operation::Gemm { a, b, options })
    }

    pub fn batch_norm(
        &self,
        input: &Operand,
        mean: &Operand,
        variance: &Operand,
        options: BatchNormOptions<&Operand>,
    ) -> Operand {
        self.build_operation(&Operation::BatchNorm {
            input,
            mean,
            variance,
            options,
        })
    }

    pub fn reduce(
        &self,
        operator: ReduceOperator,
        input: &Operand,
        axes: &[i32],
        keep_dimensions: bool,
    ) -> Operand {
        self.build_operation(&Operation::Reduce {
            operator,
            input,
            axes: axes.to_vec(),
            keep_dimensions,
        })
    }

    /// Splits `input` along `axis`.
    ///
    /// A single entry in `splits` is the number of equal parts. Several entries are the sizes
    /// of each part.
    pub fn split(&self, input: &Operand, splits: &[u32], axis: i32) -> OperandArray {
        let size = match splits {
            [count] => *count,
            sizes => sizes.len() as u32,
        };
        let mut state = self.client.lock();
        let result = state
            .operand_arrays
            .new_object(OperandArrayState { size });
        state.serialize_command(&WireCommand::GraphBuilderSplit {
            graph_builder: self.handle,
            result,
            input: input.handle,
            axis,
            splits: splits.to_vec(),
        });
        drop(state);
        OperandArray::from_parts(self.client.clone(), result)
    }

    /// Compiles the graph whose outputs are the operands registered on `named_operands`.
    pub fn build(&self, named_operands: &NamedOperands) -> Graph {
        let mut state = self.client.lock();
        let result = state.graphs.new_object(GraphState::default());
        state.serialize_command(&WireCommand::GraphBuilderBuild {
            graph_builder: self.handle,
            named_operands: named_operands.handle,
            result,
        });
        drop(state);
        Graph::from_parts(self.client.clone(), result)
    }
}

impl OperandArray {
    /// Number of operands the split produced.
    pub fn size(&self) -> u32 {
        self.client
            .lock()
            .operand_arrays
            .get(self.handle)
            .map_or(0, |array| array.size)
    }

    /// The operand at `index`, or `None` past the end of the array.
    pub fn get_operand(&self, index: u32) -> Option<Operand> {
        let mut state = self.client.lock();
        let size = state.operand_arrays.get(self.handle)?.size;
        if index >= size {
            return None;
        }
        let result = state.operands.new_object(());
        state.serialize_command(&WireCommand::OperandArrayGetOperand {
            operand_array: self.handle,
            index,
            result,
        });
        drop(state);
        Some(Operand::from_parts(self.client.clone(), result))
    }
}

impl NamedInputs {
    /// Binds `data`, shaped by `dimensions`, to the graph input `name`.
    pub fn set(&self, name: &str, data: &[u8], dimensions: &[i32]) {
        self.client
            .lock()
            .serialize_command(&WireCommand::NamedInputsSet {
                named_inputs: self.handle,
                name: name.to_string(),
                dimensions: dimensions.to_vec(),
                data: data.to_vec(),
            });
    }
}

impl NamedOperands {
    pub fn set(&self, name: &str, operand: &Operand) {
        self.client
            .lock()
            .serialize_command(&WireCommand::NamedOperandsSet {
                named_operands: self.handle,
                operand: operand.handle,
                name: name.to_string(),
            });
    }
}

impl NamedOutputs {
    /// Registers `view` to receive the output `name` of later compute calls.
    ///
    /// Only the length and offset of the view cross the wire.
    pub fn set_output(&self, name: &str, view: ArrayBufferView) {
        let mut state = self.client.lock();
        let byte_length = view.byte_length() as u64;
        let byte_offset = view.byte_offset() as u64;
        let Some(outputs) = state.named_outputs.get_mut(self.handle) else {
            return;
        };
        outputs.outputs.insert(name.to_string(), view);
        state.serialize_command(&WireCommand::NamedOutputsSetOutput {
            named_outputs: self.handle,
            byte_length,
            byte_offset,
            name: name.to_string(),
        });
    }
}
