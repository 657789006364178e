use std::sync::Arc;

use ahash::AHashMap;
use futures_channel::mpsc;
use parking_lot::Mutex;
use tracing::{debug, info};
use webnn_serialization::{ChunkedCommandSerializer, NoopCommandSerializer, WireCommand};
use webnn_structures::{ErrorType, ObjectHandle, ObjectType};

use crate::client::array_buffer_view::ArrayBufferView;
use crate::client::object_allocator::ObjectAllocator;
use crate::client::pending_requests::{CallbackResult, PendingRequests};

pub(crate) const ERROR_SCOPE_DISCONNECTED_MESSAGE: &str = "GPU device disconnected";
pub(crate) const COMPUTE_DISCONNECTED_MESSAGE: &str = "WebNN context disconnected";
pub(crate) const CONTEXT_DESTROYED_MESSAGE: &str = "WebNN context destroyed";
pub(crate) const GRAPH_DESTROYED_MESSAGE: &str = "WebNN graph destroyed";

//region Per object state

#[derive(Debug, Default)]
pub(crate) struct ContextState {
    pub error_scope_depth: u64,
    pub pop_error_scope_requests: PendingRequests<CallbackResult>,
    pub compute_requests: PendingRequests<CallbackResult>,
    pub uncaptured_error_sender: Option<mpsc::UnboundedSender<CallbackResult>>,
}

impl ContextState {
    fn resolve_all(&mut self, error_type: ErrorType, scope_message: &str, compute_message: &str) {
        self.pop_error_scope_requests
            .resolve_all(|| CallbackResult::new(error_type, scope_message));
        self.compute_requests
            .resolve_all(|| CallbackResult::new(error_type, compute_message));
    }
}

#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub compute_requests: PendingRequests<CallbackResult>,
}

#[derive(Debug, Default)]
pub(crate) struct OperandArrayState {
    pub size: u32,
}

#[derive(Debug, Default)]
pub(crate) struct NamedOutputsState {
    pub outputs: AHashMap<String, ArrayBufferView>,
}

//endregion

/// Everything the client proxies share: the outgoing command stream and one object table per
/// type. Proxies reach it through [`SharedClientState`].
pub(crate) struct ClientState {
    serializer: ChunkedCommandSerializer,
    disconnected: bool,
    pub disconnect_on_fatal_error: bool,

    pub instances: ObjectAllocator<()>,
    pub contexts: ObjectAllocator<ContextState>,
    pub graph_builders: ObjectAllocator<()>,
    pub graphs: ObjectAllocator<GraphState>,
    pub operands: ObjectAllocator<()>,
    pub operand_arrays: ObjectAllocator<OperandArrayState>,
    pub named_inputs: ObjectAllocator<()>,
    pub named_operands: ObjectAllocator<()>,
    pub named_outputs: ObjectAllocator<NamedOutputsState>,
}

pub(crate) type SharedClientState = Arc<Mutex<ClientState>>;

impl ClientState {
    pub fn new(serializer: ChunkedCommandSerializer, disconnect_on_fatal_error: bool) -> Self {
        Self {
            serializer,
            disconnected: false,
            disconnect_on_fatal_error,
            instances: ObjectAllocator::new(),
            contexts: ObjectAllocator::new(),
            graph_builders: ObjectAllocator::new(),
            graphs: ObjectAllocator::new(),
            operands: ObjectAllocator::new(),
            operand_arrays: ObjectAllocator::new(),
            named_inputs: ObjectAllocator::new(),
            named_operands: ObjectAllocator::new(),
            named_outputs: ObjectAllocator::new(),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Queues one command. After a disconnect the command lands in the no-op sink.
    pub fn serialize_command(&mut self, command: &WireCommand) -> bool {
        debug!("Client sending {:?}", command.id());
        self.serializer.serialize_command(command)
    }

    pub fn flush(&mut self) -> bool {
        self.serializer.flush()
    }

    /// Frees the client slot of `handle` and tells the server to destroy the object.
    ///
    /// Nothing is sent if the slot was already freed or reused.
    pub fn destroy_object(&mut self, object_type: ObjectType, handle: ObjectHandle) {
        if !self.free_object(object_type, handle) {
            return;
        }
        self.serialize_command(&WireCommand::DestroyObject {
            object_type,
            object_id: handle.id,
        });
    }

    fn free_object(&mut self, object_type: ObjectType, handle: ObjectHandle) -> bool {
        match object_type {
            ObjectType::Instance => self.instances.free(handle).is_some(),
            ObjectType::Context => match self.contexts.free(handle) {
                Some(mut context) => {
                    context.resolve_all(
                        ErrorType::Unknown,
                        CONTEXT_DESTROYED_MESSAGE,
                        CONTEXT_DESTROYED_MESSAGE,
                    );
                    true
                }
                None => false,
            },
            ObjectType::GraphBuilder => self.graph_builders.free(handle).is_some(),
            ObjectType::Graph => match self.graphs.free(handle) {
                Some(mut graph) => {
                    graph
                        .compute_requests
                        .resolve_all(|| CallbackResult::new(ErrorType::Unknown, GRAPH_DESTROYED_MESSAGE));
                    true
                }
                None => false,
            },
            ObjectType::Operand => self.operands.free(handle).is_some(),
            ObjectType::OperandArray => self.operand_arrays.free(handle).is_some(),
            ObjectType::NamedInputs => self.named_inputs.free(handle).is_some(),
            ObjectType::NamedOperands => self.named_operands.free(handle).is_some(),
            ObjectType::NamedOutputs => self.named_outputs.free(handle).is_some(),
        }
    }

    /// Destroys every live object, children before the contexts and instances that made them.
    pub fn destroy_all_objects(&mut self) {
        let mut handles: Vec<(ObjectType, ObjectHandle)> = Vec::new();
        macro_rules! collect {
            ($table:ident, $object_type:expr) => {
                handles.extend(self.$table.iter_mut().map(|(handle, _)| ($object_type, handle)));
            };
        }
        collect!(operands, ObjectType::Operand);
        collect!(operand_arrays, ObjectType::OperandArray);
        collect!(named_inputs, ObjectType::NamedInputs);
        collect!(named_operands, ObjectType::NamedOperands);
        collect!(named_outputs, ObjectType::NamedOutputs);
        collect!(graphs, ObjectType::Graph);
        collect!(graph_builders, ObjectType::GraphBuilder);
        collect!(contexts, ObjectType::Context);
        collect!(instances, ObjectType::Instance);

        for (object_type, handle) in handles {
            self.destroy_object(object_type, handle);
        }
    }

    /// Stops all further traffic and resolves every outstanding request with
    /// [`ErrorType::DeviceLost`]. Calling it again does nothing.
    pub fn disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        self.serializer
            .replace_serializer(Box::new(NoopCommandSerializer::default()));

        for (_, context) in self.contexts.iter_mut() {
            context.resolve_all(
                ErrorType::DeviceLost,
                ERROR_SCOPE_DISCONNECTED_MESSAGE,
                COMPUTE_DISCONNECTED_MESSAGE,
            );
        }
        for (_, graph) in self.graphs.iter_mut() {
            graph.compute_requests.resolve_all(|| {
                CallbackResult::new(ErrorType::DeviceLost, COMPUTE_DISCONNECTED_MESSAGE)
            });
        }
        info!("WebNN wire client disconnected");
    }
}
