//! Shared fixtures for the wire tests: a recording native library and a client/server loopback.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use webnn_config::WireConfig;
use webnn_serialization::{
    BufferedCommandSerializer, ChunkedCommandHandler, ChunkedCommandSerializer, FlushedCommands,
    ReturnWireCommand, WireCommand,
};
use webnn_structures::{
    ContextOptions, ErrorFilter, ErrorType, ObjectType, OperandDescriptor, Operation,
    WebnnDataError,
};
use webnn_wire::client::{Instance, WireClient};
use webnn_wire::server::{
    ErrorCallback, NativeHandle, OutputBuffer, UncapturedErrorCallback, WebnnProcs, WireServer,
};
use webnn_wire::WireResult;

/// One call into the native library, as seen by [`MockProcs`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    CreateContext(ContextOptions),
    CreateGraphBuilder,
    CreateNamedInputs,
    CreateNamedOperands,
    CreateNamedOutputs,
    PushErrorScope(ErrorFilter),
    PopErrorScope,
    SetUncapturedCallback { context: u64, installed: bool },
    Compute,
    ComputeSync,
    GraphComputeAsync,
    Input { name: String },
    Constant { data: Vec<u8> },
    Operation(Operation<u64>),
    Split { splits: Vec<u32>, axis: i32 },
    Build,
    GetOperand(u32),
    NamedInputsSet { name: String, dimensions: Vec<i32> },
    NamedOperandsSet { name: String, operand: u64 },
    SetOutput { name: String, byte_length: u64, byte_offset: u64 },
    GetOutput { name: String },
    Reference(ObjectType, u64),
    Release(ObjectType, u64),
}

#[derive(Default)]
struct MockState {
    next_native: u64,
    calls: Vec<NativeCall>,
    native_types: HashMap<u64, ObjectType>,
    error_scopes: HashMap<u64, usize>,
    uncaptured_callbacks: HashMap<u64, UncapturedErrorCallback>,
    pop_result: Option<(ErrorType, String)>,
    compute_result: Option<(ErrorType, String)>,
    defer_callbacks: bool,
    deferred: Vec<(ErrorCallback, ErrorType, String)>,
    outputs: HashMap<String, OutputBuffer>,
    refuse_creation: bool,
}

impl MockState {
    fn create(&mut self, object_type: ObjectType, call: NativeCall) -> Option<NativeHandle> {
        self.calls.push(call);
        if self.refuse_creation {
            return None;
        }
        self.next_native += 1;
        self.native_types.insert(self.next_native, object_type);
        NativeHandle::new(self.next_native)
    }

    fn complete(&mut self, callback: ErrorCallback, result: Option<(ErrorType, String)>) {
        let (error_type, message) = result.unwrap_or((ErrorType::NoError, String::new()));
        if self.defer_callbacks {
            self.deferred.push((callback, error_type, message));
        } else {
            callback(error_type, message);
        }
    }
}

/// Recording stand-in for the native WebNN library.
///
/// Every entry point is logged as a [`NativeCall`]. Completions run inline unless
/// [`MockNative::defer_callbacks`] is set, in which case [`MockNative::complete_deferred`]
/// runs them later.
pub struct MockProcs {
    state: Arc<Mutex<MockState>>,
}

/// Test side view of a [`MockProcs`] owned by a server.
#[derive(Clone)]
pub struct MockNative {
    state: Arc<Mutex<MockState>>,
}

pub fn mock_procs() -> (MockProcs, MockNative) {
    let state = Arc::new(Mutex::new(MockState::default()));
    (
        MockProcs {
            state: state.clone(),
        },
        MockNative { state },
    )
}

impl MockNative {
    /// A native object created outside the wire, for injection.
    pub fn create_object(&self, object_type: ObjectType) -> NativeHandle {
        let mut state = self.state.lock();
        state.next_native += 1;
        let value = state.next_native;
        state.native_types.insert(value, object_type);
        NativeHandle::new(value).unwrap()
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn releases(&self) -> Vec<(ObjectType, u64)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                NativeCall::Release(object_type, handle) => Some((*object_type, *handle)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn set_pop_result(&self, error_type: ErrorType, message: &str) {
        self.state.lock().pop_result = Some((error_type, message.to_string()));
    }

    pub fn set_compute_result(&self, error_type: ErrorType, message: &str) {
        self.state.lock().compute_result = Some((error_type, message.to_string()));
    }

    pub fn set_output(&self, name: &str, output: OutputBuffer) {
        self.state.lock().outputs.insert(name.to_string(), output);
    }

    pub fn refuse_creation(&self, refuse: bool) {
        self.state.lock().refuse_creation = refuse;
    }

    pub fn defer_callbacks(&self, defer: bool) {
        self.state.lock().defer_callbacks = defer;
    }

    /// Runs deferred completions, newest first when `reverse` is set.
    pub fn complete_deferred(&self, reverse: bool) {
        let mut deferred = std::mem::take(&mut self.state.lock().deferred);
        if reverse {
            deferred.reverse();
        }
        for (callback, error_type, message) in deferred {
            callback(error_type, message);
        }
    }

    pub fn has_uncaptured_callback(&self, context: NativeHandle) -> bool {
        self.state
            .lock()
            .uncaptured_callbacks
            .contains_key(&context.get())
    }

    /// Reports an error no scope captured, the way a native context would.
    pub fn raise_uncaptured(&self, context: NativeHandle, error_type: ErrorType, message: &str) {
        let mut state = self.state.lock();
        if let Some(callback) = state.uncaptured_callbacks.get_mut(&context.get()) {
            callback(error_type, message.to_string());
        }
    }

    /// Native handles the server created for `object_type`, oldest first.
    pub fn handles_of(&self, object_type: ObjectType) -> Vec<u64> {
        let state = self.state.lock();
        let mut handles: Vec<u64> = state
            .native_types
            .iter()
            .filter(|(_, ty)| **ty == object_type)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort_unstable();
        handles
    }
}

impl WebnnProcs for MockProcs {
    fn instance_create_context(
        &mut self,
        _instance: NativeHandle,
        options: &ContextOptions,
    ) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::Context, NativeCall::CreateContext(*options))
    }

    fn context_create_graph_builder(&mut self, _context: NativeHandle) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::GraphBuilder, NativeCall::CreateGraphBuilder)
    }

    fn context_create_named_inputs(&mut self, _context: NativeHandle) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::NamedInputs, NativeCall::CreateNamedInputs)
    }

    fn context_create_named_operands(&mut self, _context: NativeHandle) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::NamedOperands, NativeCall::CreateNamedOperands)
    }

    fn context_create_named_outputs(&mut self, _context: NativeHandle) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::NamedOutputs, NativeCall::CreateNamedOutputs)
    }

    fn context_push_error_scope(&mut self, context: NativeHandle, filter: ErrorFilter) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::PushErrorScope(filter));
        *state.error_scopes.entry(context.get()).or_default() += 1;
    }

    fn context_pop_error_scope(&mut self, context: NativeHandle, callback: ErrorCallback) -> bool {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::PopErrorScope);
        let depth = state.error_scopes.entry(context.get()).or_default();
        if *depth == 0 {
            return false;
        }
        *depth -= 1;
        let result = state.pop_result.clone();
        state.complete(callback, result);
        true
    }

    fn context_set_uncaptured_error_callback(
        &mut self,
        context: NativeHandle,
        callback: Option<UncapturedErrorCallback>,
    ) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::SetUncapturedCallback {
            context: context.get(),
            installed: callback.is_some(),
        });
        match callback {
            Some(callback) => {
                state.uncaptured_callbacks.insert(context.get(), callback);
            }
            None => {
                state.uncaptured_callbacks.remove(&context.get());
            }
        }
    }

    fn context_compute(
        &mut self,
        _context: NativeHandle,
        _graph: NativeHandle,
        _inputs: NativeHandle,
        _outputs: NativeHandle,
        callback: ErrorCallback,
    ) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::Compute);
        let result = state.compute_result.clone();
        state.complete(callback, result);
    }

    fn context_compute_sync(
        &mut self,
        _context: NativeHandle,
        _graph: NativeHandle,
        _inputs: NativeHandle,
        _outputs: NativeHandle,
    ) -> ErrorType {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::ComputeSync);
        state
            .compute_result
            .as_ref()
            .map_or(ErrorType::NoError, |(error_type, _)| *error_type)
    }

    fn graph_compute_async(
        &mut self,
        _graph: NativeHandle,
        _inputs: NativeHandle,
        _outputs: NativeHandle,
        callback: ErrorCallback,
    ) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::GraphComputeAsync);
        let result = state.compute_result.clone();
        state.complete(callback, result);
    }

    fn graph_builder_input(
        &mut self,
        _graph_builder: NativeHandle,
        name: &str,
        _descriptor: &OperandDescriptor,
    ) -> Option<NativeHandle> {
        self.state.lock().create(
            ObjectType::Operand,
            NativeCall::Input {
                name: name.to_string(),
            },
        )
    }

    fn graph_builder_constant(
        &mut self,
        _graph_builder: NativeHandle,
        _descriptor: &OperandDescriptor,
        data: &[u8],
    ) -> Option<NativeHandle> {
        self.state.lock().create(
            ObjectType::Operand,
            NativeCall::Constant {
                data: data.to_vec(),
            },
        )
    }

    fn graph_builder_operation(
        &mut self,
        _graph_builder: NativeHandle,
        operation: &Operation<NativeHandle>,
    ) -> Option<NativeHandle> {
        let operation = operation.map_handles(|operand| operand.get());
        self.state
            .lock()
            .create(ObjectType::Operand, NativeCall::Operation(operation))
    }

    fn graph_builder_split(
        &mut self,
        _graph_builder: NativeHandle,
        _input: NativeHandle,
        splits: &[u32],
        axis: i32,
    ) -> Option<NativeHandle> {
        self.state.lock().create(
            ObjectType::OperandArray,
            NativeCall::Split {
                splits: splits.to_vec(),
                axis,
            },
        )
    }

    fn graph_builder_build(
        &mut self,
        _graph_builder: NativeHandle,
        _named_operands: NativeHandle,
    ) -> Option<NativeHandle> {
        self.state.lock().create(ObjectType::Graph, NativeCall::Build)
    }

    fn operand_array_get_operand(
        &mut self,
        _operand_array: NativeHandle,
        index: u32,
    ) -> Option<NativeHandle> {
        self.state
            .lock()
            .create(ObjectType::Operand, NativeCall::GetOperand(index))
    }

    fn named_inputs_set(
        &mut self,
        _named_inputs: NativeHandle,
        name: &str,
        _data: &[u8],
        dimensions: &[i32],
    ) {
        self.state.lock().calls.push(NativeCall::NamedInputsSet {
            name: name.to_string(),
            dimensions: dimensions.to_vec(),
        });
    }

    fn named_operands_set(&mut self, _named_operands: NativeHandle, name: &str, operand: NativeHandle) {
        self.state.lock().calls.push(NativeCall::NamedOperandsSet {
            name: name.to_string(),
            operand: operand.get(),
        });
    }

    fn named_outputs_set_output(
        &mut self,
        _named_outputs: NativeHandle,
        name: &str,
        byte_length: u64,
        byte_offset: u64,
    ) {
        self.state.lock().calls.push(NativeCall::SetOutput {
            name: name.to_string(),
            byte_length,
            byte_offset,
        });
    }

    fn named_outputs_get_output(
        &mut self,
        _named_outputs: NativeHandle,
        name: &str,
    ) -> Option<OutputBuffer> {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::GetOutput {
            name: name.to_string(),
        });
        state.outputs.get(name).cloned()
    }

    fn reference(&mut self, object_type: ObjectType, handle: NativeHandle) {
        self.state
            .lock()
            .calls
            .push(NativeCall::Reference(object_type, handle.get()));
    }

    fn release(&mut self, object_type: ObjectType, handle: NativeHandle) {
        self.state
            .lock()
            .calls
            .push(NativeCall::Release(object_type, handle.get()));
    }
}

/// Encodes client commands the way a client would, for feeding a server directly.
pub fn encode_commands(commands: &[WireCommand]) -> Vec<u8> {
    let transport = BufferedCommandSerializer::new(4096);
    let frames = transport.flushed_commands();
    let mut serializer = ChunkedCommandSerializer::new(Box::new(transport));
    for command in commands {
        assert!(serializer.serialize_command(command));
    }
    serializer.flush();
    frames.drain().concat()
}

/// Encodes server commands, for feeding a client directly.
pub fn encode_return_commands(commands: &[ReturnWireCommand]) -> Vec<u8> {
    let transport = BufferedCommandSerializer::new(4096);
    let frames = transport.flushed_commands();
    let mut serializer = ChunkedCommandSerializer::new(Box::new(transport));
    for command in commands {
        assert!(serializer.serialize_command(command));
    }
    serializer.flush();
    frames.drain().concat()
}

/// Decodes every frame queued on `frames`.
pub fn decode_commands(frames: &FlushedCommands) -> Vec<WireCommand> {
    let mut handler = ChunkedCommandHandler::new();
    let mut decoded = Vec::new();
    for frame in frames.drain() {
        handler
            .handle_commands::<WireCommand, _, WebnnDataError>(&frame, |command| {
                decoded.push(command);
                Ok(())
            })
            .unwrap();
    }
    decoded
}

pub fn decode_return_commands(frames: &FlushedCommands) -> Vec<ReturnWireCommand> {
    let mut handler = ChunkedCommandHandler::new();
    let mut decoded = Vec::new();
    for frame in frames.drain() {
        handler
            .handle_commands::<ReturnWireCommand, _, WebnnDataError>(&frame, |command| {
                decoded.push(command);
                Ok(())
            })
            .unwrap();
    }
    decoded
}

/// A client wired to a server over in-memory transports, with an injected instance.
pub struct Loopback {
    pub instance: Instance,
    pub client: WireClient,
    pub server: WireServer,
    pub native: MockNative,
    pub native_instance: NativeHandle,
    to_server: FlushedCommands,
    to_client: FlushedCommands,
}

impl Loopback {
    pub fn new() -> Self {
        Self::with_config(&WireConfig::default())
    }

    pub fn with_config(config: &WireConfig) -> Self {
        let maximum_allocation_size = config.transport.max_allocation_size;
        let client_transport = BufferedCommandSerializer::new(maximum_allocation_size);
        let to_server = client_transport.flushed_commands();
        let server_transport = BufferedCommandSerializer::new(maximum_allocation_size);
        let to_client = server_transport.flushed_commands();

        let (procs, native) = mock_procs();
        let client = WireClient::new(Box::new(client_transport), config);
        let mut server = WireServer::new(Box::new(procs), Box::new(server_transport), config);

        let instance = client.reserve_instance();
        let native_instance = native.create_object(ObjectType::Instance);
        assert!(server.inject_instance(native_instance, instance.handle()));

        Self {
            instance,
            client,
            server,
            native,
            native_instance,
            to_server,
            to_client,
        }
    }

    /// Client commands to the server, native completions back to the client.
    pub fn pump(&mut self) -> WireResult<()> {
        self.send_to_server()?;
        self.deliver_to_client()
    }

    /// Flushes the client and lets the server handle everything it sent.
    pub fn send_to_server(&mut self) -> WireResult<()> {
        self.client.flush();
        for frame in self.to_server.drain() {
            self.server.handle_commands(&frame)?;
        }
        Ok(())
    }

    /// Drains native completions that arrived after the last pump and delivers them.
    pub fn deliver_to_client(&mut self) -> WireResult<()> {
        self.server.process_native_events()?;
        self.server.flush();
        for frame in self.to_client.drain() {
            self.client.handle_commands(&frame)?;
        }
        Ok(())
    }

    /// Return commands queued for the client, without delivering them.
    pub fn take_return_commands(&mut self) -> Vec<ReturnWireCommand> {
        self.server.flush();
        decode_return_commands(&self.to_client)
    }
}
