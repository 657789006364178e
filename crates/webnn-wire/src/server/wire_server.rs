use ahash::AHashMap;
use tracing::{debug, error, info, warn};
use webnn_config::WireConfig;
use webnn_serialization::{
    ChunkedCommandHandler, ChunkedCommandSerializer, CommandSerializer, ReturnWireCommand,
    WireCommand,
};
use webnn_structures::{ErrorType, ObjectHandle, ObjectId, ObjectType};

use crate::error::{WireError, WireResult};
use crate::server::known_objects::{ContextInfo, KnownObjects, NativeHandle};
use crate::server::procs::WebnnProcs;
use crate::server::server_events::{self, EventQueue, ServerEvent};

/// Server half of the wire.
///
/// Decodes client commands, keeps one object table per type mapping client handles to native
/// handles, drives the native library through [`WebnnProcs`] and sends completions back as
/// return commands.
pub struct WireServer {
    pub(crate) procs: Box<dyn WebnnProcs>,
    serializer: ChunkedCommandSerializer,
    handler: ChunkedCommandHandler,
    flush_after_handle: bool,
    /// Set by the first fatal stream error. The stream is dead from then on.
    disconnected: bool,
    pub(crate) events: EventQueue,

    pub(crate) instances: KnownObjects<()>,
    pub(crate) contexts: KnownObjects<ContextInfo>,
    pub(crate) graph_builders: KnownObjects<()>,
    pub(crate) graphs: KnownObjects<()>,
    pub(crate) operands: KnownObjects<()>,
    pub(crate) operand_arrays: KnownObjects<()>,
    pub(crate) named_inputs: KnownObjects<()>,
    pub(crate) named_operands: KnownObjects<()>,
    pub(crate) named_outputs: KnownObjects<()>,

    /// Output names registered per named outputs id, in registration order.
    pub(crate) output_names: AHashMap<ObjectId, Vec<String>>,
}

impl WireServer {
    pub fn new(
        procs: Box<dyn WebnnProcs>,
        serializer: Box<dyn CommandSerializer>,
        config: &WireConfig,
    ) -> Self {
        info!("WebNN wire server created");
        Self {
            procs,
            serializer: ChunkedCommandSerializer::new(serializer),
            handler: ChunkedCommandHandler::new(),
            flush_after_handle: config.server.flush_after_handle,
            disconnected: false,
            events: EventQueue::default(),
            instances: KnownObjects::new(),
            contexts: KnownObjects::new(),
            graph_builders: KnownObjects::new(),
            graphs: KnownObjects::new(),
            operands: KnownObjects::new(),
            operand_arrays: KnownObjects::new(),
            named_inputs: KnownObjects::new(),
            named_operands: KnownObjects::new(),
            named_outputs: KnownObjects::new(),
            output_names: AHashMap::new(),
        }
    }

    /// Decodes and executes every command in `bytes`, in order.
    ///
    /// The first failing command aborts the rest of the stream and its error is returned. Every
    /// later call returns [`WireError::Disconnected`] without running anything. Return commands
    /// produced along the way are flushed when `flush_after_handle` is set.
    pub fn handle_commands(&mut self, bytes: &[u8]) -> WireResult<()> {
        if self.disconnected {
            warn!("Dropping {} bytes received after a fatal stream error", bytes.len());
            return Err(WireError::Disconnected);
        }
        let mut handler = std::mem::take(&mut self.handler);
        let result = handler.handle_commands::<WireCommand, _, WireError>(bytes, |command| {
            self.handle_command(command)?;
            self.process_native_events()
        });
        self.handler = handler;

        if let Err(err) = &result {
            error!("Fatal error in command stream: {}", err);
            self.disconnected = true;
        }
        if self.flush_after_handle {
            self.serializer.flush();
        }
        result
    }

    /// Turns native completions that arrived outside of [`handle_commands`](Self::handle_commands)
    /// into return commands. Call it whenever the native library may have completed work.
    pub fn process_native_events(&mut self) -> WireResult<()> {
        loop {
            let event = self.events.lock().pop_front();
            match event {
                Some(event) => self.on_native_event(event)?,
                None => return Ok(()),
            }
        }
    }

    pub fn flush(&mut self) -> bool {
        self.serializer.flush()
    }

    /// True once a fatal stream error has been seen.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub(crate) fn serialize_command(&mut self, command: &ReturnWireCommand) -> bool {
        debug!("Server sending {:?}", command.id());
        self.serializer.serialize_command(command)
    }

    //region Injection

    /// Places an instance created outside the wire at a handle the client reserved with
    /// [`WireClient::reserve_instance`](crate::client::WireClient::reserve_instance).
    ///
    /// Takes one reference on `native`. Returns `false` if the handle cannot be allocated.
    pub fn inject_instance(&mut self, native: NativeHandle, handle: ObjectHandle) -> bool {
        if self.instances.allocate(handle, native, None, ()).is_none() {
            warn!("Cannot inject instance at {}", handle);
            return false;
        }
        self.procs.reference(ObjectType::Instance, native);
        true
    }

    /// Places a context created outside the wire at a reserved handle and starts forwarding its
    /// uncaptured errors. Takes one reference on `native`.
    pub fn inject_context(&mut self, native: NativeHandle, handle: ObjectHandle) -> bool {
        if self
            .contexts
            .allocate(handle, native, None, ContextInfo::default())
            .is_none()
        {
            warn!("Cannot inject context at {}", handle);
            return false;
        }
        self.procs.reference(ObjectType::Context, native);
        let callback = server_events::uncaptured_error_callback(&self.events, handle);
        self.procs
            .context_set_uncaptured_error_callback(native, Some(callback));
        true
    }

    //endregion

    //region Native events

    fn on_native_event(&mut self, event: ServerEvent) -> WireResult<()> {
        match event {
            ServerEvent::PopErrorScope {
                context,
                request_serial,
                error_type,
                message,
            } => {
                self.serialize_command(&ReturnWireCommand::ContextPopErrorScopeCallback {
                    context,
                    request_serial,
                    error_type,
                    message,
                });
            }
            ServerEvent::UncapturedError {
                context,
                error_type,
                message,
            } => {
                self.serialize_command(&ReturnWireCommand::ContextUncapturedErrorCallback {
                    context,
                    error_type,
                    message,
                });
            }
            ServerEvent::ContextCompute {
                context,
                request_serial,
                named_outputs,
                error_type,
                message,
            } => {
                let (error_type, message) =
                    self.finish_compute(named_outputs, error_type, message);
                self.serialize_command(&ReturnWireCommand::ContextComputeCallback {
                    context,
                    request_serial,
                    error_type,
                    message,
                });
            }
            ServerEvent::GraphComputeAsync {
                graph,
                request_serial,
                named_outputs,
                error_type,
                message,
            } => {
                let (error_type, message) =
                    self.finish_compute(named_outputs, error_type, message);
                self.serialize_command(&ReturnWireCommand::GraphComputeAsyncCallback {
                    graph,
                    request_serial,
                    error_type,
                    message,
                });
            }
        }
        Ok(())
    }

    /// Sends the results of a successful compute ahead of its callback. A result that cannot be
    /// read turns the callback into an error.
    fn finish_compute(
        &mut self,
        named_outputs: ObjectId,
        error_type: ErrorType,
        message: String,
    ) -> (ErrorType, String) {
        if error_type != ErrorType::NoError {
            return (error_type, message);
        }
        match self.serialize_compute_results(named_outputs) {
            Ok(()) => (error_type, message),
            Err(err) => {
                warn!("Failed to return compute results: {}", err);
                (ErrorType::Unknown, err.to_string())
            }
        }
    }

    /// Sends one `ContextComputeResult` per registered output name, then forgets the names.
    pub(crate) fn serialize_compute_results(&mut self, named_outputs_id: ObjectId) -> WireResult<()> {
        let Some(names) = self.output_names.remove(&named_outputs_id) else {
            return Ok(());
        };
        let (native, generation) = self
            .named_outputs
            .get(named_outputs_id)
            .and_then(|data| data.handle.map(|handle| (handle, data.generation)))
            .ok_or_else(|| {
                WireError::FatalStream(format!(
                    "Named outputs {} no longer exists",
                    named_outputs_id
                ))
            })?;
        let handle = ObjectHandle::new(named_outputs_id, generation);

        for name in names {
            let output = self
                .procs
                .named_outputs_get_output(native, &name)
                .ok_or_else(|| {
                    WireError::FatalStream(format!(
                        "Native library has no output named '{}' on {}",
                        name, handle
                    ))
                })?;
            self.serialize_command(&ReturnWireCommand::ContextComputeResult {
                named_outputs: handle,
                byte_length: output.byte_length,
                byte_offset: output.byte_offset,
                name,
                buffer: output.bytes,
            });
        }
        Ok(())
    }

    //endregion
}

impl Drop for WireServer {
    fn drop(&mut self) {
        // Native callbacks must not outlive the server.
        for context in self.contexts.get_all_handles() {
            self.procs
                .context_set_uncaptured_error_callback(context, None);
        }
        let tables: [(ObjectType, &mut KnownObjects<()>); 8] = [
            (ObjectType::Operand, &mut self.operands),
            (ObjectType::OperandArray, &mut self.operand_arrays),
            (ObjectType::NamedInputs, &mut self.named_inputs),
            (ObjectType::NamedOperands, &mut self.named_operands),
            (ObjectType::NamedOutputs, &mut self.named_outputs),
            (ObjectType::Graph, &mut self.graphs),
            (ObjectType::GraphBuilder, &mut self.graph_builders),
            (ObjectType::Instance, &mut self.instances),
        ];
        for (object_type, table) in tables {
            for handle in table.acquire_all_handles() {
                self.procs.release(object_type, handle);
            }
        }
        for context in self.contexts.acquire_all_handles() {
            self.procs.release(ObjectType::Context, context);
        }
        info!("WebNN wire server destroyed");
    }
}
