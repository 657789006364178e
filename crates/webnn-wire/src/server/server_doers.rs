use tracing::{debug, warn};
use webnn_serialization::WireCommand;
use webnn_structures::{ErrorType, ObjectHandle, ObjectId, ObjectType};

use crate::error::{WireError, WireResult};
use crate::server::known_objects::{ContextInfo, KnownObjects, NativeHandle};
use crate::server::server_events;
use crate::server::wire_server::WireServer;

/// A resolved handle argument.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedObject {
    pub native: NativeHandle,
    pub context_id: Option<ObjectId>,
}

fn unknown_object(object_type: ObjectType, handle: ObjectHandle) -> WireError {
    WireError::FatalStream(format!("Unknown {} {}", object_type, handle))
}

fn creation_failed(object_type: ObjectType, handle: ObjectHandle) -> WireError {
    WireError::FatalStream(format!(
        "Native library failed to create {} {}",
        object_type, handle
    ))
}

impl WireServer {
    pub(crate) fn objects(&self, object_type: ObjectType) -> Option<&KnownObjects<()>> {
        match object_type {
            ObjectType::Instance => Some(&self.instances),
            ObjectType::Context => None,
            ObjectType::GraphBuilder => Some(&self.graph_builders),
            ObjectType::Graph => Some(&self.graphs),
            ObjectType::Operand => Some(&self.operands),
            ObjectType::OperandArray => Some(&self.operand_arrays),
            ObjectType::NamedInputs => Some(&self.named_inputs),
            ObjectType::NamedOperands => Some(&self.named_operands),
            ObjectType::NamedOutputs => Some(&self.named_outputs),
        }
    }

    pub(crate) fn objects_mut(&mut self, object_type: ObjectType) -> Option<&mut KnownObjects<()>> {
        match object_type {
            ObjectType::Instance => Some(&mut self.instances),
            ObjectType::Context => None,
            ObjectType::GraphBuilder => Some(&mut self.graph_builders),
            ObjectType::Graph => Some(&mut self.graphs),
            ObjectType::Operand => Some(&mut self.operands),
            ObjectType::OperandArray => Some(&mut self.operand_arrays),
            ObjectType::NamedInputs => Some(&mut self.named_inputs),
            ObjectType::NamedOperands => Some(&mut self.named_operands),
            ObjectType::NamedOutputs => Some(&mut self.named_outputs),
        }
    }

    /// Looks up a live object by its full handle.
    fn resolve(&self, object_type: ObjectType, handle: ObjectHandle) -> WireResult<ResolvedObject> {
        let found = match object_type {
            ObjectType::Context => self
                .contexts
                .get_with_handle(handle)
                .and_then(|data| data.handle)
                .map(|native| ResolvedObject {
                    native,
                    context_id: Some(handle.id),
                }),
            _ => self
                .objects(object_type)
                .and_then(|objects| objects.get_with_handle(handle))
                .and_then(|data| {
                    data.handle.map(|native| ResolvedObject {
                        native,
                        context_id: data.context_id,
                    })
                }),
        };
        found.ok_or_else(|| unknown_object(object_type, handle))
    }

    fn resolve_native(&self, object_type: ObjectType, handle: ObjectHandle) -> WireResult<NativeHandle> {
        self.resolve(object_type, handle).map(|object| object.native)
    }

    fn ensure_can_allocate(&self, object_type: ObjectType, handle: ObjectHandle) -> WireResult<()> {
        let can_allocate = match object_type {
            ObjectType::Context => self.contexts.can_allocate(handle),
            _ => self
                .objects(object_type)
                .is_some_and(|objects| objects.can_allocate(handle)),
        };
        if can_allocate {
            Ok(())
        } else {
            Err(WireError::FatalStream(format!(
                "Cannot allocate {} at {}",
                object_type, handle
            )))
        }
    }

    /// Stores a newly created context child and registers it on its context.
    fn store_context_child(
        &mut self,
        object_type: ObjectType,
        handle: ObjectHandle,
        native: NativeHandle,
        context_id: Option<ObjectId>,
    ) -> WireResult<()> {
        let stored = self
            .objects_mut(object_type)
            .and_then(|objects| objects.allocate(handle, native, context_id, ()))
            .is_some();
        if !stored {
            self.procs.release(object_type, native);
            return Err(WireError::FatalStream(format!(
                "Cannot allocate {} at {}",
                object_type, handle
            )));
        }
        if let Some(context_id) = context_id {
            let tracked = self
                .contexts
                .get_mut(context_id)
                .is_some_and(|context| context.extra.track_child(object_type, handle.id));
            if !tracked {
                return Err(WireError::FatalStream(format!(
                    "{} {} is already tracked by context {}",
                    object_type, handle, context_id
                )));
            }
        }
        Ok(())
    }

    /// Runs a creation entry point for a context child and stores its result at `result`.
    fn create_context_child(
        &mut self,
        object_type: ObjectType,
        result: ObjectHandle,
        context_id: Option<ObjectId>,
        create: impl FnOnce(&mut Self) -> Option<NativeHandle>,
    ) -> WireResult<()> {
        self.ensure_can_allocate(object_type, result)?;
        let native = create(self).ok_or_else(|| creation_failed(object_type, result))?;
        self.store_context_child(object_type, result, native, context_id)
    }

    pub(crate) fn handle_command(&mut self, command: WireCommand) -> WireResult<()> {
        debug!("Server received {:?}", command.id());
        match command {
            WireCommand::DestroyObject {
                object_type,
                object_id,
            } => self.do_destroy_object(object_type, object_id),
            WireCommand::InstanceCreateContext {
                instance,
                result,
                options,
            } => {
                let instance = self.resolve_native(ObjectType::Instance, instance)?;
                self.ensure_can_allocate(ObjectType::Context, result)?;
                let native = self
                    .procs
                    .instance_create_context(instance, &options)
                    .ok_or_else(|| creation_failed(ObjectType::Context, result))?;
                if self
                    .contexts
                    .allocate(result, native, None, ContextInfo::default())
                    .is_none()
                {
                    self.procs.release(ObjectType::Context, native);
                    return Err(unknown_object(ObjectType::Context, result));
                }
                let callback = server_events::uncaptured_error_callback(&self.events, result);
                self.procs
                    .context_set_uncaptured_error_callback(native, Some(callback));
                Ok(())
            }
            WireCommand::ContextCreateGraphBuilder { context, result } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                self.create_context_child(ObjectType::GraphBuilder, result, Some(context.id), |s| {
                    s.procs.context_create_graph_builder(native)
                })
            }
            WireCommand::ContextCreateNamedInputs { context, result } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                self.create_context_child(ObjectType::NamedInputs, result, Some(context.id), |s| {
                    s.procs.context_create_named_inputs(native)
                })
            }
            WireCommand::ContextCreateNamedOperands { context, result } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                self.create_context_child(ObjectType::NamedOperands, result, Some(context.id), |s| {
                    s.procs.context_create_named_operands(native)
                })
            }
            WireCommand::ContextCreateNamedOutputs { context, result } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                self.create_context_child(ObjectType::NamedOutputs, result, Some(context.id), |s| {
                    s.procs.context_create_named_outputs(native)
                })
            }
            WireCommand::ContextPushErrorScope { context, filter } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                self.procs.context_push_error_scope(native, filter);
                Ok(())
            }
            WireCommand::ContextPopErrorScope {
                context,
                request_serial,
            } => {
                let native = self.resolve_native(ObjectType::Context, context)?;
                let callback =
                    server_events::pop_error_scope_callback(&self.events, context, request_serial);
                if self.procs.context_pop_error_scope(native, callback) {
                    Ok(())
                } else {
                    Err(WireError::FatalStream(format!(
                        "Context {} has no error scope to pop",
                        context
                    )))
                }
            }
            WireCommand::ContextCompute {
                context,
                graph,
                request_serial,
                inputs,
                outputs,
            } => {
                let context_native = self.resolve_native(ObjectType::Context, context)?;
                let graph = self.resolve_native(ObjectType::Graph, graph)?;
                let inputs = self.resolve_native(ObjectType::NamedInputs, inputs)?;
                let outputs_native = self.resolve_native(ObjectType::NamedOutputs, outputs)?;
                let callback = server_events::context_compute_callback(
                    &self.events,
                    context,
                    request_serial,
                    outputs.id,
                );
                self.procs
                    .context_compute(context_native, graph, inputs, outputs_native, callback);
                Ok(())
            }
            WireCommand::ContextComputeSync {
                context,
                graph,
                inputs,
                outputs,
            } => {
                let context = self.resolve_native(ObjectType::Context, context)?;
                let graph = self.resolve_native(ObjectType::Graph, graph)?;
                let inputs = self.resolve_native(ObjectType::NamedInputs, inputs)?;
                let outputs_native = self.resolve_native(ObjectType::NamedOutputs, outputs)?;
                let error_type = self
                    .procs
                    .context_compute_sync(context, graph, inputs, outputs_native);
                if error_type != ErrorType::NoError {
                    debug!("Synchronous compute finished with {}", error_type);
                    return Ok(());
                }
                self.serialize_compute_results(outputs.id)
            }
            WireCommand::GraphComputeAsync {
                graph,
                request_serial,
                inputs,
                outputs,
            } => {
                let graph_native = self.resolve_native(ObjectType::Graph, graph)?;
                let inputs = self.resolve_native(ObjectType::NamedInputs, inputs)?;
                let outputs_native = self.resolve_native(ObjectType::NamedOutputs, outputs)?;
                let callback = server_events::graph_compute_callback(
                    &self.events,
                    graph,
                    request_serial,
                    outputs.id,
                );
                self.procs
                    .graph_compute_async(graph_native, inputs, outputs_native, callback);
                Ok(())
            }
            WireCommand::GraphBuilderInput {
                graph_builder,
                result,
                descriptor,
                name,
            } => {
                let builder = self.resolve(ObjectType::GraphBuilder, graph_builder)?;
                self.create_context_child(ObjectType::Operand, result, builder.context_id, |s| {
                    s.procs.graph_builder_input(builder.native, &name, &descriptor)
                })
            }
            WireCommand::GraphBuilderConstant {
                graph_builder,
                result,
                descriptor,
                data,
            } => {
                let builder = self.resolve(ObjectType::GraphBuilder, graph_builder)?;
                self.create_context_child(ObjectType::Operand, result, builder.context_id, |s| {
                    s.procs.graph_builder_constant(builder.native, &descriptor, &data)
                })
            }
            WireCommand::GraphBuilderOperation {
                graph_builder,
                result,
                operation,
            } => {
                let builder = self.resolve(ObjectType::GraphBuilder, graph_builder)?;
                let operation = operation
                    .try_map_handles(|operand| self.resolve_native(ObjectType::Operand, *operand))?;
                self.create_context_child(ObjectType::Operand, result, builder.context_id, |s| {
                    s.procs.graph_builder_operation(builder.native, &operation)
                })
            }
            WireCommand::GraphBuilderSplit {
                graph_builder,
                result,
                input,
                axis,
                splits,
            } => {
                let builder = self.resolve(ObjectType::GraphBuilder, graph_builder)?;
                let input = self.resolve_native(ObjectType::Operand, input)?;
                self.create_context_child(
                    ObjectType::OperandArray,
                    result,
                    builder.context_id,
                    |s| s.procs.graph_builder_split(builder.native, input, &splits, axis),
                )
            }
            WireCommand::GraphBuilderBuild {
                graph_builder,
                named_operands,
                result,
            } => {
                let builder = self.resolve(ObjectType::GraphBuilder, graph_builder)?;
                let named_operands = self.resolve_native(ObjectType::NamedOperands, named_operands)?;
                self.create_context_child(ObjectType::Graph, result, builder.context_id, |s| {
                    s.procs.graph_builder_build(builder.native, named_operands)
                })
            }
            WireCommand::OperandArrayGetOperand {
                operand_array,
                index,
                result,
            } => {
                let array = self.resolve(ObjectType::OperandArray, operand_array)?;
                self.create_context_child(ObjectType::Operand, result, array.context_id, |s| {
                    s.procs.operand_array_get_operand(array.native, index)
                })
            }
            WireCommand::NamedInputsSet {
                named_inputs,
                name,
                dimensions,
                data,
            } => {
                let native = self.resolve_native(ObjectType::NamedInputs, named_inputs)?;
                self.procs.named_inputs_set(native, &name, &data, &dimensions);
                Ok(())
            }
            WireCommand::NamedOperandsSet {
                named_operands,
                operand,
                name,
            } => {
                let native = self.resolve_native(ObjectType::NamedOperands, named_operands)?;
                let operand = self.resolve_native(ObjectType::Operand, operand)?;
                self.procs.named_operands_set(native, &name, operand);
                Ok(())
            }
            WireCommand::NamedOutputsSetOutput {
                named_outputs,
                byte_length,
                byte_offset,
                name,
            } => {
                let native = self.resolve_native(ObjectType::NamedOutputs, named_outputs)?;
                self.procs
                    .named_outputs_set_output(native, &name, byte_length, byte_offset);
                self.output_names
                    .entry(named_outputs.id)
                    .or_default()
                    .push(name);
                Ok(())
            }
        }
    }

    /// Destroys the object `object_id` of `object_type`. A context takes everything it created
    /// down with it, newest first.
    pub(crate) fn do_destroy_object(
        &mut self,
        object_type: ObjectType,
        object_id: ObjectId,
    ) -> WireResult<()> {
        if object_id == 0 {
            return Err(WireError::FatalStream(format!(
                "Cannot destroy the null {}",
                object_type
            )));
        }

        if object_type == ObjectType::Context {
            let context = self.contexts.get(object_id).ok_or_else(|| {
                WireError::FatalStream(format!("Unknown context #{}", object_id))
            })?;
            let children = context.extra.children_newest_first();
            let native = context.handle;
            for (child_type, child_id) in children {
                self.do_destroy_object(child_type, child_id)?;
            }
            if let Some(native) = native {
                self.procs.context_set_uncaptured_error_callback(native, None);
                self.procs.release(ObjectType::Context, native);
            }
            self.contexts.free(object_id);
            return Ok(());
        }

        let data = self
            .objects_mut(object_type)
            .and_then(|objects| objects.free(object_id))
            .ok_or_else(|| {
                WireError::FatalStream(format!("Unknown {} #{}", object_type, object_id))
            })?;
        if let Some(context_id) = data.context_id {
            let untracked = self
                .contexts
                .get_mut(context_id)
                .is_some_and(|context| context.extra.untrack_child(object_type, object_id));
            if !untracked {
                warn!(
                    "{} #{} was not tracked by context #{}",
                    object_type, object_id, context_id
                );
            }
        }
        if object_type == ObjectType::NamedOutputs {
            self.output_names.remove(&object_id);
        }
        if let Some(native) = data.handle {
            self.procs.release(object_type, native);
        }
        Ok(())
    }
}
