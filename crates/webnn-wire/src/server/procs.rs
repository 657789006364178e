use webnn_structures::{
    ContextOptions, ErrorFilter, ErrorType, ObjectType, OperandDescriptor, Operation,
};

use crate::server::known_objects::NativeHandle;

/// Completion of a native error scope pop or compute call.
pub type ErrorCallback = Box<dyn FnOnce(ErrorType, String) + Send>;

/// Called for every error no error scope captured.
pub type UncapturedErrorCallback = Box<dyn FnMut(ErrorType, String) + Send>;

/// Bytes of one computed output. The output is `bytes[byte_offset..byte_offset + byte_length]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    pub bytes: Vec<u8>,
    pub byte_offset: u64,
    pub byte_length: u64,
}

/// The native WebNN entry points the server drives.
///
/// Creation entry points return `None` when the native library refuses to create the object;
/// the server treats that as a failed command. Callbacks may run inline or later on any thread.
pub trait WebnnProcs: Send {
    //region Creation

    fn instance_create_context(
        &mut self,
        instance: NativeHandle,
        options: &ContextOptions,
    ) -> Option<NativeHandle>;

    fn context_create_graph_builder(&mut self, context: NativeHandle) -> Option<NativeHandle>;

    fn context_create_named_inputs(&mut self, context: NativeHandle) -> Option<NativeHandle>;

    fn context_create_named_operands(&mut self, context: NativeHandle) -> Option<NativeHandle>;

    fn context_create_named_outputs(&mut self, context: NativeHandle) -> Option<NativeHandle>;

    //endregion

    //region Context

    fn context_push_error_scope(&mut self, context: NativeHandle, filter: ErrorFilter);

    /// Returns `false` if there was no scope to pop. The callback is not called in that case.
    fn context_pop_error_scope(&mut self, context: NativeHandle, callback: ErrorCallback) -> bool;

    /// `None` removes the callback.
    fn context_set_uncaptured_error_callback(
        &mut self,
        context: NativeHandle,
        callback: Option<UncapturedErrorCallback>,
    );

    fn context_compute(
        &mut self,
        context: NativeHandle,
        graph: NativeHandle,
        inputs: NativeHandle,
        outputs: NativeHandle,
        callback: ErrorCallback,
    );

    fn context_compute_sync(
        &mut self,
        context: NativeHandle,
        graph: NativeHandle,
        inputs: NativeHandle,
        outputs: NativeHandle,
    ) -> ErrorType;

    fn graph_compute_async(
        &mut self,
        graph: NativeHandle,
        inputs: NativeHandle,
        outputs: NativeHandle,
        callback: ErrorCallback,
    );

    //endregion

    //region Graph building

    fn graph_builder_input(
        &mut self,
        graph_builder: NativeHandle,
        name: &str,
        descriptor: &OperandDescriptor,
    ) -> Option<NativeHandle>;

    fn graph_builder_constant(
        &mut self,
        graph_builder: NativeHandle,
        descriptor: &OperandDescriptor,
        data: &[u8],
    ) -> Option<NativeHandle>;

    fn graph_builder_operation(
        &mut self,
        graph_builder: NativeHandle,
        operation: &Operation<NativeHandle>,
    ) -> Option<NativeHandle>;

    fn graph_builder_split(
        &mut self,
        graph_builder: NativeHandle,
        input: NativeHandle,
        splits: &[u32],
        axis: i32,
    ) -> Option<NativeHandle>;

    fn graph_builder_build(
        &mut self,
        graph_builder: NativeHandle,
        named_operands: NativeHandle,
    ) -> Option<NativeHandle>;

    fn operand_array_get_operand(
        &mut self,
        operand_array: NativeHandle,
        index: u32,
    ) -> Option<NativeHandle>;

    //endregion

    //region Named collections

    fn named_inputs_set(
        &mut self,
        named_inputs: NativeHandle,
        name: &str,
        data: &[u8],
        dimensions: &[i32],
    );

    fn named_operands_set(&mut self, named_operands: NativeHandle, name: &str, operand: NativeHandle);

    fn named_outputs_set_output(
        &mut self,
        named_outputs: NativeHandle,
        name: &str,
        byte_length: u64,
        byte_offset: u64,
    );

    /// The computed output `name`, or `None` if there is none.
    fn named_outputs_get_output(
        &mut self,
        named_outputs: NativeHandle,
        name: &str,
    ) -> Option<OutputBuffer>;

    //endregion

    //region Lifetime

    fn reference(&mut self, object_type: ObjectType, handle: NativeHandle);

    fn release(&mut self, object_type: ObjectType, handle: NativeHandle);

    //endregion
}
