//! Tests for the server half of the wire
//!
//! Raw command streams go straight into a server backed by a recording native library; the
//! loopback tests run real client proxies against it.

mod common;

use webnn_config::WireConfig;
use webnn_serialization::{
    BufferedCommandSerializer, FlushedCommands, ReturnWireCommand, WireCommand,
};
use webnn_structures::{
    BinaryOperator, ContextOptions, ErrorFilter, ErrorType, ObjectHandle, ObjectType,
    OperandDescriptor, OperandType, Operation,
};
use webnn_wire::client::ArrayBufferView;
use webnn_wire::server::{NativeHandle, OutputBuffer, WireServer};
use webnn_wire::WireError;

use common::{decode_return_commands, encode_commands, mock_procs, Loopback, MockNative, NativeCall};

const INSTANCE: ObjectHandle = ObjectHandle::new(1, 0);
const CONTEXT: ObjectHandle = ObjectHandle::new(1, 0);

struct RawServer {
    server: WireServer,
    native: MockNative,
    native_context: NativeHandle,
    returned: FlushedCommands,
}

impl RawServer {
    /// A server with an injected instance and context at `#1@0`.
    fn new() -> Self {
        let (procs, native) = mock_procs();
        let transport = BufferedCommandSerializer::new(4096);
        let returned = transport.flushed_commands();
        let mut server = WireServer::new(Box::new(procs), Box::new(transport), &WireConfig::default());
        assert!(server.inject_instance(native.create_object(ObjectType::Instance), INSTANCE));
        let native_context = native.create_object(ObjectType::Context);
        assert!(server.inject_context(native_context, CONTEXT));
        native.clear_calls();
        Self {
            server,
            native,
            native_context,
            returned,
        }
    }

    fn handle(&mut self, commands: &[WireCommand]) -> Result<(), WireError> {
        self.server.handle_commands(&encode_commands(commands))
    }

    fn returned(&mut self) -> Vec<ReturnWireCommand> {
        self.server.flush();
        decode_return_commands(&self.returned)
    }
}

fn create_graph_builder(result: ObjectHandle) -> WireCommand {
    WireCommand::ContextCreateGraphBuilder {
        context: CONTEXT,
        result,
    }
}

fn float_descriptor(dimensions: Vec<i32>) -> OperandDescriptor {
    OperandDescriptor::new(OperandType::Float32, dimensions)
}

fn assert_fatal(result: Result<(), WireError>) {
    assert!(
        matches!(result, Err(WireError::FatalStream(_))),
        "expected a fatal stream error, got {:?}",
        result
    );
}

//region Object tables

#[test]
fn test_objects_are_allocated_at_the_client_chosen_handle() {
    let mut raw = RawServer::new();
    raw.handle(&[create_graph_builder(ObjectHandle::new(4, 2))])
        .unwrap();
    raw.handle(&[WireCommand::GraphBuilderInput {
        graph_builder: ObjectHandle::new(4, 2),
        result: ObjectHandle::new(1, 0),
        descriptor: float_descriptor(vec![1]),
        name: "x".into(),
    }])
    .unwrap();
    assert_eq!(
        raw.native.calls(),
        vec![
            NativeCall::CreateGraphBuilder,
            NativeCall::Input { name: "x".into() }
        ]
    );
}

#[test]
fn test_stale_generation_does_not_resolve() {
    let mut raw = RawServer::new();
    let builder = ObjectHandle::new(1, 0);
    raw.handle(&[
        create_graph_builder(builder),
        WireCommand::DestroyObject {
            object_type: ObjectType::GraphBuilder,
            object_id: 1,
        },
    ])
    .unwrap();

    assert_fatal(raw.handle(&[WireCommand::GraphBuilderInput {
        graph_builder: builder,
        result: ObjectHandle::new(1, 0),
        descriptor: float_descriptor(vec![1]),
        name: "x".into(),
    }]));
}

#[test]
fn test_freed_slot_only_accepts_a_newer_generation() {
    let mut raw = RawServer::new();
    raw.handle(&[
        create_graph_builder(ObjectHandle::new(1, 0)),
        WireCommand::DestroyObject {
            object_type: ObjectType::GraphBuilder,
            object_id: 1,
        },
    ])
    .unwrap();
    assert_fatal(raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))]));

    let mut raw = RawServer::new();
    raw.handle(&[
        create_graph_builder(ObjectHandle::new(1, 0)),
        WireCommand::DestroyObject {
            object_type: ObjectType::GraphBuilder,
            object_id: 1,
        },
        create_graph_builder(ObjectHandle::new(1, 1)),
    ])
    .unwrap();
}

#[test]
fn test_live_slot_cannot_be_allocated_twice() {
    let mut raw = RawServer::new();
    raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))])
        .unwrap();
    assert_fatal(raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))]));
    // The native library was never asked for the second builder.
    assert_eq!(raw.native.count(|call| *call == NativeCall::CreateGraphBuilder), 1);
}

#[test]
fn test_id_zero_is_never_created_or_destroyed() {
    let mut raw = RawServer::new();
    assert_fatal(raw.handle(&[create_graph_builder(ObjectHandle::NULL)]));
    assert!(raw.native.calls().is_empty());

    let mut raw = RawServer::new();
    assert_fatal(raw.handle(&[WireCommand::DestroyObject {
        object_type: ObjectType::Operand,
        object_id: 0,
    }]));
    assert!(raw.native.calls().is_empty());
}

#[test]
fn test_destroying_unknown_object_is_fatal() {
    let mut raw = RawServer::new();
    assert_fatal(raw.handle(&[WireCommand::DestroyObject {
        object_type: ObjectType::Graph,
        object_id: 3,
    }]));
}

#[test]
fn test_native_creation_failure_is_fatal() {
    let mut raw = RawServer::new();
    raw.native.refuse_creation(true);
    assert_fatal(raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))]));
}

#[test]
fn test_first_failing_command_stops_the_stream() {
    let mut raw = RawServer::new();
    let result = raw.handle(&[
        WireCommand::ContextPushErrorScope {
            context: ObjectHandle::new(9, 0),
            filter: ErrorFilter::Validation,
        },
        create_graph_builder(ObjectHandle::new(1, 0)),
    ]);
    assert_fatal(result);
    assert!(raw.native.calls().is_empty());
}

#[test]
fn test_truncated_stream_is_fatal() {
    let mut raw = RawServer::new();
    let bytes = encode_commands(&[create_graph_builder(ObjectHandle::new(1, 0))]);
    let result = raw.server.handle_commands(&bytes[..bytes.len() - 1]);
    assert!(matches!(result, Err(WireError::Data(_))));
}

#[test]
fn test_stream_stays_dead_after_a_fatal_error() {
    let mut raw = RawServer::new();
    // A header announcing 1000 bytes with nothing behind it.
    let mut truncated = 1000u64.to_le_bytes().to_vec();
    truncated.extend_from_slice(&1u32.to_le_bytes());
    assert!(matches!(
        raw.server.handle_commands(&truncated),
        Err(WireError::Data(_))
    ));
    assert!(raw.server.is_disconnected());

    let result = raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))]);
    assert!(matches!(result, Err(WireError::Disconnected)));
    assert_eq!(raw.native.count(|call| *call == NativeCall::CreateGraphBuilder), 0);
}

#[test]
fn test_healthy_stream_is_not_disconnected() {
    let mut raw = RawServer::new();
    raw.handle(&[create_graph_builder(ObjectHandle::new(1, 0))])
        .unwrap();
    assert!(!raw.server.is_disconnected());
}

//endregion

//region Graph building

#[test]
fn test_operation_handles_are_mapped_to_native_handles() {
    let mut raw = RawServer::new();
    let builder = ObjectHandle::new(1, 0);
    raw.handle(&[
        create_graph_builder(builder),
        WireCommand::GraphBuilderInput {
            graph_builder: builder,
            result: ObjectHandle::new(1, 0),
            descriptor: float_descriptor(vec![2]),
            name: "a".into(),
        },
        WireCommand::GraphBuilderConstant {
            graph_builder: builder,
            result: ObjectHandle::new(2, 0),
            descriptor: float_descriptor(vec![2]),
            data: vec![0; 8],
        },
        WireCommand::GraphBuilderOperation {
            graph_builder: builder,
            result: ObjectHandle::new(3, 0),
            operation: Operation::Binary {
                operator: BinaryOperator::Add,
                a: ObjectHandle::new(1, 0),
                b: ObjectHandle::new(2, 0),
            },
        },
    ])
    .unwrap();

    let operands = raw.native.handles_of(ObjectType::Operand);
    assert_eq!(operands.len(), 3);
    assert!(raw.native.calls().contains(&NativeCall::Operation(Operation::Binary {
        operator: BinaryOperator::Add,
        a: operands[0],
        b: operands[1],
    })));
}

#[test]
fn test_operation_on_unknown_operand_is_fatal() {
    let mut raw = RawServer::new();
    let builder = ObjectHandle::new(1, 0);
    raw.handle(&[create_graph_builder(builder)]).unwrap();
    assert_fatal(raw.handle(&[WireCommand::GraphBuilderOperation {
        graph_builder: builder,
        result: ObjectHandle::new(1, 0),
        operation: Operation::Unary {
            operator: webnn_structures::UnaryOperator::Relu,
            input: ObjectHandle::new(5, 0),
        },
    }]));
}

#[test]
fn test_split_and_get_operand_reach_the_native_library() {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    let input = builder.input("x", &float_descriptor(vec![6]));
    let parts = builder.split(&input, &[2, 4], 0);
    let second = parts.get_operand(1).unwrap();
    wire.pump().unwrap();

    let calls = wire.native.calls();
    assert!(calls.contains(&NativeCall::Split {
        splits: vec![2, 4],
        axis: 0
    }));
    assert!(calls.contains(&NativeCall::GetOperand(1)));
    assert_eq!(second.handle(), ObjectHandle::new(2, 0));
}

#[test]
fn test_large_constant_survives_chunking() {
    let mut config = WireConfig::default();
    config.transport.max_allocation_size = 64;
    let mut wire = Loopback::with_config(&config);
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    let data: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
    let _constant = builder.constant(&OperandDescriptor::new(OperandType::Uint8, vec![1000]), &data);
    wire.pump().unwrap();

    assert!(wire.native.calls().contains(&NativeCall::Constant { data }));
}

#[test]
fn test_server_follows_client_ids_past_sixty_five_thousand() {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    let descriptor = OperandDescriptor::new(OperandType::Uint8, vec![1]);

    let mut operands = Vec::with_capacity(66_000);
    for batch in 0..66 {
        for _ in 0..1_000 {
            operands.push(builder.constant(&descriptor, &[batch as u8]));
        }
        wire.pump().unwrap();
        wire.native.clear_calls();
    }

    assert_eq!(operands.last().unwrap().handle(), ObjectHandle::new(66_000, 0));
    assert!(!wire.server.is_disconnected());
    assert!(!wire.client.is_disconnected());
}

//endregion

//region Error scopes

#[test]
fn test_error_scope_result_reaches_the_client() {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    wire.native.set_pop_result(ErrorType::Validation, "bad shape");
    context.push_error_scope(ErrorFilter::Validation);
    let mut scope = context.pop_error_scope().unwrap();
    wire.pump().unwrap();

    let result = scope.try_recv().unwrap().unwrap();
    assert_eq!(result.error_type, ErrorType::Validation);
    assert_eq!(result.message, "bad shape");
}

#[test]
fn test_pop_of_empty_native_scope_stack_is_fatal() {
    let mut raw = RawServer::new();
    assert_fatal(raw.handle(&[WireCommand::ContextPopErrorScope {
        context: CONTEXT,
        request_serial: 0,
    }]));
    assert!(raw.returned().is_empty());
}

#[test]
fn test_uncaptured_errors_reach_the_client_until_the_context_is_destroyed() {
    let mut raw = RawServer::new();
    raw.native
        .raise_uncaptured(raw.native_context, ErrorType::OutOfMemory, "oom");
    raw.server.process_native_events().unwrap();
    assert_eq!(
        raw.returned(),
        vec![ReturnWireCommand::ContextUncapturedErrorCallback {
            context: CONTEXT,
            error_type: ErrorType::OutOfMemory,
            message: "oom".into(),
        }]
    );

    raw.handle(&[WireCommand::DestroyObject {
        object_type: ObjectType::Context,
        object_id: CONTEXT.id,
    }])
    .unwrap();
    assert!(!raw.native.has_uncaptured_callback(raw.native_context));
}

//endregion

//region Destruction

#[test]
fn test_context_destroys_children_newest_first() {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    let operand = builder.input("x", &float_descriptor(vec![1]));
    let outputs = context.create_named_outputs();
    wire.pump().unwrap();

    let native_context = wire.native.handles_of(ObjectType::Context)[0];
    let native_builder = wire.native.handles_of(ObjectType::GraphBuilder)[0];
    let native_operand = wire.native.handles_of(ObjectType::Operand)[0];
    let native_outputs = wire.native.handles_of(ObjectType::NamedOutputs)[0];
    wire.native.clear_calls();

    drop(context);
    wire.pump().unwrap();

    assert_eq!(
        wire.native.calls(),
        vec![
            NativeCall::Release(ObjectType::NamedOutputs, native_outputs),
            NativeCall::Release(ObjectType::Operand, native_operand),
            NativeCall::Release(ObjectType::GraphBuilder, native_builder),
            NativeCall::SetUncapturedCallback {
                context: native_context,
                installed: false
            },
            NativeCall::Release(ObjectType::Context, native_context),
        ]
    );
    drop((outputs, operand, builder));
}

#[test]
fn test_destroyed_child_is_not_destroyed_again_with_its_context() {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    drop(builder);
    drop(context);
    wire.pump().unwrap();
    assert_eq!(
        wire.native
            .count(|call| matches!(call, NativeCall::Release(ObjectType::GraphBuilder, _))),
        1
    );
}

#[test]
fn test_server_teardown_releases_contexts_last() {
    let mut raw = RawServer::new();
    raw.handle(&[
        create_graph_builder(ObjectHandle::new(1, 0)),
        WireCommand::ContextCreateNamedInputs {
            context: CONTEXT,
            result: ObjectHandle::new(1, 0),
        },
    ])
    .unwrap();
    let native = raw.native.clone();
    let native_context = raw.native_context;
    native.clear_calls();
    drop(raw);

    let calls = native.calls();
    assert_eq!(
        calls[0],
        NativeCall::SetUncapturedCallback {
            context: native_context.get(),
            installed: false
        }
    );
    let released: Vec<ObjectType> = native.releases().into_iter().map(|(ty, _)| ty).collect();
    assert_eq!(
        released,
        vec![
            ObjectType::NamedInputs,
            ObjectType::GraphBuilder,
            ObjectType::Instance,
            ObjectType::Context
        ]
    );
}

//endregion

//region Compute

struct ComputeSetup {
    wire: Loopback,
    context: webnn_wire::client::Context,
    graph: webnn_wire::client::Graph,
    inputs: webnn_wire::client::NamedInputs,
    outputs: webnn_wire::client::NamedOutputs,
    view: ArrayBufferView,
}

fn compute_setup() -> ComputeSetup {
    let mut wire = Loopback::new();
    let context = wire.instance.create_context(&ContextOptions::default());
    let builder = context.create_graph_builder();
    let descriptor = float_descriptor(vec![2]);
    let a = builder.input("a", &descriptor);
    let b = builder.constant(&descriptor, &[0u8; 8]);
    let sum = builder.add(&a, &b);
    let named_operands = context.create_named_operands();
    named_operands.set("sum", &sum);
    let graph = builder.build(&named_operands);
    let inputs = context.create_named_inputs();
    inputs.set("a", &[1u8; 8], &[2]);
    let outputs = context.create_named_outputs();
    let view = ArrayBufferView::new(8);
    outputs.set_output("sum", view.clone());
    wire.pump().unwrap();
    wire.native.set_output(
        "sum",
        OutputBuffer {
            bytes: vec![0, 0, 7, 7, 7, 7, 7, 7, 7, 7],
            byte_offset: 2,
            byte_length: 8,
        },
    );
    ComputeSetup {
        wire,
        context,
        graph,
        inputs,
        outputs,
        view,
    }
}

#[test]
fn test_compute_copies_results_before_resolving() {
    let mut setup = compute_setup();
    let mut done = setup
        .context
        .compute(&setup.graph, &setup.inputs, &setup.outputs);
    setup.wire.send_to_server().unwrap();

    let returned = setup.wire.take_return_commands();
    assert_eq!(returned.len(), 2);
    assert!(matches!(
        &returned[0],
        ReturnWireCommand::ContextComputeResult { name, byte_offset: 2, byte_length: 8, .. } if name == "sum"
    ));
    assert!(matches!(
        returned[1],
        ReturnWireCommand::ContextComputeCallback {
            error_type: ErrorType::NoError,
            ..
        }
    ));
    assert_eq!(done.try_recv().unwrap(), None);
}

#[test]
fn test_compute_round_trip_fills_the_output_view() {
    let mut setup = compute_setup();
    let mut done = setup
        .context
        .compute(&setup.graph, &setup.inputs, &setup.outputs);
    setup.wire.pump().unwrap();

    assert!(done.try_recv().unwrap().unwrap().is_success());
    assert_eq!(setup.view.to_vec(), vec![7u8; 8]);
    assert!(setup.wire.native.calls().contains(&NativeCall::NamedInputsSet {
        name: "a".into(),
        dimensions: vec![2],
    }));
}

#[test]
fn test_deferred_completions_resolve_in_any_order() {
    let mut setup = compute_setup();
    setup.wire.native.defer_callbacks(true);
    let mut first = setup
        .context
        .compute(&setup.graph, &setup.inputs, &setup.outputs);
    let mut second = setup.graph.compute_async(&setup.inputs, &setup.outputs);
    setup.wire.pump().unwrap();
    assert_eq!(first.try_recv().unwrap(), None);
    assert_eq!(second.try_recv().unwrap(), None);

    setup.wire.native.complete_deferred(true);
    setup.wire.deliver_to_client().unwrap();
    assert!(first.try_recv().unwrap().unwrap().is_success());
    assert!(second.try_recv().unwrap().unwrap().is_success());
}

#[test]
fn test_failed_compute_sends_no_results() {
    let mut setup = compute_setup();
    setup
        .wire
        .native
        .set_compute_result(ErrorType::Validation, "bad input");
    let _done = setup.graph.compute_async(&setup.inputs, &setup.outputs);
    setup.wire.send_to_server().unwrap();

    let returned = setup.wire.take_return_commands();
    assert_eq!(
        returned,
        vec![ReturnWireCommand::GraphComputeAsyncCallback {
            graph: setup.graph.handle(),
            request_serial: 0,
            error_type: ErrorType::Validation,
            message: "bad input".into(),
        }]
    );
}

#[test]
fn test_unreadable_async_output_becomes_an_unknown_error() {
    let mut setup = compute_setup();
    setup.outputs.set_output("missing", ArrayBufferView::new(4));
    let mut done = setup
        .context
        .compute(&setup.graph, &setup.inputs, &setup.outputs);
    setup.wire.pump().unwrap();

    assert_eq!(done.try_recv().unwrap().unwrap().error_type, ErrorType::Unknown);
}

#[test]
fn test_unreadable_sync_output_is_fatal() {
    let mut setup = compute_setup();
    setup.outputs.set_output("missing", ArrayBufferView::new(4));
    setup
        .context
        .compute_sync(&setup.graph, &setup.inputs, &setup.outputs);
    assert_fatal(setup.wire.send_to_server());
}

#[test]
fn test_sync_compute_delivers_results_without_a_callback() {
    let mut setup = compute_setup();
    setup
        .context
        .compute_sync(&setup.graph, &setup.inputs, &setup.outputs);
    setup.wire.send_to_server().unwrap();
    let returned = setup.wire.take_return_commands();
    assert_eq!(returned.len(), 1);
    assert!(matches!(
        returned[0],
        ReturnWireCommand::ContextComputeResult { .. }
    ));
}

#[test]
fn test_sync_compute_error_sends_nothing() {
    let mut setup = compute_setup();
    setup
        .wire
        .native
        .set_compute_result(ErrorType::OutOfMemory, "");
    setup
        .context
        .compute_sync(&setup.graph, &setup.inputs, &setup.outputs);
    setup.wire.send_to_server().unwrap();
    assert!(setup.wire.take_return_commands().is_empty());
}

//endregion
