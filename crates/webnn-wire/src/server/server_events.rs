use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use webnn_structures::{ErrorType, ObjectHandle, ObjectId};

use crate::server::procs::{ErrorCallback, UncapturedErrorCallback};

/// A native completion waiting to be turned into return commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ServerEvent {
    PopErrorScope {
        context: ObjectHandle,
        request_serial: u64,
        error_type: ErrorType,
        message: String,
    },
    UncapturedError {
        context: ObjectHandle,
        error_type: ErrorType,
        message: String,
    },
    ContextCompute {
        context: ObjectHandle,
        request_serial: u64,
        named_outputs: ObjectId,
        error_type: ErrorType,
        message: String,
    },
    GraphComputeAsync {
        graph: ObjectHandle,
        request_serial: u64,
        named_outputs: ObjectId,
        error_type: ErrorType,
        message: String,
    },
}

/// Completions pushed by native callbacks, possibly from other threads.
pub(crate) type EventQueue = Arc<Mutex<VecDeque<ServerEvent>>>;

fn push_event(queue: &Weak<Mutex<VecDeque<ServerEvent>>>, event: ServerEvent) {
    // The server is gone; nobody is left to tell.
    if let Some(queue) = queue.upgrade() {
        queue.lock().push_back(event);
    }
}

pub(crate) fn pop_error_scope_callback(
    queue: &EventQueue,
    context: ObjectHandle,
    request_serial: u64,
) -> ErrorCallback {
    let queue = Arc::downgrade(queue);
    Box::new(move |error_type, message| {
        push_event(
            &queue,
            ServerEvent::PopErrorScope {
                context,
                request_serial,
                error_type,
                message,
            },
        )
    })
}

pub(crate) fn uncaptured_error_callback(
    queue: &EventQueue,
    context: ObjectHandle,
) -> UncapturedErrorCallback {
    let queue = Arc::downgrade(queue);
    Box::new(move |error_type, message| {
        push_event(
            &queue,
            ServerEvent::UncapturedError {
                context,
                error_type,
                message,
            },
        )
    })
}

pub(crate) fn context_compute_callback(
    queue: &EventQueue,
    context: ObjectHandle,
    request_serial: u64,
    named_outputs: ObjectId,
) -> ErrorCallback {
    let queue = Arc::downgrade(queue);
    Box::new(move |error_type, message| {
        push_event(
            &queue,
            ServerEvent::ContextCompute {
                context,
                request_serial,
                named_outputs,
                error_type,
                message,
            },
        )
    })
}

pub(crate) fn graph_compute_callback(
    queue: &EventQueue,
    graph: ObjectHandle,
    request_serial: u64,
    named_outputs: ObjectId,
) -> ErrorCallback {
    let queue = Arc::downgrade(queue);
    Box::new(move |error_type, message| {
        push_event(
            &queue,
            ServerEvent::GraphComputeAsync {
                graph,
                request_serial,
                named_outputs,
                error_type,
                message,
            },
        )
    })
}
