use tracing::{debug, warn};
use webnn_serialization::ReturnWireCommand;
use webnn_structures::{ErrorType, ObjectHandle};

use crate::client::client_state::ClientState;
use crate::client::pending_requests::{CallbackResult, PendingRequests};
use crate::error::{WireError, WireResult};

impl ClientState {
    /// Applies one return command from the server.
    ///
    /// Results for objects the client already destroyed are dropped. An unknown request serial
    /// or an output name nobody registered fails the stream.
    pub(crate) fn handle_return_command(&mut self, command: ReturnWireCommand) -> WireResult<()> {
        debug!("Client received {:?}", command.id());
        match command {
            ReturnWireCommand::ContextPopErrorScopeCallback {
                context,
                request_serial,
                error_type,
                message,
            } => {
                let Some(state) = self.contexts.get_mut(context) else {
                    return ignore_stale("context", context);
                };
                resolve(
                    &mut state.pop_error_scope_requests,
                    "pop error scope",
                    request_serial,
                    error_type,
                    message,
                )
            }
            ReturnWireCommand::ContextUncapturedErrorCallback {
                context,
                error_type,
                message,
            } => {
                let Some(state) = self.contexts.get_mut(context) else {
                    return ignore_stale("context", context);
                };
                if let Some(sender) = &state.uncaptured_error_sender {
                    if sender
                        .unbounded_send(CallbackResult::new(error_type, message))
                        .is_err()
                    {
                        state.uncaptured_error_sender = None;
                    }
                }
                Ok(())
            }
            ReturnWireCommand::ContextComputeCallback {
                context,
                request_serial,
                error_type,
                message,
            } => {
                let Some(state) = self.contexts.get_mut(context) else {
                    return ignore_stale("context", context);
                };
                resolve(
                    &mut state.compute_requests,
                    "context compute",
                    request_serial,
                    error_type,
                    message,
                )
            }
            ReturnWireCommand::ContextComputeResult {
                named_outputs,
                byte_length,
                byte_offset,
                name,
                buffer,
            } => {
                let Some(state) = self.named_outputs.get(named_outputs) else {
                    return ignore_stale("named outputs", named_outputs);
                };
                let view = state.outputs.get(&name).ok_or_else(|| {
                    WireError::FatalStream(format!(
                        "No output named '{}' is registered on named outputs {}",
                        name, named_outputs
                    ))
                })?;
                view.try_copy_from(&buffer, byte_offset, byte_length)
            }
            ReturnWireCommand::GraphComputeAsyncCallback {
                graph,
                request_serial,
                error_type,
                message,
            } => {
                let Some(state) = self.graphs.get_mut(graph) else {
                    return ignore_stale("graph", graph);
                };
                resolve(
                    &mut state.compute_requests,
                    "graph compute",
                    request_serial,
                    error_type,
                    message,
                )
            }
        }
    }
}

fn ignore_stale(kind: &str, handle: ObjectHandle) -> WireResult<()> {
    debug!("Dropping result for stale {} {}", kind, handle);
    Ok(())
}

fn resolve(
    requests: &mut PendingRequests<CallbackResult>,
    kind: &str,
    request_serial: u64,
    error_type: ErrorType,
    message: String,
) -> WireResult<()> {
    if requests.resolve(request_serial, CallbackResult::new(error_type, message)) {
        return Ok(());
    }
    warn!("Unknown {} request serial {}", kind, request_serial);
    Err(WireError::FatalStream(format!(
        "Unknown {} request serial {}",
        kind, request_serial
    )))
}
