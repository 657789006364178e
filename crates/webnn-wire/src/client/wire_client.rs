use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};
use webnn_config::WireConfig;
use webnn_serialization::{
    ChunkedCommandHandler, ChunkedCommandSerializer, CommandSerializer, ReturnWireCommand,
};

use crate::client::api_objects::{Context, Instance};
use crate::client::client_state::{ClientState, ContextState, SharedClientState};
use crate::error::{WireError, WireResult};

/// Client half of the wire.
///
/// Owns the outgoing command stream and the object tables behind every proxy it hands out.
/// Feed bytes received from the server to [`handle_commands`](Self::handle_commands) and ship
/// whatever the serializer flushes to the server.
///
/// # Example
/// ```
/// use webnn_config::WireConfig;
/// use webnn_serialization::BufferedCommandSerializer;
/// use webnn_structures::ContextOptions;
/// use webnn_wire::client::WireClient;
///
/// let transport = BufferedCommandSerializer::new(4096);
/// let frames = transport.flushed_commands();
/// let client = WireClient::new(Box::new(transport), &WireConfig::default());
///
/// let instance = client.reserve_instance();
/// let context = instance.create_context(&ContextOptions::default());
/// let _builder = context.create_graph_builder();
/// client.flush();
/// assert_eq!(frames.len(), 1);
/// ```
pub struct WireClient {
    state: SharedClientState,
    handler: ChunkedCommandHandler,
}

impl WireClient {
    pub fn new(serializer: Box<dyn CommandSerializer>, config: &WireConfig) -> Self {
        let state = ClientState::new(
            ChunkedCommandSerializer::new(serializer),
            config.client.disconnect_on_fatal_error,
        );
        info!("WebNN wire client created");
        Self {
            state: Arc::new(Mutex::new(state)),
            handler: ChunkedCommandHandler::new(),
        }
    }

    /// Allocates an instance proxy without sending anything.
    ///
    /// The embedder injects the native instance on the server at the same handle.
    pub fn reserve_instance(&self) -> Instance {
        let handle = self.state.lock().instances.new_object(());
        debug!("Reserved instance {}", handle);
        Instance::from_parts(self.state.clone(), handle)
    }

    /// Allocates a context proxy without sending anything. See [`reserve_instance`](Self::reserve_instance).
    pub fn reserve_context(&self) -> Context {
        let handle = self.state.lock().contexts.new_object(ContextState::default());
        debug!("Reserved context {}", handle);
        Context::from_parts(self.state.clone(), handle)
    }

    /// Decodes and applies every return command in `bytes`.
    ///
    /// Any error is fatal to the stream. With `disconnect_on_fatal_error` set the client also
    /// disconnects before returning it.
    pub fn handle_commands(&mut self, bytes: &[u8]) -> WireResult<()> {
        let state = &self.state;
        if state.lock().is_disconnected() {
            return Err(WireError::Disconnected);
        }
        let result = self
            .handler
            .handle_commands::<ReturnWireCommand, _, WireError>(bytes, |command| {
                state.lock().handle_return_command(command)
            });
        if let Err(err) = &result {
            error!("Fatal error in return command stream: {}", err);
            let mut state = self.state.lock();
            if state.disconnect_on_fatal_error {
                state.disconnect();
            }
        }
        result
    }

    /// Stops the client for good. Every outstanding request resolves with
    /// [`ErrorType::DeviceLost`](webnn_structures::ErrorType::DeviceLost) and later calls on
    /// proxies send nothing.
    pub fn disconnect(&self) {
        self.state.lock().disconnect();
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.lock().is_disconnected()
    }

    pub fn flush(&self) -> bool {
        self.state.lock().flush()
    }
}

impl Drop for WireClient {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.destroy_all_objects();
        state.flush();
        state.disconnect();
    }
}
