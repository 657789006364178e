//! Client half of the wire: proxies, object tables and return command dispatch.

mod api_objects;
mod array_buffer_view;
mod client_doers;
mod client_state;
mod object_allocator;
mod pending_requests;
mod wire_client;

pub use api_objects::{
    Context, Graph, GraphBuilder, Instance, NamedInputs, NamedOperands, NamedOutputs, Operand,
    OperandArray,
};
pub use array_buffer_view::ArrayBufferView;
pub use object_allocator::ObjectAllocator;
pub use pending_requests::{CallbackResult, PendingRequests};
pub use wire_client::WireClient;
