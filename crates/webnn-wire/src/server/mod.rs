//! Server half of the wire: object tables, command dispatch and the native procedure seam.

mod known_objects;
mod procs;
mod server_doers;
mod server_events;
mod wire_server;

pub use known_objects::{AllocationState, ContextInfo, KnownObjects, NativeHandle, ObjectData};
pub use procs::{ErrorCallback, OutputBuffer, UncapturedErrorCallback, WebnnProcs};
pub use wire_server::WireServer;
