//! # WebNN Wire Serialization
//!
//! The command codec shared by both halves of the WebNN wire. API calls on client proxies become
//! [`WireCommand`]s, asynchronous results from the server become [`ReturnWireCommand`]s, and
//! both travel through the same framing.
//!
//! ## Core Components
//!
//! - **[`CommandHeader`]** - `command_size u64 | command_id u32` prefix of every command
//! - **[`WireCommandSet`]** - one direction's closed command set with its exact encoding
//! - **[`CommandSerializer`]** - transport seam handing out contiguous space
//! - **[`ChunkedCommandSerializer`]** / **[`ChunkedCommandHandler`]** - encode with transparent
//!   chunking, decode with transparent reassembly
//!
//! ## Format
//!
//! All integers are little endian. Object references are `id u32 | generation u32`. Strings are
//! `u32` length + UTF-8 bytes, raw byte regions are `u64` length + bytes and integer arrays are
//! `u32` count + elements, so every variable length field can be skipped without outside
//! knowledge.
//!
//! ```rust
//! use webnn_serialization::{
//!     BufferedCommandSerializer, ChunkedCommandHandler, ChunkedCommandSerializer, WireCommand,
//! };
//! use webnn_structures::{ObjectHandle, WebnnDataError};
//!
//! let transport = BufferedCommandSerializer::new(4096);
//! let frames = transport.flushed_commands();
//! let mut serializer = ChunkedCommandSerializer::new(Box::new(transport));
//!
//! let command = WireCommand::ContextCreateGraphBuilder {
//!     context: ObjectHandle::new(1, 0),
//!     result: ObjectHandle::new(1, 0),
//! };
//! assert!(serializer.serialize_command(&command));
//! serializer.flush();
//!
//! let mut handler = ChunkedCommandHandler::new();
//! for frame in frames.drain() {
//!     handler
//!         .handle_commands::<WireCommand, _, WebnnDataError>(&frame, |decoded| {
//!             assert_eq!(decoded, command);
//!             Ok(())
//!         })
//!         .unwrap();
//! }
//! ```

mod chunked_command_handler;
mod chunked_command_serializer;
mod command_header;
mod command_serializer;
mod return_wire_command;
pub mod wire_byte_cursor;
mod wire_command;
mod wire_command_set;
mod wire_serializable;

pub use chunked_command_handler::ChunkedCommandHandler;
pub use chunked_command_serializer::ChunkedCommandSerializer;
pub use command_header::CommandHeader;
pub use command_serializer::{
    BufferedCommandSerializer, CommandSerializer, FlushedCommands, NoopCommandSerializer,
};
pub use return_wire_command::{ReturnWireCommand, ReturnWireCommandId};
pub use wire_byte_cursor::{WireByteReader, WireByteWriter};
pub use wire_command::{WireCommand, WireCommandId};
pub use wire_command_set::WireCommandSet;
pub use wire_serializable::WireSerializable;
