//! # WebNN Wire
//!
//! Lets an application build and run WebNN graphs in one process while the native WebNN
//! implementation lives in another. The client hands out proxy objects whose methods become
//! commands; the server decodes those commands, drives the native library and sends results back.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! webnn = "0.1"
//! ```
//!
//! ```rust
//! use webnn::prelude::*;
//!
//! let transport = BufferedCommandSerializer::new(4096);
//! let to_server = transport.flushed_commands();
//! let client = WireClient::new(Box::new(transport), &WireConfig::default());
//!
//! let instance = client.reserve_instance();
//! let context = instance.create_context(&ContextOptions::default());
//! let builder = context.create_graph_builder();
//! let descriptor = OperandDescriptor::new(OperandType::Float32, vec![2]);
//! let a = builder.input("a", &descriptor);
//! let b = builder.constant(&descriptor, &[0u8; 8]);
//! let _sum = builder.add(&a, &b);
//!
//! client.flush();
//! assert_eq!(to_server.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: webnn-structures                           │
//! │  (ObjectHandle, OperandDescriptor, Operation, ErrorType)│
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Codec: webnn-serialization                             │
//! │  (WireCommand, ReturnWireCommand, chunking)             │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Wire: webnn-wire                                       │
//! │  (WireClient proxies, WireServer object tables)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `webnn-config` and `webnn-observability` provide configuration loading and logging setup
//! for embedders and the `wire_dump` tool.
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use webnn_structures as structures;

// Re-export codec
pub use webnn_serialization as serialization;

// Re-export wire
pub use webnn_wire as wire;

// Re-export ambient crates
pub use webnn_config as config;
pub use webnn_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::structures::{
        ContextOptions, ErrorFilter, ErrorType, ObjectHandle, ObjectType, OperandDescriptor,
        OperandType, Operation, WebnnDataError,
    };

    pub use crate::serialization::{
        BufferedCommandSerializer, CommandSerializer, FlushedCommands, ReturnWireCommand,
        WireCommand,
    };

    pub use crate::wire::client::{
        ArrayBufferView, CallbackResult, Context, Graph, GraphBuilder, Instance, NamedInputs,
        NamedOperands, NamedOutputs, Operand, OperandArray, WireClient,
    };
    pub use crate::wire::server::{NativeHandle, OutputBuffer, WebnnProcs, WireServer};
    pub use crate::wire::{WireError, WireResult};

    pub use crate::config::WireConfig;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_reaches_every_layer() {
        let config = WireConfig::default();
        assert!(config.client.disconnect_on_fatal_error);
        assert_eq!(ObjectHandle::new(0, 0).id, 0);
        assert!(!crate::observability::KNOWN_CRATES.is_empty());
    }
}
