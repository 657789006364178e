//! # WebNN Wire
//!
//! The two halves of the WebNN wire protocol.
//!
//! - **[`client`]** - proxy objects an application builds graphs with. Every call becomes a
//!   [`WireCommand`](webnn_serialization::WireCommand); asynchronous results come back as
//!   completions on `futures-channel` receivers.
//! - **[`server`]** - replays client commands against a native WebNN implementation reached
//!   through [`WebnnProcs`](server::WebnnProcs) and reports results back.
//!
//! Neither side owns a transport. Both write through a
//! [`CommandSerializer`](webnn_serialization::CommandSerializer) and are fed received bytes
//! through `handle_commands`.

pub mod client;
mod error;
pub mod server;

pub use error::{WireError, WireResult};
