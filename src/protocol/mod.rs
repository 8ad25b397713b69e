//! Streaming tool-call protocol client
//!
//! Submits one chat exchange to the backend and consumes its framed event
//! stream, dispatching text deltas and tool events in arrival order.

mod client;
mod frame;
mod options;
mod transport;
mod types;

pub use client::{DEFAULT_EXCHANGE_TIMEOUT, ExchangeRequest, ExchangeSink, FnSink, ProtocolClient};
pub use frame::{DONE_SENTINEL, Frame};
pub use options::ChatOptions;
pub use transport::{ByteStream, ChatTransport, HttpTransport};
pub use types::{ChatRequest, ChatTurn, Role, ToolEvent, WireMessage};
