//! Concurrency runtime: per-user turn lanes, the shared worker bound, and
//! paced reply delivery.

pub mod pacing;
pub mod pipeline;
pub mod transport;

pub use pacing::ReplyPacer;
pub use pipeline::TurnPipeline;
pub use transport::{ChannelTransport, ConsoleTransport, OutboundMessage, Transport, TransportError};
