//! A user-space TCP connection engine: the per-connection state
//! machine and segment-processing pipeline implementing RFC 793,
//! embedded behind a single-threaded, cooperative event loop.
//!
//! The crate's job stops at the connection automaton and its directly
//! supporting data structures (sequence arithmetic, the TCB, the send
//! and receive buffers, the eleven-state automaton, and the
//! `Engine`/`ConnectionTable` facade around them). IP/Ethernet framing,
//! routing, DNS, and congestion control beyond RFC 793's window
//! mechanism are out of scope and live behind the [`tcp::transport::Transport`]
//! seam.

pub mod bufstore;
pub mod config;
pub mod engine;
pub mod err;
pub mod iss;
pub mod tcp;

pub use bufstore::BufferStore;
pub use config::Config;
pub use engine::Engine;
pub use err::Error;
pub use iss::{ClockIssGenerator, IssGenerator, SequentialIssGenerator};
pub use tcp::transport::{RecordingTransport, TunTransport};
pub use tcp::{Dual, Quad};
