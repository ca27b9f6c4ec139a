//! VexDB - an in-memory key/value store with vector similarity search
//!
//! VexDB speaks a Redis-style wire protocol over TCP. Mutating commands are
//! logged to an append-only file in the same wire format and replayed at
//! startup, which keeps persistence and the network codec on a single code
//! path. Clients may batch commands with MULTI/EXEC/DISCARD transactions,
//! and float vectors stored with VECSET can be searched by cosine
//! similarity with VECSIM.

pub mod aof;
pub mod buffer;
pub mod commands;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod store;

/// Re-export commonly used types
pub use buffer::RingBuffer;
pub use commands::{Command, CommandRegistry};
pub use dispatch::{Dispatcher, TransactionState};
pub use protocol::{Frame, FrameError, Reply};
pub use store::{Store, Value};
