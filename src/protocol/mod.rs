//! Wire protocol codec
//!
//! Requests arrive as RESP-style arrays of bulk strings and are parsed into
//! flat token lists; replies are built from the [`Reply`] type and encoded
//! back to bytes. The same frame grammar is reused verbatim for the
//! append-only log, so startup replay goes through this parser too.

pub mod frame;
pub mod reply;

pub use frame::{Frame, FrameError};
pub use reply::Reply;
