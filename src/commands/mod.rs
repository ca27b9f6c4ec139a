//! Command implementations
//!
//! Each command is a stateless unit struct implementing [`Command`]; the
//! registry instantiates all of them once at startup and the dispatcher
//! routes token lists to them by name.

mod registry;
mod string;
mod ttl;
mod txn;
mod vector;

pub use registry::CommandRegistry;

use crate::protocol::Reply;
use crate::store::Store;
use bytes::Bytes;

/// Command execution contract.
///
/// `args` excludes the command name; the dispatcher has already enforced
/// `min_args`/`max_args` by the time `execute` runs.
pub trait Command: Send + Sync {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply;

    /// Registered (case-sensitive) name.
    fn name(&self) -> &'static str;

    /// Minimum argument count.
    fn min_args(&self) -> usize {
        0
    }

    /// Maximum argument count (None = unlimited).
    fn max_args(&self) -> Option<usize> {
        None
    }
}

/// Parse an argument as a signed decimal integer.
pub(crate) fn parse_integer(token: &Bytes) -> Option<i64> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

pub(crate) fn not_an_integer() -> Reply {
    Reply::error("ERR value is not an integer or out of range")
}
