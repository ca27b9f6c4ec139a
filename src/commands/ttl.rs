//! TTL commands (EXPIRE)

use super::{not_an_integer, parse_integer, Command};
use crate::protocol::Reply;
use crate::store::Store;
use bytes::Bytes;

/// EXPIRE command - set a timeout on an existing key
///
/// Syntax: EXPIRE key seconds
///
/// Replies :1 when the TTL was set (and logged), :0 for a missing key or a
/// non-positive timeout.
pub struct ExpireCommand;

impl Command for ExpireCommand {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply {
        let seconds = match parse_integer(&args[1]) {
            Some(s) => s,
            None => return not_an_integer(),
        };
        if store.set_expire(&args[0], seconds) {
            Reply::Integer(1)
        } else {
            Reply::Integer(0)
        }
    }

    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
