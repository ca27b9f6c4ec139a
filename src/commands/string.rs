//! String commands (SET, GET)

use super::Command;
use crate::protocol::Reply;
use crate::store::{Store, Value};
use bytes::Bytes;

/// SET command - overwrite a key with a byte string
///
/// Syntax: SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply {
        store.set(args[0].clone(), args[1].clone());
        Reply::ok()
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// GET command - read a key's byte string
///
/// Syntax: GET key
///
/// Replies nil when the key is absent or expired, and a WRONGTYPE error
/// when the key holds a vector.
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, store: &mut Store, args: &[Bytes]) -> Reply {
        match store.get(&args[0]) {
            Some(Value::Str(bytes)) => Reply::Bulk(bytes.clone()),
            Some(_) => {
                Reply::error("WRONGTYPE Operation against a key holding the wrong kind of value")
            }
            None => Reply::Nil,
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
