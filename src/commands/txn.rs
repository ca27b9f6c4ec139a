//! Transaction control registry entries (MULTI, EXEC, DISCARD)
//!
//! The dispatcher intercepts these names before normal execution; the
//! structs below exist so the registry stays the complete command table
//! (the EXEC drain consults it to tell unknown names from misplaced
//! transaction control).

use super::Command;
use crate::protocol::Reply;
use crate::store::Store;
use bytes::Bytes;

macro_rules! control_command {
    ($struct_name:ident, $name:literal) => {
        pub struct $struct_name;

        impl Command for $struct_name {
            fn execute(&self, _store: &mut Store, _args: &[Bytes]) -> Reply {
                // Unreachable through dispatch; kept inert for safety.
                Reply::ok()
            }

            fn name(&self) -> &'static str {
                $name
            }

            fn max_args(&self) -> Option<usize> {
                Some(0)
            }
        }
    };
}

control_command!(MultiCommand, "MULTI");
control_command!(ExecCommand, "EXEC");
control_command!(DiscardCommand, "DISCARD");
