//! Command dispatch and transaction engine
//!
//! Maps parsed token lists onto command handlers against the store, and
//! owns the MULTI/EXEC/DISCARD state machine. Startup replay feeds logged
//! frames through the exact same path with a synthetic transaction state.

use crate::aof::{AofConfig, AofWriter};
use crate::commands::{parse_integer, not_an_integer, CommandRegistry};
use crate::protocol::{frame, Reply};
use crate::store::Store;
use anyhow::Context;
use bytes::Bytes;
use std::fs;
use tracing::{debug, info, warn};

/// Per-connection transaction state.
///
/// `queue` is only non-empty while a transaction is open or in the instant
/// EXEC drains it; MULTI, EXEC and DISCARD all reset both fields together.
#[derive(Debug, Default)]
pub struct TransactionState {
    pub active: bool,
    pub queue: Vec<Vec<Bytes>>,
}

/// Routes token lists to command handlers.
pub struct Dispatcher {
    registry: CommandRegistry,
    store: Store,
}

impl Dispatcher {
    /// Dispatcher over a fresh, non-durable store.
    pub fn new() -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            store: Store::new(),
        }
    }

    /// Dispatcher backed by an append-only log.
    ///
    /// An existing log is replayed through the normal dispatch path before
    /// the writer is attached, so replay never re-logs. Failing to open the
    /// log for append is fatal; a malformed or truncated trailing frame
    /// only halts replay, keeping the partially recovered keyspace.
    pub fn with_aof(config: &AofConfig) -> anyhow::Result<Self> {
        let mut dispatcher = Dispatcher::new();

        if config.path.exists() {
            let bytes = fs::read(&config.path)
                .with_context(|| format!("failed to read AOF {:?}", config.path))?;
            dispatcher.replay(&bytes);
        }

        let writer = AofWriter::open(&config.path, config.sync_policy)
            .with_context(|| format!("failed to open AOF {:?} for append", config.path))?;
        dispatcher.store.attach_aof(writer);
        Ok(dispatcher)
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Process one complete command frame for a connection.
    pub fn dispatch(&mut self, tokens: Vec<Bytes>, txn: &mut TransactionState) -> Reply {
        let name = match tokens.first() {
            // Non-UTF-8 names can never be registered; the empty string
            // stands in and falls through as unknown.
            Some(first) => std::str::from_utf8(first).unwrap_or("").to_string(),
            None => return Reply::error("ERR empty command"),
        };
        debug!("dispatching {}", name);

        match name.as_str() {
            "MULTI" => {
                if txn.active {
                    return Reply::error("ERR MULTI calls can not be nested");
                }
                txn.active = true;
                txn.queue.clear();
                Reply::ok()
            }
            "EXEC" => {
                if !txn.active {
                    return Reply::error("ERR EXEC without MULTI");
                }
                txn.active = false;
                let queued = std::mem::take(&mut txn.queue);
                let replies = queued
                    .iter()
                    .map(|cmd| self.execute_queued(cmd))
                    .collect();
                Reply::Array(replies)
            }
            "DISCARD" => {
                if !txn.active {
                    return Reply::error("ERR DISCARD without MULTI");
                }
                txn.active = false;
                txn.queue.clear();
                Reply::ok()
            }
            _ if txn.active => self.enqueue(&name, tokens, txn),
            _ => self.execute(&tokens),
        }
    }

    /// Queuing path while a transaction is open.
    ///
    /// Names missing from the registry queue unconditionally; of the known
    /// commands only SET, GET and EXPIRE are validated before queuing.
    /// This asymmetry is long-standing observable behavior, kept as is.
    fn enqueue(&mut self, name: &str, tokens: Vec<Bytes>, txn: &mut TransactionState) -> Reply {
        if self.registry.contains(name) {
            match name {
                "SET" if tokens.len() != 3 => return Reply::wrong_arity("SET"),
                "GET" if tokens.len() != 2 => return Reply::wrong_arity("GET"),
                "EXPIRE" if tokens.len() != 3 => return Reply::wrong_arity("EXPIRE"),
                "EXPIRE" => {
                    if parse_integer(&tokens[2]).is_none() {
                        return not_an_integer();
                    }
                }
                _ => {}
            }
        }
        txn.queue.push(tokens);
        Reply::queued()
    }

    /// One entry of an EXEC drain. Errors here never abort the batch.
    fn execute_queued(&mut self, tokens: &[Bytes]) -> Reply {
        let name = String::from_utf8_lossy(&tokens[0]).into_owned();
        if !self.registry.contains(&name) {
            return Reply::error(format!("ERR unknown command '{}'", name));
        }
        if matches!(name.as_str(), "MULTI" | "EXEC" | "DISCARD") {
            return Reply::error(format!("ERR command '{}' not allowed in transaction", name));
        }
        self.execute(tokens)
    }

    /// Registry lookup, arity enforcement, execution.
    fn execute(&mut self, tokens: &[Bytes]) -> Reply {
        let command = match std::str::from_utf8(&tokens[0])
            .ok()
            .and_then(|name| self.registry.get(name))
        {
            Some(command) => command,
            None => {
                return Reply::error(format!(
                    "ERR unknown command '{}'",
                    String::from_utf8_lossy(&tokens[0])
                ))
            }
        };

        let args = &tokens[1..];
        if args.len() < command.min_args() {
            return Reply::wrong_arity(command.name());
        }
        if let Some(max) = command.max_args() {
            if args.len() > max {
                return Reply::wrong_arity(command.name());
            }
        }

        command.execute(&mut self.store, args)
    }

    /// Rebuild state from the raw log contents.
    fn replay(&mut self, mut buf: &[u8]) {
        let mut txn = TransactionState::default();
        let mut replayed = 0usize;
        loop {
            match frame::parse(buf) {
                Ok(Some(frame)) => {
                    buf = &buf[frame.len..];
                    self.dispatch(frame.tokens, &mut txn);
                    replayed += 1;
                }
                Ok(None) => {
                    if !buf.is_empty() {
                        warn!(
                            "truncated trailing frame in AOF ({} bytes dropped), \
                             keeping partially recovered state",
                            buf.len()
                        );
                    }
                    break;
                }
                Err(e) => {
                    warn!("malformed AOF frame, halting replay: {}", e);
                    break;
                }
            }
        }
        info!("replayed {} commands from AOF", replayed);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::SyncPolicy;
    use std::path::PathBuf;

    fn cmd(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())).collect()
    }

    fn dispatch(d: &mut Dispatcher, txn: &mut TransactionState, parts: &[&str]) -> Reply {
        d.dispatch(cmd(parts), txn)
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        assert_eq!(dispatch(&mut d, &mut txn, &["SET", "k", "v"]), Reply::ok());
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "k"]), Reply::bulk("v"));
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "nope"]), Reply::Nil);
    }

    #[test]
    fn test_unknown_command() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        let reply = dispatch(&mut d, &mut txn, &["FLY", "now"]);
        assert_eq!(reply, Reply::error("ERR unknown command 'FLY'"));
    }

    #[test]
    fn test_wrong_arity() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        assert_eq!(
            dispatch(&mut d, &mut txn, &["SET", "only-key"]),
            Reply::wrong_arity("SET")
        );
        assert_eq!(
            dispatch(&mut d, &mut txn, &["GET", "k", "extra"]),
            Reply::wrong_arity("GET")
        );
    }

    #[test]
    fn test_empty_command() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        assert!(matches!(d.dispatch(vec![], &mut txn), Reply::Error(_)));
    }

    #[test]
    fn test_transaction_queues_then_applies() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();

        assert_eq!(dispatch(&mut d, &mut txn, &["MULTI"]), Reply::ok());
        assert_eq!(dispatch(&mut d, &mut txn, &["SET", "a", "1"]), Reply::queued());
        assert_eq!(dispatch(&mut d, &mut txn, &["SET", "b", "2"]), Reply::queued());
        // Nothing applied while queued.
        assert_eq!(d.execute(&cmd(&["GET", "a"])), Reply::Nil);

        let reply = dispatch(&mut d, &mut txn, &["EXEC"]);
        assert_eq!(reply, Reply::Array(vec![Reply::ok(), Reply::ok()]));
        assert!(!txn.active);
        assert!(txn.queue.is_empty());
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "a"]), Reply::bulk("1"));
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "b"]), Reply::bulk("2"));
    }

    #[test]
    fn test_exec_with_empty_queue() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        dispatch(&mut d, &mut txn, &["MULTI"]);
        assert_eq!(dispatch(&mut d, &mut txn, &["EXEC"]), Reply::Array(vec![]));
    }

    #[test]
    fn test_discard_drops_queue() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        dispatch(&mut d, &mut txn, &["MULTI"]);
        dispatch(&mut d, &mut txn, &["SET", "a", "1"]);
        assert_eq!(dispatch(&mut d, &mut txn, &["DISCARD"]), Reply::ok());
        assert!(!txn.active && txn.queue.is_empty());
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "a"]), Reply::Nil);
    }

    #[test]
    fn test_transaction_control_misuse() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        assert!(matches!(dispatch(&mut d, &mut txn, &["EXEC"]), Reply::Error(_)));
        assert!(matches!(dispatch(&mut d, &mut txn, &["DISCARD"]), Reply::Error(_)));

        dispatch(&mut d, &mut txn, &["MULTI"]);
        assert_eq!(
            dispatch(&mut d, &mut txn, &["MULTI"]),
            Reply::error("ERR MULTI calls can not be nested")
        );
    }

    #[test]
    fn test_queue_validates_known_arity() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        dispatch(&mut d, &mut txn, &["MULTI"]);

        // Invalid built-ins are rejected up front and never queued.
        assert!(matches!(dispatch(&mut d, &mut txn, &["SET", "a"]), Reply::Error(_)));
        assert!(matches!(
            dispatch(&mut d, &mut txn, &["EXPIRE", "a", "soon"]),
            Reply::Error(_)
        ));
        assert!(txn.queue.is_empty());
        assert_eq!(dispatch(&mut d, &mut txn, &["EXEC"]), Reply::Array(vec![]));
    }

    #[test]
    fn test_unknown_commands_queue_unconditionally() {
        let mut d = Dispatcher::new();
        let mut txn = TransactionState::default();
        dispatch(&mut d, &mut txn, &["MULTI"]);

        // Unregistered names skip validation entirely and only fail at EXEC.
        assert_eq!(dispatch(&mut d, &mut txn, &["NOSUCH", "x"]), Reply::queued());
        assert_eq!(dispatch(&mut d, &mut txn, &["SET", "a", "1"]), Reply::queued());

        let reply = dispatch(&mut d, &mut txn, &["EXEC"]);
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::error("ERR unknown command 'NOSUCH'"), Reply::ok()])
        );
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "a"]), Reply::bulk("1"));
    }

    #[test]
    fn test_replay_restores_state() {
        let path = PathBuf::from("test_dispatch_replay.aof");
        let _ = fs::remove_file(&path);
        let config = AofConfig {
            path: path.clone(),
            sync_policy: SyncPolicy::Always,
        };

        {
            let mut d = Dispatcher::with_aof(&config).unwrap();
            let mut txn = TransactionState::default();
            dispatch(&mut d, &mut txn, &["SET", "k", "v"]);
            let vecset = vec![
                Bytes::from_static(b"VECSET"),
                Bytes::from_static(b"vec"),
                crate::store::vector_to_bytes(&[1.0, 0.0]),
            ];
            assert_eq!(d.dispatch(vecset, &mut txn), Reply::ok());
            dispatch(&mut d, &mut txn, &["SET", "k2", "v2"]);
        }

        let mut d = Dispatcher::with_aof(&config).unwrap();
        let mut txn = TransactionState::default();
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "k"]), Reply::bulk("v"));
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "k2"]), Reply::bulk("v2"));
        let vecsim = vec![
            Bytes::from_static(b"VECSIM"),
            crate::store::vector_to_bytes(&[1.0, 0.0]),
            Bytes::from_static(b"1"),
        ];
        assert_eq!(
            d.dispatch(vecsim, &mut txn),
            Reply::Array(vec![Reply::bulk("vec")])
        );
        // Replay itself must not have re-logged anything: a third open
        // still sees exactly the original three commands' worth of state.
        let log_len = fs::metadata(&path).unwrap().len();
        drop(d);
        let _ = Dispatcher::with_aof(&config).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), log_len);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_replay_tolerates_truncated_tail() {
        let path = PathBuf::from("test_dispatch_truncated.aof");
        let _ = fs::remove_file(&path);

        let mut log = bytes::BytesMut::new();
        frame::encode(&mut log, &cmd(&["SET", "k", "v"]));
        // Crash mid-append: the second frame stops short.
        log.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$2\r\nk2");
        fs::write(&path, &log).unwrap();

        let config = AofConfig {
            path: path.clone(),
            sync_policy: SyncPolicy::Always,
        };
        let mut d = Dispatcher::with_aof(&config).unwrap();
        let mut txn = TransactionState::default();
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "k"]), Reply::bulk("v"));
        assert_eq!(dispatch(&mut d, &mut txn, &["GET", "k2"]), Reply::Nil);

        fs::remove_file(&path).unwrap();
    }
}
