//! Per-client connection handling
//!
//! Each connection stages socket bytes in a ring buffer, peels off
//! complete frames, and batches the replies for one readiness round into
//! an outbound buffer before flushing.

use crate::buffer::RingBuffer;
use crate::dispatch::{Dispatcher, TransactionState};
use crate::protocol::{frame, Reply};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;

pub struct Connection {
    stream: TcpStream,

    /// Unconsumed inbound bytes; frames may arrive split arbitrarily.
    inbound: RingBuffer,

    /// Replies accumulated during the current round, flushed together.
    outbound: BytesMut,

    /// Open transaction, if any. Dropped wholesale when the connection
    /// closes.
    txn: TransactionState,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            inbound: RingBuffer::new(),
            outbound: BytesMut::with_capacity(4096),
            txn: TransactionState::default(),
        }
    }

    /// Serve this client until it disconnects or faults.
    pub async fn handle(&mut self, dispatcher: Arc<Mutex<Dispatcher>>) -> anyhow::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                if self.inbound.is_empty() {
                    return Ok(());
                }
                anyhow::bail!("connection reset by peer mid-frame");
            }
            debug!("read {} bytes", n);
            self.inbound.write(&chunk[..n]);

            self.dispatch_buffered(&dispatcher).await;

            if !self.outbound.is_empty() {
                self.stream.write_all(&self.outbound).await?;
                self.stream.flush().await?;
                self.outbound.clear();
            }
        }
    }

    /// Dispatch every complete frame currently buffered.
    ///
    /// Stops on the first incomplete frame (more bytes will come) or on a
    /// malformed one, which earns an error reply and leaves the buffer
    /// untouched.
    async fn dispatch_buffered(&mut self, dispatcher: &Arc<Mutex<Dispatcher>>) {
        loop {
            let parsed = match self.inbound.peek(0, self.inbound.size()) {
                Some(window) => frame::parse(&window),
                None => return,
            };
            match parsed {
                Ok(Some(frame)) => {
                    self.inbound.consume(frame.len);
                    let reply = {
                        let mut dispatcher = dispatcher.lock().await;
                        dispatcher.dispatch(frame.tokens, &mut self.txn)
                    };
                    reply.encode_to(&mut self.outbound);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("protocol error: {}", e);
                    Reply::error(format!("ERR protocol error: {}", e))
                        .encode_to(&mut self.outbound);
                    break;
                }
            }
        }
    }
}
