//! Reply values and their RESP encoding

use bytes::{BufMut, Bytes, BytesMut};

/// Everything a command handler can answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Simple status: +OK\r\n
    Simple(String),

    /// Error: -ERR message\r\n
    Error(String),

    /// Integer: :1\r\n
    Integer(i64),

    /// Bulk string: $5\r\nhello\r\n
    Bulk(Bytes),

    /// Absent value: $-1\r\n
    Nil,

    /// Array of replies; EXEC answers with one entry per queued command.
    Array(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    pub fn queued() -> Self {
        Reply::Simple("QUEUED".to_string())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    pub fn bulk(bytes: impl Into<Bytes>) -> Self {
        Reply::Bulk(bytes.into())
    }

    pub fn wrong_arity(name: &str) -> Self {
        Reply::Error(format!("ERR wrong number of arguments for '{}' command", name))
    }

    /// Append the wire encoding of this reply to `buf`.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        match self {
            Reply::Simple(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Reply::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Reply::Integer(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            Reply::Bulk(bytes) => {
                buf.put_u8(b'$');
                buf.put_slice(bytes.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(bytes);
                buf.put_slice(b"\r\n");
            }
            Reply::Nil => {
                buf.put_slice(b"$-1\r\n");
            }
            Reply::Array(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    item.encode_to(buf);
                }
            }
        }
    }

    /// Encode into a fresh byte sequence.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf);
        buf.freeze()
    }
}
