//! Keyspace and persistence engine

mod memory;
mod value;

pub use memory::Store;
pub use value::{vector_from_bytes, vector_to_bytes, Value};
