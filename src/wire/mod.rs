//! Wire-level messages and the value codec

pub mod encoding;
pub mod message;

pub use encoding::{decode_value, encode_key, encode_value, partition_hash, RowBuffer};
pub use message::{
    BoundColumn, OpHandle, OpOutcome, OpStatus, ResultBatch, StatementType, WireOperation,
};
