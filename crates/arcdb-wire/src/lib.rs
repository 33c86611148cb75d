//! Binary wire format for coordinator ↔ storage-node search responses.

pub mod codec;
pub mod varint;

pub use codec::{decode_search_results, encode_search_results};
pub use varint::{read_varint, varint_len, write_varint};
