//! Binary codec for `SearchResult` streams.
//!
//! Shard search responses travel as a length-prefixed binary frame
//! rather than JSON: result lists are large, float-heavy, and decoded
//! on the hot path of every fan-out search.
//!
//! # Frame layout (little-endian fixed-width fields)
//!
//! ```text
//! <varint:count>
//! repeated count times:
//!     <f64:distance>
//!     <f64:similarity>
//!     <varint:id>
//!     <i64:created_at_epoch_millis>
//!     <varint:dimension>
//!     <f32:embedding[0]> ... <f32:embedding[dimension-1]>
//!     <string:database_id>
//!     <string:original_data>
//!
//! string := <varint:byte_length> <utf8 bytes>
//! ```

use arcdb_core::{CoreError, CoreResult, SearchResult, VectorEntry};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::TimeZone;

use crate::varint::{read_varint, varint_len, write_varint};

/// Encodes an ordered result list into a wire frame.
///
/// A zero count is written explicitly so an empty response is still a
/// valid frame.
#[must_use]
pub fn encode_search_results(results: &[SearchResult]) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame_size_hint(results));
    write_varint(&mut buf, results.len() as u64);
    for result in results {
        encode_result(&mut buf, result);
    }
    buf.freeze()
}

/// Decodes a wire frame into an ordered result list.
///
/// # Errors
///
/// Returns `Protocol` for truncated buffers, varint overflow, invalid
/// UTF-8, or trailing garbage after the declared count.
pub fn decode_search_results(frame: &[u8]) -> CoreResult<Vec<SearchResult>> {
    let mut buf = frame;
    let count = read_varint(&mut buf)?;
    // Each result occupies at least the fixed-width fields.
    if count > (frame.len() as u64) / MIN_RESULT_SIZE as u64 + 1 {
        return Err(CoreError::protocol(format!(
            "result count {count} exceeds frame capacity"
        )));
    }
    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        results.push(decode_result(&mut buf)?);
    }
    if buf.has_remaining() {
        return Err(CoreError::protocol(format!(
            "{} trailing bytes after {count} results",
            buf.remaining()
        )));
    }
    Ok(results)
}

/// Smallest possible encoded result: two f64, one i64, three one-byte
/// varints, two empty strings.
const MIN_RESULT_SIZE: usize = 8 + 8 + 1 + 8 + 1 + 1 + 1;

fn frame_size_hint(results: &[SearchResult]) -> usize {
    varint_len(results.len() as u64)
        + results
            .iter()
            .map(|r| {
                MIN_RESULT_SIZE
                    + r.entry.embedding.len() * 4
                    + r.entry.database_id.len()
                    + r.entry.original_data.len()
            })
            .sum::<usize>()
}

fn encode_result(buf: &mut BytesMut, result: &SearchResult) {
    buf.put_f64_le(result.distance);
    buf.put_f64_le(result.similarity);
    write_varint(buf, result.entry.id);
    buf.put_i64_le(result.entry.created_at.timestamp_millis());
    write_varint(buf, result.entry.embedding.len() as u64);
    for component in &result.entry.embedding {
        buf.put_f32_le(*component);
    }
    write_string(buf, &result.entry.database_id);
    write_string(buf, &result.entry.original_data);
}

fn decode_result(buf: &mut &[u8]) -> CoreResult<SearchResult> {
    let distance = read_f64(buf)?;
    let similarity = read_f64(buf)?;
    let id = read_varint(buf)?;
    let created_at_millis = read_i64(buf)?;
    let created_at = chrono::Utc
        .timestamp_millis_opt(created_at_millis)
        .single()
        .ok_or_else(|| {
            CoreError::protocol(format!("timestamp {created_at_millis} is out of range"))
        })?;

    let dimension = read_varint(buf)?;
    if dimension > (buf.remaining() / 4) as u64 {
        return Err(CoreError::protocol(format!(
            "dimension {dimension} exceeds remaining frame"
        )));
    }
    let mut embedding = Vec::with_capacity(dimension as usize);
    for _ in 0..dimension {
        embedding.push(buf.get_f32_le());
    }

    let database_id = read_string(buf)?;
    let original_data = read_string(buf)?;

    Ok(SearchResult {
        entry: VectorEntry {
            id,
            embedding,
            database_id,
            original_data,
            created_at,
        },
        distance,
        similarity,
    })
}

fn write_string(buf: &mut BytesMut, value: &str) {
    write_varint(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

fn read_string(buf: &mut &[u8]) -> CoreResult<String> {
    let len = read_varint(buf)?;
    if len > buf.remaining() as u64 {
        return Err(CoreError::protocol(format!(
            "string length {len} exceeds remaining frame"
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|err| CoreError::protocol(format!("invalid UTF-8: {err}")))
}

fn read_f64(buf: &mut &[u8]) -> CoreResult<f64> {
    if buf.remaining() < 8 {
        return Err(CoreError::protocol("truncated f64 field"));
    }
    Ok(buf.get_f64_le())
}

fn read_i64(buf: &mut &[u8]) -> CoreResult<i64> {
    if buf.remaining() < 8 {
        return Err(CoreError::protocol("truncated i64 field"));
    }
    Ok(buf.get_i64_le())
}
