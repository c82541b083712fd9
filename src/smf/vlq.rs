// Variable-length quantities
// 7 bits per byte, big-endian, MSB set on every byte but the last

use super::{DecodeError, DecodeResult};

/// Longest encoding allowed by the SMF format
pub const MAX_BYTES: usize = 4;

/// Largest value representable in four VLQ bytes
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// Decode one quantity from the front of `bytes`.
///
/// Reading stops at the first byte with a clear MSB or after [`MAX_BYTES`]
/// bytes, whichever comes first. Returns the value and the unconsumed remainder.
pub fn decode(bytes: &[u8]) -> DecodeResult<(u32, &[u8])> {
    let mut value: u32 = 0;
    let mut consumed = 0;

    while consumed < MAX_BYTES {
        let b = *bytes
            .get(consumed)
            .ok_or(DecodeError::UnexpectedEof { context: "variable-length quantity" })?;
        consumed += 1;
        value = (value << 7) | u32::from(b & 0x7F);
        if b & 0x80 == 0 {
            break;
        }
    }

    Ok((value, &bytes[consumed..]))
}

/// Decode a VLQ length followed by that many bytes.
///
/// Returns the block and whatever follows it (empty when the block was the last
/// thing in the buffer).
pub fn decode_length_prefixed_block(bytes: &[u8]) -> DecodeResult<(&[u8], &[u8])> {
    let (length, rest) = decode(bytes)?;
    let length = length as usize;
    if length > rest.len() {
        return Err(DecodeError::UnexpectedEof { context: "length-prefixed block" });
    }
    Ok(rest.split_at(length))
}

/// Encode `value` (masked to 28 bits) as a VLQ
pub fn encode(value: u32) -> Vec<u8> {
    let value = value & MAX_VALUE;
    let mut out = Vec::with_capacity(MAX_BYTES);
    let mut shift = 21;

    // Skip leading zero groups, but always emit the last one
    while shift > 0 && (value >> shift) & 0x7F == 0 {
        shift -= 7;
    }
    while shift > 0 {
        out.push(((value >> shift) & 0x7F) as u8 | 0x80);
        shift -= 7;
    }
    out.push((value & 0x7F) as u8);
    out
}
