//! Fixed-width integer packing, base64/hex decoding, and constant-time
//! comparison. Every protocol integer is little-endian.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use subtle::ConstantTimeEq;

use crate::error::{PasskeyEngineError, Result};

pub fn put_u16_le(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32_le(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u64_le(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_i64_le(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn take<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            PasskeyEngineError::Decode(format!(
                "need {} bytes at offset {}, have {}",
                N,
                offset,
                data.len()
            ))
        })
}

pub fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    take::<1>(data, offset).map(|b| b[0])
}

pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    take(data, offset).map(u16::from_le_bytes)
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    take(data, offset).map(u32::from_le_bytes)
}

pub fn read_u64_le(data: &[u8], offset: usize) -> Result<u64> {
    take(data, offset).map(u64::from_le_bytes)
}

pub fn read_i64_le(data: &[u8], offset: usize) -> Result<i64> {
    take(data, offset).map(i64::from_le_bytes)
}

/// Decode base64 input of unknown flavor. Deep-link payloads arrive in both
/// standard and URL-safe alphabets, padded and unpadded, depending on the
/// client platform.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| URL_SAFE.decode(input))
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .or_else(|_| STANDARD.decode(input))
        .map_err(|e| PasskeyEngineError::Decode(format!("base64: {e}")))
}

pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(trimmed).map_err(|e| PasskeyEngineError::Decode(format!("hex: {e}")))
}

/// Constant-time byte-array equality for security-sensitive comparisons.
/// Length mismatch returns false without inspecting contents.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
