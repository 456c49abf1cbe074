//! ECDSA signature normalization.
//!
//! The secp256r1 verification precompile rejects high-S signatures as a
//! malleability defense, while authenticators are free to produce either
//! form. Every signature therefore passes through [`normalize_signature`]
//! before it is placed into a verification instruction.

use p256::ecdsa::Signature;

use crate::constants::SIGNATURE_SIZE;
use crate::error::{PasskeyEngineError, Result};

const COMPONENT_SIZE: usize = SIGNATURE_SIZE / 2;

/// Normalize a raw `R || S` signature to canonical low-S form.
///
/// Accepts either the 64-byte fixed encoding or an ASN.1 DER encoding
/// (authenticators emit DER; deep links usually carry the raw form).
/// If `S > n/2` it is replaced with `n - S`. Idempotent.
pub fn normalize_signature(signature: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
    let parsed = if signature.len() == SIGNATURE_SIZE {
        Signature::from_slice(signature).map_err(|_| PasskeyEngineError::InvalidSignature)?
    } else if signature.first() == Some(&0x30) {
        Signature::from_der(signature).map_err(|_| PasskeyEngineError::InvalidSignature)?
    } else {
        return Err(PasskeyEngineError::InvalidSignatureLength(signature.len()));
    };

    let low_s = parsed.normalize_s().unwrap_or(parsed);
    let mut out = [0u8; SIGNATURE_SIZE];
    out.copy_from_slice(&low_s.to_bytes());
    Ok(out)
}

/// Normalize a signature supplied as separate R and S halves.
///
/// Components shorter than 32 bytes are right-aligned and zero-padded, the
/// way authenticators strip leading zeroes from scalar encodings.
pub fn normalize_signature_parts(r: &[u8], s: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
    let mut raw = [0u8; SIGNATURE_SIZE];
    pad_component(&mut raw[..COMPONENT_SIZE], r)?;
    pad_component(&mut raw[COMPONENT_SIZE..], s)?;
    normalize_signature(&raw)
}

fn pad_component(dest: &mut [u8], component: &[u8]) -> Result<()> {
    if component.is_empty() || component.len() > COMPONENT_SIZE {
        return Err(PasskeyEngineError::InvalidSignatureLength(component.len()));
    }
    dest[COMPONENT_SIZE - component.len()..].copy_from_slice(component);
    Ok(())
}
