//! Builder for the native secp256r1 signature-verification instruction.
//!
//! The precompile consumes a fixed-layout buffer: a one-byte signature
//! count, a padding byte, a 14-byte offsets table, then the payload
//! (compressed public key, signature, message). Offsets must point at the
//! exact byte positions inside this same buffer; any mismatch surfaces as a
//! verification failure on-chain, so this module is covered by exact-byte
//! golden tests.

use solana_sdk::instruction::Instruction;

use crate::codec::{ct_eq, put_u16_le, read_u16_le, read_u8};
use crate::constants::{PASSKEY_PUBLIC_KEY_SIZE, SECP256R1_PROGRAM_ID, SIGNATURE_SIZE};
use crate::error::{PasskeyEngineError, Result};
use crate::types::PasskeyPublicKey;

const HEADER_SIZE: usize = 14;
const DATA_START: usize = 2 + HEADER_SIZE;
const PUBKEY_OFFSET: usize = DATA_START;
const SIGNATURE_OFFSET: usize = DATA_START + PASSKEY_PUBLIC_KEY_SIZE;
const MESSAGE_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_SIZE;

/// Marker meaning "the offsets refer to this instruction's own data".
const THIS_INSTRUCTION: u16 = 0xFFFF;

/// Build the verification instruction for one signature.
///
/// `signature` must already be in canonical low-S form
/// (see [`crate::signature::normalize_signature`]).
pub fn build_verify_instruction(
    public_key: &PasskeyPublicKey,
    signature: &[u8],
    message: &[u8],
) -> Result<Instruction> {
    if signature.len() != SIGNATURE_SIZE {
        return Err(PasskeyEngineError::InvalidVerificationInput(
            "signature must be 64 bytes",
        ));
    }
    let message_size = u16::try_from(message.len()).map_err(|_| {
        PasskeyEngineError::InvalidVerificationInput("message exceeds u16 length")
    })?;

    let mut data = Vec::with_capacity(MESSAGE_OFFSET + message.len());
    data.push(1); // number of signatures
    data.push(0); // padding
    put_u16_le(&mut data, SIGNATURE_OFFSET as u16);
    put_u16_le(&mut data, THIS_INSTRUCTION);
    put_u16_le(&mut data, PUBKEY_OFFSET as u16);
    put_u16_le(&mut data, THIS_INSTRUCTION);
    put_u16_le(&mut data, MESSAGE_OFFSET as u16);
    put_u16_le(&mut data, message_size);
    put_u16_le(&mut data, THIS_INSTRUCTION);
    debug_assert_eq!(data.len(), DATA_START);

    data.extend_from_slice(public_key.as_bytes());
    data.extend_from_slice(signature);
    data.extend_from_slice(message);

    Ok(Instruction {
        program_id: SECP256R1_PROGRAM_ID,
        accounts: vec![],
        data,
    })
}

/// Check a verification instruction against expected inputs, mirroring the
/// on-chain program's header and payload validation byte for byte.
pub fn check_verify_instruction(
    instruction: &Instruction,
    public_key: &PasskeyPublicKey,
    signature: &[u8],
    message: &[u8],
) -> Result<()> {
    let expected_len = MESSAGE_OFFSET + message.len();
    if instruction.program_id != SECP256R1_PROGRAM_ID
        || !instruction.accounts.is_empty()
        || instruction.data.len() != expected_len
    {
        return Err(PasskeyEngineError::InvalidVerificationInput(
            "not a secp256r1 verification instruction of the expected size",
        ));
    }

    let data = &instruction.data;
    let header_ok = read_u8(data, 0)? == 1
        && read_u16_le(data, 2)? == SIGNATURE_OFFSET as u16
        && read_u16_le(data, 4)? == THIS_INSTRUCTION
        && read_u16_le(data, 6)? == PUBKEY_OFFSET as u16
        && read_u16_le(data, 8)? == THIS_INSTRUCTION
        && read_u16_le(data, 10)? == MESSAGE_OFFSET as u16
        && read_u16_le(data, 12)? == message.len() as u16
        && read_u16_le(data, 14)? == THIS_INSTRUCTION;
    if !header_ok {
        return Err(PasskeyEngineError::InvalidVerificationInput(
            "offsets header mismatch",
        ));
    }

    let payload_ok = ct_eq(&data[PUBKEY_OFFSET..SIGNATURE_OFFSET], public_key.as_ref())
        && ct_eq(&data[SIGNATURE_OFFSET..MESSAGE_OFFSET], signature)
        && ct_eq(&data[MESSAGE_OFFSET..], message);
    if !payload_ok {
        return Err(PasskeyEngineError::InvalidVerificationInput(
            "payload mismatch",
        ));
    }

    Ok(())
}
