//! Borsh argument structs for the wallet program's instructions.
//!
//! Field order matches the on-chain program so the produced instruction
//! data is byte-compatible. Instruction data is the 8-byte global sighash
//! followed by the borsh-serialized args.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash::hash;

use crate::constants::PASSKEY_PUBLIC_KEY_SIZE;

/// Anchor-style instruction discriminator: first 8 bytes of
/// `SHA256("namespace:name")`.
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{namespace}:{name}");
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash(preimage.as_bytes()).to_bytes()[..8]);
    out
}

/// Prefix instruction data for a named wallet-program instruction.
pub fn instruction_data(name: &str, args: &impl BorshSerialize) -> Vec<u8> {
    let mut data = sighash("global", name).to_vec();
    data.extend_from_slice(&borsh::to_vec(args).unwrap());
    data
}

/// The documented default policy instruction: a bare `check_policy` call
/// with no arguments, used when the caller supplies no policy data.
pub fn default_policy_instruction_data() -> Vec<u8> {
    sighash("global", "check_policy").to_vec()
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct ExecuteArgs {
    pub passkey_public_key: [u8; PASSKEY_PUBLIC_KEY_SIZE],
    pub signature: Vec<u8>,
    pub client_data_json_raw: Vec<u8>,
    pub authenticator_data_raw: Vec<u8>,
    pub verify_instruction_index: u8,
    pub split_index: u16,
    pub policy_data: Vec<u8>,
    pub cpi_data: Vec<u8>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct CallPolicyArgs {
    pub passkey_public_key: [u8; PASSKEY_PUBLIC_KEY_SIZE],
    pub signature: Vec<u8>,
    pub client_data_json_raw: Vec<u8>,
    pub authenticator_data_raw: Vec<u8>,
    pub verify_instruction_index: u8,
    pub policy_data: Vec<u8>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct ChangePolicyArgs {
    pub passkey_public_key: [u8; PASSKEY_PUBLIC_KEY_SIZE],
    pub signature: Vec<u8>,
    pub client_data_json_raw: Vec<u8>,
    pub authenticator_data_raw: Vec<u8>,
    pub verify_instruction_index: u8,
    pub split_index: u16,
    pub destroy_policy_data: Vec<u8>,
    pub init_policy_data: Vec<u8>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct CreateSessionArgs {
    pub passkey_public_key: [u8; PASSKEY_PUBLIC_KEY_SIZE],
    pub signature: Vec<u8>,
    pub client_data_json_raw: Vec<u8>,
    pub authenticator_data_raw: Vec<u8>,
    pub verify_instruction_index: u8,
    pub policy_data: Vec<u8>,
    pub cpi_hash: [u8; 32],
    pub expires_at: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct ExecuteDeferredArgs {
    pub instruction_data_list: Vec<Vec<u8>>,
    pub split_index: Vec<u16>,
}
