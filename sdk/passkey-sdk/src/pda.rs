//! Deterministic program-derived address derivation.
//!
//! All derivations are pure functions of `(program_id, namespace, seeds)`;
//! callers may memoize by seed tuple. Seed namespaces mirror the on-chain
//! program's account layout.

use solana_sdk::pubkey::Pubkey;

use crate::types::{DerivedAddress, DeviceSeedScheme, PasskeyPublicKey};

/// Seed for the smart wallet system account, combined with the wallet id.
pub const SMART_WALLET_SEED: &[u8] = b"smart_wallet";
/// Seed for the per-wallet state account (nonce, policy program).
pub const WALLET_CONFIG_SEED: &[u8] = b"smart_wallet_data";
/// Seed for a wallet device (one per registered passkey).
pub const WALLET_DEVICE_SEED: &[u8] = b"wallet_device";
/// Seed for the policy program registry.
pub const POLICY_REGISTRY_SEED: &[u8] = b"policy_registry";
/// Seed for the global program config.
pub const GLOBAL_CONFIG_SEED: &[u8] = b"config";
/// Seed for a deferred-execution session, combined with wallet and nonce.
pub const TRANSACTION_SESSION_SEED: &[u8] = b"transaction_session";

/// Generic derivation over a namespace and arbitrary seed parts.
pub fn derive(program_id: &Pubkey, namespace: &[u8], seed_parts: &[&[u8]]) -> DerivedAddress {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(1 + seed_parts.len());
    seeds.push(namespace);
    seeds.extend_from_slice(seed_parts);
    let (address, bump) = Pubkey::find_program_address(&seeds, program_id);
    DerivedAddress { address, bump }
}

/// Derive the smart wallet address from its client-chosen id.
pub fn derive_smart_wallet(program_id: &Pubkey, wallet_id: u64) -> DerivedAddress {
    derive(program_id, SMART_WALLET_SEED, &[&wallet_id.to_le_bytes()])
}

/// Derive the wallet state account for a smart wallet.
pub fn derive_wallet_config(program_id: &Pubkey, smart_wallet: &Pubkey) -> DerivedAddress {
    derive(program_id, WALLET_CONFIG_SEED, &[smart_wallet.as_ref()])
}

/// Derive the device account binding a passkey to a smart wallet.
///
/// The third seed depends on the configured scheme: either
/// `SHA256(passkey || wallet)` or the credential-ID hash. Both deployed
/// program generations exist in the wild, so the scheme is explicit input.
pub fn derive_wallet_device(
    program_id: &Pubkey,
    smart_wallet: &Pubkey,
    scheme: DeviceSeedScheme,
    passkey: &PasskeyPublicKey,
    credential_hash: &[u8; 32],
) -> DerivedAddress {
    let material = match scheme {
        DeviceSeedScheme::PasskeyWallet => passkey.to_hashed_bytes(smart_wallet),
        DeviceSeedScheme::CredentialHash => *credential_hash,
    };
    derive(
        program_id,
        WALLET_DEVICE_SEED,
        &[smart_wallet.as_ref(), &material],
    )
}

/// Derive the policy program registry account.
pub fn derive_policy_registry(program_id: &Pubkey) -> DerivedAddress {
    derive(program_id, POLICY_REGISTRY_SEED, &[])
}

/// Derive the global config account.
pub fn derive_global_config(program_id: &Pubkey) -> DerivedAddress {
    derive(program_id, GLOBAL_CONFIG_SEED, &[])
}

/// Derive the session account for a wallet at a given nonce. Each nonce maps
/// to exactly one session address, which is what keeps two concurrent
/// sessions from colliding.
pub fn derive_transaction_session(
    program_id: &Pubkey,
    smart_wallet: &Pubkey,
    nonce: u64,
) -> DerivedAddress {
    derive(
        program_id,
        TRANSACTION_SESSION_SEED,
        &[smart_wallet.as_ref(), &nonce.to_le_bytes()],
    )
}
