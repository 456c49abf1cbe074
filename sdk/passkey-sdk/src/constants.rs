use solana_sdk::{pubkey, pubkey::Pubkey};

/// Solana's built-in Secp256r1 signature verification program ID.
pub const SECP256R1_PROGRAM_ID: Pubkey = pubkey!("Secp256r1SigVerify1111111111111111111111111");

/// Size of a compressed secp256r1 public key in bytes.
pub const PASSKEY_PUBLIC_KEY_SIZE: usize = 33;

/// Size of a serialized ECDSA signature (R || S) in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Compressed-point prefix bytes for secp256r1 public keys.
pub const COMPRESSED_PUBKEY_PREFIX_EVEN: u8 = 0x02;
pub const COMPRESSED_PUBKEY_PREFIX_ODD: u8 = 0x03;

/// Allowed drift between the timestamp bound into an authorization message
/// and on-chain time. Messages outside this window are rejected on-chain.
pub const MAX_TIMESTAMP_DRIFT_SECONDS: i64 = 30;
