use serde::{Deserialize, Serialize};
use solana_sdk::hash::hash;
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;

use crate::constants::{
    COMPRESSED_PUBKEY_PREFIX_EVEN, COMPRESSED_PUBKEY_PREFIX_ODD, PASSKEY_PUBLIC_KEY_SIZE,
};
use crate::error::{PasskeyEngineError, Result};

/// Compressed secp256r1 public key of a WebAuthn passkey.
///
/// Always exactly 33 bytes with a `0x02`/`0x03` compressed-point prefix;
/// both invariants are enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasskeyPublicKey(pub(crate) [u8; PASSKEY_PUBLIC_KEY_SIZE]);

impl PasskeyPublicKey {
    pub fn new(bytes: [u8; PASSKEY_PUBLIC_KEY_SIZE]) -> Result<Self> {
        if bytes[0] != COMPRESSED_PUBKEY_PREFIX_EVEN && bytes[0] != COMPRESSED_PUBKEY_PREFIX_ODD {
            return Err(PasskeyEngineError::InvalidVerificationInput(
                "public key is not a compressed secp256r1 point",
            ));
        }
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PASSKEY_PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            PasskeyEngineError::InvalidVerificationInput("public key must be 33 bytes")
        })?;
        Self::new(arr)
    }

    pub fn as_bytes(&self) -> &[u8; PASSKEY_PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// SHA256 of `passkey || wallet`, the device-PDA seed material used by
    /// the passkey-wallet seed scheme.
    pub fn to_hashed_bytes(&self, wallet: &Pubkey) -> [u8; 32] {
        let mut buf = [0u8; PASSKEY_PUBLIC_KEY_SIZE + 32];
        buf[..PASSKEY_PUBLIC_KEY_SIZE].copy_from_slice(&self.0);
        buf[PASSKEY_PUBLIC_KEY_SIZE..].copy_from_slice(wallet.as_ref());
        hash(&buf).to_bytes()
    }
}

impl AsRef<[u8]> for PasskeyPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Raw WebAuthn authenticator output accompanying a signature.
///
/// The message covered by the signature is
/// `authenticator_data || SHA256(client_data_json)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAuthData {
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

/// Everything the browser-redirect flow hands back after the user approves
/// a passkey prompt. The signature is raw authenticator output and may still
/// be in high-S form.
#[derive(Debug, Clone)]
pub struct PasskeyAssertion {
    pub public_key: PasskeyPublicKey,
    pub signature: Vec<u8>,
    pub client_auth: ClientAuthData,
}

/// One account referenced by an instruction. Created fresh per build and
/// never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRef {
    pub address: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountRef {
    pub fn readonly(address: Pubkey) -> Self {
        Self {
            address,
            is_signer: false,
            is_writable: false,
        }
    }

    pub fn to_account_meta(&self) -> AccountMeta {
        if self.is_writable {
            AccountMeta::new(self.address, self.is_signer)
        } else {
            AccountMeta::new_readonly(self.address, self.is_signer)
        }
    }
}

impl From<&AccountMeta> for AccountRef {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            address: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

/// A program-derived address together with its bump seed. Pure function of
/// the seed tuple; callers may memoize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Seed material variant for the wallet-device PDA. Two deployed program
/// generations disagree on this, so it is explicit configuration rather
/// than forked code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSeedScheme {
    /// Seed with `SHA256(passkey || wallet)`.
    PasskeyWallet,
    /// Seed with the SHA256 hash of the WebAuthn credential ID.
    CredentialHash,
}

/// How the authorization message is carried inside the WebAuthn challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeEncoding {
    /// Raw 32-byte message hash.
    MessageHash,
    /// Deterministic borsh serialization of the structured message record.
    BorshMessage,
}

/// Protocol-variant configuration. Selects seed layout and challenge
/// encoding explicitly; nothing in the engine branches on ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub program_id: Pubkey,
    pub device_seed_scheme: DeviceSeedScheme,
    pub challenge_encoding: ChallengeEncoding,
}

impl ProtocolConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            device_seed_scheme: DeviceSeedScheme::PasskeyWallet,
            challenge_encoding: ChallengeEncoding::MessageHash,
        }
    }

    pub fn with_device_seed_scheme(mut self, scheme: DeviceSeedScheme) -> Self {
        self.device_seed_scheme = scheme;
        self
    }

    pub fn with_challenge_encoding(mut self, encoding: ChallengeEncoding) -> Self {
        self.challenge_encoding = encoding;
        self
    }
}

/// Resolved per-wallet context consumed by the instruction assembler.
///
/// Addresses are resolved once by the caller (see [`crate::pda`]) and the
/// nonce must be read immediately before message construction.
#[derive(Debug, Clone)]
pub struct WalletContext {
    pub config: ProtocolConfig,
    pub smart_wallet: Pubkey,
    pub wallet_config: Pubkey,
    pub wallet_device: Pubkey,
    pub policy_program: Pubkey,
    pub policy_registry: Pubkey,
    pub global_config: Pubkey,
    pub last_nonce: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passkey_prefix_is_enforced() {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x04;
        assert!(PasskeyPublicKey::new(bytes).is_err());
        bytes[0] = 0x02;
        assert!(PasskeyPublicKey::new(bytes).is_ok());
        bytes[0] = 0x03;
        assert!(PasskeyPublicKey::new(bytes).is_ok());
    }

    #[test]
    fn passkey_from_slice_rejects_bad_length() {
        assert!(PasskeyPublicKey::from_slice(&[0x02; 32]).is_err());
        assert!(PasskeyPublicKey::from_slice(&[0x02; 34]).is_err());
    }

    #[test]
    fn hashed_bytes_bind_wallet_address() {
        let key = PasskeyPublicKey::new([0x02; 33]).unwrap();
        let a = key.to_hashed_bytes(&Pubkey::new_unique());
        let b = key.to_hashed_bytes(&Pubkey::new_unique());
        assert_ne!(a, b);
    }
}
