//! Shared helpers: a software passkey standing in for a platform
//! authenticator, and wallet-context construction.
#![allow(dead_code)]

use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use passkey_sdk::webauthn::encode_challenge;
use passkey_sdk::{
    derive_global_config, derive_policy_registry, derive_smart_wallet, derive_wallet_config,
    derive_wallet_device, ClientAuthData, DeviceSeedScheme, PasskeyAssertion, PasskeyPublicKey,
    ProtocolConfig, WalletContext,
};

/// Software authenticator producing real secp256r1 assertions over a
/// WebAuthn-shaped payload.
pub struct SoftwarePasskey {
    signing_key: SigningKey,
    pub public_key: PasskeyPublicKey,
}

impl SoftwarePasskey {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let compressed = verifying_key.to_encoded_point(true);
        let public_key = PasskeyPublicKey::from_slice(compressed.as_bytes()).unwrap();
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.signing_key)
    }

    /// Sign a challenge the way a browser authenticator would: embed it in
    /// clientDataJSON, then sign `authenticator_data || SHA256(client_data)`.
    /// The raw signature may be high-S; normalization is the engine's job.
    pub fn assert(&self, challenge: &[u8]) -> PasskeyAssertion {
        let client_data_json = format!(
            "{{\"type\":\"webauthn.get\",\"challenge\":\"{}\",\"origin\":\"https://wallet.example\",\"crossOrigin\":false}}",
            encode_challenge(challenge)
        )
        .into_bytes();
        // 32-byte rpIdHash + flags + counter
        let mut authenticator_data = vec![0xA1u8; 32];
        authenticator_data.push(0x05);
        authenticator_data.extend_from_slice(&7u32.to_be_bytes());

        let mut message = authenticator_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: Signature = self.signing_key.sign(&message);

        PasskeyAssertion {
            public_key: self.public_key,
            signature: signature.to_bytes().to_vec(),
            client_auth: ClientAuthData {
                authenticator_data,
                client_data_json,
            },
        }
    }
}

pub fn wallet_program_id() -> Pubkey {
    Pubkey::new_from_array([0x17; 32])
}

pub fn policy_program_id() -> Pubkey {
    Pubkey::new_from_array([0x23; 32])
}

/// Resolve a full wallet context for a fresh wallet id, nonce included.
pub fn wallet_context(passkey: &SoftwarePasskey, wallet_id: u64, nonce: u64) -> WalletContext {
    let program_id = wallet_program_id();
    let config = ProtocolConfig::new(program_id);
    let smart_wallet = derive_smart_wallet(&program_id, wallet_id).address;
    WalletContext {
        config,
        smart_wallet,
        wallet_config: derive_wallet_config(&program_id, &smart_wallet).address,
        wallet_device: derive_wallet_device(
            &program_id,
            &smart_wallet,
            DeviceSeedScheme::PasskeyWallet,
            &passkey.public_key,
            &[0u8; 32],
        )
        .address,
        policy_program: policy_program_id(),
        policy_registry: derive_policy_registry(&program_id).address,
        global_config: derive_global_config(&program_id).address,
        last_nonce: nonce,
    }
}

pub fn instruction_with_accounts(program_tag: u8, count: usize, data: Vec<u8>) -> Instruction {
    Instruction {
        program_id: Pubkey::new_from_array([program_tag; 32]),
        accounts: (0..count)
            .map(|i| AccountMeta::new(Pubkey::new_from_array([program_tag + 1 + i as u8; 32]), false))
            .collect(),
        data,
    }
}
