//! Off-chain protocol engine for passkey-authorized smart wallets.
//!
//! The engine turns a WebAuthn passkey assertion into a Solana transaction
//! plan: it derives the wallet's program addresses, builds the canonical
//! authorization message for the requested action, checks the assertion
//! against it, normalizes the secp256r1 signature, emits the verify
//! precompile instruction, and assembles the wallet instruction with the
//! split indices the on-chain program needs to partition its remaining
//! accounts. Everything here is pure and synchronous; RPC traffic, fee
//! handling, and transaction submission live with the caller.

pub mod args;
pub mod assemble;
pub mod codec;
pub mod constants;
pub mod error;
pub mod message;
pub mod pda;
pub mod secp256r1;
pub mod signature;
pub mod types;
pub mod webauthn;

pub use crate::assemble::{
    assemble_call_policy, assemble_change_policy, assemble_create_session,
    assemble_execute, assemble_execute_deferred, authorization_challenge, InstructionPlan,
};
pub use crate::error::{PasskeyEngineError, Result};
pub use crate::message::{
    AuthorizationMessage, AuthorizedAction, InstructionDigest, SessionCommitment,
};
pub use crate::pda::{
    derive_global_config, derive_policy_registry, derive_smart_wallet,
    derive_transaction_session, derive_wallet_config, derive_wallet_device,
};
pub use crate::secp256r1::build_verify_instruction;
pub use crate::signature::normalize_signature;
pub use crate::types::{
    AccountRef, ChallengeEncoding, ClientAuthData, DerivedAddress, DeviceSeedScheme,
    PasskeyAssertion, PasskeyPublicKey, ProtocolConfig, WalletContext,
};
pub use crate::webauthn::PasskeyPrompt;
