//! Canonical hash commitments binding authorized actions to a nonce and
//! timestamp.
//!
//! Recipe, per auxiliary instruction:
//!   data_hash     = H(instruction data)
//!   accounts_hash = H(program_id || Σ(address || signer_byte || writable_byte))
//!   digest        = H(data_hash || accounts_hash)
//! and per action:
//!   message_hash  = H(nonce_le || timestamp_le || digest_1 [|| digest_2])
//!
//! Account order is semantically significant: reordering accounts changes
//! the hash, which binds account permissions into the authorization. The
//! final 32-byte value is the WebAuthn challenge payload, or is embedded as
//! fields of a borsh-serialized record, depending on the configured
//! [`ChallengeEncoding`].

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash::{hash, Hasher};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::codec::{ct_eq, put_i64_le, put_u64_le};
use crate::error::{PasskeyEngineError, Result};
use crate::types::{AccountRef, ChallengeEncoding};

/// Hash of one instruction's account metadata, program id first, accounts in
/// call order. An instruction with zero accounts still hashes
/// deterministically (just the program id).
pub fn accounts_hash(program_id: &Pubkey, accounts: &[AccountRef]) -> [u8; 32] {
    let mut hasher = Hasher::default();
    hasher.hash(program_id.as_ref());
    for account in accounts {
        hasher.hash(account.address.as_ref());
        hasher.hash(&[account.is_signer as u8]);
        hasher.hash(&[account.is_writable as u8]);
    }
    hasher.result().to_bytes()
}

/// The two 32-byte hashes committing to one auxiliary instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDigest {
    pub data_hash: [u8; 32],
    pub accounts_hash: [u8; 32],
}

impl InstructionDigest {
    pub fn of(instruction: &Instruction) -> Self {
        let accounts: Vec<AccountRef> = instruction.accounts.iter().map(AccountRef::from).collect();
        Self::from_parts(&instruction.data, &instruction.program_id, &accounts)
    }

    pub fn from_parts(data: &[u8], program_id: &Pubkey, accounts: &[AccountRef]) -> Self {
        Self {
            data_hash: hash(data).to_bytes(),
            accounts_hash: accounts_hash(program_id, accounts),
        }
    }

    /// `H(data_hash || accounts_hash)`, the per-instruction digest bound
    /// into the authorization message.
    pub fn combined(&self) -> [u8; 32] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&self.data_hash);
        buf[32..].copy_from_slice(&self.accounts_hash);
        hash(&buf).to_bytes()
    }
}

/// Aggregate data commitment over many CPI instructions: the borsh
/// (length-prefixed) serialization of the data blobs, hashed once. This lets
/// a whole deferred transaction be committed to with one fixed-size value.
pub fn aggregate_instruction_data_hash(instructions: &[Instruction]) -> [u8; 32] {
    let blobs: Vec<&[u8]> = instructions.iter().map(|ix| ix.data.as_slice()).collect();
    hash(&borsh::to_vec(&blobs).unwrap()).to_bytes()
}

/// Aggregate account commitment over the flat remaining-accounts list of a
/// deferred transaction. Each instruction contributes its program-id slot
/// (readonly, non-signer) followed by its accounts in call order.
pub fn aggregate_accounts_hash(instructions: &[Instruction]) -> [u8; 32] {
    let mut hasher = Hasher::default();
    for instruction in instructions {
        hasher.hash(instruction.program_id.as_ref());
        hasher.hash(&[0u8]);
        hasher.hash(&[0u8]);
        for meta in &instruction.accounts {
            hasher.hash(meta.pubkey.as_ref());
            hasher.hash(&[meta.is_signer as u8]);
            hasher.hash(&[meta.is_writable as u8]);
        }
    }
    hasher.result().to_bytes()
}

/// Both aggregate hashes as one digest, combinable like a single
/// instruction's digest.
pub fn aggregate_digest(instructions: &[Instruction]) -> InstructionDigest {
    InstructionDigest {
        data_hash: aggregate_instruction_data_hash(instructions),
        accounts_hash: aggregate_accounts_hash(instructions),
    }
}

/// An action a passkey holder can authorize, together with its auxiliary
/// instructions. Borrowed views; nothing here is mutated or retained.
#[derive(Debug, Clone, Copy)]
pub enum AuthorizedAction<'a> {
    /// Run one CPI instruction after the policy check.
    Execute {
        policy: &'a Instruction,
        cpi: &'a Instruction,
    },
    /// Call into the wallet's policy program only (device management etc.).
    CallPolicy { policy: &'a Instruction },
    /// Replace the wallet's policy program: destroy the old state, init the
    /// new one.
    ChangePolicy {
        destroy_old: &'a Instruction,
        init_new: &'a Instruction,
    },
    /// Open a deferred-execution session committing to many CPI
    /// instructions at once.
    CreateSession {
        policy: &'a Instruction,
        cpi_instructions: &'a [Instruction],
    },
}

/// The digests of an action, one variant per action kind. Two logically
/// different actions never serialize identically: each variant fixes its
/// own digest set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionDigests {
    Execute {
        policy: InstructionDigest,
        cpi: InstructionDigest,
    },
    CallPolicy { policy: InstructionDigest },
    ChangePolicy {
        old_policy: InstructionDigest,
        new_policy: InstructionDigest,
    },
    CreateSession {
        policy: InstructionDigest,
        cpi: InstructionDigest,
    },
}

/// Canonical authorization message: nonce, timestamp, and the action's
/// digests, in fixed field order with no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationMessage {
    pub nonce: u64,
    pub timestamp: i64,
    pub digests: ActionDigests,
}

impl AuthorizationMessage {
    /// Build the message for an action. `nonce` must be the wallet's
    /// last-known nonce read immediately beforehand; this function does not
    /// (and cannot) check freshness.
    pub fn new(nonce: u64, timestamp: i64, action: &AuthorizedAction<'_>) -> Self {
        let digests = match action {
            AuthorizedAction::Execute { policy, cpi } => ActionDigests::Execute {
                policy: InstructionDigest::of(policy),
                cpi: InstructionDigest::of(cpi),
            },
            AuthorizedAction::CallPolicy { policy } => ActionDigests::CallPolicy {
                policy: InstructionDigest::of(policy),
            },
            AuthorizedAction::ChangePolicy {
                destroy_old,
                init_new,
            } => ActionDigests::ChangePolicy {
                old_policy: InstructionDigest::of(destroy_old),
                new_policy: InstructionDigest::of(init_new),
            },
            AuthorizedAction::CreateSession {
                policy,
                cpi_instructions,
            } => ActionDigests::CreateSession {
                policy: InstructionDigest::of(policy),
                cpi: aggregate_digest(cpi_instructions),
            },
        };
        Self {
            nonce,
            timestamp,
            digests,
        }
    }

    fn combined_digests(&self) -> ([u8; 32], Option<[u8; 32]>) {
        match &self.digests {
            ActionDigests::Execute { policy, cpi } => (policy.combined(), Some(cpi.combined())),
            ActionDigests::CallPolicy { policy } => (policy.combined(), None),
            ActionDigests::ChangePolicy {
                old_policy,
                new_policy,
            } => (old_policy.combined(), Some(new_policy.combined())),
            ActionDigests::CreateSession { policy, cpi } => {
                (policy.combined(), Some(cpi.combined()))
            }
        }
    }

    /// The 32-byte value the passkey actually signs (inside the WebAuthn
    /// challenge): `H(nonce_le || timestamp_le || digest_1 [|| digest_2])`.
    pub fn message_hash(&self) -> [u8; 32] {
        let (first, second) = self.combined_digests();
        let mut buf = Vec::with_capacity(8 + 8 + 64);
        put_u64_le(&mut buf, self.nonce);
        put_i64_le(&mut buf, self.timestamp);
        buf.extend_from_slice(&first);
        if let Some(second) = second {
            buf.extend_from_slice(&second);
        }
        hash(&buf).to_bytes()
    }

    /// Serialize the message into WebAuthn challenge bytes per the
    /// configured protocol variant.
    pub fn challenge_bytes(&self, encoding: ChallengeEncoding) -> Vec<u8> {
        match encoding {
            ChallengeEncoding::MessageHash => self.message_hash().to_vec(),
            ChallengeEncoding::BorshMessage => match &self.digests {
                ActionDigests::Execute { policy, cpi }
                | ActionDigests::CreateSession { policy, cpi } => {
                    borsh::to_vec(&ExecuteMessageRecord {
                        nonce: self.nonce,
                        current_timestamp: self.timestamp,
                        policy_data_hash: policy.data_hash,
                        policy_accounts_hash: policy.accounts_hash,
                        cpi_data_hash: cpi.data_hash,
                        cpi_accounts_hash: cpi.accounts_hash,
                    })
                    .unwrap()
                }
                ActionDigests::CallPolicy { policy } => borsh::to_vec(&CallPolicyMessageRecord {
                    nonce: self.nonce,
                    current_timestamp: self.timestamp,
                    policy_data_hash: policy.data_hash,
                    policy_accounts_hash: policy.accounts_hash,
                })
                .unwrap(),
                ActionDigests::ChangePolicy {
                    old_policy,
                    new_policy,
                } => borsh::to_vec(&ChangePolicyMessageRecord {
                    nonce: self.nonce,
                    current_timestamp: self.timestamp,
                    old_policy_data_hash: old_policy.data_hash,
                    old_policy_accounts_hash: old_policy.accounts_hash,
                    new_policy_data_hash: new_policy.data_hash,
                    new_policy_accounts_hash: new_policy.accounts_hash,
                })
                .unwrap(),
            },
        }
    }
}

/// Borsh record variant of an execute / session authorization, matching the
/// on-chain message layout field for field.
#[derive(Debug, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct ExecuteMessageRecord {
    pub nonce: u64,
    pub current_timestamp: i64,
    pub policy_data_hash: [u8; 32],
    pub policy_accounts_hash: [u8; 32],
    pub cpi_data_hash: [u8; 32],
    pub cpi_accounts_hash: [u8; 32],
}

#[derive(Debug, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct CallPolicyMessageRecord {
    pub nonce: u64,
    pub current_timestamp: i64,
    pub policy_data_hash: [u8; 32],
    pub policy_accounts_hash: [u8; 32],
}

#[derive(Debug, Default, Clone, BorshSerialize, BorshDeserialize)]
pub struct ChangePolicyMessageRecord {
    pub nonce: u64,
    pub current_timestamp: i64,
    pub old_policy_data_hash: [u8; 32],
    pub old_policy_accounts_hash: [u8; 32],
    pub new_policy_data_hash: [u8; 32],
    pub new_policy_accounts_hash: [u8; 32],
}

/// Session commitment created at deferred-session open time and consumed
/// exactly once at execution or expiry-close. Mirrors the on-chain session
/// account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCommitment {
    pub owner_wallet: Pubkey,
    pub instruction_data_hash: [u8; 32],
    pub accounts_metadata_hash: [u8; 32],
    pub authorized_nonce: u64,
    pub expires_at: i64,
    pub rent_refund_address: Pubkey,
}

impl SessionCommitment {
    pub fn new(
        owner_wallet: Pubkey,
        instructions: &[Instruction],
        authorized_nonce: u64,
        expires_at: i64,
        rent_refund_address: Pubkey,
    ) -> Self {
        Self {
            owner_wallet,
            instruction_data_hash: aggregate_instruction_data_hash(instructions),
            accounts_metadata_hash: aggregate_accounts_hash(instructions),
            authorized_nonce,
            expires_at,
            rent_refund_address,
        }
    }

    /// Validate a commitment against the instruction set about to be
    /// executed. A stale nonce or expired window is surfaced, never
    /// silently corrected: refusing to submit is the caller's job.
    pub fn verify(
        &self,
        instructions: &[Instruction],
        wallet_nonce: u64,
        now: i64,
    ) -> Result<()> {
        if self.authorized_nonce != wallet_nonce {
            return Err(PasskeyEngineError::StaleNonce {
                authorized: self.authorized_nonce,
                current: wallet_nonce,
            });
        }
        if now >= self.expires_at {
            return Err(PasskeyEngineError::ExpiredSession {
                expires_at: self.expires_at,
                now,
            });
        }
        let data = aggregate_instruction_data_hash(instructions);
        let accounts = aggregate_accounts_hash(instructions);
        if !ct_eq(&data, &self.instruction_data_hash)
            || !ct_eq(&accounts, &self.accounts_metadata_hash)
        {
            return Err(PasskeyEngineError::HashMismatch);
        }
        Ok(())
    }

    /// One fixed-size value committing to the whole session, as bound into
    /// the create-session authorization message.
    pub fn combined_hash(&self) -> [u8; 32] {
        InstructionDigest {
            data_hash: self.instruction_data_hash,
            accounts_hash: self.accounts_metadata_hash,
        }
        .combined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    fn sample_instruction(accounts: usize) -> Instruction {
        Instruction {
            program_id: Pubkey::new_from_array([1u8; 32]),
            accounts: (0..accounts)
                .map(|i| AccountMeta::new(Pubkey::new_from_array([10 + i as u8; 32]), i == 0))
                .collect(),
            data: vec![0xAA, 0xBB, 0xCC],
        }
    }

    #[test]
    fn account_order_changes_the_hash() {
        let ix = sample_instruction(3);
        let mut reordered = ix.clone();
        reordered.accounts.swap(0, 2);
        assert_ne!(
            InstructionDigest::of(&ix).accounts_hash,
            InstructionDigest::of(&reordered).accounts_hash
        );
    }

    #[test]
    fn flag_changes_change_the_hash() {
        let ix = sample_instruction(2);
        let mut flipped = ix.clone();
        flipped.accounts[1].is_writable = false;
        assert_ne!(
            InstructionDigest::of(&ix).accounts_hash,
            InstructionDigest::of(&flipped).accounts_hash
        );
    }

    #[test]
    fn zero_account_instruction_hashes_deterministically() {
        let ix = Instruction {
            program_id: Pubkey::new_from_array([1u8; 32]),
            accounts: vec![],
            data: vec![],
        };
        assert_eq!(
            InstructionDigest::of(&ix),
            InstructionDigest::of(&ix.clone())
        );
        // accounts hash degenerates to H(program_id)
        assert_eq!(
            InstructionDigest::of(&ix).accounts_hash,
            hash(ix.program_id.as_ref()).to_bytes()
        );
    }

    #[test]
    fn message_hash_round_trips_from_components() {
        let policy = sample_instruction(2);
        let cpi = sample_instruction(3);
        let action = AuthorizedAction::Execute {
            policy: &policy,
            cpi: &cpi,
        };
        let message = AuthorizationMessage::new(5, 1_700_000_000, &action);

        // recompute by hand from the component instructions
        let mut buf = Vec::new();
        buf.extend_from_slice(&5u64.to_le_bytes());
        buf.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        buf.extend_from_slice(&InstructionDigest::of(&policy).combined());
        buf.extend_from_slice(&InstructionDigest::of(&cpi).combined());
        assert_eq!(message.message_hash(), hash(&buf).to_bytes());
    }

    #[test]
    fn action_variants_never_collide() {
        let policy = sample_instruction(2);
        let cpi = sample_instruction(3);
        let execute = AuthorizationMessage::new(
            5,
            1_700_000_000,
            &AuthorizedAction::Execute {
                policy: &policy,
                cpi: &cpi,
            },
        );
        let call_policy = AuthorizationMessage::new(
            5,
            1_700_000_000,
            &AuthorizedAction::CallPolicy { policy: &policy },
        );
        assert_ne!(execute.message_hash(), call_policy.message_hash());
    }

    #[test]
    fn borsh_challenge_decodes_to_the_same_fields() {
        let policy = sample_instruction(2);
        let cpi = sample_instruction(3);
        let message = AuthorizationMessage::new(
            7,
            1_700_000_123,
            &AuthorizedAction::Execute {
                policy: &policy,
                cpi: &cpi,
            },
        );
        let bytes = message.challenge_bytes(ChallengeEncoding::BorshMessage);
        let record = ExecuteMessageRecord::try_from_slice(&bytes).unwrap();
        assert_eq!(record.nonce, 7);
        assert_eq!(record.current_timestamp, 1_700_000_123);
        assert_eq!(record.policy_data_hash, InstructionDigest::of(&policy).data_hash);
        assert_eq!(record.cpi_accounts_hash, InstructionDigest::of(&cpi).accounts_hash);
    }

    #[test]
    fn session_commitment_verifies_and_rejects() {
        let instructions = vec![sample_instruction(2), sample_instruction(1)];
        let wallet = Pubkey::new_from_array([3u8; 32]);
        let refund = Pubkey::new_from_array([4u8; 32]);
        let commitment = SessionCommitment::new(wallet, &instructions, 9, 2_000, refund);

        commitment.verify(&instructions, 9, 1_000).unwrap();

        assert!(matches!(
            commitment.verify(&instructions, 10, 1_000),
            Err(PasskeyEngineError::StaleNonce { .. })
        ));
        assert!(matches!(
            commitment.verify(&instructions, 9, 2_000),
            Err(PasskeyEngineError::ExpiredSession { .. })
        ));

        let mut tampered = instructions.clone();
        tampered[0].data.push(0xFF);
        assert!(matches!(
            commitment.verify(&tampered, 9, 1_000),
            Err(PasskeyEngineError::HashMismatch)
        ));
    }

    #[test]
    fn aggregate_data_hash_is_length_prefixed() {
        // ["ab", "c"] and ["a", "bc"] concatenate identically; the borsh
        // length prefixes must keep them distinct.
        let make = |datas: &[&[u8]]| -> Vec<Instruction> {
            datas
                .iter()
                .map(|d| Instruction {
                    program_id: Pubkey::new_from_array([1u8; 32]),
                    accounts: vec![],
                    data: d.to_vec(),
                })
                .collect()
        };
        let a = aggregate_instruction_data_hash(&make(&[b"ab", b"c"]));
        let b = aggregate_instruction_data_hash(&make(&[b"a", b"bc"]));
        assert_ne!(a, b);
    }
}
