//! End-to-end direct authorization flows with a real secp256r1 signer.

use borsh::BorshDeserialize;
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::Signature;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use passkey_sdk::args::{sighash, CallPolicyArgs, ChangePolicyArgs, ExecuteArgs};
use passkey_sdk::constants::SECP256R1_PROGRAM_ID;
use passkey_sdk::secp256r1::check_verify_instruction;
use passkey_sdk::webauthn::signed_message;
use passkey_sdk::{
    assemble_call_policy, assemble_change_policy, assemble_execute, authorization_challenge,
    normalize_signature, AuthorizedAction, ChallengeEncoding, PasskeyEngineError,
};

mod common;
use common::{instruction_with_accounts, policy_program_id, wallet_context, SoftwarePasskey};

const TIMESTAMP: i64 = 1_700_000_000;

fn policy_instruction() -> Instruction {
    instruction_with_accounts(0x23, 2, sighash("global", "check_policy").to_vec())
}

fn transfer_instruction() -> Instruction {
    instruction_with_accounts(0x40, 3, vec![2, 0, 0, 0, 100])
}

#[test]
fn execute_plan_verifies_and_splits() {
    let passkey = SoftwarePasskey::generate();
    let ctx = wallet_context(&passkey, 1, 5);
    let policy = policy_instruction();
    let cpi = transfer_instruction();

    let challenge = authorization_challenge(
        &ctx,
        &AuthorizedAction::Execute {
            policy: &policy,
            cpi: &cpi,
        },
        TIMESTAMP,
    );
    assert_eq!(challenge.len(), 32);
    let assertion = passkey.assert(&challenge);

    let plan = assemble_execute(&ctx, &Pubkey::new_unique(), &assertion, &policy, &cpi, TIMESTAMP)
        .unwrap();

    assert_eq!(plan.instructions.len(), 2);
    assert_eq!(plan.split_index, vec![4]);

    // verify instruction leads and carries the normalized signature over
    // the exact authenticator payload
    let verify_ix = &plan.instructions[0];
    assert_eq!(verify_ix.program_id, SECP256R1_PROGRAM_ID);
    let normalized = normalize_signature(&assertion.signature).unwrap();
    let message = signed_message(&assertion.client_auth);
    check_verify_instruction(verify_ix, &assertion.public_key, &normalized, &message).unwrap();

    // the normalized signature still verifies under the generating key
    let signature = Signature::from_slice(&normalized).unwrap();
    passkey.verifying_key().verify(&message, &signature).unwrap();

    // wallet instruction: 9 named accounts + program slot + 3 cpi + 2 policy
    let wallet_ix = &plan.instructions[1];
    assert_eq!(wallet_ix.program_id, ctx.config.program_id);
    assert_eq!(wallet_ix.accounts.len(), 15);
    assert_eq!(wallet_ix.accounts[9].pubkey, cpi.program_id);
    assert_eq!(wallet_ix.accounts[13].pubkey, policy.accounts[0].pubkey);

    assert_eq!(&wallet_ix.data[..8], &sighash("global", "execute"));
    let args = ExecuteArgs::try_from_slice(&wallet_ix.data[8..]).unwrap();
    assert_eq!(args.split_index, 4);
    assert_eq!(args.timestamp, TIMESTAMP);
    assert_eq!(args.cpi_data, cpi.data);
    assert_eq!(args.policy_data, policy.data);
    assert_eq!(&args.passkey_public_key, passkey.public_key.as_bytes());
}

#[test]
fn assertion_over_wrong_challenge_is_rejected() {
    let passkey = SoftwarePasskey::generate();
    let ctx = wallet_context(&passkey, 1, 5);
    let policy = policy_instruction();
    let cpi = transfer_instruction();

    // signed for nonce 6 while the context still says 5
    let stale_ctx = wallet_context(&passkey, 1, 6);
    let challenge = authorization_challenge(
        &stale_ctx,
        &AuthorizedAction::Execute {
            policy: &policy,
            cpi: &cpi,
        },
        TIMESTAMP,
    );
    let assertion = passkey.assert(&challenge);

    assert!(matches!(
        assemble_execute(&ctx, &Pubkey::new_unique(), &assertion, &policy, &cpi, TIMESTAMP),
        Err(PasskeyEngineError::HashMismatch)
    ));
}

#[test]
fn borsh_challenge_encoding_round_trips() {
    let passkey = SoftwarePasskey::generate();
    let mut ctx = wallet_context(&passkey, 2, 1);
    ctx.config = ctx.config.with_challenge_encoding(ChallengeEncoding::BorshMessage);
    let policy = policy_instruction();
    let cpi = transfer_instruction();

    let challenge = authorization_challenge(
        &ctx,
        &AuthorizedAction::Execute {
            policy: &policy,
            cpi: &cpi,
        },
        TIMESTAMP,
    );
    // structured record, not a bare hash
    assert!(challenge.len() > 32);

    let assertion = passkey.assert(&challenge);
    assemble_execute(&ctx, &Pubkey::new_unique(), &assertion, &policy, &cpi, TIMESTAMP).unwrap();
}

#[test]
fn call_policy_plan_has_no_split() {
    let passkey = SoftwarePasskey::generate();
    let ctx = wallet_context(&passkey, 3, 8);
    let policy = policy_instruction();

    let challenge =
        authorization_challenge(&ctx, &AuthorizedAction::CallPolicy { policy: &policy }, TIMESTAMP);
    let assertion = passkey.assert(&challenge);

    let plan =
        assemble_call_policy(&ctx, &Pubkey::new_unique(), &assertion, &policy, TIMESTAMP).unwrap();

    assert_eq!(plan.instructions.len(), 2);
    assert!(plan.split_index.is_empty());

    let wallet_ix = &plan.instructions[1];
    assert_eq!(wallet_ix.accounts.len(), 9 + policy.accounts.len());
    assert_eq!(&wallet_ix.data[..8], &sighash("global", "call_policy"));
    let args = CallPolicyArgs::try_from_slice(&wallet_ix.data[8..]).unwrap();
    assert_eq!(args.policy_data, policy.data);
}

#[test]
fn change_policy_splits_at_destroy_boundary() {
    let passkey = SoftwarePasskey::generate();
    let ctx = wallet_context(&passkey, 4, 2);
    let destroy_old = instruction_with_accounts(0x23, 2, vec![9]);
    let init_new = instruction_with_accounts(0x60, 3, vec![7]);

    let challenge = authorization_challenge(
        &ctx,
        &AuthorizedAction::ChangePolicy {
            destroy_old: &destroy_old,
            init_new: &init_new,
        },
        TIMESTAMP,
    );
    let assertion = passkey.assert(&challenge);

    let plan = assemble_change_policy(
        &ctx,
        &Pubkey::new_unique(),
        &assertion,
        &destroy_old,
        &init_new,
        TIMESTAMP,
    )
    .unwrap();

    assert_eq!(plan.split_index, vec![2]);
    let wallet_ix = &plan.instructions[1];
    // 9 named + new policy program + 2 destroy + 3 init
    assert_eq!(wallet_ix.accounts.len(), 15);
    assert_eq!(wallet_ix.accounts[9].pubkey, init_new.program_id);
    assert_eq!(&wallet_ix.data[..8], &sighash("global", "change_policy"));
    let args = ChangePolicyArgs::try_from_slice(&wallet_ix.data[8..]).unwrap();
    assert_eq!(args.split_index, 2);
    assert_eq!(args.destroy_policy_data, destroy_old.data);
    assert_eq!(args.init_policy_data, init_new.data);
}

#[test]
fn policy_program_is_carried_in_named_accounts() {
    let passkey = SoftwarePasskey::generate();
    let ctx = wallet_context(&passkey, 5, 0);
    let policy = policy_instruction();
    let cpi = transfer_instruction();

    let challenge = authorization_challenge(
        &ctx,
        &AuthorizedAction::Execute {
            policy: &policy,
            cpi: &cpi,
        },
        TIMESTAMP,
    );
    let assertion = passkey.assert(&challenge);
    let plan = assemble_execute(&ctx, &Pubkey::new_unique(), &assertion, &policy, &cpi, TIMESTAMP)
        .unwrap();

    let wallet_ix = &plan.instructions[1];
    assert_eq!(wallet_ix.accounts[5].pubkey, policy_program_id());
    assert!(!wallet_ix.accounts[5].is_writable);
}
