//! Instruction assembly: orders the verification, policy, and CPI pieces
//! and computes the account-slice boundaries the wallet program uses to
//! partition its remaining accounts.
//!
//! Per authorization attempt the flow is `Built` (message + verify
//! instruction) then `Assembled` (this module's output); signature
//! verification and submission happen outside the engine. Terminal outcomes
//! are an [`InstructionPlan`] or a typed error; nothing is retried here.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use solana_sdk::sysvar;
use tracing::debug;

use crate::args::{
    instruction_data, CallPolicyArgs, ChangePolicyArgs, CreateSessionArgs, ExecuteArgs,
    ExecuteDeferredArgs,
};
use crate::error::{PasskeyEngineError, Result};
use crate::message::{AuthorizationMessage, AuthorizedAction, SessionCommitment};
use crate::pda;
use crate::secp256r1::build_verify_instruction;
use crate::signature::normalize_signature;
use crate::types::{PasskeyAssertion, WalletContext};
use crate::webauthn::{signed_message, verify_client_challenge};

/// Ordered, transaction-ready instruction list plus the split indices that
/// let the wallet program slice its flat remaining-accounts array back into
/// per-instruction groups. Built fresh per call; stateless.
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
    pub split_index: Vec<u16>,
}

/// The verify instruction always leads the plan.
const VERIFY_INSTRUCTION_INDEX: u8 = 0;

fn checked_split(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| PasskeyEngineError::SplitIndexOverflow(index))
}

/// Remaining accounts for a direct action: the CPI program-id slot, the CPI
/// accounts, then the policy accounts (policy always follows CPI). The
/// split index counts the CPI slice including the inlined program-id slot.
pub fn direct_remaining_accounts(
    cpi: &Instruction,
    policy: &Instruction,
) -> Result<(Vec<AccountMeta>, u16)> {
    let split = checked_split(1 + cpi.accounts.len())?;
    let mut metas = Vec::with_capacity(1 + cpi.accounts.len() + policy.accounts.len());
    metas.push(AccountMeta::new_readonly(cpi.program_id, false));
    metas.extend(cpi.accounts.iter().cloned());
    metas.extend(policy.accounts.iter().cloned());
    Ok((metas, split))
}

/// Flat remaining accounts for a deferred transaction: per instruction, the
/// program-id slot then its accounts. Returns the cumulative split index
/// after each instruction except the last.
pub fn deferred_remaining_accounts(
    instructions: &[Instruction],
) -> Result<(Vec<AccountMeta>, Vec<u16>)> {
    let mut metas = Vec::new();
    let mut splits = Vec::with_capacity(instructions.len().saturating_sub(1));
    for (i, instruction) in instructions.iter().enumerate() {
        metas.push(AccountMeta::new_readonly(instruction.program_id, false));
        metas.extend(instruction.accounts.iter().cloned());
        if i + 1 < instructions.len() {
            splits.push(checked_split(metas.len())?);
        }
    }
    Ok((metas, splits))
}

/// The challenge bytes the platform prompt should present for signing.
/// `timestamp` is the current block time read from the ledger; the nonce is
/// the wallet's last-known nonce carried in `ctx`.
pub fn authorization_challenge(
    ctx: &WalletContext,
    action: &AuthorizedAction<'_>,
    timestamp: i64,
) -> Vec<u8> {
    AuthorizationMessage::new(ctx.last_nonce, timestamp, action)
        .challenge_bytes(ctx.config.challenge_encoding)
}

/// Named accounts every passkey-authorized wallet instruction starts with.
fn wallet_accounts(ctx: &WalletContext, payer: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(ctx.smart_wallet, false),
        AccountMeta::new(ctx.wallet_config, false),
        AccountMeta::new_readonly(ctx.wallet_device, false),
        AccountMeta::new_readonly(ctx.policy_registry, false),
        AccountMeta::new_readonly(ctx.policy_program, false),
        AccountMeta::new_readonly(ctx.global_config, false),
        AccountMeta::new_readonly(sysvar::instructions::ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ]
}

/// Validate the assertion against the expected message and produce the
/// leading verify instruction plus the canonical 64-byte signature.
fn verified_parts(
    ctx: &WalletContext,
    assertion: &PasskeyAssertion,
    message: &AuthorizationMessage,
) -> Result<(Instruction, [u8; 64])> {
    let challenge = message.challenge_bytes(ctx.config.challenge_encoding);
    verify_client_challenge(&assertion.client_auth, &challenge)?;

    let signature = normalize_signature(&assertion.signature)?;
    let signed = signed_message(&assertion.client_auth);
    let verify_ix = build_verify_instruction(&assertion.public_key, &signature, &signed)?;
    Ok((verify_ix, signature))
}

/// Assemble a direct execute: `[verify, execute]` with the CPI and policy
/// accounts appended to the wallet instruction.
pub fn assemble_execute(
    ctx: &WalletContext,
    payer: &Pubkey,
    assertion: &PasskeyAssertion,
    policy: &Instruction,
    cpi: &Instruction,
    timestamp: i64,
) -> Result<InstructionPlan> {
    let action = AuthorizedAction::Execute { policy, cpi };
    let message = AuthorizationMessage::new(ctx.last_nonce, timestamp, &action);
    let (verify_ix, signature) = verified_parts(ctx, assertion, &message)?;

    let (remaining, split_index) = direct_remaining_accounts(cpi, policy)?;
    debug!(
        nonce = ctx.last_nonce,
        split_index,
        remaining = remaining.len(),
        "assembling execute plan"
    );

    let args = ExecuteArgs {
        passkey_public_key: *assertion.public_key.as_bytes(),
        signature: signature.to_vec(),
        client_data_json_raw: assertion.client_auth.client_data_json.clone(),
        authenticator_data_raw: assertion.client_auth.authenticator_data.clone(),
        verify_instruction_index: VERIFY_INSTRUCTION_INDEX,
        split_index,
        policy_data: policy.data.clone(),
        cpi_data: cpi.data.clone(),
        timestamp,
    };

    let mut accounts = wallet_accounts(ctx, payer);
    accounts.extend(remaining);
    let wallet_ix = Instruction {
        program_id: ctx.config.program_id,
        accounts,
        data: instruction_data("execute", &args),
    };

    Ok(InstructionPlan {
        instructions: vec![verify_ix, wallet_ix],
        split_index: vec![split_index],
    })
}

/// Assemble a policy-only call (device management and similar).
pub fn assemble_call_policy(
    ctx: &WalletContext,
    payer: &Pubkey,
    assertion: &PasskeyAssertion,
    policy: &Instruction,
    timestamp: i64,
) -> Result<InstructionPlan> {
    let action = AuthorizedAction::CallPolicy { policy };
    let message = AuthorizationMessage::new(ctx.last_nonce, timestamp, &action);
    let (verify_ix, signature) = verified_parts(ctx, assertion, &message)?;

    debug!(nonce = ctx.last_nonce, "assembling call-policy plan");

    let args = CallPolicyArgs {
        passkey_public_key: *assertion.public_key.as_bytes(),
        signature: signature.to_vec(),
        client_data_json_raw: assertion.client_auth.client_data_json.clone(),
        authenticator_data_raw: assertion.client_auth.authenticator_data.clone(),
        verify_instruction_index: VERIFY_INSTRUCTION_INDEX,
        policy_data: policy.data.clone(),
        timestamp,
    };

    let mut accounts = wallet_accounts(ctx, payer);
    accounts.extend(policy.accounts.iter().cloned());
    let wallet_ix = Instruction {
        program_id: ctx.config.program_id,
        accounts,
        data: instruction_data("call_policy", &args),
    };

    Ok(InstructionPlan {
        instructions: vec![verify_ix, wallet_ix],
        split_index: vec![],
    })
}

/// Assemble a policy-program change: destroy the old policy state, then
/// initialize the new program's. The split index separates the two account
/// groups (no inlined program-id slot; both programs are named accounts).
pub fn assemble_change_policy(
    ctx: &WalletContext,
    payer: &Pubkey,
    assertion: &PasskeyAssertion,
    destroy_old: &Instruction,
    init_new: &Instruction,
    timestamp: i64,
) -> Result<InstructionPlan> {
    let action = AuthorizedAction::ChangePolicy {
        destroy_old,
        init_new,
    };
    let message = AuthorizationMessage::new(ctx.last_nonce, timestamp, &action);
    let (verify_ix, signature) = verified_parts(ctx, assertion, &message)?;

    let split_index = checked_split(destroy_old.accounts.len())?;
    debug!(nonce = ctx.last_nonce, split_index, "assembling change-policy plan");

    let args = ChangePolicyArgs {
        passkey_public_key: *assertion.public_key.as_bytes(),
        signature: signature.to_vec(),
        client_data_json_raw: assertion.client_auth.client_data_json.clone(),
        authenticator_data_raw: assertion.client_auth.authenticator_data.clone(),
        verify_instruction_index: VERIFY_INSTRUCTION_INDEX,
        split_index,
        destroy_policy_data: destroy_old.data.clone(),
        init_policy_data: init_new.data.clone(),
        timestamp,
    };

    let mut accounts = wallet_accounts(ctx, payer);
    accounts.push(AccountMeta::new_readonly(init_new.program_id, false));
    accounts.extend(destroy_old.accounts.iter().cloned());
    accounts.extend(init_new.accounts.iter().cloned());
    let wallet_ix = Instruction {
        program_id: ctx.config.program_id,
        accounts,
        data: instruction_data("change_policy", &args),
    };

    Ok(InstructionPlan {
        instructions: vec![verify_ix, wallet_ix],
        split_index: vec![split_index],
    })
}

/// Assemble a deferred-session open. The session account is derived from
/// the wallet and the current nonce, so each nonce maps to exactly one
/// session. Returns the plan together with the commitment the caller needs
/// later to execute or close the session.
pub fn assemble_create_session(
    ctx: &WalletContext,
    payer: &Pubkey,
    assertion: &PasskeyAssertion,
    policy: &Instruction,
    cpi_instructions: &[Instruction],
    expires_at: i64,
    timestamp: i64,
) -> Result<(InstructionPlan, SessionCommitment)> {
    let action = AuthorizedAction::CreateSession {
        policy,
        cpi_instructions,
    };
    let message = AuthorizationMessage::new(ctx.last_nonce, timestamp, &action);
    let (verify_ix, signature) = verified_parts(ctx, assertion, &message)?;

    let commitment = SessionCommitment::new(
        ctx.smart_wallet,
        cpi_instructions,
        ctx.last_nonce,
        expires_at,
        *payer,
    );
    let session = pda::derive_transaction_session(
        &ctx.config.program_id,
        &ctx.smart_wallet,
        ctx.last_nonce,
    );
    debug!(
        nonce = ctx.last_nonce,
        session = %session.address,
        instructions = cpi_instructions.len(),
        "assembling create-session plan"
    );

    let args = CreateSessionArgs {
        passkey_public_key: *assertion.public_key.as_bytes(),
        signature: signature.to_vec(),
        client_data_json_raw: assertion.client_auth.client_data_json.clone(),
        authenticator_data_raw: assertion.client_auth.authenticator_data.clone(),
        verify_instruction_index: VERIFY_INSTRUCTION_INDEX,
        policy_data: policy.data.clone(),
        cpi_hash: commitment.combined_hash(),
        expires_at,
        timestamp,
    };

    let mut accounts = wallet_accounts(ctx, payer);
    accounts.push(AccountMeta::new(session.address, false));
    accounts.extend(policy.accounts.iter().cloned());
    let wallet_ix = Instruction {
        program_id: ctx.config.program_id,
        accounts,
        data: instruction_data("create_transaction_session", &args),
    };

    Ok((
        InstructionPlan {
            instructions: vec![verify_ix, wallet_ix],
            split_index: vec![],
        },
        commitment,
    ))
}

/// Assemble the deferred execution of a previously opened session. No
/// passkey material is needed; the commitment already binds everything.
/// `wallet_nonce` and `now` are read from the ledger immediately before
/// assembly so stale sessions fail here instead of on-chain.
pub fn assemble_execute_deferred(
    ctx: &WalletContext,
    payer: &Pubkey,
    commitment: &SessionCommitment,
    instructions: &[Instruction],
    wallet_nonce: u64,
    now: i64,
) -> Result<InstructionPlan> {
    commitment.verify(instructions, wallet_nonce, now)?;

    let session = pda::derive_transaction_session(
        &ctx.config.program_id,
        &ctx.smart_wallet,
        commitment.authorized_nonce,
    );
    let (remaining, split_index) = deferred_remaining_accounts(instructions)?;
    debug!(
        session = %session.address,
        instructions = instructions.len(),
        "assembling deferred execution plan"
    );

    let args = ExecuteDeferredArgs {
        instruction_data_list: instructions.iter().map(|ix| ix.data.clone()).collect(),
        split_index: split_index.clone(),
    };

    let mut accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(ctx.smart_wallet, false),
        AccountMeta::new(ctx.wallet_config, false),
        AccountMeta::new(session.address, false),
        AccountMeta::new(commitment.rent_refund_address, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    accounts.extend(remaining);
    let wallet_ix = Instruction {
        program_id: ctx.config.program_id,
        accounts,
        data: instruction_data("execute_deferred_transaction", &args),
    };

    Ok(InstructionPlan {
        instructions: vec![wallet_ix],
        split_index,
    })
}
