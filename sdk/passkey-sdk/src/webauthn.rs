//! WebAuthn client-data handling and the synchronous prompt boundary.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use solana_sdk::hash::hash;

use crate::codec::ct_eq;
use crate::error::{PasskeyEngineError, Result};
use crate::types::{ClientAuthData, PasskeyAssertion};

/// Reconstruct the exact byte string the authenticator signed:
/// `authenticator_data || SHA256(client_data_json)`.
pub fn signed_message(client_auth: &ClientAuthData) -> Vec<u8> {
    let client_hash = hash(&client_auth.client_data_json).to_bytes();
    let mut message =
        Vec::with_capacity(client_auth.authenticator_data.len() + client_hash.len());
    message.extend_from_slice(&client_auth.authenticator_data);
    message.extend_from_slice(&client_hash);
    message
}

/// Extract and decode the challenge from `clientDataJSON`.
///
/// Browsers occasionally wrap the challenge in stray quotes or slashes when
/// it travels through a deep link, so those are trimmed before decoding.
pub fn parse_challenge(client_data_json: &[u8]) -> Result<Vec<u8>> {
    let json_str = core::str::from_utf8(client_data_json)
        .map_err(|_| PasskeyEngineError::ClientDataInvalidUtf8)?;
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| PasskeyEngineError::ClientDataJsonParse(e.to_string()))?;

    if let Some(ty) = parsed.get("type").and_then(|t| t.as_str()) {
        if ty != "webauthn.get" {
            return Err(PasskeyEngineError::ClientDataJsonParse(format!(
                "unexpected ceremony type {ty:?}"
            )));
        }
    }

    let challenge = parsed["challenge"]
        .as_str()
        .ok_or(PasskeyEngineError::ChallengeMissing)?;
    let cleaned = challenge.trim_matches(|c| c == '"' || c == '\'' || c == '/' || c == ' ');
    URL_SAFE_NO_PAD
        .decode(cleaned)
        .map_err(|e| PasskeyEngineError::Decode(format!("challenge base64: {e}")))
}

/// Check that the client signed exactly the expected challenge bytes.
/// Constant-time comparison; any disagreement is a [`HashMismatch`].
///
/// [`HashMismatch`]: PasskeyEngineError::HashMismatch
pub fn verify_client_challenge(client_auth: &ClientAuthData, expected: &[u8]) -> Result<()> {
    let embedded = parse_challenge(&client_auth.client_data_json)?;
    if !ct_eq(&embedded, expected) {
        return Err(PasskeyEngineError::HashMismatch);
    }
    Ok(())
}

/// Encode challenge bytes the way they appear in `clientDataJSON`.
pub fn encode_challenge(challenge: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(challenge)
}

/// Synchronous boundary to the platform passkey prompt (browser redirect,
/// deep link, etc.). The engine hands the implementation a challenge and
/// gets back raw authenticator output; user dismissal is surfaced as
/// [`PasskeyEngineError::PromptCancelled`], not an unresolved future.
pub trait PasskeyPrompt {
    fn request(&self, challenge: &[u8]) -> Result<PasskeyAssertion>;
}
