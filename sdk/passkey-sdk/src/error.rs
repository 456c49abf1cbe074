use thiserror::Error;

/// Error types for the passkey authorization engine.
///
/// Every variant is permanent: the engine never retries internally and never
/// returns partial results. Callers decide whether the surrounding network
/// operation is worth retrying.
#[derive(Debug, Error)]
pub enum PasskeyEngineError {
    /// Malformed base64, hex, or UTF-8 input.
    #[error("decode error: {0}")]
    Decode(String),

    /// Signature is neither 64 bytes nor two resolvable 32-byte halves.
    #[error("invalid signature length: {0} bytes")]
    InvalidSignatureLength(usize),

    /// Signature components rejected by curve arithmetic (r or s zero or
    /// not a valid scalar).
    #[error("invalid secp256r1 signature")]
    InvalidSignature,

    /// Bad public key, signature, or message sizing for the verification
    /// precompile instruction.
    #[error("invalid verification input: {0}")]
    InvalidVerificationInput(&'static str),

    /// Recomputed commitment does not match the expected or stored value.
    #[error("hash mismatch: recomputed commitment differs from expected")]
    HashMismatch,

    /// Nonce no longer equals the wallet's last-known nonce.
    #[error("stale nonce: authorized {authorized}, wallet is at {current}")]
    StaleNonce { authorized: u64, current: u64 },

    /// Session commitment is past its expiry timestamp.
    #[error("session expired at {expires_at} (now {now})")]
    ExpiredSession { expires_at: i64, now: i64 },

    /// A remaining-accounts split index would not fit in a u16. The CPI
    /// instruction set is too large for one commit and must go through the
    /// session pathway.
    #[error("split index {0} exceeds u16 range")]
    SplitIndexOverflow(usize),

    /// Client data JSON is not valid UTF-8.
    #[error("client data JSON is not valid UTF-8")]
    ClientDataInvalidUtf8,

    /// Client data JSON could not be parsed or has the wrong shape.
    #[error("client data JSON parse error: {0}")]
    ClientDataJsonParse(String),

    /// Challenge field missing from client data JSON.
    #[error("challenge field missing from client data JSON")]
    ChallengeMissing,

    /// The user dismissed the passkey prompt.
    #[error("passkey prompt cancelled")]
    PromptCancelled,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, PasskeyEngineError>;
