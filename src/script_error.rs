use thiserror::Error;

use crate::{num, script, signature};

/// The kinds of script failure, each with a stable numeric code (see [`ScriptError::code`]) that
/// matches the `SCRIPT_ERR_*` numbering used by Bitcoin test vectors.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[repr(i32)]
pub enum ScriptError {
    #[error("Ok")]
    Ok = 0, // Unused (except in test vectors, to mark success)

    #[error("unknown error")]
    UnknownError,

    #[error("script evaluation failed")]
    EvalFalse,

    #[error("OP_RETURN encountered")]
    OpReturn,

    // Max sizes
    #[error("script size exceeded maximum")]
    ScriptSize,

    #[error("push size exceeded maximum")]
    PushSize,

    #[error("operation count exceeded maximum")]
    OpCount,

    #[error("stack size exceeded maximum")]
    StackSize,

    #[error("signature count exceeded maximum")]
    SigCount,

    #[error("public key count exceeded maximum")]
    PubKeyCount,

    // Failed verify operations
    #[error("verify operation failed")]
    Verify,

    #[error("equal verify operation failed")]
    EqualVerify,

    #[error("check multisig verify operation failed")]
    CheckMultisigVerify,

    #[error("check sig verify operation failed")]
    CheckSigVerify,

    #[error("num equal verify operation failed")]
    NumEqualVerify,

    // Logical/Format/Canonical errors
    #[error("bad opcode encountered")]
    BadOpcode,

    #[error("disabled opcode encountered")]
    DisabledOpcode,

    #[error("invalid stack operation encountered")]
    InvalidStackOperation,

    #[error("invalid altstack operation encountered")]
    InvalidAltstackOperation,

    #[error("unbalanced conditional encountered")]
    UnbalancedConditional,

    // OP_CHECKLOCKTIMEVERIFY
    #[error("negative lock time encountered")]
    NegativeLockTime,

    #[error("unsatisfied locktime condition")]
    UnsatisfiedLockTime,

    // BIP62
    #[error("signature hash type error")]
    SigHashType,

    #[error("signature DER encoding error")]
    SigDER,

    #[error("minimal data requirement not met")]
    MinimalData,

    #[error("signature push only requirement not met")]
    SigPushOnly,

    #[error("signature s value is too high")]
    SigHighS,

    #[error("signature null dummy error")]
    SigNullDummy,

    #[error("public key type error")]
    PubKeyType,

    #[error("clean stack requirement not met")]
    CleanStack,

    // softfork safeness
    #[error("discouraged upgradable NOPs encountered")]
    DiscourageUpgradableNOPs,

    /// Corresponds to the `scriptnum_error` exception in Bitcoin Core.
    #[error("script number error")]
    ScriptNum,
}

impl ScriptError {
    pub fn code(&self) -> i32 {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        *self as i32
    }
}

/// A failed script operation: what went wrong, plus anything more specific that was known at the
/// point of failure.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("{kind}{}", .detail.as_ref().map_or_else(String::new, |detail| format!(": {detail}")))]
pub struct Error {
    #[source]
    kind: ScriptError,
    detail: Option<String>,
}

impl Error {
    pub fn new(kind: ScriptError) -> Self {
        Error { kind, detail: None }
    }

    pub fn with_detail(kind: ScriptError, detail: impl Into<String>) -> Self {
        Error {
            kind,
            detail: Some(detail.into()),
        }
    }

    pub fn kind(&self) -> ScriptError {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl From<ScriptError> for Error {
    fn from(value: ScriptError) -> Self {
        Error::new(value)
    }
}

impl From<num::Error> for Error {
    fn from(value: num::Error) -> Self {
        Error::with_detail(ScriptError::ScriptNum, value.to_string())
    }
}

impl From<script::Error> for Error {
    fn from(value: script::Error) -> Self {
        match value {
            script::Error::Opcode(_) => Error::with_detail(ScriptError::BadOpcode, value.to_string()),
        }
    }
}

impl From<signature::Error> for Error {
    fn from(value: signature::Error) -> Self {
        let kind = match value {
            signature::Error::SigHashType(_) => ScriptError::SigHashType,
            signature::Error::SigDER(_) => ScriptError::SigDER,
            signature::Error::SigHighS => ScriptError::SigHighS,
            signature::Error::PubKeyType => ScriptError::PubKeyType,
        };
        Error::with_detail(kind, value.to_string())
    }
}
