//! Vectors that fail, each with the error it should produce.

use super::{Entry::*, TestVector, DEFAULT_FLAGS, EMPTY_FLAGS, NOP2};
use crate::{
    interpreter::Flags,
    op::*,
    script_error::ScriptError,
    test_vectors::{bad, disabled},
};

pub(crate) const TEST_VECTORS: &[TestVector] = &[
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[N(2), O(EQUALVERIFY), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EqualVerify),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[N(2), O(EQUAL)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        // negative zero is false
        script_sig: &[H("0180")],
        script_pubkey: &[],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        script_sig: &[H("4c00")],
        script_pubkey: &[O(_0), O(EQUAL)],
        flags: DEFAULT_FLAGS.union(Flags::MinimalData),
        result: Err(ScriptError::MinimalData),
    },
    TestVector {
        script_sig: &[H("4c0101")],
        script_pubkey: &[],
        flags: DEFAULT_FLAGS.union(Flags::MinimalData),
        result: Err(ScriptError::MinimalData),
    },
    TestVector {
        script_sig: &[H("020100")],
        script_pubkey: &[O(_1ADD), O(_2), O(NUMEQUAL)],
        flags: DEFAULT_FLAGS.union(Flags::MinimalData),
        result: Err(ScriptError::ScriptNum),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::CAT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[O(IF), O(disabled::MUL), O(ELSE), O(_1), O(ENDIF)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::SUBSTR), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::LEFT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::RIGHT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::INVERT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::AND), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::OR), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::XOR), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::DIV), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::MOD), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::LSHIFT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::RSHIFT), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::_2MUL), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(disabled::_2DIV), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::DisabledOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(bad::VERIF), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::BadOpcode),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(bad::VERNOTIF), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::BadOpcode),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(bad::VER)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::BadOpcode),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[H("ba")],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::BadOpcode),
    },
    TestVector {
        // truncated push
        script_sig: &[],
        script_pubkey: &[H("4c05ffff")],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::BadOpcode),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(IF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::UnbalancedConditional),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(ENDIF)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::UnbalancedConditional),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(ELSE)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::UnbalancedConditional),
    },
    TestVector {
        // conditionals don’t span scripts
        script_sig: &[N(1), O(IF)],
        script_pubkey: &[O(_1), O(ENDIF)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::UnbalancedConditional),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(IF), O(_1), O(ENDIF)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::UnbalancedConditional),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(RETURN)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::OpReturn),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(VERIFY), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::Verify),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_1), O(_2), O(NUMEQUALVERIFY), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::NumEqualVerify),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[N(5), O(PICK)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::InvalidStackOperation),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(FROMALTSTACK)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::InvalidAltstackOperation),
    },
    TestVector {
        // the alt stack doesn’t carry over between scripts
        script_sig: &[N(1), O(TOALTSTACK)],
        script_pubkey: &[O(FROMALTSTACK)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::InvalidAltstackOperation),
    },
    TestVector {
        script_sig: &[N(2147483647)],
        script_pubkey: &[O(DUP), O(ADD), O(_1ADD)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::ScriptNum),
    },
    TestVector {
        script_sig: &[H("050000008000")],
        script_pubkey: &[O(_1ADD)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::ScriptNum),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[H("61616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161")],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::OpCount),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[H("5151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151")],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::StackSize),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[H("4d09020101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101")],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::PushSize),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[N(0), N(0)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[N(0), N(0), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS.union(Flags::NullDummy),
        result: Err(ScriptError::SigNullDummy),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[N(0), N(0), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::InvalidStackOperation),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[N(1), N(0), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::SigCount),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[N(21), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::PubKeyCount),
    },
    TestVector {
        script_sig: &[N(0), N(0)],
        script_pubkey: &[N(1), H("0100"), N(1), O(CHECKMULTISIGVERIFY), O(_1)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::CheckMultisigVerify),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[H("0100"), O(CHECKSIGVERIFY), O(_1)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::CheckSigVerify),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[H("0100"), O(CHECKSIG)],
        flags: EMPTY_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[H("0100"), O(CHECKSIG), O(NOT)],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::PubKeyType),
    },
    TestVector {
        // a signature that isn’t DER
        script_sig: &[H("020101")],
        script_pubkey: &[H("0100"), O(CHECKSIG), O(NOT)],
        flags: EMPTY_FLAGS.union(Flags::DerSig),
        result: Err(ScriptError::SigDER),
    },
    TestVector {
        script_sig: &[N(1), O(DUP)],
        script_pubkey: &[O(EQUAL)],
        flags: DEFAULT_FLAGS.union(Flags::SigPushOnly),
        result: Err(ScriptError::SigPushOnly),
    },
    TestVector {
        script_sig: &[O(NOP), H("0151")],
        script_pubkey: &[
            O(HASH160),
            H("14da1745e9b549bd0bfa1a569971c77eba30cd5a4b"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::SigPushOnly),
    },
    TestVector {
        // P2SH of OP_0
        script_sig: &[H("0100")],
        script_pubkey: &[
            O(HASH160),
            H("149f7fd096d37ed2c0e3f7f0cfc924beef4ffceb68"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS,
        result: Err(ScriptError::EvalFalse),
    },
    TestVector {
        script_sig: &[N(1), H("0151")],
        script_pubkey: &[
            O(HASH160),
            H("14da1745e9b549bd0bfa1a569971c77eba30cd5a4b"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS.union(Flags::CleanStack),
        result: Err(ScriptError::CleanStack),
    },
    TestVector {
        script_sig: &[N(1), N(1)],
        script_pubkey: &[],
        flags: DEFAULT_FLAGS.union(Flags::CleanStack),
        result: Err(ScriptError::CleanStack),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[N(-1), O(CHECKLOCKTIMEVERIFY)],
        flags: DEFAULT_FLAGS.union(Flags::CHECKLOCKTIMEVERIFY),
        result: Err(ScriptError::NegativeLockTime),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[N(0), O(CHECKLOCKTIMEVERIFY)],
        flags: DEFAULT_FLAGS.union(Flags::CHECKLOCKTIMEVERIFY),
        result: Err(ScriptError::UnsatisfiedLockTime),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(CHECKLOCKTIMEVERIFY)],
        flags: DEFAULT_FLAGS.union(Flags::CHECKLOCKTIMEVERIFY),
        result: Err(ScriptError::InvalidStackOperation),
    },
    TestVector {
        // lock times can use five bytes
        script_sig: &[],
        script_pubkey: &[H("050000000001"), O(CHECKLOCKTIMEVERIFY)],
        flags: DEFAULT_FLAGS.union(Flags::CHECKLOCKTIMEVERIFY),
        result: Err(ScriptError::UnsatisfiedLockTime),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[H("06000000000001"), O(CHECKLOCKTIMEVERIFY)],
        flags: DEFAULT_FLAGS.union(Flags::CHECKLOCKTIMEVERIFY),
        result: Err(ScriptError::ScriptNum),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(NOP2)],
        flags: DEFAULT_FLAGS.union(Flags::DiscourageUpgradableNOPs),
        result: Err(ScriptError::DiscourageUpgradableNOPs),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(NOP10)],
        flags: DEFAULT_FLAGS.union(Flags::DiscourageUpgradableNOPs),
        result: Err(ScriptError::DiscourageUpgradableNOPs),
    },
];
