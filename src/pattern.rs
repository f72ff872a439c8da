//! Reusable bits of scripts, to avoid writing hex strings.
//!
//! Bitcoin Script doesn’t have a real type system, but many of these are annotated with some
//! indication of the type. Being scripts with holes, the types are more complicated than those
//! listed with the opcodes in interpreter.rs. Here’s the decoder ring:
//!
//! * `Bool`, `PubKey`, `Signature`, and other capitalized WordsSmashedTogether – a individual stack
//!   value, with a particular shape
//! * `[]` – a comma-separated sequence of stack values
//! * `+` – a concatenation of stack sequences (useful with type variables that represent sequences)
//! * `*` – repetition `n*Signature` is a sequence of `n` Signature`s
//! * `->` – input on the left, output on the right
//! * `∪` – a union of stack sequences
//! * `💥` – terminates evaluation, if followed by `?`, it _may_ terminate evaluation
//! * `_` – any type, each occurrence can represent a different type

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::{
    interpreter, num,
    opcode::{Opcode, PushValue},
    op,
    script::Program,
};

/// `RIPEMD160(SHA256(data))`, the hash committed to by P2PKH and P2SH outputs.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

// abstractions

/// Holds the two branches of a conditional, without the condition.
///
/// type: `(thn ∪ els) + [Bool] -> (thn ∪ els)`
pub fn branch(thn: &[Opcode], els: &[Opcode]) -> Vec<Opcode> {
    [&[op::IF], thn, &[op::ELSE], els, &[op::ENDIF]].concat()
}

/// Performs a `sig_count`-of-`pks.len()` multisig. Returns `None` if there are more keys than
/// `CHECKMULTISIG` accepts or a key is too large to push.
///
/// if `verify`
///   type: `[Dummy] + sig_count*Signature -> 💥?`
///   type: `[Dummy] + sig_count*Signature -> [Bool]`
pub fn check_multisig(sig_count: u8, pks: &[&[u8]], verify: bool) -> Option<Program> {
    let key_count = u8::try_from(pks.len())
        .ok()
        .filter(|n| *n <= interpreter::MAX_PUBKEY_COUNT)?;
    let keys = pks
        .iter()
        .map(|pk| PushValue::element(pk).map(Opcode::PushValue))
        .collect::<Option<Vec<_>>>()?;
    Some(Program(
        [
            &[Opcode::PushValue(push_num(sig_count.into()))],
            &keys[..],
            &[
                Opcode::PushValue(push_num(key_count.into())),
                if verify {
                    op::CHECKMULTISIGVERIFY
                } else {
                    op::CHECKMULTISIG
                },
            ],
        ]
        .concat(),
    ))
}

/// Checks equality against some constant value.
///
/// if `verify`
///   type: `[_] -> 💥?`
///   type: `[_] -> [Bool]`
pub fn equals(expected: PushValue, verify: bool) -> [Opcode; 2] {
    [
        Opcode::PushValue(expected),
        if verify { op::EQUALVERIFY } else { op::EQUAL },
    ]
}

/// Checks a signature against the provided pubkey.
///
/// if `verify`
///   type: `[Signature] -> 💥?`
///   type: `[Signature] -> [Bool]`
pub fn check_sig(pubkey: &[u8], verify: bool) -> [Opcode; 2] {
    [
        Opcode::PushValue(PushValue::element(pubkey).expect("each pubkey is no more than 65 bytes")),
        if verify {
            op::CHECKSIGVERIFY
        } else {
            op::CHECKSIG
        },
    ]
}

/// “CLTV”
///
/// type: `[] -> [] + 💥?`
pub fn check_lock_time_verify(lt: u32) -> [Opcode; 3] {
    [
        Opcode::PushValue(push_num(lt.into())),
        op::CHECKLOCKTIMEVERIFY,
        op::DROP,
    ]
}

/// Produce a minimal `PushValue` that encodes the provided number.
pub fn push_num(n: i64) -> PushValue {
    PushValue::element(&num::serialize(n)).expect("all i64 can be encoded as `PushValue`")
}

/// Produce a minimal `PushValue` that encodes the provided script. This is particularly useful with
/// P2SH.
pub fn push_script(script: &Program) -> Option<PushValue> {
    PushValue::element(&script.to_bytes())
}

/// Creates a `PushValue` from a 20-byte value (basically, RipeMD160 and other hashes).
pub fn push_160b_hash(hash: &[u8; 20]) -> PushValue {
    PushValue::element(hash).expect("20 is a valid data size")
}

/// P2PK
///
/// type: `[Signature] -> [Bool]`
pub fn pay_to_pubkey(pubkey: &[u8]) -> Program {
    Program(check_sig(pubkey, false).to_vec())
}

/// P2PKH
///
/// type: `[Signature, PubKey] -> [Bool] ∪  💥`
pub fn pay_to_pubkey_hash(pk: &[u8]) -> Program {
    Program(
        [
            &[op::DUP, op::HASH160],
            &equals(push_160b_hash(&hash160(pk)), true)[..],
            &[op::CHECKSIG],
        ]
        .concat(),
    )
}

/// P2SH
///
/// type: `[_] -> [Bool]`
pub fn pay_to_script_hash(redeem_script: &Program) -> Program {
    Program(
        [
            &[op::HASH160],
            &equals(push_160b_hash(&hash160(&redeem_script.to_bytes())), false)[..],
        ]
        .concat(),
    )
}

/// Hash160 HTLC: the sender can reclaim after `lt`, the recipient can claim early by revealing the
/// preimage of `recipient_hash`.
///
/// type: `[Signature, Bool] ∪ [Signature, Preimage, Bool] -> [Bool] ∪  💥`
pub fn hash160_htlc(
    lt: u32,
    sender_pk: &[u8],
    recipient_hash: &[u8; 20],
    recipient_pk: &[u8],
) -> Program {
    Program(branch(
        &[
            &check_lock_time_verify(lt)[..],
            &check_sig(sender_pk, false)[..],
        ]
        .concat(),
        &[
            &[op::HASH160],
            &equals(push_160b_hash(recipient_hash), true)[..],
            &check_sig(recipient_pk, false)[..],
        ]
        .concat(),
    ))
}
