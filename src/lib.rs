//! Bitcoin script parsing and interpretation.
//!
//! Scripts are parsed into [`Program`]s, and a [`ScriptInterpreter`] verifies a signature script
//! against an output script under a set of [`Flags`]. Signatures and lock times are checked through
//! a caller-supplied [`interpreter::SignatureChecker`], so this crate never needs to see the
//! spending transaction. P2SH and `OP_CHECKLOCKTIMEVERIFY` are available both as flags and as
//! [`extension`]s.

#![doc(html_root_url = "https://docs.rs/btc_script/0.1.0")]

#[macro_use]
extern crate enum_primitive;

pub mod extension;
mod external;
pub mod interpreter;
pub mod num;
pub mod op;
pub mod opcode;
pub mod pattern;
pub mod script;
pub mod script_error;
pub mod signature;

#[cfg(any(test, feature = "test-dependencies"))]
pub mod test_vectors;

pub use extension::{CltvExtension, Extension, Flow, P2shExtension};
#[cfg(feature = "signature-validation")]
pub use interpreter::CallbackSignatureChecker;
pub use interpreter::{Flags, Limits, NullSignatureChecker, ScriptInterpreter, SignatureChecker};
pub use num::ScriptNum;
pub use opcode::Opcode;
pub use script::Program;
pub use script_error::{Error, ScriptError};

/// Utilities useful for tests in other modules and crates.
#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use hex::FromHex;
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    use crate::{
        interpreter::{Flags, SignatureChecker},
        opcode::{Opcode, PushValue},
        pattern::*,
        script::{self, Program},
        script_error::{Error, ScriptError},
        test_vectors::TestVector,
        ScriptInterpreter,
    };

    /// Ensures that flags represent a supported state. `CleanStack` is only meaningful alongside
    /// `P2SH`, and verification rejects it otherwise.
    pub fn repair_flags(flags: Flags) -> Flags {
        if flags.contains(Flags::CleanStack) {
            flags | Flags::P2SH
        } else {
            flags
        }
    }

    /// A `usize` one larger than the longest allowed script, for testing bounds.
    pub const OVERFLOW_SCRIPT_SIZE: usize = script::MAX_SCRIPT_SIZE + 1;

    /// The lock time the static test case is spent with.
    pub const LOCK_TIME: i64 = 2410374;

    lazy_static::lazy_static! {
        /// The P2SH redeem script used for the static test case.
        pub static ref REDEEM_SCRIPT: Program = check_multisig(
            2,
            &[
                &<[u8; 0x21]>::from_hex("03b2cc71d23eb30020a4893982a1e2d352da0d20ee657fa02901c432758909ed8f").expect("valid key"),
                &<[u8; 0x21]>::from_hex("029d1e9a9354c0d2aee9ffd0f0cea6c39bbf98c4066cf143115ba2279d0ba7dabe").expect("valid key"),
                &<[u8; 0x21]>::from_hex("03e32096b63fd57f3308149d238dcbb24d8d28aad95c0e4e74e3e5e6a11b61bcc4").expect("valid key")
            ],
            false).expect("all keys are valid and there’s not more than 20 of them");
        /// The scriptPubkey used for the static test case.
        pub static ref SCRIPT_PUBKEY: Program = pay_to_script_hash(&REDEEM_SCRIPT);
        /// The scriptSig used for the static test case.
        pub static ref SCRIPT_SIG: Program = Program(vec![
            Opcode::PushValue(push_num(0)),
            Opcode::PushValue(PushValue::element(&<[u8; 0x48]>::from_hex("3045022100d2ab3e6258fe244fa442cfb38f6cef9ac9a18c54e70b2f508e83fa87e20d040502200eead947521de943831d07a350e45af8e36c2166984a8636f0a8811ff03ed09401").expect("valid sig")).expect("fits into a PushValue")),
            Opcode::PushValue(PushValue::element(&<[u8; 0x47]>::from_hex("3044022013e15d865010c257eef133064ef69a780b4bc7ebe6eda367504e806614f940c3022062fdbc8c2d049f91db2042d6c9771de6f1ef0b3b1fea76c1ab5542e44ed29ed801").expect("valid sig")).expect("fits into a PushValue")),
            Opcode::PushValue(push_script(&REDEEM_SCRIPT).expect("fits into a PushValue")),
        ]);

        /// A fixed key for tests that need to produce their own signatures.
        pub static ref SECRET_KEY: SecretKey =
            SecretKey::from_slice(&[0x11; 32]).expect("in range for secp256k1");
        /// The compressed encoding of the public half of [`struct@SECRET_KEY`].
        pub static ref PUBLIC_KEY: [u8; 33] =
            PublicKey::from_secret_key(&Secp256k1::signing_only(), &SECRET_KEY).serialize();
    }

    /// The correct sighash for the static test case.
    pub fn sighash(_script_code: &script::Code, _hash_type: u8) -> Option<[u8; 32]> {
        <[u8; 32]>::from_hex("e8c7bdac77f6bb1f3aba2eaa1fada551a9c8b3b5ecd1ef86e6e58a5f1aab952c")
            .ok()
    }

    /// An incorrect sighash for the static test case – for checking failure cases.
    pub fn invalid_sighash(_script_code: &script::Code, _hash_type: u8) -> Option<[u8; 32]> {
        <[u8; 32]>::from_hex("08c7bdac77f6bb1f3aba2eaa1fada551a9c8b3b5ecd1ef86e6e58a5f1aab952c")
            .ok()
    }

    /// A callback that returns no sighash at all – another failure case.
    pub fn missing_sighash(_script_code: &script::Code, _hash_type: u8) -> Option<[u8; 32]> {
        None
    }

    /// Signs `hash` with [`struct@SECRET_KEY`], producing the stack form of a signature: DER with
    /// the hash type byte appended.
    pub fn sign(hash: &[u8; 32], hash_type: u8) -> Vec<u8> {
        sign_with(&SECRET_KEY, hash, hash_type)
    }

    /// Like [`sign`], but with any key.
    pub fn sign_with(key: &SecretKey, hash: &[u8; 32], hash_type: u8) -> Vec<u8> {
        let sig = Secp256k1::signing_only().sign_ecdsa(&Message::from_digest(*hash), key);
        [&sig.serialize_der()[..], &[hash_type]].concat()
    }

    /// A P2PKH spend of [`struct@PUBLIC_KEY`], signed over `hash`.
    pub fn p2pkh_sig(hash: &[u8; 32], hash_type: u8) -> Program {
        Program(vec![
            Opcode::PushValue(PushValue::element(&sign(hash, hash_type)).expect("signatures are short")),
            Opcode::PushValue(PushValue::element(&PUBLIC_KEY[..]).expect("keys are short")),
        ])
    }

    /// Verify raw scripts, reducing any failure to its kind, which is all a test vector records.
    pub fn verify_bytes(
        checker: &dyn SignatureChecker,
        sig: &[u8],
        pub_key: &[u8],
        flags: Flags,
    ) -> Result<(), ScriptError> {
        let sig = Program::parse(sig).map_err(|e| Error::from(e).kind())?;
        let pub_key = Program::parse(pub_key).map_err(|e| Error::from(e).kind())?;
        ScriptInterpreter::new(flags, checker)
            .verify(&sig, &pub_key)
            .map_err(|e| e.kind())
    }

    /// Run a single test case, panicking if it doesn’t produce the expected result.
    pub(crate) fn run_test_vector(tv: &TestVector, checker: &dyn SignatureChecker) {
        if let Err(actual) = tv.run(&|sig, pub_key, flags| verify_bytes(checker, sig, pub_key, flags))
        {
            panic!(
                "{:?} didn’t match the result in

    {:?}
",
                actual, tv
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use hex::FromHex;

    use super::{
        op, pattern,
        test_vectors::test_vectors,
        testing::{run_test_vector, OVERFLOW_SCRIPT_SIZE, REDEEM_SCRIPT, SCRIPT_PUBKEY, SCRIPT_SIG},
        Flags, NullSignatureChecker, P2shExtension, Program, ScriptError, ScriptInterpreter,
    };
    #[cfg(feature = "signature-validation")]
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    #[cfg(feature = "signature-validation")]
    use super::{
        opcode::{Opcode, PushValue},
        signature::HashType,
        testing::{
            invalid_sighash, missing_sighash, p2pkh_sig, sighash, sign, sign_with, LOCK_TIME,
            PUBLIC_KEY,
        },
        CallbackSignatureChecker,
    };

    const FLAGS: Flags = Flags::P2SH.union(Flags::CHECKLOCKTIMEVERIFY);

    /// Every encoding rule, plus everything that’s consensus for P2SH spends.
    #[cfg(feature = "signature-validation")]
    const STANDARD_FLAGS: Flags = Flags::P2SH
        .union(Flags::StrictEnc)
        .union(Flags::DerSig)
        .union(Flags::LowS)
        .union(Flags::NullDummy)
        .union(Flags::SigPushOnly)
        .union(Flags::MinimalData)
        .union(Flags::DiscourageUpgradableNOPs)
        .union(Flags::CleanStack)
        .union(Flags::CHECKLOCKTIMEVERIFY);

    #[cfg(feature = "signature-validation")]
    #[test]
    fn it_works() {
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: LOCK_TIME,
            is_final: true,
        };
        let ret = ScriptInterpreter::new(FLAGS, &checker).verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret, Ok(()));
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn it_works_through_the_p2sh_extension() {
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: LOCK_TIME,
            is_final: true,
        };
        let ret = ScriptInterpreter::new(Flags::CHECKLOCKTIMEVERIFY, &checker)
            .with_extension(Box::new(P2shExtension::new()))
            .verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret, Ok(()));
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn it_fails_on_invalid_sighash() {
        let checker = CallbackSignatureChecker {
            sighash: &invalid_sighash,
            lock_time: LOCK_TIME,
            is_final: true,
        };
        let ret = ScriptInterpreter::new(FLAGS, &checker).verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret.map_err(|e| e.kind()), Err(ScriptError::EvalFalse));
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn it_fails_on_missing_sighash() {
        let checker = CallbackSignatureChecker {
            sighash: &missing_sighash,
            lock_time: LOCK_TIME,
            is_final: true,
        };
        let ret = ScriptInterpreter::new(FLAGS, &checker).verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret.map_err(|e| e.kind()), Err(ScriptError::EvalFalse));
    }

    #[test]
    fn it_fails_with_null_checker() {
        let ret = ScriptInterpreter::new(FLAGS, &NullSignatureChecker())
            .verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret.map_err(|e| e.kind()), Err(ScriptError::EvalFalse));
    }

    #[test]
    fn without_p2sh_only_the_hash_is_checked() {
        let ret = ScriptInterpreter::new(Flags::empty(), &NullSignatureChecker())
            .verify(&SCRIPT_SIG, &SCRIPT_PUBKEY);
        assert_eq!(ret, Ok(()));
    }

    #[test]
    fn fixture_shapes() {
        assert!(SCRIPT_PUBKEY.is_pay_to_script_hash());
        assert!(SCRIPT_SIG.is_push_only());
        assert_eq!(REDEEM_SCRIPT.sig_op_count(true), 3);
        assert_eq!(REDEEM_SCRIPT.sig_op_count(false), 20);
        assert_eq!(SCRIPT_PUBKEY.sig_op_count(true), 0);
        assert_eq!(
            SCRIPT_PUBKEY.to_string(),
            format!(
                "OP_HASH160 {} OP_EQUAL",
                hex::encode(pattern::hash160(&REDEEM_SCRIPT.to_bytes()))
            )
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn p2pkh_round_trip() {
        let hash = sighash(&Default::default(), HashType::ALL).expect("fixed hash");
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: 0,
            is_final: false,
        };
        let interp = ScriptInterpreter::new(STANDARD_FLAGS, &checker);
        let pub_key = pattern::pay_to_pubkey_hash(&PUBLIC_KEY[..]);

        assert_eq!(interp.verify(&p2pkh_sig(&hash, HashType::ALL), &pub_key), Ok(()));

        // signed over something else
        assert_eq!(
            interp
                .verify(&p2pkh_sig(&[0; 32], HashType::ALL), &pub_key)
                .map_err(|e| e.kind()),
            Err(ScriptError::EvalFalse)
        );

        // one byte of the key hash flipped
        let mut tampered = pub_key.clone();
        if let Opcode::PushValue(pv) = &mut tampered.0[2] {
            *pv = pattern::push_160b_hash(&{
                let mut hash = pattern::hash160(&PUBLIC_KEY[..]);
                hash[0] ^= 1;
                hash
            });
        }
        assert_eq!(
            interp
                .verify(&p2pkh_sig(&hash, HashType::ALL), &tampered)
                .map_err(|e| e.kind()),
            Err(ScriptError::EqualVerify)
        );

        // undefined hash type
        assert_eq!(
            interp
                .verify(&p2pkh_sig(&hash, 0x05), &pub_key)
                .map_err(|e| e.kind()),
            Err(ScriptError::SigHashType)
        );
        assert_eq!(
            ScriptInterpreter::new(Flags::P2SH, &checker)
                .verify(&p2pkh_sig(&hash, 0x05), &pub_key),
            Ok(())
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn p2pk_inside_p2sh() {
        let hash = sighash(&Default::default(), HashType::ALL).expect("fixed hash");
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: 0,
            is_final: false,
        };
        let redeem = pattern::pay_to_pubkey(&PUBLIC_KEY[..]);
        let sig = Program(vec![
            Opcode::PushValue(
                PushValue::element(&sign(&hash, HashType::ALL)).expect("short"),
            ),
            Opcode::PushValue(pattern::push_script(&redeem).expect("short")),
        ]);
        let pub_key = pattern::pay_to_script_hash(&redeem);

        assert_eq!(
            ScriptInterpreter::new(STANDARD_FLAGS, &checker).verify(&sig, &pub_key),
            Ok(())
        );

        // an extra element is only caught by CLEANSTACK
        let padded = Program([&[op::_1], &sig.0[..]].concat());
        assert_eq!(
            ScriptInterpreter::new(STANDARD_FLAGS, &checker)
                .verify(&padded, &pub_key)
                .map_err(|e| e.kind()),
            Err(ScriptError::CleanStack)
        );
        assert_eq!(
            ScriptInterpreter::new(Flags::P2SH, &checker).verify(&padded, &pub_key),
            Ok(())
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn lock_time_in_the_redeem_script() {
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: LOCK_TIME,
            is_final: false,
        };
        let hash = sighash(&Default::default(), HashType::ALL).expect("fixed hash");
        let redeem = Program(
            [
                &pattern::check_lock_time_verify(2_000_000)[..],
                &pattern::pay_to_pubkey(&PUBLIC_KEY[..]).0[..],
            ]
            .concat(),
        );
        let sig = |redeem: &Program| {
            Program(vec![
                Opcode::PushValue(
                    PushValue::element(&sign(&hash, HashType::ALL)).expect("short"),
                ),
                Opcode::PushValue(pattern::push_script(redeem).expect("short")),
            ])
        };

        assert_eq!(
            ScriptInterpreter::new(STANDARD_FLAGS, &checker)
                .verify(&sig(&redeem), &pattern::pay_to_script_hash(&redeem)),
            Ok(())
        );

        let too_late = Program(
            [
                &pattern::check_lock_time_verify(3_000_000)[..],
                &pattern::pay_to_pubkey(&PUBLIC_KEY[..]).0[..],
            ]
            .concat(),
        );
        assert_eq!(
            ScriptInterpreter::new(STANDARD_FLAGS, &checker)
                .verify(&sig(&too_late), &pattern::pay_to_script_hash(&too_late))
                .map_err(|e| e.kind()),
            Err(ScriptError::UnsatisfiedLockTime)
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn multisig_signatures_follow_key_order() {
        let hash = sighash(&Default::default(), HashType::ALL).expect("fixed hash");
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: 0,
            is_final: false,
        };
        let secp = Secp256k1::signing_only();
        let keys = [0x11, 0x22, 0x33]
            .map(|b| SecretKey::from_slice(&[b; 32]).expect("in range for secp256k1"));
        let pks: Vec<[u8; 33]> = keys
            .iter()
            .map(|k| PublicKey::from_secret_key(&secp, k).serialize())
            .collect();
        let pub_key = pattern::check_multisig(2, &[&pks[0], &pks[1], &pks[2]], false)
            .expect("three keys");
        let spend = |signers: &[usize]| {
            Program(
                [
                    &[op::_0][..],
                    &signers
                        .iter()
                        .map(|i| {
                            Opcode::PushValue(
                                PushValue::element(&sign_with(&keys[*i], &hash, HashType::ALL))
                                    .expect("short"),
                            )
                        })
                        .collect::<Vec<_>>()[..],
                ]
                .concat(),
            )
        };
        let interp = ScriptInterpreter::new(STANDARD_FLAGS, &checker);

        assert_eq!(interp.verify(&spend(&[0, 1]), &pub_key), Ok(()));
        assert_eq!(interp.verify(&spend(&[0, 2]), &pub_key), Ok(()));
        assert_eq!(interp.verify(&spend(&[1, 2]), &pub_key), Ok(()));
        assert_eq!(
            interp.verify(&spend(&[2, 0]), &pub_key).map_err(|e| e.kind()),
            Err(ScriptError::EvalFalse)
        );
        assert_eq!(
            interp.verify(&spend(&[1, 1]), &pub_key).map_err(|e| e.kind()),
            Err(ScriptError::EvalFalse)
        );
    }

    #[cfg(feature = "signature-validation")]
    #[test]
    fn htlc_paths() {
        let hash = sighash(&Default::default(), HashType::ALL).expect("fixed hash");
        let checker = CallbackSignatureChecker {
            sighash: &sighash,
            lock_time: LOCK_TIME,
            is_final: false,
        };
        let interp = ScriptInterpreter::new(STANDARD_FLAGS, &checker);
        let preimage: &[u8] = b"secret";
        let other_key = [0x02; 33];
        let push = |data: &[u8]| Opcode::PushValue(PushValue::element(data).expect("short"));

        // recipient reveals the preimage
        let htlc = pattern::hash160_htlc(
            2_000_000,
            &other_key,
            &pattern::hash160(preimage),
            &PUBLIC_KEY[..],
        );
        let claim = Program(vec![push(&sign(&hash, HashType::ALL)), push(preimage), op::_0]);
        assert_eq!(interp.verify(&claim, &htlc), Ok(()));

        let wrong = Program(vec![push(&sign(&hash, HashType::ALL)), push(&b"guess"[..]), op::_0]);
        assert_eq!(
            interp.verify(&wrong, &htlc).map_err(|e| e.kind()),
            Err(ScriptError::EqualVerify)
        );

        // sender reclaims once the lock time has passed
        let refund = |lt| {
            pattern::hash160_htlc(lt, &PUBLIC_KEY[..], &pattern::hash160(preimage), &other_key)
        };
        let reclaim = Program(vec![push(&sign(&hash, HashType::ALL)), op::_1]);
        assert_eq!(interp.verify(&reclaim, &refund(2_000_000)), Ok(()));
        assert_eq!(
            interp
                .verify(&reclaim, &refund(3_000_000))
                .map_err(|e| e.kind()),
            Err(ScriptError::UnsatisfiedLockTime)
        );
    }

    #[test]
    fn oversized_scripts_fail_before_evaluation() {
        let pub_key = Program(vec![op::NOP; OVERFLOW_SCRIPT_SIZE]);
        assert_eq!(
            ScriptInterpreter::new(Flags::P2SH, &NullSignatureChecker())
                .verify(&Program(vec![op::_1]), &pub_key)
                .map_err(|e| e.kind()),
            Err(ScriptError::ScriptSize)
        );
    }

    #[test]
    fn known_errors_have_known_codes() {
        let bytes = <Vec<u8>>::from_hex("51").expect("valid hex");
        let err = ScriptInterpreter::new(Flags::empty(), &NullSignatureChecker())
            .verify(
                &Program::parse(&bytes).expect("parses"),
                &Program(vec![op::RETURN]),
            )
            .expect_err("OP_RETURN fails");
        assert_eq!(err.kind(), ScriptError::OpReturn);
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_vectors_pass() {
        for tv in test_vectors() {
            run_test_vector(tv, &NullSignatureChecker());
        }
    }
}
