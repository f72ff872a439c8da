//! Vectors that verify.

use super::{Entry::*, TestVector, DEFAULT_FLAGS, EMPTY_FLAGS, NOP2};
use crate::{interpreter::Flags, op::*, test_vectors::bad};

pub(crate) const TEST_VECTORS: &[TestVector] = &[
    TestVector {
        script_sig: &[N(1), N(2)],
        script_pubkey: &[O(_2), O(EQUALVERIFY), O(_1), O(EQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        // non-minimal empty push
        script_sig: &[H("4c00")],
        script_pubkey: &[O(_0), O(EQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[A("abc")],
        script_pubkey: &[
            O(RIPEMD160),
            H("148eb208f7e05d987a9b044a8e98c6b087f15a0bfc"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[A("")],
        script_pubkey: &[
            O(SHA256),
            H("20e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[O(IF), O(_0), O(ELSE), O(_1), O(ENDIF)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1), N(0)],
        script_pubkey: &[O(NOTIF), O(IF), O(_1), O(ELSE), O(_0), O(ENDIF), O(ENDIF)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[O(_0), O(IF), O(RETURN), O(ENDIF), O(_1)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        // only the conditional bad opcodes fail when skipped
        script_sig: &[],
        script_pubkey: &[
            O(_0),
            O(IF),
            O(bad::VER),
            O(bad::RESERVED),
            O(bad::RESERVED1),
            O(bad::RESERVED2),
            H("ba"),
            O(ENDIF),
            O(_1),
        ],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(2), N(3)],
        script_pubkey: &[O(ADD), N(5), O(NUMEQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(-1)],
        script_pubkey: &[O(ABS), O(_1), O(NUMEQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[N(0), N(1), O(WITHIN)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        // non-minimal operands are fine without MINIMALDATA
        script_sig: &[H("020100")],
        script_pubkey: &[O(_1ADD), O(_2), O(NUMEQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1), N(2), N(3)],
        script_pubkey: &[O(ROT), O(_1), O(EQUALVERIFY), O(_2DROP), O(DEPTH), O(_0), O(EQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(TOALTSTACK), O(FROMALTSTACK)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[H("616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161616161")],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[H("51515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151515151")],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[],
        script_pubkey: &[H("4d080201010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101010101")],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[O(NOP1), O(NOP2), O(NOP10)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        // 0-of-0 with a dummy
        script_sig: &[N(0)],
        script_pubkey: &[N(0), N(0), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1)],
        script_pubkey: &[N(0), N(0), O(CHECKMULTISIG)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(0)],
        script_pubkey: &[H("0100"), O(CHECKSIG), O(NOT)],
        flags: EMPTY_FLAGS,
        result: Ok(()),
    },
    TestVector {
        script_sig: &[N(1), O(DUP)],
        script_pubkey: &[O(EQUAL)],
        flags: DEFAULT_FLAGS,
        result: Ok(()),
    },
    TestVector {
        // P2SH of OP_TRUE
        script_sig: &[H("0151")],
        script_pubkey: &[
            O(HASH160),
            H("14da1745e9b549bd0bfa1a569971c77eba30cd5a4b"),
            O(EQUAL),
        ],
        flags: DEFAULT_FLAGS.union(Flags::CleanStack),
        result: Ok(()),
    },
    TestVector {
        // the redeem script isn’t run without P2SH
        script_sig: &[H("0100")],
        script_pubkey: &[
            O(HASH160),
            H("149f7fd096d37ed2c0e3f7f0cfc924beef4ffceb68"),
            O(EQUAL),
        ],
        flags: EMPTY_FLAGS,
        result: Ok(()),
    },
];
