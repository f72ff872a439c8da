//! Script pairs with the result verification should produce, written in a shorthand that can
//! express malformed scripts.

pub(crate) mod invalid;
pub(crate) mod valid;

use hex::{FromHex, FromHexError};

use crate::{interpreter::Flags, op, opcode::PushValue, pattern, script_error::ScriptError};

/// A shorthand syntax for writing possibly-incorrect scripts.
#[derive(Debug)]
pub(crate) enum Entry {
    /// An Opcode
    O(crate::opcode::Opcode),
    /// A byte sequence encoded as a hex string, included verbatim
    H(&'static str),
    /// A minimal push of an ASCII string
    A(&'static str),
    /// A minimal push of a number
    N(i64),
}

impl Entry {
    pub(crate) fn serialize(&self) -> Result<Vec<u8>, FromHexError> {
        match self {
            Entry::O(opcode) => Ok(opcode.into()),
            Entry::H(bytes) => <Vec<u8>>::from_hex(*bytes),
            Entry::A(string) => Ok(PushValue::from_slice(string.as_bytes())
                .map_or_else(Vec::new, |pv| (&pv).into())),
            Entry::N(num) => Ok((&pattern::push_num(*num)).into()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TestVector {
    pub(crate) script_sig: &'static [Entry],
    pub(crate) script_pubkey: &'static [Entry],
    pub(crate) flags: Flags,
    pub(crate) result: Result<(), ScriptError>,
}

impl TestVector {
    /// A successful run is uninteresting, but a failure returns the actual `Result` in `Err`.
    pub(crate) fn run(
        &self,
        f: &dyn Fn(&[u8], &[u8], Flags) -> Result<(), ScriptError>,
    ) -> Result<(), Result<(), ScriptError>> {
        match (
            Self::serialize_script(self.script_sig),
            Self::serialize_script(self.script_pubkey),
        ) {
            (Ok(sig), Ok(pubkey)) => {
                let res = f(&sig, &pubkey, self.flags);
                if res == self.result {
                    Ok(())
                } else {
                    Err(res)
                }
            }
            (s, p) => panic!("{:?} has a bad hex value: {:?}", self, s.and(p)),
        }
    }

    fn serialize_script(entries: &[Entry]) -> Result<Vec<u8>, FromHexError> {
        entries
            .iter()
            .map(Entry::serialize)
            .collect::<Result<Vec<Vec<u8>>, FromHexError>>()
            .map(|vs| vs.concat())
    }
}

/// Every vector, valid ones first.
pub(crate) fn test_vectors() -> impl Iterator<Item = &'static TestVector> {
    valid::TEST_VECTORS.iter().chain(invalid::TEST_VECTORS)
}

/// `OP_CHECKLOCKTIMEVERIFY` as it behaves without its flag.
pub(crate) const NOP2: crate::opcode::Opcode = op::CHECKLOCKTIMEVERIFY;

pub(crate) const EMPTY_FLAGS: Flags = Flags::empty();

/// What most of the vectors run with.
pub(crate) const DEFAULT_FLAGS: Flags = Flags::P2SH.union(Flags::StrictEnc);

pub(crate) mod bad {
    use crate::opcode::{
        Bad::*,
        Opcode::{self, *},
    };

    pub const RESERVED: Opcode = Bad(OP_RESERVED);
    pub const VER: Opcode = Bad(OP_VER);
    pub const VERIF: Opcode = Bad(OP_VERIF);
    pub const VERNOTIF: Opcode = Bad(OP_VERNOTIF);
    pub const RESERVED1: Opcode = Bad(OP_RESERVED1);
    pub const RESERVED2: Opcode = Bad(OP_RESERVED2);
}

pub(crate) mod disabled {
    use crate::opcode::{
        Disabled::*,
        Opcode::{self, *},
    };

    pub const CAT: Opcode = Disabled(OP_CAT);
    pub const SUBSTR: Opcode = Disabled(OP_SUBSTR);
    pub const LEFT: Opcode = Disabled(OP_LEFT);
    pub const RIGHT: Opcode = Disabled(OP_RIGHT);
    pub const INVERT: Opcode = Disabled(OP_INVERT);
    pub const AND: Opcode = Disabled(OP_AND);
    pub const OR: Opcode = Disabled(OP_OR);
    pub const XOR: Opcode = Disabled(OP_XOR);
    pub const _2MUL: Opcode = Disabled(OP_2MUL);
    pub const _2DIV: Opcode = Disabled(OP_2DIV);
    pub const MUL: Opcode = Disabled(OP_MUL);
    pub const DIV: Opcode = Disabled(OP_DIV);
    pub const MOD: Opcode = Disabled(OP_MOD);
    pub const LSHIFT: Opcode = Disabled(OP_LSHIFT);
    pub const RSHIFT: Opcode = Disabled(OP_RSHIFT);
}
