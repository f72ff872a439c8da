//! Managing sequences of opcodes.

use core::fmt;

use thiserror::Error;

use crate::{
    interpreter,
    opcode::{
        self,
        push_value::{LargeValue, SmallValue},
        Opcode, Operation, PushValue,
    },
};

/// Maximum number of bytes pushable to the stack
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum script length in bytes
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Errors that can occur when decomposing a script into chunks.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("during parsing: {0}")]
    Opcode(opcode::Error),
}

impl From<opcode::Error> for Error {
    fn from(value: opcode::Error) -> Self {
        Error::Opcode(value)
    }
}

/// An iterator that provides `Opcode`s from a byte stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Parser<'a>(&'a [u8]);

impl Iterator for Parser<'_> {
    type Item = Result<Opcode, opcode::Error>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            None
        } else {
            let (res, rem) = Opcode::parse(self.0);
            self.0 = rem;
            Some(res)
        }
    }
}

/// Serialized script, used inside transaction inputs and outputs. This is also the form in which
/// the subscript is handed to a [`interpreter::SignatureChecker`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Code(pub Vec<u8>);

impl Code {
    /// Produce an [`Opcode`] iterator from [`Code`].
    pub fn parse(&self) -> Parser<'_> {
        Parser(&self.0)
    }
}

impl From<&Program> for Code {
    fn from(value: &Program) -> Self {
        Code(value.to_bytes())
    }
}

/// A parsed script: the ordered chunks of a byte string.
///
/// Pushes keep the encoding they were parsed with, so [`Program::to_bytes`] reproduces the
/// original bytes exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program(pub Vec<Opcode>);

impl Program {
    /// Parse a script in one left-to-right pass. This fails only if a push claims more bytes than
    /// remain; disabled and unknown opcodes are left for the interpreter to reject.
    pub fn parse(raw_script: &[u8]) -> Result<Self, Error> {
        Parser(raw_script)
            .collect::<Result<_, _>>()
            .map(Program)
            .map_err(Error::Opcode)
    }

    /// Convert a sequence of `Opcode`s to the bytes that would be included in a transaction.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(Vec::from).collect()
    }

    pub fn byte_len(&self) -> usize {
        self.0.iter().map(|op| Vec::from(op).len()).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Opcode> {
        self.0.iter()
    }

    /// Called by P2SH and `SigPushOnly` verification.
    ///
    /// __NB__: This is a check on opcode bytes, so `OP_RESERVED` counts as a push even though it
    ///         fails when executed.
    pub fn is_push_only(&self) -> bool {
        self.0
            .iter()
            .all(|op| op.leading_byte() <= SmallValue::OP_16.into())
    }

    /// Returns true iff this script is `OP_HASH160 <20 bytes> OP_EQUAL`, with the hash pushed
    /// directly.
    pub fn is_pay_to_script_hash(&self) -> bool {
        match &self.0[..] {
            [Opcode::Operation(Operation::OP_HASH160), Opcode::PushValue(PushValue::LargeValue(LargeValue::PushdataBytelength(v))), Opcode::Operation(Operation::OP_EQUAL)] => {
                v.len() == 0x14
            }
            _ => false,
        }
    }

    /// The chunks from `from` to the end. Signature opcodes commit to the subscript that starts
    /// after the most recent `OP_CODESEPARATOR`.
    pub fn subscript(&self, from: usize) -> Program {
        Program(self.0.get(from..).map_or(vec![], <[Opcode]>::to_vec))
    }

    /// Remove every push of `data` that uses the encoding a signer would have produced for it.
    /// A signature can’t commit to itself, so its pushes are dropped from the subscript before
    /// hashing.
    pub fn find_and_delete(&self, data: &[u8]) -> Program {
        let pattern = match LargeValue::from_slice(data) {
            None => vec![SmallValue::OP_0.into()],
            Some(lv) => Vec::from(&lv),
        };
        Program(
            self.0
                .iter()
                .filter(|op| Vec::from(*op) != pattern)
                .cloned()
                .collect(),
        )
    }

    /// Pre-version-0.6, Bitcoin always counted CHECKMULTISIGs as 20 sigops. With
    /// pay-to-script-hash, that changed: CHECKMULTISIGs serialized in script_sigs are counted more
    /// accurately, assuming they are of the form ... OP_N CHECKMULTISIG ...
    pub fn sig_op_count(&self, accurate: bool) -> u32 {
        let mut last_opcode: Option<&Opcode> = None;
        let mut count = 0;
        for opcode in &self.0 {
            count += match opcode {
                Opcode::Operation(Operation::OP_CHECKSIG | Operation::OP_CHECKSIGVERIFY) => 1,
                Opcode::Operation(
                    Operation::OP_CHECKMULTISIG | Operation::OP_CHECKMULTISIGVERIFY,
                ) => match last_opcode {
                    // Even with an accurate count, 0 keys is counted as 20.
                    Some(Opcode::PushValue(PushValue::SmallValue(sv)))
                        if accurate && SmallValue::OP_1 <= *sv =>
                    {
                        u32::try_from(sv.to_num()).unwrap_or(interpreter::MAX_PUBKEY_COUNT.into())
                    }
                    _ => u32::from(interpreter::MAX_PUBKEY_COUNT),
                },
                _ => 0,
            };
            last_opcode = Some(opcode);
        }
        count
    }
}

impl From<Vec<Opcode>> for Program {
    fn from(value: Vec<Opcode>) -> Self {
        Program(value)
    }
}

impl FromIterator<Opcode> for Program {
    fn from_iter<I: IntoIterator<Item = Opcode>>(iter: I) -> Self {
        Program(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Opcode;
    type IntoIter = core::slice::Iter<'a, Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Assembly notation, e.g. `OP_DUP OP_HASH160 89ab… OP_EQUALVERIFY OP_CHECKSIG`.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops = self.0.iter();
        if let Some(first) = ops.next() {
            write!(f, "{}", first)?;
            for op in ops {
                write!(f, " {}", op)?;
            }
        }
        Ok(())
    }
}
