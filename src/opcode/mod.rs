#![allow(non_camel_case_types)]

pub mod push_value;

use core::fmt;

use enum_primitive::FromPrimitive;
use thiserror::Error;

use push_value::{
    LargeValue,
    SmallValue::{self, *},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("expected {expected_bytes} bytes, but only {available_bytes} bytes available")]
    Read {
        expected_bytes: usize,
        available_bytes: usize,
    },
}

/// Opcodes that represent constants to be pushed onto the stack.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PushValue {
    /// Constants that are represented by a single byte.
    SmallValue(SmallValue),
    /// Constants that contain data in addition to the opcode byte.
    LargeValue(LargeValue),
}

impl PushValue {
    /// Produce a minimal `PushValue` for the given data.
    pub fn from_slice(v: &[u8]) -> Option<PushValue> {
        match v {
            [] => Some(PushValue::SmallValue(OP_0)),
            [0x81] => Some(PushValue::SmallValue(OP_1NEGATE)),
            [n @ 1..=16] => SmallValue::from_num((*n).into()).map(PushValue::SmallValue),
            _ => LargeValue::from_slice(v).map(PushValue::LargeValue),
        }
    }

    /// Like [`PushValue::from_slice`], but refuses values larger than a stack element may be.
    pub fn element(v: &[u8]) -> Option<PushValue> {
        if v.len() <= crate::script::MAX_SCRIPT_ELEMENT_SIZE {
            PushValue::from_slice(v)
        } else {
            None
        }
    }

    /// Get the stack element represented by this [`PushValue`].
    pub fn value(&self) -> Vec<u8> {
        match self {
            PushValue::LargeValue(pv) => pv.value().to_vec(),
            PushValue::SmallValue(pv) => pv.value(),
        }
    }

    /// Returns false if there is a smaller possible encoding of the provided value.
    pub fn is_minimal_push(&self) -> bool {
        match self {
            PushValue::LargeValue(lv) => lv.is_minimal_push(),
            PushValue::SmallValue(_) => true,
        }
    }

    /// The opcode byte this value starts with.
    pub fn leading_byte(&self) -> u8 {
        match self {
            PushValue::SmallValue(sv) => (*sv).into(),
            PushValue::LargeValue(lv) => lv.leading_byte(),
        }
    }
}

enum_from_primitive! {
/// Control operations are evaluated regardless of whether the current branch is active.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Control {
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
}
}

enum_from_primitive! {
/// Normal operations are only executed when they are on an active branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Operation {
    // control
    OP_NOP = 0x61,
    OP_VERIFY = 0x69,
    OP_RETURN = 0x6a,

    // stack ops
    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    // splice ops
    OP_SIZE = 0x82,

    // bit logic
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,

    // numeric
    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,

    OP_ADD = 0x93,
    OP_SUB = 0x94,

    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,

    OP_WITHIN = 0xa5,

    // crypto
    OP_RIPEMD160 = 0xa6,
    OP_SHA1 = 0xa7,
    OP_SHA256 = 0xa8,
    OP_HASH160 = 0xa9,
    OP_HASH256 = 0xaa,
    OP_CODESEPARATOR = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,

    // expansion
    OP_NOP1 = 0xb0,
    OP_CHECKLOCKTIMEVERIFY = 0xb1,
    OP_NOP3 = 0xb2,
    OP_NOP4 = 0xb3,
    OP_NOP5 = 0xb4,
    OP_NOP6 = 0xb5,
    OP_NOP7 = 0xb6,
    OP_NOP8 = 0xb7,
    OP_NOP9 = 0xb8,
    OP_NOP10 = 0xb9,
}
}

enum_from_primitive! {
/// Opcodes that fail as soon as they’re encountered, even on an inactive branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Disabled {
    // splice ops
    OP_CAT = 0x7e,
    OP_SUBSTR = 0x7f,
    OP_LEFT = 0x80,
    OP_RIGHT = 0x81,
    // bit logic
    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    // numeric
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,
}
}

/// Opcodes that fail if they’re on an active branch.
///
/// `OP_VERIF` and `OP_VERNOTIF` are the exception: they fail even when skipped, because the
/// interpreter treats every byte in the `OP_IF`–`OP_ENDIF` range as a conditional.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Bad {
    OP_RESERVED,
    OP_VER,
    OP_VERIF,
    OP_VERNOTIF,
    OP_RESERVED1,
    OP_RESERVED2,
    Unknown(u8),
}

impl Bad {
    pub fn fails_unexecuted(&self) -> bool {
        matches!(self, Bad::OP_VERIF | Bad::OP_VERNOTIF)
    }
}

impl From<u8> for Bad {
    fn from(value: u8) -> Self {
        match value {
            0x50 => Bad::OP_RESERVED,
            0x62 => Bad::OP_VER,
            0x65 => Bad::OP_VERIF,
            0x66 => Bad::OP_VERNOTIF,
            0x89 => Bad::OP_RESERVED1,
            0x8a => Bad::OP_RESERVED2,
            _ => Bad::Unknown(value),
        }
    }
}

impl From<Bad> for u8 {
    fn from(value: Bad) -> Self {
        match value {
            Bad::OP_RESERVED => 0x50,
            Bad::OP_VER => 0x62,
            Bad::OP_VERIF => 0x65,
            Bad::OP_VERNOTIF => 0x66,
            Bad::OP_RESERVED1 => 0x89,
            Bad::OP_RESERVED2 => 0x8a,
            Bad::Unknown(byte) => byte,
        }
    }
}

impl From<Control> for u8 {
    fn from(value: Control) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

impl From<Operation> for u8 {
    fn from(value: Operation) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

impl From<Disabled> for u8 {
    fn from(value: Disabled) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

/// A single chunk of a script.
///
/// Every byte maps to exactly one variant, so parsing only fails when a push runs past the end of
/// the script. Whether a [`Disabled`] or [`Bad`] opcode is an error depends on where it appears,
/// so that is left to the interpreter.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Opcodes that represent constants to be pushed onto the stack.
    PushValue(PushValue),
    /// - always evaluated
    /// - can be cast to its discriminant
    Control(Control),
    /// - only evaluated on active branch
    /// - can be cast to its discriminant
    Operation(Operation),
    /// - fail even on an inactive branch
    Disabled(Disabled),
    /// - fail on an active branch
    Bad(Bad),
}

impl Opcode {
    /// This parses a single opcode from a byte stream.
    ///
    /// This always returns the unparsed bytes, because parsing failures don’t invalidate the
    /// remainder of the stream (if any).
    pub fn parse(script: &[u8]) -> (Result<Opcode, Error>, &[u8]) {
        match LargeValue::parse(script) {
            Some((res, remaining_code)) => (
                res.map(|v| Opcode::PushValue(PushValue::LargeValue(v))),
                remaining_code,
            ),
            None => match script.split_first() {
                None => (
                    Err(Error::Read {
                        expected_bytes: 1,
                        available_bytes: 0,
                    }),
                    &[],
                ),
                Some((leading_byte, remaining_code)) => {
                    (Ok(Opcode::from_byte(*leading_byte)), remaining_code)
                }
            },
        }
    }

    /// Classify a byte that isn’t the start of a [`LargeValue`].
    fn from_byte(byte: u8) -> Opcode {
        if let Some(sv) = SmallValue::from_u8(byte) {
            Opcode::PushValue(PushValue::SmallValue(sv))
        } else if let Some(ctl) = Control::from_u8(byte) {
            Opcode::Control(ctl)
        } else if let Some(op) = Operation::from_u8(byte) {
            Opcode::Operation(op)
        } else if let Some(disabled) = Disabled::from_u8(byte) {
            Opcode::Disabled(disabled)
        } else {
            Opcode::Bad(Bad::from(byte))
        }
    }

    /// The first byte of this chunk’s encoding.
    pub fn leading_byte(&self) -> u8 {
        match self {
            Opcode::PushValue(pv) => pv.leading_byte(),
            Opcode::Control(ctl) => (*ctl).into(),
            Opcode::Operation(op) => (*op).into(),
            Opcode::Disabled(op) => (*op).into(),
            Opcode::Bad(op) => (*op).into(),
        }
    }

    /// False only for pushes that could have used a shorter encoding.
    pub fn is_canonical(&self) -> bool {
        match self {
            Opcode::PushValue(pv) => pv.is_minimal_push(),
            _ => true,
        }
    }

    /// The stack element a push places on the stack, or `None` for every other opcode.
    pub fn push_data(&self) -> Option<Vec<u8>> {
        match self {
            Opcode::PushValue(pv) => Some(pv.value()),
            _ => None,
        }
    }
}

impl From<PushValue> for Opcode {
    fn from(value: PushValue) -> Self {
        Opcode::PushValue(value)
    }
}

impl From<Control> for Opcode {
    fn from(value: Control) -> Self {
        Opcode::Control(value)
    }
}

impl From<Operation> for Opcode {
    fn from(value: Operation) -> Self {
        Opcode::Operation(value)
    }
}

impl From<Disabled> for Opcode {
    fn from(value: Disabled) -> Self {
        Opcode::Disabled(value)
    }
}

impl From<Bad> for Opcode {
    fn from(value: Bad) -> Self {
        Opcode::Bad(value)
    }
}

/// Only the leading byte, so any data a push carries is lost.
impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value.leading_byte()
    }
}

impl From<&PushValue> for Vec<u8> {
    fn from(value: &PushValue) -> Self {
        match value {
            PushValue::SmallValue(v) => vec![(*v).into()],
            PushValue::LargeValue(v) => v.into(),
        }
    }
}

impl From<&Opcode> for Vec<u8> {
    fn from(value: &Opcode) -> Self {
        match value {
            Opcode::PushValue(v) => v.into(),
            _ => vec![value.leading_byte()],
        }
    }
}

impl fmt::Display for PushValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushValue::SmallValue(sv) => write!(f, "{:?}", sv),
            PushValue::LargeValue(lv) => {
                for byte in lv.value() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// The conventional assembly notation: opcode names, with pushed data as hex.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::PushValue(pv) => write!(f, "{}", pv),
            Opcode::Control(op) => write!(f, "{:?}", op),
            Opcode::Operation(op) => write!(f, "{:?}", op),
            Opcode::Disabled(op) => write!(f, "{:?}", op),
            Opcode::Bad(Bad::Unknown(byte)) => write!(f, "OP_UNKNOWN<0x{:02x}>", byte),
            Opcode::Bad(op) => write!(f, "{:?}", op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_value::LargeValue::*;

    #[test]
    fn every_byte_is_classified_and_round_trips() {
        for byte in 0..=u8::MAX {
            // a length of 1 for any of the `OP_PUSHDATA` forms, followed by padding
            let script = [&[byte, 1, 0, 0, 0][..], &[0; 0x50]].concat();
            let (res, _) = Opcode::parse(&script);
            let op = res.expect("long enough for any push");
            assert_eq!(op.leading_byte(), byte, "for {byte:#04x}");
            assert_eq!(Vec::<u8>::from(&op)[0], byte);
        }
    }

    #[test]
    fn classification() {
        assert_eq!(
            Opcode::parse(&[0xab]).0,
            Ok(Opcode::Operation(Operation::OP_CODESEPARATOR))
        );
        assert_eq!(
            Opcode::parse(&[0x7e]).0,
            Ok(Opcode::Disabled(Disabled::OP_CAT))
        );
        assert_eq!(Opcode::parse(&[0x65]).0, Ok(Opcode::Bad(Bad::OP_VERIF)));
        assert_eq!(Opcode::parse(&[0xba]).0, Ok(Opcode::Bad(Bad::Unknown(0xba))));
        assert_eq!(
            Opcode::parse(&[0x63]).0,
            Ok(Opcode::Control(Control::OP_IF))
        );
        assert!(Bad::OP_VERNOTIF.fails_unexecuted());
        assert!(!Bad::OP_VER.fails_unexecuted());
    }

    #[test]
    fn empty_input_is_a_read_error() {
        assert_eq!(
            Opcode::parse(&[]),
            (
                Err(Error::Read {
                    expected_bytes: 1,
                    available_bytes: 0
                }),
                &[][..]
            )
        );
    }

    #[test]
    fn canonical_pushes() {
        let direct = Opcode::from(PushValue::LargeValue(PushdataBytelength(vec![0xaa; 10])));
        let padded = Opcode::from(PushValue::LargeValue(OP_PUSHDATA2(vec![0xaa; 10])));
        assert!(direct.is_canonical());
        assert!(!padded.is_canonical());
        assert_eq!(direct.push_data(), padded.push_data());
        assert!(Opcode::from(Operation::OP_DUP).is_canonical());
        assert_eq!(Opcode::from(Operation::OP_DUP).push_data(), None);
    }

    #[test]
    fn small_values_push_script_numbers() {
        assert_eq!(
            Opcode::from(PushValue::SmallValue(OP_1NEGATE)).push_data(),
            Some(vec![0x81])
        );
        assert_eq!(
            Opcode::from(PushValue::SmallValue(OP_16)).push_data(),
            Some(vec![16])
        );
        assert_eq!(
            Opcode::from(PushValue::SmallValue(OP_0)).push_data(),
            Some(vec![])
        );
    }

    #[test]
    fn from_slice_is_minimal() {
        assert_eq!(
            PushValue::from_slice(&[5]),
            Some(PushValue::SmallValue(OP_5))
        );
        assert_eq!(
            PushValue::from_slice(&[17]),
            Some(PushValue::LargeValue(PushdataBytelength(vec![17])))
        );
        assert_eq!(
            PushValue::from_slice(&[0; 0x4c]),
            Some(PushValue::LargeValue(OP_PUSHDATA1(vec![0; 0x4c])))
        );
    }

    #[test]
    fn asm() {
        assert_eq!(Opcode::from(Operation::OP_HASH160).to_string(), "OP_HASH160");
        assert_eq!(
            Opcode::from(PushValue::LargeValue(PushdataBytelength(vec![0xde, 0xad]))).to_string(),
            "dead"
        );
        assert_eq!(Opcode::from(Bad::Unknown(0xff)).to_string(), "OP_UNKNOWN<0xff>");
    }
}
