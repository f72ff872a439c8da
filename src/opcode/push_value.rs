#![allow(non_camel_case_types)]

use enum_primitive::FromPrimitive;

use crate::opcode;

/// Data values that aren’t represented within their opcode byte.
///
/// The encoding that was used is preserved, so a parsed script can be re-serialized byte for byte
/// and non-minimal pushes can be detected.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LargeValue {
    /// A direct push of 1–75 bytes, where the opcode byte is the length.
    ///
    /// NB: The lower bound is 1 because a zero-length direct push has the same encoding as
    ///     [`SmallValue::OP_0`].
    PushdataBytelength(Vec<u8>),
    OP_PUSHDATA1(Vec<u8>),
    OP_PUSHDATA2(Vec<u8>),
    OP_PUSHDATA4(Vec<u8>),
}

use LargeValue::*;

impl LargeValue {
    pub(crate) const PUSHDATA1_BYTE: u8 = 0x4c;
    pub(crate) const PUSHDATA2_BYTE: u8 = 0x4d;
    pub(crate) const PUSHDATA4_BYTE: u8 = 0x4e;

    /// Returns the shortest [`LargeValue`] that can hold `v`. This is the encoding used when a
    /// byte string is appended to a script, so it never produces a [`SmallValue`], even for
    /// values like `[0x01]`.
    pub fn from_slice(v: &[u8]) -> Option<LargeValue> {
        match v.len() {
            0 => None,
            1..=0x4b => Some(PushdataBytelength(v.to_vec())),
            0x4c..=0xff => Some(OP_PUSHDATA1(v.to_vec())),
            0x100..=0xffff => Some(OP_PUSHDATA2(v.to_vec())),
            len if u32::try_from(len).is_ok() => Some(OP_PUSHDATA4(v.to_vec())),
            _ => None,
        }
    }

    fn split_value(script: &[u8], needed_bytes: usize) -> (Result<&[u8], opcode::Error>, &[u8]) {
        match script.split_at_checked(needed_bytes) {
            None => (
                Err(opcode::Error::Read {
                    expected_bytes: needed_bytes,
                    available_bytes: script.len(),
                }),
                &[],
            ),
            Some((value, remainder)) => (Ok(value), remainder),
        }
    }

    /// First splits `size_size` bytes to determine the size of the value to read, then splits the
    /// value.
    fn split_tagged_value(
        script: &[u8],
        size_size: usize,
    ) -> (Result<&[u8], opcode::Error>, &[u8]) {
        let (res, rem) = Self::split_value(script, size_size);
        match res {
            Err(_) => (res, rem),
            Ok(bytes) => {
                let mut size = 0;
                for byte in bytes.iter().rev() {
                    size <<= 8;
                    size |= usize::from(*byte);
                }
                Self::split_value(rem, size)
            }
        }
    }

    /// Parse a single [`LargeValue`] from a script. Returns `None` if the first byte doesn’t
    /// correspond to a [`LargeValue`].
    pub fn parse(script: &[u8]) -> Option<(Result<LargeValue, opcode::Error>, &[u8])> {
        let (leading_byte, script) = script.split_first()?;
        let (res, rem) = match *leading_byte {
            0x01..LargeValue::PUSHDATA1_BYTE => Self::split_value(script, (*leading_byte).into()),
            LargeValue::PUSHDATA1_BYTE => Self::split_tagged_value(script, 1),
            LargeValue::PUSHDATA2_BYTE => Self::split_tagged_value(script, 2),
            LargeValue::PUSHDATA4_BYTE => Self::split_tagged_value(script, 4),
            _ => return None,
        };
        Some((
            res.map(|v| match *leading_byte {
                LargeValue::PUSHDATA1_BYTE => OP_PUSHDATA1(v.to_vec()),
                LargeValue::PUSHDATA2_BYTE => OP_PUSHDATA2(v.to_vec()),
                LargeValue::PUSHDATA4_BYTE => OP_PUSHDATA4(v.to_vec()),
                _ => PushdataBytelength(v.to_vec()),
            }),
            rem,
        ))
    }

    /// Get the stack element represented by this [`LargeValue`].
    pub fn value(&self) -> &[u8] {
        match self {
            PushdataBytelength(v) => v.as_slice(),
            OP_PUSHDATA1(v) => v.as_slice(),
            OP_PUSHDATA2(v) => v.as_slice(),
            OP_PUSHDATA4(v) => v.as_slice(),
        }
    }

    /// Whether the length fits the encoding this value names. Direct pushes hold 1–75 bytes.
    pub fn is_well_formed(&self) -> bool {
        match self {
            PushdataBytelength(v) => (1..=0x4b).contains(&v.len()),
            OP_PUSHDATA1(v) => u8::try_from(v.len()).is_ok(),
            OP_PUSHDATA2(v) => u16::try_from(v.len()).is_ok(),
            OP_PUSHDATA4(v) => u32::try_from(v.len()).is_ok(),
        }
    }

    /// The encoding a value that isn’t well formed is serialized with instead.
    fn reencoded(&self) -> Option<LargeValue> {
        if self.is_well_formed() {
            None
        } else {
            Self::from_slice(self.value())
        }
    }

    /// The opcode byte this value is serialized with.
    pub fn leading_byte(&self) -> u8 {
        if !self.is_well_formed() {
            return self
                .reencoded()
                .map_or(SmallValue::OP_0.into(), |lv| lv.leading_byte());
        }
        match self {
            PushdataBytelength(v) => u8::try_from(v.len()).expect("checked by `is_well_formed`"),
            OP_PUSHDATA1(_) => Self::PUSHDATA1_BYTE,
            OP_PUSHDATA2(_) => Self::PUSHDATA2_BYTE,
            OP_PUSHDATA4(_) => Self::PUSHDATA4_BYTE,
        }
    }

    /// Returns false if there is a smaller possible encoding of the provided value.
    pub fn is_minimal_push(&self) -> bool {
        match self {
            PushdataBytelength(data) => match data.as_slice() {
                [b] => *b != 0x81 && (*b < 1 || 16 < *b),
                _ => true,
            },
            OP_PUSHDATA1(data) => usize::from(Self::PUSHDATA1_BYTE) <= data.len(),
            OP_PUSHDATA2(data) => 0x100 <= data.len(),
            OP_PUSHDATA4(data) => 0x10000 <= data.len(),
        }
    }
}

impl From<&LargeValue> for Vec<u8> {
    fn from(value: &LargeValue) -> Self {
        if !value.is_well_formed() {
            // An empty value has no `LargeValue` encoding.
            return value
                .reencoded()
                .map_or_else(|| vec![SmallValue::OP_0.into()], |lv| (&lv).into());
        }
        match value {
            PushdataBytelength(bv) => [&[value.leading_byte()], bv.as_slice()].concat(),
            OP_PUSHDATA1(bv) => {
                let len = u8::try_from(bv.len()).expect("OP_PUSHDATA1 holds at most 255 bytes");
                [&[LargeValue::PUSHDATA1_BYTE, len], bv.as_slice()].concat()
            }
            OP_PUSHDATA2(bv) => {
                let len = u16::try_from(bv.len()).expect("OP_PUSHDATA2 holds at most 65535 bytes");
                [
                    &[LargeValue::PUSHDATA2_BYTE][..],
                    &len.to_le_bytes(),
                    bv.as_slice(),
                ]
                .concat()
            }
            OP_PUSHDATA4(bv) => {
                let len = u32::try_from(bv.len()).expect("OP_PUSHDATA4 holds at most 2^32-1 bytes");
                [
                    &[LargeValue::PUSHDATA4_BYTE][..],
                    &len.to_le_bytes(),
                    bv.as_slice(),
                ]
                .concat()
            }
        }
    }
}

enum_from_primitive! {
/// Data values represented entirely by their opcode byte.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum SmallValue {
    // push value
    OP_0 = 0x00,
    OP_1NEGATE = 0x4f,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,
}
}

use SmallValue::*;

impl SmallValue {
    /// The integer this opcode stands for.
    pub fn to_num(&self) -> i64 {
        match self {
            OP_0 => 0,
            OP_1NEGATE => -1,
            _ => i64::from(u8::from(*self) - (u8::from(OP_1) - 1)),
        }
    }

    /// Get the stack element represented by this [`SmallValue`], i.e. the script-number encoding
    /// of [`SmallValue::to_num`].
    pub fn value(&self) -> Vec<u8> {
        match self {
            OP_0 => vec![],
            OP_1NEGATE => vec![0x81],
            _ => vec![u8::from(*self) - (u8::from(OP_1) - 1)],
        }
    }

    /// The opcode for a number in `-1..=16`.
    pub fn from_num(n: i64) -> Option<SmallValue> {
        match n {
            -1 => Some(OP_1NEGATE),
            0 => Some(OP_0),
            1..=16 => u8::try_from(n)
                .ok()
                .and_then(|n| SmallValue::from_u8(n + (u8::from(OP_1) - 1))),
            _ => None,
        }
    }
}

impl From<SmallValue> for u8 {
    fn from(value: SmallValue) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}
