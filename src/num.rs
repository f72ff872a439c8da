//! Script numbers.
//!
//! Numeric opcodes interpret stack elements as signed integers in a little-endian sign-magnitude
//! encoding: the high bit of the most-significant byte carries the sign, the encoding is as short
//! as possible, and the empty byte string is zero.

use core::ops::{Add, Neg, Sub};

use thiserror::Error;

/// Things that can go wrong when decoding a script number.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error(
        "non-minimal encoding of script number{}",
        .0.as_ref().map_or(String::new(), |vch| format!(": {vch:02x?}"))
    )]
    NonMinimalEncoding(Option<Vec<u8>>),

    #[error("script number overflow: max: {max_size}, actual: {actual}")]
    Overflow { max_size: usize, actual: usize },
}

/// The operand size used by every numeric opcode other than `OP_CHECKLOCKTIMEVERIFY`.
pub const DEFAULT_MAX_SIZE: usize = 4;

/// The only 9-byte encoding that can be decoded.
const I64_MIN_ENCODING: [u8; 9] = [0, 0, 0, 0, 0, 0, 0, 0x80, 0x80];

/// Convert bytes to the integer they encode.
///
/// __NB__: Setting `max_size` to more than `9` has no effect, and the encoding of [`i64::MIN`] is
///         the only allowed 9-byte value.
pub fn parse(vch: &[u8], require_minimal: bool, max_size: Option<usize>) -> Result<i64, Error> {
    match vch.last() {
        None => Ok(0),
        Some(vch_back) => {
            let max_size = max_size.unwrap_or(DEFAULT_MAX_SIZE);
            if vch.len() > max_size {
                return Err(Error::Overflow {
                    max_size,
                    actual: vch.len(),
                });
            }
            if require_minimal {
                // Check that the number is encoded with the minimum possible number of bytes.
                //
                // If the most-significant-byte - excluding the sign bit - is zero then we're not
                // minimal. Note how this test also rejects the negative-zero encoding, 0x80.
                if (vch_back & 0x7F) == 0 {
                    // One exception: if there's more than one byte and the most significant bit of
                    // the second-most-significant-byte is set then it would have conflicted with
                    // the sign bit if one fewer byte were used, and so such encodings are minimal.
                    // An example of this is +-255, which have minimal encodings [0xff, 0x00] and
                    // [0xff, 0x80] respectively.
                    if vch.len() <= 1 || (vch[vch.len() - 2] & 0x80) == 0 {
                        return Err(Error::NonMinimalEncoding(Some(vch.to_vec())));
                    }
                }
            }

            if *vch == I64_MIN_ENCODING {
                return Ok(i64::MIN);
            };

            // A left shift of an `i64` by 64 bits overflows, so nothing longer than 8 bytes (other
            // than the encoding above) can be decoded.
            if vch.len() > 8 {
                return Err(Error::Overflow {
                    max_size: 8,
                    actual: vch.len(),
                });
            };

            let mut result: i64 = 0;
            for (i, vch_i) in vch.iter().enumerate() {
                result |= i64::from(*vch_i) << (8 * i);
            }

            // If the input vector's most significant byte is 0x80, remove it from the result's msb
            // and return a negative.
            if vch_back & 0x80 != 0 {
                return Ok(-(result & !(0x80 << (8 * (vch.len() - 1)))));
            };

            Ok(result)
        }
    }
}

/// Produce the minimal encoding of an integer.
pub fn serialize(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let neg = value < 0;
    let mut absvalue = value.unsigned_abs();

    while absvalue != 0 {
        result.push((absvalue & 0xff) as u8);
        absvalue >>= 8;
    }

    // - If the most significant byte is >= 0x80 and the value is positive, push a new zero-byte to
    //   make the significant byte < 0x80 again.
    // - If the most significant byte is >= 0x80 and the value is negative, push a new 0x80 byte
    //   that will be popped off when converting to an integral.
    // - If the most significant byte is < 0x80 and the value is negative, add 0x80 to it, since it
    //   will be subtracted and interpreted as a negative when converting to an integral.
    if result.last().map_or(true, |last| last & 0x80 != 0) {
        result.push(if neg { 0x80 } else { 0 });
    } else if neg {
        if let Some(last) = result.last_mut() {
            *last |= 0x80;
        }
    }

    result
}

/// An integer as seen by the numeric opcodes.
///
/// Decoding is restricted (by size and, optionally, by minimality), but arithmetic is done on the
/// full `i64`, so results may be larger than anything that could be decoded as an operand.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptNum(i64);

impl ScriptNum {
    /// The number zero, which encodes to the empty byte string.
    pub const ZERO: ScriptNum = ScriptNum(0);

    /// Decode a stack element. `max_size` defaults to [`DEFAULT_MAX_SIZE`].
    pub fn decode(
        vch: &[u8],
        require_minimal: bool,
        max_size: Option<usize>,
    ) -> Result<Self, Error> {
        parse(vch, require_minimal, max_size).map(ScriptNum)
    }

    /// The shortest encoding of this number.
    pub fn encode(&self) -> Vec<u8> {
        serialize(self.0)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(ScriptNum)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(ScriptNum)
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.0.checked_neg().map(ScriptNum)
    }

    pub fn checked_abs(self) -> Option<Self> {
        self.0.checked_abs().map(ScriptNum)
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        ScriptNum(value)
    }
}

impl From<ScriptNum> for i64 {
    fn from(value: ScriptNum) -> Self {
        value.0
    }
}

impl Add for ScriptNum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(
            self.0
                .checked_add(other.0)
                .unwrap_or_else(|| panic!("{} + {} overflows a script number", self.0, other.0)),
        )
    }
}

impl Sub for ScriptNum {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(
            self.0
                .checked_sub(other.0)
                .unwrap_or_else(|| panic!("{} - {} overflows a script number", self.0, other.0)),
        )
    }
}

impl Neg for ScriptNum {
    type Output = Self;

    fn neg(self) -> Self {
        assert!(self.0 != i64::MIN, "can’t negate i64::MIN");
        Self(-self.0)
    }
}
