//! Signature handling.
//!
//! This is in a separate module so we can minimize the code that has access to the internals,
//! making it easier to ensure that we check the encoding correctly.

use secp256k1::ecdsa;
use thiserror::Error;

use crate::external::pubkey::PubKey;

/// Things that can go wrong when constructing a `HashType` from its byte.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum InvalidHashType {
    /// Ignoring `ANYONECANPAY`, the byte must be one of `ALL`, `NONE`, or `SINGLE`.
    #[error("undefined hash type {0:#04x}")]
    Undefined(u8),
}

/// Any error that can happen during signature decoding.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum InvalidDerInteger {
    #[error("missing the 0x02 integer encoding byte")]
    NotAnInteger,
    #[error("the integer was expected to be {expected} bytes, but it was {actual} bytes")]
    IncorrectLength { actual: usize, expected: u8 },
    #[error("integers can’t be zero-length")]
    ZeroLength,
    #[error("leading 0x00 bytes are disallowed, unless it would otherwise be interpreted as a negative number.")]
    LeadingNullByte,
    #[error("integers can’t be negative")]
    Negative,
}

/// Errors that occur during decoding of a DER signature.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum InvalidDerEncoding {
    #[error("didn’t start with 0x30, or was missing the length")]
    WrongType,
    #[error("the signature can’t be longer than 70 bytes")]
    TooLong,
    #[error("the signature was expected to be {expected} bytes, but it was {actual} bytes")]
    IncorrectLength { actual: usize, expected: u8 },
    #[error(
        "the {name} component {}failed: {error}",
        .value.clone().map_or("".to_owned(), |vec| format!("({vec:?}) "))
    )]
    InvalidComponent {
        name: &'static str,
        value: Option<Vec<u8>>,
        error: InvalidDerInteger,
    },
}

/// Errors that occur when checking the encoding of signatures and public keys.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    // BIP62
    #[error("signature hash type error: {0}")]
    SigHashType(InvalidHashType),

    #[error("signature DER encoding error: {0}")]
    SigDER(InvalidDerEncoding),

    #[error("signature s value is too high")]
    SigHighS,

    #[error("public key is neither compressed nor uncompressed")]
    PubKeyType,
}

/// The ways in which an input may commit to the outputs of its transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignedOutputs {
    /// The input signature commits to all outputs in the transaction.
    All,
    /// The input's signature commits to the output at the same index as the input.
    Single,
    /// The input's signature does not commit to any outputs.
    None,
}

/// The different SigHash types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashType {
    signed_outputs: SignedOutputs,
    anyone_can_pay: bool,
}

impl HashType {
    pub const ALL: u8 = 0x01;
    pub const NONE: u8 = 0x02;
    pub const SINGLE: u8 = 0x03;
    pub const ANYONECANPAY: u8 = 0x80;

    /// Construct a `HashType` from the byte appended to a signature.
    ///
    /// When `is_strict` (`StrictEnc`), only the defined values are accepted. Otherwise any value
    /// for the lower five bits other than 2 & 3 is treated as [`SignedOutputs::All`].
    pub fn from_bits(bits: u8, is_strict: bool) -> Result<Self, InvalidHashType> {
        let base = bits & !Self::ANYONECANPAY;
        if is_strict && !(Self::ALL..=Self::SINGLE).contains(&base) {
            Err(InvalidHashType::Undefined(bits))
        } else {
            Ok(HashType {
                signed_outputs: match bits & 0x1f {
                    Self::NONE => SignedOutputs::None,
                    Self::SINGLE => SignedOutputs::Single,
                    _ => SignedOutputs::All,
                },
                anyone_can_pay: bits & Self::ANYONECANPAY != 0,
            })
        }
    }

    /// See [SignedOutputs].
    pub fn signed_outputs(&self) -> SignedOutputs {
        self.signed_outputs
    }

    /// Allows anyone to add inputs to this transaction.
    pub fn anyone_can_pay(&self) -> bool {
        self.anyone_can_pay
    }
}

/// Checks the properties of individual integers in a DER signature.
fn is_valid_integer(int_bytes: &[u8]) -> Result<(), InvalidDerInteger> {
    match int_bytes {
        [] => Err(InvalidDerInteger::ZeroLength),
        // Null bytes at the start are not allowed, unless it would otherwise be interpreted as
        // a negative number.
        [0x00, next, ..] => {
            if next & 0x80 != 0 {
                Ok(())
            } else {
                Err(InvalidDerInteger::LeadingNullByte)
            }
        }
        // Negative numbers are not allowed.
        [first, ..] => {
            if first & 0x80 == 0 {
                Ok(())
            } else {
                Err(InvalidDerInteger::Negative)
            }
        }
    }
}

/// A canonical signature consists of: <30> <total len> <02> <len R> <R> <02> <len S> <S>
///
/// Where R and S are not negative (their first byte has its highest bit not set), and not
/// excessively padded (do not start with a 0 byte, unless an otherwise negative number follows,
/// in which case a single 0 byte is necessary and even required).
///
/// See https://bitcointalk.org/index.php?topic=8392.msg127623#msg127623
///
/// This function is consensus-critical since BIP66. `sig` excludes the hash type byte.
///
/// __NB__: This doesn’t rely on [ecdsa::Signature::from_der] because it is consensus critical,
///         so we need to ensure that these exact checks happen.
pub fn is_valid_encoding(sig: &[u8]) -> Result<(), InvalidDerEncoding> {
    // Format: 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S]
    // * total-length: 1-byte length descriptor of everything that follows.
    // * R-length: 1-byte length descriptor of the R value that follows.
    // * R: arbitrary-length big-endian encoded R value. It must use the shortest
    //   possible encoding for a positive integer (which means no null bytes at
    //   the start, except a single one when the next byte has its highest bit set).
    // * S-length: 1-byte length descriptor of the S value that follows.
    // * S: arbitrary-length big-endian encoded S value. The same rules apply.

    // implied checks:
    // - Minimum size constraint.
    // - Verify that the length of the signature matches the sum of the length of the elements.
    let [0x30, total_len, content @ ..] = sig else {
        return Err(InvalidDerEncoding::WrongType);
    };
    // Maximum size constraint.
    if *total_len > 70 {
        return Err(InvalidDerEncoding::TooLong);
    }
    // Make sure the length covers the entire signature.
    if usize::from(*total_len) != content.len() {
        return Err(InvalidDerEncoding::IncorrectLength {
            actual: content.len(),
            expected: *total_len,
        });
    }
    // Check whether the R element is an integer.
    // Extract the length of the R element.
    let [0x02, r_len, r_s @ ..] = content else {
        return Err(InvalidDerEncoding::InvalidComponent {
            name: "r",
            value: None,
            error: InvalidDerInteger::NotAnInteger,
        });
    };
    // Make sure the length of the R element is still inside the signature.
    let Some((r, rest)) = r_s.split_at_checked((*r_len).into()) else {
        return Err(InvalidDerEncoding::InvalidComponent {
            name: "r",
            value: Some(r_s.to_vec()),
            error: InvalidDerInteger::IncorrectLength {
                actual: r_s.len(),
                expected: *r_len,
            },
        });
    };
    // Check whether the S element is an integer.
    // Extract the length of the S element.
    let [0x02, s_len, s @ ..] = rest else {
        return Err(InvalidDerEncoding::InvalidComponent {
            name: "s",
            value: None,
            error: InvalidDerInteger::NotAnInteger,
        });
    };
    is_valid_integer(r).map_err(|error| InvalidDerEncoding::InvalidComponent {
        name: "r",
        value: Some(r.to_vec()),
        error,
    })?;
    // Make sure the length of the S element is exactly what remains.
    if usize::from(*s_len) != s.len() {
        return Err(InvalidDerEncoding::InvalidComponent {
            name: "s",
            value: Some(s.to_vec()),
            error: InvalidDerInteger::IncorrectLength {
                actual: s.len(),
                expected: *s_len,
            },
        });
    }
    is_valid_integer(s).map_err(|error| InvalidDerEncoding::InvalidComponent {
        name: "s",
        value: Some(s.to_vec()),
        error,
    })
}

/// Checks a signature (including its trailing hash type byte) against the encoding rules enabled
/// by the interpreter flags.
///
/// The empty signature always passes. It’s a compact way to provide an invalid signature for use
/// with CHECK(MULTI)SIG.
pub fn check_encoding(
    vch_sig: &[u8],
    require_der: bool,
    require_low_s: bool,
    is_strict: bool,
) -> Result<(), Error> {
    let Some((hash_type, sig)) = vch_sig.split_last() else {
        return Ok(());
    };
    if require_der || require_low_s || is_strict {
        is_valid_encoding(sig).map_err(Error::SigDER)?;
    }
    if require_low_s
        && !ecdsa::Signature::from_der_lax(sig).is_ok_and(|sig| PubKey::check_low_s(&sig))
    {
        return Err(Error::SigHighS);
    }
    if is_strict {
        HashType::from_bits(*hash_type, true).map_err(Error::SigHashType)?;
    }
    Ok(())
}

/// With `StrictEnc`, public keys must be 33-byte compressed or 65-byte uncompressed keys.
pub fn check_pub_key_encoding(vch_pub_key: &[u8], is_strict: bool) -> Result<(), Error> {
    if is_strict && !PubKey(vch_pub_key).is_compressed_or_uncompressed() {
        Err(Error::PubKeyType)
    } else {
        Ok(())
    }
}

/// This contains a parsed ECDSA signature and its hash type, ready for verification.
#[derive(Clone, Debug)]
pub struct Decoded {
    sig: ecdsa::Signature,
    hash_type: u8,
}

impl Decoded {
    /// Leniently decodes a signature for verification. Encoding rules are enforced separately by
    /// [`check_encoding`], so this accepts anything libsecp256k1’s lax parser does, and
    /// normalizes S, since verification only accepts low-S signatures.
    pub fn from_bytes(vch_sig: &[u8]) -> Option<Self> {
        let (hash_type, sig) = vch_sig.split_last()?;
        let mut sig = ecdsa::Signature::from_der_lax(sig).ok()?;
        sig.normalize_s();
        Some(Decoded {
            sig,
            hash_type: *hash_type,
        })
    }

    /// The ECDSA signature.
    pub fn sig(&self) -> &ecdsa::Signature {
        &self.sig
    }

    /// The hash type byte, which the signature hash commits to.
    pub fn sighash_type(&self) -> u8 {
        self.hash_type
    }
}
