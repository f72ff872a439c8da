//! Wrappers around the cryptographic primitives that script verification relies on.

pub mod pubkey;
