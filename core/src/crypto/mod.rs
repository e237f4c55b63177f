// Copyright (c) 2023 The Beam Team

//! Cryptographic primitives
//!
//! Nonce generation, key derivation, Fiat-Shamir transcripts and
//! multi-scalar multiplication over secp256k1, composed into coin
//! commitments, range proofs, Schnorr signatures, kernels and shielded
//! (Lelantus) spend and receive operations.

mod point;
pub use point::*;

mod hash;
pub use hash::{finish, HashWriter};

pub mod multimac;

mod context;
pub use context::{
    Context, CustomGenerator, RangeProofGenerator, RANGE_PROOF_BITS, RANGE_PROOF_GENS,
};

mod nonce;
pub use nonce::NonceGenerator;

mod oracle;
pub use oracle::Oracle;

mod kdf;
pub use kdf::{fourcc, Kdf, SUBKEY_TAG};

pub mod coin;

pub mod range_proof;

pub mod signature;
pub use signature::SignatureExt;

pub mod kernel;

pub mod address;

pub mod shielded;

#[cfg(test)]
pub(crate) mod test {
    use lazy_static::lazy_static;

    use super::Context;

    lazy_static! {
        static ref CONTEXT: Context = Context::new();
    }

    /// Shared generator context, built once per test binary
    pub fn context() -> &'static Context {
        &CONTEXT
    }
}
