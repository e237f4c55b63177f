// Copyright (c) 2023 The Beam Team

//! HKDF-style deterministic nonce generator

use hkdf::HkdfExtract;
use hmac::{
    digest::{generic_array::GenericArray, typenum::U64, KeyInit},
    Hmac, Mac,
};
use k256::Scalar;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{scalar_bytes, scalar_from_stream};

/// Deterministic generator of secret values
///
/// Initialised with a null-terminated salt and seed material (HKDF extract),
/// each output is `HMAC(prk, [prev_okm] || context || counter)` with the
/// counter pre-incremented from zero.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NonceGenerator {
    prk: [u8; 32],
    okm: [u8; 32],
    counter: u8,
    first: bool,
    #[zeroize(skip)]
    context: &'static [u8],
}

impl NonceGenerator {
    /// Create a generator from a salt and 32-byte seed
    pub fn new(salt: &[u8], seed: &[u8; 32]) -> Self {
        Self::from_parts(salt, &[&seed[..]])
    }

    /// Create a generator from a salt and seed material supplied in parts
    pub fn from_parts(salt: &[u8], parts: &[&[u8]]) -> Self {
        let mut e = HkdfExtract::<Sha256>::new(Some(salt));
        for p in parts {
            e.input_ikm(p);
        }
        let (prk, _) = e.finalize();

        let mut s = Self {
            prk: [0u8; 32],
            okm: [0u8; 32],
            counter: 0,
            first: true,
            context: &[],
        };
        s.prk.copy_from_slice(&prk);

        s
    }

    /// Create a generator from a salt and a scalar seed (written big-endian)
    pub fn from_scalar(salt: &[u8], seed: &Scalar) -> Self {
        let mut b = scalar_bytes(seed);
        let s = Self::new(salt, &b);
        b.zeroize();
        s
    }

    /// Set the expansion context (null-terminated)
    pub fn set_context(&mut self, ctx: &'static [u8]) {
        self.context = ctx;
    }

    /// Restart expansion from the same key material
    pub fn reset(&mut self) {
        self.counter = 0;
        self.first = true;
    }

    /// Advance to and return the next output block
    pub fn next_okm(&mut self) -> &[u8; 32] {
        let mut key = GenericArray::<u8, U64>::default();
        key[..32].copy_from_slice(&self.prk);

        let mut mac = <Hmac<Sha256> as KeyInit>::new(&key);
        key.zeroize();

        if self.first {
            self.first = false;
        } else {
            mac.update(&self.okm);
        }

        mac.update(self.context);

        self.counter = self.counter.wrapping_add(1);
        mac.update(&[self.counter]);

        self.okm.copy_from_slice(&mac.finalize().into_bytes());

        &self.okm
    }

    /// Draw the next non-zero scalar below the group order
    pub fn next_scalar(&mut self) -> Scalar {
        scalar_from_stream(|| *self.next_okm())
    }
}
