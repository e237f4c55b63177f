// Copyright (c) 2023 The Beam Team

//! Coin identifiers and switch commitments

use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::{export, finish, Context, CustomGenerator, HashWriter, Kdf, Oracle};
use crate::apdu::types::{CoinId, CompactPoint};

/// Original key scheme, amount and asset not hashed
pub const SCHEME_V0: u8 = 0;
/// Historical scheme with a child key bug, treated as V0 without a child Kdf
pub const SCHEME_BB21: u8 = 1;
/// Current scheme, binding amount and asset into the key
pub const SCHEME_V1: u8 = 2;

/// Bits of `sub_idx` holding the subkey index
pub const SUBKEY_BITS: u32 = 24;

const SUBKEY_MASK: u32 = (1 << SUBKEY_BITS) - 1;

/// Asset generator point for a non-native asset
pub fn asset_point(aid: u32) -> (CompactPoint, ProjectivePoint) {
    let mut o = Oracle::new();
    o.write_str(b"B.Asset.Gen.V1\0").write_num(aid as u64);

    let (c, p) = o.next_point();
    (c, p.into())
}

/// Asset generator table, `None` for the native asset
pub fn asset_generator(aid: u32) -> Option<CustomGenerator> {
    match aid {
        0 => None,
        _ => Some(CustomGenerator::new(&asset_point(aid).1)),
    }
}

/// Key derivation and commitment helpers for [`CoinId`]
pub trait CoinIdExt {
    /// Key scheme
    fn scheme(&self) -> u8;

    /// Subkey index
    fn subkey(&self) -> u32;

    /// Whether keys derive from a child Kdf
    fn has_child(&self) -> bool {
        self.subkey() != 0 && self.scheme() != SCHEME_BB21
    }

    /// Key derivation hash
    fn hash(&self) -> [u8; 32];

    /// Secret key before the switch adjustment
    fn sk_raw(&self, master: &Kdf) -> Scalar;

    /// Blinding factor and commitment
    fn sk_comm(&self, master: &Kdf, ctx: &Context) -> (Scalar, CompactPoint);

    /// Blinding factor alone
    fn sk(&self, master: &Kdf, ctx: &Context) -> Scalar;
}

impl CoinIdExt for CoinId {
    fn scheme(&self) -> u8 {
        (self.sub_idx >> SUBKEY_BITS) as u8
    }

    fn subkey(&self) -> u32 {
        self.sub_idx & SUBKEY_MASK
    }

    fn hash(&self) -> [u8; 32] {
        let mut sha = Sha256::new();

        let mut scheme = self.scheme();
        let mut sub_idx = self.sub_idx;

        // BB2.1 keys hash as V0
        if scheme == SCHEME_BB21 {
            sub_idx = self.subkey() | (SCHEME_V0 as u32) << SUBKEY_BITS;
            scheme = SCHEME_V0;
        }

        match scheme {
            SCHEME_V0 => sha.write_str(b"kid\0"),
            _ => sha.write_str(b"kidv-1\0"),
        };

        sha.write_num(self.idx)
            .write_num(self.kind as u64)
            .write_num(sub_idx as u64);

        if scheme >= SCHEME_V1 {
            sha.write_num(self.amount);

            if self.asset_id != 0 {
                sha.write_str(b"asset\0").write_num(self.asset_id as u64);
            }
        }

        finish(sha)
    }

    fn sk_raw(&self, master: &Kdf) -> Scalar {
        let hv = self.hash();

        match self.has_child() {
            true => master.child(self.subkey()).derive_skey(&hv),
            false => master.derive_skey(&hv),
        }
    }

    fn sk_comm(&self, master: &Kdf, ctx: &Context) -> (Scalar, CompactPoint) {
        let (sk, delta, c0) = switch(self, master, ctx);

        let comm = ctx.mul_g(&delta) + c0;

        (sk, export(&comm))
    }

    fn sk(&self, master: &Kdf, ctx: &Context) -> Scalar {
        switch(self, master, ctx).0
    }
}

/// Apply the switch adjustment, returning `(sk + delta, delta, C0)`
fn switch(cid: &CoinId, master: &Kdf, ctx: &Context) -> (Scalar, Scalar, ProjectivePoint) {
    let mut sk = cid.sk_raw(master);

    let agen = asset_generator(cid.asset_id);
    let c0 = ctx.commit(&sk, cid.amount, agen.as_ref());
    let c1 = ctx.mul_j(&sk);

    let mut o = Oracle::new();
    o.write_projective(&c0).write_projective(&c1);
    let delta = o.next_scalar();

    let r = sk + delta;
    sk.zeroize();

    (r, delta, c0)
}
