// Copyright (c) 2023 The Beam Team

//! Generator context

use k256::{elliptic_curve::point::AffineCoordinates, ProjectivePoint, Scalar};

use super::{
    export,
    multimac::{multi_mac, FastGenerator, SecureGenerator, ODD_CUSTOM, ODD_H, ODD_RANGEPROOF},
    HashWriter, Oracle,
};

/// Number of bits in a range-proof value
pub const RANGE_PROOF_BITS: usize = 64;

/// Generators used by range proofs (`2 * RANGE_PROOF_BITS`)
pub const RANGE_PROOF_GENS: usize = 2 * RANGE_PROOF_BITS;

/// Custom (asset or public key) generator
pub type CustomGenerator = FastGenerator<ODD_CUSTOM>;

/// Range-proof vector generator
pub type RangeProofGenerator = FastGenerator<ODD_RANGEPROOF>;

/// Precomputed generator tables
///
/// `G` is the curve base point, `H`, `J` and the range-proof generators are
/// derived by hashing domain strings to the curve so no discrete log
/// relation between them is known.
pub struct Context {
    g: SecureGenerator,
    j: SecureGenerator,
    h: FastGenerator<ODD_H>,
    j_point: ProjectivePoint,
    rangeproof: [RangeProofGenerator; RANGE_PROOF_GENS],
}

fn hash_to_point(tag: &[u8], idx: Option<u64>) -> ProjectivePoint {
    let mut o = Oracle::new();
    o.write_str(tag);
    if let Some(i) = idx {
        o.write_num(i);
    }

    let (_c, p) = o.next_point();
    p.into()
}

impl Context {
    /// Derive and precompute all generators
    pub fn new() -> Self {
        let nums = hash_to_point(b"beam.gen.nums\0", None);
        let h = hash_to_point(b"beam.gen.H\0", None);
        let j = hash_to_point(b"beam.gen.J\0", None);

        let rangeproof = core::array::from_fn(|i| {
            RangeProofGenerator::new(&hash_to_point(b"beam.gen.rp\0", Some(i as u64)))
        });

        #[cfg(feature = "log")]
        log::debug!("generator context ready");

        Self {
            g: SecureGenerator::new(&ProjectivePoint::GENERATOR, &nums),
            j: SecureGenerator::new(&j, &nums),
            h: FastGenerator::new(&h),
            j_point: j,
            rangeproof,
        }
    }

    pub fn g(&self) -> &SecureGenerator {
        &self.g
    }

    pub fn j(&self) -> &SecureGenerator {
        &self.j
    }

    pub fn h(&self) -> &FastGenerator<ODD_H> {
        &self.h
    }

    pub fn j_point(&self) -> ProjectivePoint {
        self.j_point
    }

    pub fn h_point(&self) -> ProjectivePoint {
        (*self.h.point()).into()
    }

    /// Range-proof generator `i` (`0..128`)
    pub fn rangeproof(&self, i: usize) -> &RangeProofGenerator {
        &self.rangeproof[i]
    }

    /// `k·G` in constant time
    pub fn mul_g(&self, k: &Scalar) -> ProjectivePoint {
        multi_mac::<ODD_H, 1, 0>([(&self.g, k)], [])
    }

    /// `k·J` in constant time
    pub fn mul_j(&self, k: &Scalar) -> ProjectivePoint {
        multi_mac::<ODD_H, 1, 0>([(&self.j, k)], [])
    }

    /// `kg·G + kj·J` in constant time
    pub fn mul_gj(&self, kg: &Scalar, kj: &Scalar) -> ProjectivePoint {
        multi_mac::<ODD_H, 2, 0>([(&self.g, kg), (&self.j, kj)], [])
    }

    /// Pedersen commitment `sk·G + amount·H`, or over a custom asset generator
    pub fn commit(
        &self,
        sk: &Scalar,
        amount: u64,
        asset_gen: Option<&CustomGenerator>,
    ) -> ProjectivePoint {
        self.commit_raw(sk, &Scalar::from(amount), asset_gen)
    }

    /// Commitment `sk·G + v·H` to a scalar value
    pub fn commit_raw(
        &self,
        sk: &Scalar,
        v: &Scalar,
        asset_gen: Option<&CustomGenerator>,
    ) -> ProjectivePoint {
        match asset_gen {
            Some(a) => multi_mac([(&self.g, sk)], [(a, v)]),
            None => multi_mac([(&self.g, sk)], [(&self.h, v)]),
        }
    }

    /// Public key x coordinate for `sk`
    ///
    /// `sk` is negated where required so the matching point has even y.
    pub fn sk_to_pk(&self, sk: &mut Scalar) -> [u8; 32] {
        let p = self.mul_g(sk).to_affine();

        if bool::from(p.y_is_odd()) {
            *sk = -*sk;
        }

        export(&p.into()).x
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
