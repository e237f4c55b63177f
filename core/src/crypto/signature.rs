// Copyright (c) 2023 The Beam Team

//! Schnorr signatures

use k256::{elliptic_curve::Group, AffinePoint, ProjectivePoint, Scalar};
use zeroize::Zeroizing;

use super::{
    export, import_affine, multimac::multi_mac, scalar_bytes, scalar_reduce, Context,
    CustomGenerator, HashWriter, NonceGenerator, Oracle,
};
use crate::apdu::types::{CompactPoint, Signature};

/// Signature challenge `e = H(nonce_pub, msg)`
pub fn challenge(nonce_pub: &CompactPoint, msg: &[u8; 32]) -> Scalar {
    let mut o = Oracle::new();
    o.write_point(nonce_pub).write_bytes(msg);
    o.next_scalar()
}

/// Partial signature response `-(e·sk + nonce)`
pub fn sign_partial(e: &Scalar, sk: &Scalar, nonce: &Scalar) -> Scalar {
    -(*e * sk + nonce)
}

/// Schnorr signing and verification over [`Signature`]
///
/// Signatures satisfy `k·G + e·Pk + NoncePub = 0`.
pub trait SignatureExt: Sized {
    /// Sign `msg` with `sk`, the nonce derived deterministically from both
    fn sign(ctx: &Context, msg: &[u8; 32], sk: &Scalar) -> Self;

    /// Verify against public key `pk`
    fn is_valid(&self, ctx: &Context, msg: &[u8; 32], pk: &CompactPoint) -> bool;

    /// Verify against a public key given by x coordinate (even y)
    fn is_valid_x(&self, ctx: &Context, msg: &[u8; 32], pk_x: &[u8; 32]) -> bool {
        self.is_valid(ctx, msg, &CompactPoint::new(*pk_x, 0))
    }
}

impl SignatureExt for Signature {
    fn sign(ctx: &Context, msg: &[u8; 32], sk: &Scalar) -> Self {
        let sk_bytes = Zeroizing::new(scalar_bytes(sk));
        let mut ng = NonceGenerator::from_parts(b"beam-Schnorr\0", &[&sk_bytes[..], msg]);
        let nonce = Zeroizing::new(ng.next_scalar());

        let nonce_pub = export(&ctx.mul_g(&nonce));
        let e = challenge(&nonce_pub, msg);
        let k = Zeroizing::new(sign_partial(&e, sk, &nonce));

        Self {
            nonce_pub,
            k: scalar_bytes(&k),
        }
    }

    fn is_valid(&self, ctx: &Context, msg: &[u8; 32], pk: &CompactPoint) -> bool {
        let pk = match import_affine(pk) {
            Some(p) => p,
            None => return false,
        };

        let nonce_pub = match import_affine(&self.nonce_pub) {
            Some(p) => p,
            None => return false,
        };

        // Overflow of k is not checked
        let k = scalar_reduce(&self.k);

        let mut r = match pk == AffinePoint::IDENTITY {
            true => ctx.mul_g(&k),
            false => {
                let g = CustomGenerator::new(&ProjectivePoint::from(pk));
                let e = challenge(&self.nonce_pub, msg);
                multi_mac([(ctx.g(), &k)], [(&g, &e)])
            }
        };

        r += nonce_pub;

        bool::from(r.is_identity())
    }
}
