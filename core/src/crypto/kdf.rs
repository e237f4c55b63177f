// Copyright (c) 2023 The Beam Team

//! Hierarchical key derivation

use k256::Scalar;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{export, finish, scalar_bytes, Context, HashWriter, NonceGenerator};
use crate::apdu::types::KdfPub;

/// Pack four ASCII characters into a big-endian integer tag
pub const fn fourcc(s: &[u8; 4]) -> u32 {
    (s[0] as u32) << 24 | (s[1] as u32) << 16 | (s[2] as u32) << 8 | s[3] as u32
}

/// Child Kdf type tag
pub const SUBKEY_TAG: u32 = fourcc(b"SubK");

/// Key derivation function, a 32-byte secret with a scalar cofactor
///
/// Public keys derive from `secret` alone (`pkey`), secret keys are
/// additionally multiplied by the cofactor (`skey`).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Kdf {
    secret: [u8; 32],
    cofactor: Scalar,
}

impl Kdf {
    /// Initialise a Kdf from a 32-byte seed
    pub fn new(seed: &[u8; 32]) -> Self {
        let mut ng = NonceGenerator::new(b"beam-HKdf\0", seed);

        ng.set_context(b"gen\0");
        let secret = *ng.next_okm();

        ng.reset();
        ng.set_context(b"coF\0");
        let cofactor = ng.next_scalar();

        Self { secret, cofactor }
    }

    /// Nonce generator keyed by this Kdf and a derivation hash
    pub fn derive_ng(&self, hv: &[u8; 32]) -> NonceGenerator {
        NonceGenerator::from_parts(b"beam-Key\0", &[&self.secret, hv])
    }

    /// Derive the public-side key for `hv`
    pub fn derive_pkey(&self, hv: &[u8; 32]) -> Scalar {
        self.derive_ng(hv).next_scalar()
    }

    /// Derive the secret key for `hv`
    pub fn derive_skey(&self, hv: &[u8; 32]) -> Scalar {
        self.derive_pkey(hv) * self.cofactor
    }

    /// Derive the child Kdf at index `i`
    pub fn child(&self, i: u32) -> Self {
        let hv = child_hash(i);
        let seed = Zeroizing::new(scalar_bytes(&self.derive_skey(&hv)));
        Self::new(&seed)
    }

    /// Multiply the cofactor by `k`
    pub(crate) fn scale_cofactor(&mut self, k: &Scalar) {
        self.cofactor *= k;
    }

    /// Public form of this Kdf, the secret with the cofactor on G and J
    pub fn to_pub(&self, ctx: &Context) -> KdfPub {
        KdfPub {
            secret: self.secret,
            cofactor_g: export(&ctx.mul_g(&self.cofactor)),
            cofactor_j: export(&ctx.mul_j(&self.cofactor)),
        }
    }
}

/// Derivation hash for child Kdf `i`
fn child_hash(i: u32) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.write_str(b"kid\0")
        .write_num(i as u64)
        .write_num(SUBKEY_TAG as u64)
        .write_num(0);
    finish(sha)
}

#[cfg(test)]
mod test {
    use k256::ProjectivePoint;

    use super::*;
    use crate::crypto::test::context;

    #[test]
    fn fourcc_packing() {
        assert_eq!(SUBKEY_TAG, 0x5375_624b);
    }

    #[test]
    fn deterministic() {
        let a = Kdf::new(&[1u8; 32]);
        let b = Kdf::new(&[1u8; 32]);
        let c = Kdf::new(&[2u8; 32]);

        let hv = [7u8; 32];
        assert_eq!(a.derive_skey(&hv), b.derive_skey(&hv));
        assert_ne!(a.derive_skey(&hv), c.derive_skey(&hv));
        assert_ne!(a.derive_pkey(&hv), a.derive_skey(&hv));
    }

    #[test]
    fn secret_key_is_cofactor_multiple() {
        let k = Kdf::new(&[3u8; 32]);
        let hv = [9u8; 32];

        assert_eq!(k.derive_skey(&hv), k.derive_pkey(&hv) * k.cofactor);
    }

    #[test]
    fn children_differ() {
        let k = Kdf::new(&[3u8; 32]);
        let hv = [9u8; 32];

        let c1 = k.child(1);
        let c2 = k.child(2);

        assert_ne!(c1.derive_skey(&hv), c2.derive_skey(&hv));
        assert_ne!(c1.derive_skey(&hv), k.derive_skey(&hv));
        assert_eq!(c1.derive_skey(&hv), k.child(1).derive_skey(&hv));
    }

    #[test]
    fn public_kdf() {
        let ctx = context();
        let k = Kdf::new(&[5u8; 32]);

        let p = k.to_pub(ctx);
        assert_eq!(p.secret, k.secret);
        assert_eq!(p.cofactor_g, export(&(ProjectivePoint::GENERATOR * k.cofactor)));
        assert_eq!(p.cofactor_j, export(&(ctx.j_point() * k.cofactor)));
    }
}
