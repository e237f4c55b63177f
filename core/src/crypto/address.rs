// Copyright (c) 2023 The Beam Team

//! Wallet addresses and payment confirmations

use k256::Scalar;
use sha2::{Digest, Sha256};

use super::{finish, fourcc, Context, HashWriter, Kdf};

/// Address key type tag
pub const ADDRESS_TAG: u32 = fourcc(b"tRid");

/// Derive the signing key and the 32-byte public ID for address `addr_id`
///
/// The key is normalised so the public point has even y, the ID is its x
/// coordinate.
pub fn address(ctx: &Context, master: &Kdf, addr_id: u64) -> (Scalar, [u8; 32]) {
    let mut sha = Sha256::new();
    sha.write_str(b"kid\0")
        .write_num(addr_id)
        .write_num(ADDRESS_TAG as u64)
        .write_num(0);

    let mut sk = master.derive_skey(&finish(sha));
    let id = ctx.sk_to_pk(&mut sk);

    (sk, id)
}

/// Message signed by a receiver to confirm payment of `amount` from `sender` under kernel `krn_id`
pub fn payment_confirmation(
    sender: &[u8; 32],
    krn_id: &[u8; 32],
    amount: u64,
    aid: u32,
) -> [u8; 32] {
    let mut sha = Sha256::new();

    sha.write_str(b"PaymentConfirmation\0")
        .write_bytes(krn_id)
        .write_bytes(sender)
        .write_num(amount);

    if aid != 0 {
        sha.write_str(b"asset\0").write_num(aid as u64);
    }

    finish(sha)
}

#[cfg(test)]
mod test {
    use k256::ProjectivePoint;

    use super::*;
    use crate::{
        apdu::types::Signature,
        crypto::{export, test::context, SignatureExt},
    };

    #[test]
    fn address_key_matches_id() {
        let ctx = context();
        let kdf = Kdf::new(&[4u8; 32]);

        for addr_id in [0, 1, 15, u64::MAX] {
            let (sk, id) = address(ctx, &kdf, addr_id);

            let p = export(&(ProjectivePoint::GENERATOR * sk));
            assert_eq!(p.x, id);
            assert_eq!(p.y, 0);
        }

        assert_ne!(address(ctx, &kdf, 1).1, address(ctx, &kdf, 2).1);
    }

    #[test]
    fn payment_proof_verifies_by_id() {
        let ctx = context();
        let kdf = Kdf::new(&[4u8; 32]);
        let (sk, id) = address(ctx, &kdf, 7);

        let msg = payment_confirmation(&[1u8; 32], &[2u8; 32], 100, 0);
        let s = Signature::sign(ctx, &msg, &sk);
        assert!(s.is_valid_x(ctx, &msg, &id));
    }

    #[test]
    fn confirmation_binds_asset() {
        let a = payment_confirmation(&[1u8; 32], &[2u8; 32], 100, 0);
        let b = payment_confirmation(&[1u8; 32], &[2u8; 32], 100, 3);
        let c = payment_confirmation(&[1u8; 32], &[2u8; 32], 101, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
