// Copyright (c) 2023 The Beam Team

//! Transaction kernel identifiers

use sha2::{Digest, Sha256};

use super::{finish, Context, HashWriter, SignatureExt};
use crate::apdu::types::{Signature, TxKernelCommitments, TxKernelUser};

/// Shielded output kernel type
pub const KERNEL_SHIELDED_OUTPUT: u8 = 3;
/// Shielded input kernel type
pub const KERNEL_SHIELDED_INPUT: u8 = 4;

/// Kernel ID over user parameters, commitment and any nested kernel IDs
pub fn kernel_id(
    krn: &TxKernelUser,
    comms: &TxKernelCommitments,
    nested: &[[u8; 32]],
) -> [u8; 32] {
    let mut sha = Sha256::new();

    sha.write_num(krn.fee)
        .write_num(krn.h_min)
        .write_num(krn.h_max)
        .write_point(&comms.commitment)
        // Asset emission, unused
        .write_num(0)
        // Extended flags
        .write_bytes(&[0]);

    for id in nested {
        sha.write_bytes(&[0]).write_bytes(id);
    }

    // End of nested kernels
    sha.write_bytes(&[1]);

    finish(sha)
}

/// Start the message of a special (shielded) kernel, left open for type-specific fields
pub fn special_msg(fee: u64, h_min: u64, h_max: u64, kind: u8) -> Sha256 {
    let mut sha = Sha256::new();

    sha.write_num(fee)
        .write_num(h_min)
        .write_num(h_max)
        .write_bytes(&[0u8; 32])
        .write_bytes(&[1])
        .write_num(kind as u64)
        .write_bytes(&[1]);

    sha
}

/// Check a kernel signature `k_sig` against the kernel commitment
pub fn is_valid(
    ctx: &Context,
    krn: &TxKernelUser,
    comms: &TxKernelCommitments,
    k_sig: &[u8; 32],
) -> bool {
    let id = kernel_id(krn, comms, &[]);

    let sig = Signature {
        nonce_pub: comms.nonce_pub,
        k: *k_sig,
    };

    sig.is_valid(ctx, &id, &comms.commitment)
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::{
        apdu::types::CompactPoint,
        crypto::{
            export, scalar_bytes, scalar_reduce,
            signature::{challenge, sign_partial},
            test::context,
        },
    };

    fn comms() -> TxKernelCommitments {
        TxKernelCommitments {
            commitment: CompactPoint::new(random(), 0),
            nonce_pub: CompactPoint::new(random(), 1),
        }
    }

    #[test]
    fn id_binds_fields() {
        let krn = TxKernelUser::new(8, 100500, 100600);
        let c = comms();
        let id = kernel_id(&krn, &c, &[]);

        assert_ne!(id, kernel_id(&TxKernelUser::new(9, 100500, 100600), &c, &[]));
        assert_ne!(id, kernel_id(&krn, &comms(), &[]));
        assert_ne!(id, kernel_id(&krn, &c, &[[0u8; 32]]));

        // The nonce does not contribute
        let mut c2 = c;
        c2.nonce_pub = CompactPoint::new(random(), 0);
        assert_eq!(id, kernel_id(&krn, &c2, &[]));
    }

    #[test]
    fn id_layout() {
        let krn = TxKernelUser::new(1, 2, 300);
        let c = comms();
        let nested = [7u8; 32];

        let mut sha = Sha256::new();
        sha.write_bytes(&[1, 2, 0xac, 0x02])
            .write_bytes(&c.commitment.x)
            .write_bytes(&[c.commitment.y])
            .write_bytes(&[0, 0, 0])
            .write_bytes(&nested)
            .write_bytes(&[1]);

        assert_eq!(kernel_id(&krn, &c, &[nested]), finish(sha));
    }

    #[test]
    fn signed_kernel_valid() {
        let ctx = context();
        let krn = TxKernelUser::new(8, 1, 10);

        let sk = scalar_reduce(&random());
        let nonce = scalar_reduce(&random());
        let c = TxKernelCommitments {
            commitment: export(&ctx.mul_g(&sk)),
            nonce_pub: export(&ctx.mul_g(&nonce)),
        };

        let e = challenge(&c.nonce_pub, &kernel_id(&krn, &c, &[]));
        let k = scalar_bytes(&sign_partial(&e, &sk, &nonce));

        assert!(is_valid(ctx, &krn, &c, &k));
        assert!(!is_valid(ctx, &TxKernelUser::new(9, 1, 10), &c, &k));
    }

    #[test]
    fn special_msg_types_differ() {
        let a = finish(special_msg(0, 0, u64::MAX, KERNEL_SHIELDED_OUTPUT));
        let b = finish(special_msg(0, 0, u64::MAX, KERNEL_SHIELDED_INPUT));
        assert_ne!(a, b);
    }
}
