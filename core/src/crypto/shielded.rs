// Copyright (c) 2023 The Beam Team

//! Shielded pool (Lelantus) keys, vouchers and proofs
//!
//! Each viewer index `i` derives a pair of Kdfs from the master key, `Gen`
//! for blinding and nonce material and `Ser` for spend keys. Vouchers hand
//! a sender everything required to build a shielded output the receiver
//! can later spend, shielded inputs are spent with the device part of a
//! one-out-of-many proof computed by [`spend_proof`].

use byteorder::{BigEndian, ByteOrder};
use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{
    address::address,
    coin::asset_generator,
    export, finish, import,
    kernel::{special_msg, KERNEL_SHIELDED_INPUT, KERNEL_SHIELDED_OUTPUT},
    range_proof::recover,
    scalar_bytes, scalar_from_bytes, scalar_reduce, scalar_reduce_flag,
    signature::{challenge, sign_partial},
    Context, HashWriter, Kdf, NonceGenerator, Oracle, SignatureExt,
};
use crate::apdu::{
    shielded::{CreateShieldedInputReq, CreateShieldedInputResp},
    tx::TxSendShieldedReq,
    types::{
        CompactPoint, ShieldedInputBlob, ShieldedInputFmt, ShieldedTxoUser, ShieldedVoucher,
    },
};

/// Child Kdf holding shielded input (re-spend output) keys
pub const SHIELDED_INPUT_CHILD: u32 = u32::MAX - 1;

/// Range proof user blob for shielded outputs, `{ aid u32 BE, flags u8 }`
const OUTPUT_USER_LEN: usize = 5;

/// Hash prefixed with the shielded output domain and `tag`
fn txt(tag: &[u8]) -> Sha256 {
    let mut sha = Sha256::new();
    sha.write_str(b"Output.Shielded.\0").write_str(tag);
    sha
}

/// Single scalar from a nonce generator over the voucher shared secret
fn ss_scalar(salt: &[u8], shared_secret: &[u8; 32]) -> Scalar {
    NonceGenerator::new(salt, shared_secret).next_scalar()
}

/// Shielded viewer key pair
#[derive(Clone)]
pub struct Viewer {
    gen: Kdf,
    ser: Kdf,
}

impl Viewer {
    /// Derive viewer `i` from the master key
    pub fn new(master: &Kdf, i: u32) -> Self {
        let mut sha = txt(b"Own.Gen\0");
        sha.write_num(i as u64);

        let k = Zeroizing::new(master.derive_pkey(&finish(sha)));
        let gen = Kdf::new(&Zeroizing::new(scalar_bytes(&k)));

        let mut sha = txt(b"Own.Ser\0");
        sha.write_num(i as u64);

        let s1 = Zeroizing::new(master.derive_pkey(&finish(sha)));
        let s2 = Zeroizing::new(master.derive_pkey(&Zeroizing::new(scalar_bytes(&s1))));

        let mut ser = Kdf::new(&Zeroizing::new(scalar_bytes(&s2)));
        ser.scale_cofactor(&s2);

        Self { gen, ser }
    }

    /// Spend key for a shielded output with blinding `kg`
    pub fn spend_key(&self, kg: &Scalar, by_viewer: bool) -> Scalar {
        let mut sha = txt(b"kG-k\0");
        sha.write_scalar(kg);
        let hv = finish(sha);

        let sk = Zeroizing::new(match by_viewer {
            true => self.gen.derive_skey(&hv),
            false => self.gen.derive_pkey(&hv),
        });

        // Serial preimage
        let mut sha = txt(b"k-pI\0");
        sha.write_scalar(&sk);

        self.ser.derive_skey(&finish(sha))
    }

    /// Build an (unsigned) voucher from `nonce`
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn voucher(&self, ctx: &Context, nonce: &[u8; 32]) -> ShieldedVoucher {
        let mut sha = txt(b"kG\0");
        sha.write_bytes(nonce);
        let kg = Zeroizing::new(self.gen.derive_pkey(&finish(sha)));

        let sk_spend = Zeroizing::new(self.spend_key(&kg, true));

        let mut o = Oracle::new();
        o.write_str(b"L.Spend\0")
            .write_projective(&ctx.mul_g(&sk_spend));
        let serial = Zeroizing::new(o.next_scalar());

        let serial_pub = export(&ctx.mul_gj(&kg, &serial));

        // Diffie-Hellman multiplier
        let mut sha = txt(b"DH\0");
        sha.write_point(&serial_pub);
        let m = Zeroizing::new(self.gen.derive_skey(&finish(sha)));

        let mut sha = txt(b"sp-sec\0");
        sha.write_projective(&ctx.mul_gj(&(*kg * *m), &(*serial * *m)));
        let shared_secret = finish(sha);

        let mut sha = txt(b"nG\0");
        sha.write_bytes(&shared_secret);
        let n_g = Zeroizing::new(self.gen.derive_pkey(&finish(sha)));

        let mut sha = txt(b"nJ\0");
        sha.write_bytes(&shared_secret);
        let n_j = Zeroizing::new(self.gen.derive_pkey(&finish(sha)));

        let nonce_pub = export(&ctx.mul_gj(&n_g, &n_j));

        let e = challenge(&nonce_pub, &ticket_hash(&serial_pub));

        ShieldedVoucher {
            serial_pub,
            nonce_pub,
            shared_secret,
            signature: Default::default(),
            k: [
                scalar_bytes(&sign_partial(&e, &kg, &n_g)),
                scalar_bytes(&sign_partial(&e, &serial, &n_j)),
            ],
        }
    }
}

/// Ticket message signed by the voucher `k` responses
pub fn ticket_hash(serial_pub: &CompactPoint) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.write_str(b"Out-S\0").write_point(serial_pub);
    finish(sha)
}

/// Voucher message signed by the receiver address key
pub fn voucher_hash(v: &ShieldedVoucher) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.write_str(b"voucher.1\0")
        .write_point(&v.serial_pub)
        .write_point(&v.nonce_pub)
        .write_bytes(&v.shared_secret);
    finish(sha)
}

/// Nonce for the voucher following one generated from `nonce`
pub fn next_voucher_nonce(nonce: &[u8; 32]) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.write_str(b"sh.v.n\0").write_bytes(nonce);
    finish(sha)
}

/// Check the ticket proof of a voucher, `k₀·G + k₁·J + e·SerialPub + NoncePub = 0`
pub fn ticket_is_valid(ctx: &Context, v: &ShieldedVoucher) -> bool {
    let (serial_pub, nonce_pub) = match (import(&v.serial_pub), import(&v.nonce_pub)) {
        (Some(s), Some(n)) => (s, n),
        _ => return false,
    };

    let e = challenge(&v.nonce_pub, &ticket_hash(&v.serial_pub));
    let r = ctx.mul_gj(&scalar_reduce(&v.k[0]), &scalar_reduce(&v.k[1]))
        + serial_pub * e
        + nonce_pub;

    r == ProjectivePoint::IDENTITY
}

/// Blinding factor of a shielded input owned by `master`
pub fn input_sk(master: &Kdf, blob: &ShieldedInputBlob, fmt: &ShieldedInputFmt) -> Scalar {
    let mut sha = Sha256::new();
    sha.write_str(b"sh.skout\0")
        .write_num(fmt.amount)
        .write_num(fmt.asset_id as u64)
        .write_num(fmt.fee)
        .write_bytes(&blob.k_ser_g)
        .write_num((blob.is_created_by_viewer != 0) as u64)
        .write_num(fmt.viewer_idx as u64);

    master
        .child(SHIELDED_INPUT_CHILD)
        .derive_skey(&finish(sha))
}

/// Shielded input proof failures
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum SpendError {
    /// Serial blinding `kSerG` overflows the group order
    SerialOverflow,
    /// Missing or undecodable decoy points
    Decoy,
}

/// Compute the device part of a shielded input spend proof
///
/// Produces the generalised Schnorr signature over the output commitment
/// and spend key, then blinds the first decoy generator and derives `zR`
/// for the host to complete the sigma proof. `req.decoys` must hold exactly
/// `spend.sigma_m` points.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn spend_proof(
    ctx: &Context,
    master: &Kdf,
    req: &CreateShieldedInputReq,
) -> Result<CreateShieldedInputResp, SpendError> {
    let fmt = &req.fmt;
    let sip = &req.spend;

    let agen = asset_generator(fmt.asset_id);
    let viewer = Viewer::new(master, fmt.viewer_idx);

    // Kernel message
    let mut sha = special_msg(fmt.fee, sip.h_min, sip.h_max, KERNEL_SHIELDED_INPUT);
    sha.write_num(sip.window_end);
    let msg = finish(sha);

    let mut oracle = Oracle::new();
    oracle
        .write_bytes(&msg)
        .write_bytes(&req.shielded_state)
        .write_point_opt(req.asset_gen())
        .write_num(sip.sigma_n as u64)
        .write_num(sip.sigma_m as u64);

    // Output commitment
    let sk_out = Zeroizing::new(input_sk(master, &req.blob, fmt));
    oracle.write_projective(&ctx.commit(&sk_out, fmt.amount, agen.as_ref()));

    // Spend key
    let k_ser_g =
        Zeroizing::new(scalar_from_bytes(&req.blob.k_ser_g).ok_or(SpendError::SerialOverflow)?);
    let sk_spend = Zeroizing::new(viewer.spend_key(&k_ser_g, req.blob.is_created_by_viewer != 0));
    oracle.write_projective(&ctx.mul_g(&sk_spend));

    let hv_sig_gen = oracle.next_hash();

    for p in &req.abcd {
        oracle.write_point(p);
    }

    // Nonces over everything visible to date, plus the secrets
    let mut n = {
        let mut sha = oracle.sha();
        for d in req.decoys() {
            sha.write_point(&d.map_err(|_| SpendError::Decoy)?);
        }

        sha.write_scalar(&sk_out)
            .write_bytes(&req.asset_sk)
            .write_bytes(&req.outp_sk);

        let seed = Zeroizing::new(finish(sha));
        let mut ng = NonceGenerator::new(b"lelantus.1\0", &seed);

        Zeroizing::new([ng.next_scalar(), ng.next_scalar(), ng.next_scalar()])
    };

    // SigGen
    let nonce_pub = export(&ctx.commit_raw(&n[0], &n[1], agen.as_ref()));

    let mut o2 = Oracle::new();
    o2.write_point(&nonce_pub).write_bytes(&hv_sig_gen);

    let asset_sk = Zeroizing::new(scalar_reduce(&req.asset_sk));
    let amount = Scalar::from(fmt.amount);

    let mix = *asset_sk * n[1];
    n[0] += mix;

    let sk_mixed = Zeroizing::new(*asset_sk * amount + *sk_out);

    let e = o2.next_scalar();
    n[0] += *sk_mixed * e;
    n[1] += amount * e;

    let e = o2.next_scalar();
    n[0] += *sk_spend * e;

    let sig = [scalar_bytes(&-n[0]), scalar_bytes(&-n[1])];

    // Blind the first decoy
    let mut decoys = req.decoys();

    let first = match decoys.next() {
        Some(Ok(p)) => p,
        _ => return Err(SpendError::Decoy),
    };
    let first = import(&first).ok_or(SpendError::Decoy)?;

    let g0 = export(&(ctx.mul_g(&n[2]) + first));
    oracle.write_point(&g0);

    for d in decoys {
        oracle.write_point(&d.map_err(|_| SpendError::Decoy)?);
    }

    let x = oracle.next_scalar();
    let mut x_pwr = x;
    for _ in 1..sip.sigma_m {
        x_pwr *= x;
    }

    // (skOld - skNew)·x^M - tau
    let outp_sk = Zeroizing::new(scalar_reduce(&req.outp_sk));
    let z_r = Zeroizing::new((*outp_sk - *sk_out) * x_pwr - n[2]);

    Ok(CreateShieldedInputResp {
        nonce_pub,
        sig,
        g0,
        z_r: scalar_bytes(&z_r),
    })
}

/// Shielded output parameters the range proof must commit to
struct OutputParams {
    /// Output blinding factor
    sk: Zeroizing<Scalar>,
    /// Overflow flags of the sender and message fields
    flags: u8,
    /// Message scalars
    extra: [Scalar; 2],
    /// Output kernel message
    krn_msg: [u8; 32],
    /// Range proof transcript prefix
    oracle: Oracle,
    /// Range proof nonce seed
    seed: Zeroizing<[u8; 32]>,
}

impl OutputParams {
    fn new(
        ctx: &Context,
        voucher: &ShieldedVoucher,
        user: &ShieldedTxoUser,
        amount: u64,
        aid: u32,
        asset_gen: Option<&CompactPoint>,
    ) -> Self {
        let (sender, f0) = scalar_reduce_flag(&user.sender);
        let sk = Zeroizing::new(ss_scalar(b"kG-O\0", &voucher.shared_secret) + sender);

        let agen = asset_generator(aid);
        let comm = ctx.commit(&sk, amount, agen.as_ref());

        let (m0, f1) = scalar_reduce_flag(&user.message[0]);
        let (m1, f2) = scalar_reduce_flag(&user.message[1]);
        let flags = f0 as u8 | (f1 as u8) << 1 | (f2 as u8) << 2;

        let krn_msg = finish(special_msg(0, 0, u64::MAX, KERNEL_SHIELDED_OUTPUT));

        let mut oracle = Oracle::new();
        oracle
            .write_bytes(&krn_msg)
            .write_point(&voucher.serial_pub)
            .write_point(&voucher.nonce_pub)
            .write_projective(&comm)
            .write_point_opt(asset_gen);

        let mut sha = oracle.sha();
        sha.write_str(b"bp-s\0").write_bytes(&voucher.shared_secret);
        let seed = Zeroizing::new(finish(sha));

        Self {
            sk,
            flags,
            extra: [m0, m1],
            krn_msg,
            oracle,
            seed,
        }
    }

    /// Blinding adjustment applied when the asset generator is blinded
    fn asset_blinding(voucher: &ShieldedVoucher, amount: u64) -> Scalar {
        ss_scalar(b"skG-O\0", &voucher.shared_secret) * Scalar::from(amount)
    }
}

/// Verify the shielded output of a send against the voucher it was built for
///
/// The voucher must be signed by the peer (and the peer must be our own
/// address `addr_id` when non-zero), and the host-built range proof must
/// let the receiver recover every output parameter. Returns the output
/// blinding factor and the nested output kernel ID.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn verify_output(
    ctx: &Context,
    master: &Kdf,
    req: &TxSendShieldedReq,
    amount: u64,
    aid: u32,
) -> Option<(Zeroizing<Scalar>, [u8; 32])> {
    let v = &req.voucher;

    // The ticket proof was checked by the receiver that signed the voucher
    if !v
        .signature
        .is_valid_x(ctx, &voucher_hash(v), &req.mutual.peer)
    {
        return None;
    }

    if req.mutual.addr_id != 0 {
        let (_sk, id) = address(ctx, master, req.mutual.addr_id);
        if id != req.mutual.peer {
            return None;
        }
    }

    let mut p = OutputParams::new(ctx, v, &req.user, amount, aid, req.asset_gen());

    let mut user = [0u8; OUTPUT_USER_LEN];
    let r = recover(
        ctx,
        &req.range_proof,
        &mut p.oracle,
        &p.seed,
        &mut user,
        Some(&p.seed),
        true,
    )?;

    if r.extra != Some(p.extra)
        || user[4] != p.flags
        || r.amount != amount
        || BigEndian::read_u32(&user[..4]) != aid
    {
        return None;
    }

    let mut sk = Zeroizing::new(r.sk?);
    if aid != 0 || req.hide_asset_always != 0 {
        *sk += OutputParams::asset_blinding(v, amount);
    }

    if *sk != *p.sk {
        return None;
    }

    let proof = req.range_proof.to_bytes().ok()?;

    let mut sha = Sha256::new();
    sha.write_bytes(&p.krn_msg).write_bytes(&proof);

    Some((p.sk, finish(sha)))
}
