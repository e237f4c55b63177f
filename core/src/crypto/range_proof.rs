// Copyright (c) 2023 The Beam Team

//! Bulletproof range proofs, device side
//!
//! The key keeper runs the secret part of proof construction for its own
//! coins ([`calculate`]): the `A` and `S` vector commitments, the blinded
//! `T1` / `T2` and `tauX`. The host completes the inner product argument.
//!
//! [`recover`] checks a complete packed proof built from a known seed,
//! recovering the embedded parameters and optionally the blinding factor
//! and the two extra scalars carried in the condensed inner product.

use byteorder::{BigEndian, ByteOrder};
use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use super::{
    coin::CoinIdExt,
    export, finish, import,
    multimac::{multi_mac, ODD_RANGEPROOF},
    scalar_bytes, scalar_from_bytes, scalar_reduce, Context, HashWriter, Kdf, NonceGenerator,
    Oracle, RangeProofGenerator, RANGE_PROOF_BITS, RANGE_PROOF_GENS,
};
use crate::apdu::types::{
    CoinId, CompactPoint, RangeProofPacked, RANGE_PROOF_CYCLES as CYCLES,
};

/// S-vector terms evaluated per multi-scalar pass
#[cfg(feature = "scarce-stack")]
pub const NAGGLE: usize = 22;

/// S-vector terms evaluated per multi-scalar pass
#[cfg(not(feature = "scarce-stack"))]
pub const NAGGLE: usize = RANGE_PROOF_GENS;

/// Bytes of user data available alongside the amount in the embedded parameters
pub const USER_MAX: usize = 32 - 8;

/// CoinID user blob length (asset, idx, type, sub_idx)
const COIN_USER_LEN: usize = 20;

/// Device outputs of [`calculate`]
#[derive(Clone, Debug)]
pub struct RangeProofOutput {
    /// Blinded `T1`, `T2`
    pub t_out: [CompactPoint; 2],
    pub tau_x: Scalar,

    /// Coin commitment
    pub commitment: CompactPoint,
    /// Vector commitments
    pub a: CompactPoint,
    pub s: CompactPoint,
}

impl Drop for RangeProofOutput {
    fn drop(&mut self) {
        self.tau_x.zeroize();
    }
}

/// Recovered proof parameters
#[derive(Clone, Debug)]
pub struct Recovered {
    pub amount: u64,
    /// Blinding factor, if a key seed was supplied
    pub sk: Option<Scalar>,
    /// Extra scalars, if requested
    pub extra: Option<[Scalar; 2]>,
}

impl Drop for Recovered {
    fn drop(&mut self) {
        if let Some(s) = &mut self.sk {
            s.zeroize();
        }
    }
}

/// Nonce seed for a coin proof, from the commitment and the owner Kdf
pub fn coin_seed(master: &Kdf, comm: &CompactPoint) -> [u8; 32] {
    let mut sha = Sha256::new();
    sha.write_point(comm);
    let hv = finish(sha);

    let k = Zeroizing::new(master.derive_pkey(&hv));

    let mut sha = Sha256::new();
    sha.write_scalar(&k);
    finish(sha)
}

/// Transcript prefix binding the proof to its commitment and asset generator
pub fn oracle_prefix(comm: &CompactPoint, asset_gen: Option<&CompactPoint>) -> Oracle {
    let mut o = Oracle::new();

    // Incubation period, always zero
    o.write_num(0).write_point(comm).write_point_opt(asset_gen);

    o
}

/// Embedded parameters for a coin, `{ 0u32, aid, idx, type, sub_idx, amount }` big-endian
fn coin_params(cid: &CoinId) -> [u8; 32] {
    let mut b = [0u8; 32];

    BigEndian::write_u32(&mut b[4..], cid.asset_id);
    BigEndian::write_u64(&mut b[8..], cid.idx);
    BigEndian::write_u32(&mut b[16..], cid.kind);
    BigEndian::write_u32(&mut b[20..], cid.sub_idx);
    BigEndian::write_u64(&mut b[24..], cid.amount);

    b
}

/// `A = alpha·G + Σ (bitᵢ ? Rᵢ : -R₆₄₊ᵢ)`
fn a_point(ctx: &Context, alpha: &Scalar, amount: u64) -> ProjectivePoint {
    let mut a = ctx.mul_g(alpha);

    for i in 0..RANGE_PROOF_BITS {
        match (amount >> i) & 1 != 0 {
            true => a += *ctx.rangeproof(i).point(),
            false => a += -*ctx.rangeproof(RANGE_PROOF_BITS + i).point(),
        }
    }

    a
}

/// `S = rho·G + Σ sᵢ·Rᵢ`, evaluated `W` terms at a time
///
/// Draws `rho` then the 128 `sᵢ` from `ng`, `k_extra` is folded into
/// `s₀` and `s₆₄`.
#[cfg_attr(feature = "noinline", inline(never))]
fn s_point<const W: usize>(
    ctx: &Context,
    ng: &mut NonceGenerator,
    k_extra: Option<&[[u8; 32]; 2]>,
) -> ProjectivePoint {
    let rho = Zeroizing::new(ng.next_scalar());

    let mut res = ProjectivePoint::IDENTITY;
    let mut s = [Scalar::ZERO; W];
    let mut base = 0;

    while base < RANGE_PROOF_GENS {
        let n = W.min(RANGE_PROOF_GENS - base);

        for (i, v) in s.iter_mut().enumerate() {
            if i >= n {
                *v = Scalar::ZERO;
                continue;
            }

            *v = ng.next_scalar();

            let idx = base + i;
            if let (Some(k), 0) = (k_extra, idx % RANGE_PROOF_BITS) {
                *v += scalar_reduce(&k[idx / RANGE_PROOF_BITS]);
            }
        }

        let fast: [(&RangeProofGenerator, &Scalar); W] = core::array::from_fn(|i| {
            (
                ctx.rangeproof((base + i).min(RANGE_PROOF_GENS - 1)),
                &s[i],
            )
        });

        res += match base {
            0 => multi_mac::<ODD_RANGEPROOF, 1, W>([(ctx.g(), &rho)], fast),
            _ => multi_mac::<ODD_RANGEPROOF, 0, W>([], fast),
        };

        base += W;
    }

    s.zeroize();

    res
}

/// Run the device part of a range proof for `cid`
///
/// `t_in` are the host's partial `T1`, `T2`, `k_extra` optional extra scalars
/// to embed and `asset_gen` the (blinded) asset generator used by the host.
/// Returns `None` if `t_in` does not decode.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn calculate(
    ctx: &Context,
    master: &Kdf,
    cid: &CoinId,
    t_in: &[CompactPoint; 2],
    k_extra: Option<&[[u8; 32]; 2]>,
    asset_gen: Option<&CompactPoint>,
) -> Option<RangeProofOutput> {
    let (sk, commitment) = cid.sk_comm(master, ctx);
    let sk = Zeroizing::new(sk);

    let seed = Zeroizing::new(coin_seed(master, &commitment));
    let mut ng = NonceGenerator::new(b"bulletproof\0", &seed);

    let alpha = Zeroizing::new(ng.next_scalar() + scalar_reduce(&coin_params(cid)));

    let s = s_point::<NAGGLE>(ctx, &mut ng, k_extra);
    let a = a_point(ctx, &alpha, cid.amount);

    let (a, s) = (export(&a), export(&s));

    let mut oracle = oracle_prefix(&commitment, asset_gen);
    oracle.write_point(&a).write_point(&s);

    let y = oracle.next_scalar();
    let z = oracle.next_scalar();

    // Blinding nonces for T1 / T2
    let sk_bytes = Zeroizing::new(scalar_bytes(&sk));
    let (yb, zb) = (scalar_bytes(&y), scalar_bytes(&z));
    let mut ng = NonceGenerator::from_parts(
        b"bulletproof-sk\0",
        &[
            &sk_bytes[..],
            &t_in[0].x,
            &[t_in[0].y],
            &yb,
            &t_in[1].x,
            &[t_in[1].y],
            &zb,
        ],
    );

    let tau = Zeroizing::new([ng.next_scalar(), ng.next_scalar()]);
    drop(ng);

    let mut t_out = [CompactPoint::INFINITY; 2];
    for i in 0..2 {
        let t = ctx.mul_g(&tau[i]) + import(&t_in[i])?;
        t_out[i] = export(&t);
        oracle.write_point(&t_out[i]);
    }

    let x = oracle.next_scalar();

    let tau_x = *sk * z * z + tau[0] * x + tau[1] * x * x;

    Some(RangeProofOutput {
        t_out,
        tau_x,
        commitment,
        a,
        s,
    })
}

/// Rebuild the `l` / `r` vectors from the nonce stream and condense them
/// through the inner product challenges `e` (and inverses)
fn condense(
    ng: &mut NonceGenerator,
    amount: u64,
    x: &Scalar,
    y: &Scalar,
    z: &Scalar,
    e: &[[Scalar; CYCLES]; 2],
) -> [Scalar; 2] {
    const HALF: usize = RANGE_PROOF_BITS / 2;

    let two = Scalar::from(2u64);
    let pz = [*z, *z - Scalar::ONE];

    let mut y_pwr = Scalar::ONE;
    let mut z2_pwr = *z * z;

    let mut out = [Scalar::ZERO; 2];

    for j in 0..2 {
        let mut ps = [Scalar::ZERO; HALF];

        for i in 0..RANGE_PROOF_BITS {
            let mut val = ng.next_scalar();
            let bit = ((amount >> i) & 1) as usize;

            match j {
                0 => {
                    val = val * x - pz[bit];
                }
                _ => {
                    val = val * x * y_pwr + pz[1 - bit] * y_pwr + z2_pwr;
                    z2_pwr *= two;
                    y_pwr *= y;
                }
            }

            // First condensation in place
            match i < HALF {
                true => ps[i] = val * e[j][0],
                false => ps[i - HALF] += val * e[1 - j][0],
            }
        }

        let mut step = HALF;
        for c in 1..CYCLES {
            step >>= 1;
            for i in 0..step {
                ps[i] = ps[i] * e[j][c] + ps[step + i] * e[1 - j][c];
            }
        }

        out[j] = ps[0];
    }

    out
}

/// Expose the inner product rounds, returning the challenges and their inverses
fn ip_challenges(proof: &RangeProofPacked, oracle: &mut Oracle) -> Option<[[Scalar; CYCLES]; 2]> {
    // Dot product multiplier, unused
    oracle.write_bytes(&proof.t_dot);
    let _ = oracle.next_scalar();

    let mut e = [[Scalar::ZERO; CYCLES]; 2];

    for c in 0..CYCLES {
        e[0][c] = oracle.next_scalar();
        e[1][c] = Option::from(e[0][c].invert())?;

        oracle
            .write_point_parts(&proof.lr[c].l, proof.parity(2 * c))
            .write_point_parts(&proof.lr[c].r, proof.parity(2 * c + 1));
    }

    Some(e)
}

/// Recover the parameters of a packed proof generated from `seed`
///
/// `oracle` must hold the transcript prefix the proof was made with. `user`
/// receives the user bytes embedded ahead of the amount (at most
/// [`USER_MAX`]), any padding ahead of them must be zero. With `seed_sk`
/// the blinding factor is recovered from `taux`, with `want_extra` the two
/// extra scalars from the condensed vectors.
///
/// Returns `None` if the proof was not generated from this seed.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn recover(
    ctx: &Context,
    proof: &RangeProofPacked,
    oracle: &mut Oracle,
    seed: &[u8; 32],
    user: &mut [u8],
    seed_sk: Option<&[u8; 32]>,
    want_extra: bool,
) -> Option<Recovered> {
    if user.len() > USER_MAX {
        return None;
    }

    let mut ng = NonceGenerator::new(b"bulletproof\0", seed);
    let alpha_base = Zeroizing::new(ng.next_scalar());
    let ro = Zeroizing::new(ng.next_scalar());

    oracle
        .write_point_parts(&proof.ax, proof.parity(RangeProofPacked::BIT_A))
        .write_point_parts(&proof.sx, proof.parity(RangeProofPacked::BIT_S));
    let y = oracle.next_scalar();
    let z = oracle.next_scalar();

    oracle
        .write_point_parts(&proof.t1x, proof.parity(RangeProofPacked::BIT_T1))
        .write_point_parts(&proof.t2x, proof.parity(RangeProofPacked::BIT_T2));
    let x = oracle.next_scalar();

    // Mu = alpha + ro·x, alpha = alpha_base + params
    let mu = scalar_from_bytes(&proof.mu)?;
    let params = Zeroizing::new(mu - (*ro * x + *alpha_base));

    let blob = Zeroizing::new(scalar_bytes(&params));
    let pad = USER_MAX - user.len();

    if blob[..pad].iter().any(|v| *v != 0) {
        return None;
    }
    user.copy_from_slice(&blob[pad..USER_MAX]);

    let amount = BigEndian::read_u64(&blob[USER_MAX..]);

    // Recompute A, rejecting false positives
    let alpha = Zeroizing::new(*alpha_base + *params);
    let a = export(&a_point(ctx, &alpha, amount));
    if a.x != proof.ax || a.y != proof.parity(RangeProofPacked::BIT_A) {
        return None;
    }

    let z2 = z * z;

    let sk = match seed_sk {
        Some(seed_sk) => {
            let mut ng_sk = NonceGenerator::new(b"bp-key\0", seed_sk);
            let tau1 = Zeroizing::new(ng_sk.next_scalar());
            let tau2 = Zeroizing::new(ng_sk.next_scalar());

            let taux = scalar_reduce(&proof.taux);
            let z2_inv: Scalar = Option::from(z2.invert())?;

            Some((taux - (*tau2 * x + *tau1) * x) * z2_inv)
        }
        None => None,
    };

    let extra = match want_extra {
        true => {
            let e = ip_challenges(proof, oracle)?;
            let cond = condense(&mut ng, amount, &x, &y, &z, &e);

            let mut extra = [Scalar::ZERO; 2];
            for j in 0..2 {
                let diff = scalar_reduce(&proof.condensed[j]) - cond[j];

                let mut unit = x;
                for c in 0..CYCLES {
                    unit *= e[j][c];
                }
                let unit_inv: Scalar = Option::from(unit.invert())?;

                extra[j] = diff * unit_inv;
            }

            Some(extra)
        }
        false => None,
    };

    Some(Recovered { amount, sk, extra })
}

/// Recover the coin identifier embedded in one of our own proofs
pub fn recover_coin_id(
    ctx: &Context,
    master: &Kdf,
    proof: &RangeProofPacked,
    comm: &CompactPoint,
    asset_gen: Option<&CompactPoint>,
) -> Option<CoinId> {
    let seed = Zeroizing::new(coin_seed(master, comm));
    let mut oracle = oracle_prefix(comm, asset_gen);

    let mut user = [0u8; COIN_USER_LEN];
    let r = recover(ctx, proof, &mut oracle, &seed, &mut user, None, false)?;

    Some(CoinId {
        asset_id: BigEndian::read_u32(&user[0..]),
        idx: BigEndian::read_u64(&user[4..]),
        kind: BigEndian::read_u32(&user[12..]),
        sub_idx: BigEndian::read_u32(&user[16..]),
        amount: r.amount,
    })
}
