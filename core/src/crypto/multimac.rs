// Copyright (c) 2023 The Beam Team

//! Multi-scalar multiplication
//!
//! Computes `Σ kᵢ·Pᵢ` in a single pass of 256 doublings. Terms come in two
//! flavours:
//!
//! - _secure_ terms, for secret scalars, use a fixed 4-bit window with a
//!   constant-time table lookup on every window. Each table entry is offset
//!   by a nothing-up-my-sleeve point so no entry is the identity, the
//!   accumulated offset is removed at the end.
//! - _fast_ terms, for public scalars, use a signed sliding window over
//!   precomputed odd multiples, skipping zero runs.

use static_assertions::const_assert;

use k256::{
    elliptic_curve::{
        group::Curve,
        subtle::{ConditionallySelectable, ConstantTimeEq},
    },
    AffinePoint, ProjectivePoint, Scalar,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::point::scalar_limbs;

/// Secure window width in bits
pub const SECURE_BITS: usize = 4;

/// Number of secure table entries
pub const SECURE_COUNT: usize = 1 << SECURE_BITS;

/// Odd multiples held for the H generator
pub const ODD_H: usize = 16;
/// Odd multiples held for custom generators (asset and public keys)
pub const ODD_CUSTOM: usize = 8;
/// Odd multiples held for range-proof generators
pub const ODD_RANGEPROOF: usize = 2;

// Window widths are derived from the table sizes
const_assert!(ODD_H.is_power_of_two());
const_assert!(ODD_CUSTOM.is_power_of_two());
const_assert!(ODD_RANGEPROOF.is_power_of_two());

const BITS: usize = 256;

/// Precomputed table for a secure generator
#[derive(Clone, Debug)]
pub struct SecureGenerator {
    /// `N + j·P` for `j` in `0..16`
    pts: [AffinePoint; SECURE_COUNT],
    /// `-(Σ 16ʷ)·N`, cancelling the per-window offsets
    compensation: AffinePoint,
}

impl SecureGenerator {
    /// Build a secure table for `p` with offset point `nums`
    pub fn new(p: &ProjectivePoint, nums: &ProjectivePoint) -> Self {
        let mut proj = [ProjectivePoint::IDENTITY; SECURE_COUNT + 1];

        proj[0] = *nums;
        for j in 1..SECURE_COUNT {
            proj[j] = proj[j - 1] + p;
        }

        // Σ 16ʷ over all 64 windows
        let mut c = Scalar::ZERO;
        let mut w = Scalar::ONE;
        let sixteen = Scalar::from(SECURE_COUNT as u64);
        for _ in 0..BITS / SECURE_BITS {
            c += w;
            w *= sixteen;
        }
        proj[SECURE_COUNT] = -(*nums * c);

        let mut aff = [AffinePoint::IDENTITY; SECURE_COUNT + 1];
        ProjectivePoint::batch_normalize(&proj, &mut aff);

        let mut pts = [AffinePoint::IDENTITY; SECURE_COUNT];
        pts.copy_from_slice(&aff[..SECURE_COUNT]);

        Self {
            pts,
            compensation: aff[SECURE_COUNT],
        }
    }

    /// Constant-time table read
    fn read(&self, nibble: u8) -> AffinePoint {
        let mut r = self.pts[0];
        for (j, p) in self.pts.iter().enumerate().skip(1) {
            r.conditional_assign(p, (j as u8).ct_eq(&nibble));
        }
        r
    }
}

/// Precomputed odd multiples `P, 3P, ..., (2N-1)P` for a fast generator
#[derive(Clone, Debug)]
pub struct FastGenerator<const N: usize> {
    odd: [AffinePoint; N],
}

impl<const N: usize> FastGenerator<N> {
    /// Window width in bits for this table size
    pub const WINDOW: usize = N.trailing_zeros() as usize + 1;

    /// Build the odd multiples table for `p`
    pub fn new(p: &ProjectivePoint) -> Self {
        let mut proj = [ProjectivePoint::IDENTITY; N];
        let p2 = p.double();

        proj[0] = *p;
        for i in 1..N {
            proj[i] = proj[i - 1] + p2;
        }

        let mut odd = [AffinePoint::IDENTITY; N];
        ProjectivePoint::batch_normalize(&proj, &mut odd);

        Self { odd }
    }

    /// Base point
    pub fn point(&self) -> &AffinePoint {
        &self.odd[0]
    }
}

const INVALID_BIT: u8 = 0xff;
const INVALID_ELEM: u8 = 0x80;

#[inline]
fn bit_get(k: &[u64; 4], i: usize) -> bool {
    (k[i / 64] >> (i % 64)) & 1 != 0
}

/// Flip a bit, returning the new value
#[inline]
fn bit_toggle(k: &mut [u64; 4], i: usize) -> bool {
    k[i / 64] ^= 1 << (i % 64);
    bit_get(k, i)
}

/// Signed window cursor over a (rewritten) scalar
///
/// Each window of `w` bits starting at a set bit `s` is followed by a
/// marker bit at `s + w`. The window start bit is cleared to indicate the
/// window value is subtracted, with a carry propagated above the marker.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Cursor {
    k: [u64; 4],
    bit: u8,
    elem: u8,
}

impl Cursor {
    /// Rewrite `s` into window form, returning the cursor at the top window
    /// and whether a carry overflowed the top bit
    fn new(s: &Scalar, wnd: usize) -> (Self, bool) {
        let mut c = Self {
            k: scalar_limbs(s),
            bit: INVALID_BIT,
            elem: INVALID_ELEM,
        };

        let mut carry = false;
        let mut len = 0;
        let mut start = 0;

        for i in 0..BITS {
            if carry {
                if !bit_toggle(&mut c.k, i) {
                    continue;
                }
                carry = false;
            } else {
                let val = bit_get(&c.k, i);

                if len > 0 {
                    if val {
                        c.elem |= 1 << (len - 1);
                    }

                    len += 1;
                    if len > wnd {
                        // Window complete, ensure the marker is set
                        match val {
                            true => {
                                carry = true;
                                bit_toggle(&mut c.k, start);
                            }
                            false => {
                                bit_toggle(&mut c.k, i);
                            }
                        }
                        len = 0;
                    }

                    continue;
                }

                if !val {
                    continue;
                }
            }

            len = 1;
            c.bit = i as u8;
            c.elem = 0;
            start = i;
        }

        (c, carry)
    }

    fn invalidate(&mut self) {
        self.bit = INVALID_BIT;
        self.elem = INVALID_ELEM;
    }

    /// Seek the next lower window
    fn move_next(&mut self, wnd: usize, odd: usize) {
        if self.bit as usize <= wnd {
            return;
        }

        let mut b = self.bit as usize - 1;
        loop {
            if bit_get(&self.k, b) {
                break;
            }
            if b <= wnd {
                self.invalidate();
                return;
            }
            b -= 1;
        }

        self.bit = (b - wnd) as u8;
        self.elem = 0;

        for _ in 0..wnd - 1 {
            self.elem <<= 1;
            b -= 1;
            if bit_get(&self.k, b) {
                self.elem |= 1;
            }
        }

        // Sign indicator
        b -= 1;
        if !bit_get(&self.k, b) {
            self.elem += odd as u8;
        }
    }
}

/// Compute `Σ sᵢ·Gᵢ + Σ fⱼ·Fⱼ` for secure terms `secure` and fast terms `fast`
///
/// Fast scalars are processed in variable time and must be public.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn multi_mac<const N: usize, const S: usize, const F: usize>(
    secure: [(&SecureGenerator, &Scalar); S],
    fast: [(&FastGenerator<N>, &Scalar); F],
) -> ProjectivePoint {
    let wnd = FastGenerator::<N>::WINDOW;
    let mut res = ProjectivePoint::IDENTITY;

    // Rewrite fast scalars, applying overflow carries before the doublings
    let mut cursors: [Cursor; F] = core::array::from_fn(|i| {
        let (c, carry) = Cursor::new(fast[i].1, wnd);
        if carry {
            res += fast[i].0.odd[0];
        }
        c
    });

    let mut limbs: [[u64; 4]; S] = core::array::from_fn(|i| scalar_limbs(secure[i].1));

    for i_bit in (0..BITS).rev() {
        res = res.double();

        if i_bit % SECURE_BITS == 0 {
            for ((g, _s), l) in secure.iter().zip(limbs.iter()) {
                let nibble = ((l[i_bit / 64] >> (i_bit % 64)) & 0xf) as u8;
                res += g.read(nibble);
            }
        }

        for (c, (g, _s)) in cursors.iter_mut().zip(fast.iter()) {
            if c.bit as usize != i_bit || c.elem == INVALID_ELEM {
                continue;
            }

            let mut e = c.elem as usize;
            match e >= N {
                true => {
                    e = 2 * N - 1 - e;
                    res += -g.odd[e];
                }
                false => {
                    res += g.odd[e];
                }
            }

            c.move_next(wnd, N);
        }
    }

    limbs.zeroize();

    for (g, _s) in secure.iter() {
        res += g.compensation;
    }

    res
}
