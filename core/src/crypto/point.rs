// Copyright (c) 2023 The Beam Team

//! Point and scalar import / export helpers

use k256::{
    elliptic_curve::{
        bigint::U256, ops::Reduce, point::DecompressPoint, sec1::ToEncodedPoint, subtle::Choice,
        PrimeField,
    },
    AffinePoint, FieldBytes, ProjectivePoint, Scalar,
};

use crate::apdu::types::CompactPoint;

/// Export an affine point to compact form, identity maps to [`CompactPoint::INFINITY`]
pub fn export_affine(p: &AffinePoint) -> CompactPoint {
    let e = p.to_encoded_point(true);
    let b = e.as_bytes();

    if b.len() != CompactPoint::LEN {
        return CompactPoint::INFINITY;
    }

    let mut x = [0u8; 32];
    x.copy_from_slice(&b[1..]);

    CompactPoint::new(x, b[0] & 1)
}

/// Export a projective point to compact form
pub fn export(p: &ProjectivePoint) -> CompactPoint {
    export_affine(&p.to_affine())
}

/// Import a compact point, the all-zero encoding yields the identity
pub fn import_affine(c: &CompactPoint) -> Option<AffinePoint> {
    if c.is_zero() {
        return Some(AffinePoint::IDENTITY);
    }

    import_nnz(c)
}

/// Import a compact point into projective form
pub fn import(c: &CompactPoint) -> Option<ProjectivePoint> {
    import_affine(c).map(ProjectivePoint::from)
}

/// Import a compact point, rejecting the identity encoding
pub fn import_nnz(c: &CompactPoint) -> Option<AffinePoint> {
    if c.y > 1 {
        return None;
    }

    from_x(&c.x, c.y != 0)
}

/// Lift an x coordinate to a curve point with the requested y parity
pub fn from_x(x: &[u8; 32], odd: bool) -> Option<AffinePoint> {
    Option::from(AffinePoint::decompress(
        &FieldBytes::from(*x),
        Choice::from(odd as u8),
    ))
}

/// Import a big-endian scalar, rejecting values above the group order
pub fn scalar_from_bytes(b: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(FieldBytes::from(*b)))
}

/// Import a non-zero big-endian scalar, rejecting overflow
pub fn scalar_from_bytes_nnz(b: &[u8; 32]) -> Option<Scalar> {
    scalar_from_bytes(b).filter(|s| !bool::from(s.is_zero()))
}

/// Draw blocks from `next` until one is a non-zero scalar below the group order
pub fn scalar_from_stream(mut next: impl FnMut() -> [u8; 32]) -> Scalar {
    loop {
        if let Some(s) = scalar_from_bytes_nnz(&next()) {
            return s;
        }
    }
}

/// Import a big-endian scalar reducing modulo the group order
pub fn scalar_reduce(b: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*b))
}

/// Import a big-endian scalar, returning the reduced value and whether it overflowed
pub fn scalar_reduce_flag(b: &[u8; 32]) -> (Scalar, bool) {
    match scalar_from_bytes(b) {
        Some(s) => (s, false),
        None => (scalar_reduce(b), true),
    }
}

/// Export a scalar as big-endian bytes
pub fn scalar_bytes(s: &Scalar) -> [u8; 32] {
    s.to_bytes().into()
}

/// Little-endian 64-bit limbs of a scalar, as walked by [`multimac`][super::multimac]
pub(crate) fn scalar_limbs(s: &Scalar) -> [u64; 4] {
    let b = s.to_bytes();
    let mut l = [0u64; 4];

    for (i, v) in l.iter_mut().enumerate() {
        let mut w = [0u8; 8];
        w.copy_from_slice(&b[32 - 8 * (i + 1)..32 - 8 * i]);
        *v = u64::from_be_bytes(w);
    }

    l
}
