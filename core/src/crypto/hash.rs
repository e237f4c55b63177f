// Copyright (c) 2023 The Beam Team

//! Transcript hashing helpers

use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

use super::{export, scalar_bytes};
use crate::apdu::types::CompactPoint;

/// Extension trait for writing protocol values into a [`Sha256`] transcript
pub trait HashWriter {
    /// Write raw bytes
    fn write_bytes(&mut self, b: &[u8]) -> &mut Self;

    /// Write a null-terminated domain string (`s` must include the terminator)
    fn write_str(&mut self, s: &[u8]) -> &mut Self {
        self.write_bytes(s)
    }

    /// Write an integer as 7-bit groups, least significant first, `0x80` marking continuation
    fn write_num(&mut self, mut v: u64) -> &mut Self {
        let mut b = [0u8; 10];
        let mut n = 0;

        loop {
            let low = (v & 0x7f) as u8;
            v >>= 7;

            if v == 0 {
                b[n] = low;
                n += 1;
                break;
            }

            b[n] = low | 0x80;
            n += 1;
        }

        self.write_bytes(&b[..n])
    }

    /// Write a compact point as `x || y`
    fn write_point(&mut self, p: &CompactPoint) -> &mut Self {
        self.write_bytes(&p.x).write_bytes(&[p.y])
    }

    /// Write `x || parity` from separated parts
    fn write_point_parts(&mut self, x: &[u8; 32], y: u8) -> &mut Self {
        self.write_bytes(x).write_bytes(&[y & 1])
    }

    /// Write a projective point in compact form
    fn write_projective(&mut self, p: &ProjectivePoint) -> &mut Self {
        self.write_point(&export(p))
    }

    /// Write a presence flag, then the point if present
    fn write_point_opt(&mut self, p: Option<&CompactPoint>) -> &mut Self {
        match p {
            Some(p) => self.write_bytes(&[1]).write_point(p),
            None => self.write_bytes(&[0]),
        }
    }

    /// Write a scalar as 32 big-endian bytes
    fn write_scalar(&mut self, s: &Scalar) -> &mut Self {
        let b = zeroize::Zeroizing::new(scalar_bytes(s));
        self.write_bytes(&b[..])
    }
}

impl HashWriter for Sha256 {
    fn write_bytes(&mut self, b: &[u8]) -> &mut Self {
        Digest::update(self, b);
        self
    }
}

/// Finalise a transcript into a 32-byte hash
pub fn finish(sha: Sha256) -> [u8; 32] {
    sha.finalize().into()
}

#[cfg(test)]
mod test {
    use super::*;

    fn num_bytes(v: u64) -> [u8; 32] {
        let mut a = Sha256::new();
        a.write_num(v);
        finish(a)
    }

    fn raw_bytes(b: &[u8]) -> [u8; 32] {
        let mut a = Sha256::new();
        a.write_bytes(b);
        finish(a)
    }

    #[test]
    fn num_encoding() {
        assert_eq!(num_bytes(0), raw_bytes(&[0x00]));
        assert_eq!(num_bytes(0x7f), raw_bytes(&[0x7f]));
        assert_eq!(num_bytes(0x80), raw_bytes(&[0x80, 0x01]));
        assert_eq!(num_bytes(300), raw_bytes(&[0xac, 0x02]));
        assert_eq!(
            num_bytes(u64::MAX),
            raw_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01])
        );
    }

    #[test]
    fn optional_point_encoding() {
        let p = CompactPoint::new([7u8; 32], 1);

        let mut a = Sha256::new();
        a.write_point_opt(Some(&p)).write_point_opt(None);

        let mut b = Sha256::new();
        b.write_bytes(&[1])
            .write_bytes(&[7u8; 32])
            .write_bytes(&[1])
            .write_bytes(&[0]);

        assert_eq!(finish(a), finish(b));
    }
}
