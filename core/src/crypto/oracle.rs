// Copyright (c) 2023 The Beam Team

//! Fiat-Shamir transcript

use k256::{AffinePoint, Scalar};
use sha2::{Digest, Sha256};

use super::{import_nnz, scalar_from_stream, HashWriter};
use crate::apdu::types::CompactPoint;

/// Running hash transcript producing challenges
///
/// Each challenge is the hash of everything exposed so far, and is fed
/// back into the transcript before the next one is drawn.
#[derive(Clone, Default)]
pub struct Oracle {
    sha: Sha256,
}

impl Oracle {
    pub fn new() -> Self {
        Self { sha: Sha256::new() }
    }

    /// Draw the next 32-byte challenge
    pub fn next_hash(&mut self) -> [u8; 32] {
        let h: [u8; 32] = self.sha.clone().finalize().into();
        Digest::update(&mut self.sha, h);
        h
    }

    /// Draw the next non-zero challenge scalar, rejecting overflow
    pub fn next_scalar(&mut self) -> Scalar {
        scalar_from_stream(|| self.next_hash())
    }

    /// Draw the next valid curve point with an even y coordinate
    pub fn next_point(&mut self) -> (CompactPoint, AffinePoint) {
        loop {
            let c = CompactPoint::new(self.next_hash(), 0);
            if let Some(p) = import_nnz(&c) {
                return (c, p);
            }
        }
    }

    /// Fetch a copy of the underlying transcript hash
    pub fn sha(&self) -> Sha256 {
        self.sha.clone()
    }
}

impl HashWriter for Oracle {
    fn write_bytes(&mut self, b: &[u8]) -> &mut Self {
        Digest::update(&mut self.sha, b);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::finish;

    #[test]
    fn challenges_chain() {
        let mut o = Oracle::new();
        o.write_str(b"test\0");

        let mut sha = Sha256::new();
        sha.write_str(b"test\0");
        let h1 = finish(sha.clone());

        assert_eq!(o.next_hash(), h1);

        sha.write_bytes(&h1);
        assert_eq!(o.next_hash(), finish(sha));
    }

    #[test]
    fn points_are_even() {
        let mut o = Oracle::new();
        o.write_num(5);

        for _ in 0..4 {
            let (c, _p) = o.next_point();
            assert_eq!(c.y, 0);
            assert!(import_nnz(&c).is_some());
        }
    }
}
