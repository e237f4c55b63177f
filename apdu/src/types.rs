// Copyright (c) 2023 The Beam Team

//! Common wire structures shared between requests and responses

use encdec::{Decode, Encode};

use crate::{helpers::*, ApduError};

/// Compressed curve point, zero `x` and `y` encodes the point at infinity
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     X (32-byte, big-endian)                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    Y_PARITY   |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CompactPoint {
    /// Affine x coordinate
    #[encdec(with = "arr")]
    pub x: [u8; 32],

    /// Parity of the affine y coordinate (0 or 1)
    pub y: u8,
}

impl CompactPoint {
    /// Encoded length
    pub const LEN: usize = 33;

    /// Point at infinity
    pub const INFINITY: Self = Self {
        x: [0u8; 32],
        y: 0,
    };

    pub const fn new(x: [u8; 32], y: u8) -> Self {
        Self { x, y }
    }

    /// Check whether this is the all-zero encoding
    pub fn is_zero(&self) -> bool {
        self.y == 0 && self.x.iter().all(|v| *v == 0)
    }
}

/// Coin identifier
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                              IDX                              |
/// |                          (u64, 8-byte)                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                              TYPE                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |              SUB_IDX (scheme << 24 | subkey index)            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             AMOUNT                            |
/// |                          (u64, 8-byte)                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            ASSET_ID                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CoinId {
    pub idx: u64,
    /// Coin type (FOURCC)
    pub kind: u32,
    pub sub_idx: u32,
    pub amount: u64,
    pub asset_id: u32,
}

impl CoinId {
    /// Encoded length
    pub const LEN: usize = 28;

    pub const fn new(idx: u64, kind: u32, sub_idx: u32, amount: u64, asset_id: u32) -> Self {
        Self {
            idx,
            kind,
            sub_idx,
            amount,
            asset_id,
        }
    }
}

/// Public Kdf, the secret with the cofactor exposed on both generators
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct KdfPub {
    #[encdec(with = "arr")]
    pub secret: [u8; 32],
    pub cofactor_g: CompactPoint,
    pub cofactor_j: CompactPoint,
}

/// User-visible kernel parameters
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        FEE (u64, 8-byte)                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      H_MIN (u64, 8-byte)                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      H_MAX (u64, 8-byte)                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxKernelUser {
    pub fee: u64,
    pub h_min: u64,
    pub h_max: u64,
}

impl TxKernelUser {
    pub const fn new(fee: u64, h_min: u64, h_max: u64) -> Self {
        Self { fee, h_min, h_max }
    }
}

/// Kernel commitment and signature nonce, exchanged between peers
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxKernelCommitments {
    pub commitment: CompactPoint,
    pub nonce_pub: CompactPoint,
}

/// Peer information for two-party transactions
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxMutual {
    /// Peer wallet ID (x coordinate of the peer address key)
    #[encdec(with = "arr")]
    pub peer: [u8; 32],

    /// Own address index, 0 for none
    pub addr_id: u64,
}

/// Kernel signature and blinding offset returned by transaction finalizers
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSig {
    #[encdec(with = "arr")]
    pub k_sig: [u8; 32],

    #[encdec(with = "arr")]
    pub k_offset: [u8; 32],
}

/// Schnorr signature
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct Signature {
    pub nonce_pub: CompactPoint,

    #[encdec(with = "arr")]
    pub k: [u8; 32],
}

impl Signature {
    pub const LEN: usize = CompactPoint::LEN + 32;
}

/// Shielded voucher, a pre-signed ticket for a receiver address
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ShieldedVoucher {
    pub serial_pub: CompactPoint,
    pub nonce_pub: CompactPoint,

    #[encdec(with = "arr")]
    pub shared_secret: [u8; 32],

    /// Signature of the voucher hash by the receiver address key
    pub signature: Signature,

    /// Ticket proof responses (G and J components)
    #[encdec(with = "arr2")]
    pub k: [[u8; 32]; 2],
}

impl ShieldedVoucher {
    pub const LEN: usize = 2 * CompactPoint::LEN + 32 + Signature::LEN + 64;
}

/// Shielded input parameters not shown to the user
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ShieldedInputBlob {
    #[encdec(with = "arr")]
    pub k_ser_g: [u8; 32],
    pub is_created_by_viewer: u8,
}

impl ShieldedInputBlob {
    pub const LEN: usize = 33;
}

/// Shielded input parameters
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ShieldedInputFmt {
    pub fee: u64,
    pub amount: u64,
    pub asset_id: u32,
    pub viewer_idx: u32,
}

impl ShieldedInputFmt {
    pub const LEN: usize = 24;
}

/// Shielded spend window and sigma proof dimensions
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ShieldedSpendParams {
    pub h_min: u64,
    pub h_max: u64,
    pub window_end: u64,
    pub sigma_n: u32,
    pub sigma_m: u32,
}

/// Sender / message fields carried in a shielded output
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ShieldedTxoUser {
    #[encdec(with = "arr")]
    pub sender: [u8; 32],

    #[encdec(with = "arr2")]
    pub message: [[u8; 32]; 2],
}

/// Inner product round (L, R x coordinates)
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct InnerProductRound {
    #[encdec(with = "arr")]
    pub l: [u8; 32],

    #[encdec(with = "arr")]
    pub r: [u8; 32],
}

/// Number of inner product rounds in a packed range proof
pub const RANGE_PROOF_CYCLES: usize = 6;

/// Packed bulletproof as produced by the host
///
/// Points are carried as x coordinates only, with their y parities packed into `ys`:
/// bit `2c + j` for `lr[c]` (`j = 0` for L, `1` for R), then bits 12..15 for A, S, T1, T2.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct RangeProofPacked {
    #[encdec(with = "arr")]
    pub ax: [u8; 32],
    #[encdec(with = "arr")]
    pub sx: [u8; 32],
    #[encdec(with = "arr")]
    pub t1x: [u8; 32],
    #[encdec(with = "arr")]
    pub t2x: [u8; 32],
    #[encdec(with = "arr")]
    pub taux: [u8; 32],
    #[encdec(with = "arr")]
    pub mu: [u8; 32],
    #[encdec(with = "arr")]
    pub t_dot: [u8; 32],

    #[encdec(with = "items")]
    pub lr: [InnerProductRound; RANGE_PROOF_CYCLES],

    #[encdec(with = "arr2")]
    pub condensed: [[u8; 32]; 2],

    #[encdec(with = "arr")]
    pub ys: [u8; 2],
}

impl RangeProofPacked {
    pub const LEN: usize = 7 * 32 + RANGE_PROOF_CYCLES * 64 + 64 + 2;

    /// Parity bit index of A
    pub const BIT_A: usize = 12;
    /// Parity bit index of S
    pub const BIT_S: usize = 13;
    /// Parity bit index of T1
    pub const BIT_T1: usize = 14;
    /// Parity bit index of T2
    pub const BIT_T2: usize = 15;

    /// Fetch a y parity bit
    pub fn parity(&self, bit: usize) -> u8 {
        (self.ys[bit >> 3] >> (bit & 7)) & 1
    }

    /// Set a y parity bit
    pub fn set_parity(&mut self, bit: usize, odd: bool) {
        let mask = 1u8 << (bit & 7);
        match odd {
            true => self.ys[bit >> 3] |= mask,
            false => self.ys[bit >> 3] &= !mask,
        }
    }

    /// Fetch the packed encoding (as hashed into shielded kernel IDs)
    pub fn to_bytes(&self) -> Result<[u8; RangeProofPacked::LEN], ApduError> {
        let mut b = [0u8; RangeProofPacked::LEN];
        self.encode(&mut b)?;
        Ok(b)
    }
}
