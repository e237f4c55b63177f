// Copyright (c) 2023 The Beam Team

//! Output (range proof) requests

use encdec::{Decode, Encode};

use crate::{
    helpers::*,
    types::{CoinId, CompactPoint},
    ApduError, ApduStatic, Opcode, BEAM_APDU_CLA,
};

/// Compute the device part of a range proof for an owned output
///
/// `t` carries the host-computed `T1`, `T2` parts, `k_extra` optional extra
/// scalars embedded in the proof (all zero for none), and `asset_gen` the
/// asset generator for non-native assets (zero for none).
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                        COIN_ID (28-byte)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      T_IN[2] (2 x 33-byte)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     K_EXTRA[2] (2 x 32-byte)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                       ASSET_GEN (33-byte)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CreateOutputReq {
    pub cid: CoinId,

    #[encdec(with = "items")]
    pub t: [CompactPoint; 2],

    #[encdec(with = "arr2")]
    pub k_extra: [[u8; 32]; 2],

    pub asset_gen: CompactPoint,
}

impl ApduStatic for CreateOutputReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::CreateOutput as u8;
}

impl CreateOutputReq {
    /// Create a new output request without extra scalars or asset generator
    pub fn new(cid: CoinId, t: [CompactPoint; 2]) -> Self {
        Self {
            cid,
            t,
            k_extra: [[0u8; 32]; 2],
            asset_gen: CompactPoint::INFINITY,
        }
    }

    /// Fetch extra scalars if set
    pub fn k_extra(&self) -> Option<&[[u8; 32]; 2]> {
        match self.k_extra.iter().flatten().all(|v| *v == 0) {
            true => None,
            false => Some(&self.k_extra),
        }
    }

    /// Fetch asset generator if set
    pub fn asset_gen(&self) -> Option<&CompactPoint> {
        match self.asset_gen.x.iter().all(|v| *v == 0) {
            true => None,
            false => Some(&self.asset_gen),
        }
    }
}

/// Range proof device part response
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CreateOutputResp {
    /// Updated `T1`, `T2`
    #[encdec(with = "items")]
    pub t: [CompactPoint; 2],

    #[encdec(with = "arr")]
    pub tau_x: [u8; 32],
}

impl CreateOutputResp {
    pub const LEN: usize = 2 * CompactPoint::LEN + 32;
}
