// Copyright (c) 2023 The Beam Team

//! Device information and key export requests

use encdec::{Decode, Encode};

use crate::{
    helpers::*,
    types::{CompactPoint, KdfPub},
    ApduError, ApduStatic, Opcode, BEAM_APDU_CLA, BEAM_PROTO_SIGNATURE,
};

/// Fetch protocol signature
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct VersionReq {}

crate::encdec_empty!(VersionReq);

impl ApduStatic for VersionReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::Version as u8;
}

/// Protocol signature response
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VersionResp {
    #[encdec(with = "arr")]
    pub signature: [u8; 8],
}

impl VersionResp {
    pub const LEN: usize = 8;

    pub fn new() -> Self {
        Self {
            signature: BEAM_PROTO_SIGNATURE,
        }
    }
}

impl Default for VersionResp {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the number of nonce slots available on the device
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct NumSlotsReq {}

crate::encdec_empty!(NumSlotsReq);

impl ApduStatic for NumSlotsReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::GetNumSlots as u8;
}

/// Number of nonce slots response
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct NumSlotsResp {
    pub num_slots: u32,
}

impl NumSlotsResp {
    pub const LEN: usize = 4;
}

/// Fetch the public Kdf for the owner key, or the shielded-input child key
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     KIND      |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct PKdfReq {
    /// 0 for the owner Kdf, any other value for the child Kdf
    pub kind: u8,
}

impl ApduStatic for PKdfReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::GetPKdf as u8;
}

impl PKdfReq {
    pub fn new(child: bool) -> Self {
        Self { kind: child as u8 }
    }
}

/// Public Kdf response
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct PKdfResp {
    pub kdf: KdfPub,
}

impl PKdfResp {
    pub const LEN: usize = 32 + 2 * CompactPoint::LEN;
}

bitflags::bitflags! {
    /// Images requested in an [`ImageReq`]
    pub struct ImageFlags: u8 {
        /// Image on the G generator
        const G = 1 << 0;
        /// Image on the J generator
        const J = 1 << 1;
    }
}

crate::encdec_bitflags!(ImageFlags);

/// Fetch key images (`sk·G`, `sk·J`) for a key derived from a child Kdf
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                         HV (32-byte)                          /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          CHILD_IDX                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     FLAGS     |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ImageReq {
    /// Key derivation hash
    #[encdec(with = "arr")]
    pub hv: [u8; 32],

    /// Child Kdf index
    pub child: u32,

    pub flags: ImageFlags,
}

impl ApduStatic for ImageReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::GetImage as u8;
}

impl ImageReq {
    pub fn new(hv: [u8; 32], child: u32, flags: ImageFlags) -> Self {
        Self { hv, child, flags }
    }
}

/// Key image response, un-requested images are zero
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct ImageResp {
    pub image_g: CompactPoint,
    pub image_j: CompactPoint,
}

impl ImageResp {
    pub const LEN: usize = 2 * CompactPoint::LEN;
}

/// Display an own address for verification by the user
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct DisplayAddressReq {
    pub addr_id: u64,
}

impl ApduStatic for DisplayAddressReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::DisplayAddress as u8;
}

impl DisplayAddressReq {
    pub fn new(addr_id: u64) -> Self {
        Self { addr_id }
    }
}
