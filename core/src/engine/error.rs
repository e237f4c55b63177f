// Copyright (c) 2023 The Beam Team

use crate::apdu::status::{proto, Status};

/// [KeyKeeper][super::KeyKeeper] errors
///
/// Each error maps to a wire [`Status`] via [`Error::status`].
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Empty request
    #[cfg_attr(feature = "thiserror", error("empty request"))]
    EmptyRequest,

    /// Request or response buffer too short for the opcode
    #[cfg_attr(feature = "thiserror", error("request or response too short"))]
    TooShort,

    /// Unknown opcode
    #[cfg_attr(feature = "thiserror", error("unknown opcode 0x{0:02x}"))]
    UnknownOpcode(u8),

    /// Request size does not match the decoded request
    #[cfg_attr(feature = "thiserror", error("request size mismatch"))]
    SizeMismatch,

    /// Response does not fit the output buffer
    #[cfg_attr(feature = "thiserror", error("response does not fit output buffer"))]
    OutputOverflow,

    /// Range proof could not be computed for the coin
    #[cfg_attr(feature = "thiserror", error("range proof failed"))]
    RangeProof,

    /// Key image request selected no generator
    #[cfg_attr(feature = "thiserror", error("no image requested"))]
    NoImage,

    /// Balance overflow, or a second non-native asset in one transaction
    #[cfg_attr(feature = "thiserror", error("amount overflow or asset mismatch"))]
    AmountOverflow,

    /// Output to a child subkey
    #[cfg_attr(feature = "thiserror", error("output to child subkey"))]
    ChildOutput,

    /// Output using a weak key scheme
    #[cfg_attr(feature = "thiserror", error("weak output scheme"))]
    WeakOutput,

    /// Input using a weak key scheme while those are not allowed
    #[cfg_attr(feature = "thiserror", error("weak inputs not allowed"))]
    WeakInput,

    /// Shielded input fee above the configured cap
    #[cfg_attr(feature = "thiserror", error("shielded fee above cap"))]
    ShieldedFee,

    /// No transaction balance
    #[cfg_attr(feature = "thiserror", error("not in transaction balance"))]
    NoBalance,

    /// Non-zero net result in both the native and another asset
    #[cfg_attr(feature = "thiserror", error("mixed asset balance"))]
    MixedAssets,

    /// Sending transaction would receive funds
    #[cfg_attr(feature = "thiserror", error("sender is receiving"))]
    NotSending,

    /// Receiving transaction would not receive funds
    #[cfg_attr(feature = "thiserror", error("receiver is not receiving"))]
    NotReceiving,

    /// Net amount is zero for a transfer, or non-zero for a split
    #[cfg_attr(feature = "thiserror", error("unexpected net amount"))]
    NetAmount,

    /// Shielded input serial key overflows the scalar field
    #[cfg_attr(feature = "thiserror", error("shielded serial key overflow"))]
    SerialOverflow,

    /// Peer kernel commitments could not be imported
    #[cfg_attr(feature = "thiserror", error("invalid peer commitments"))]
    PeerCommitments,

    /// Decoy point could not be imported
    #[cfg_attr(feature = "thiserror", error("invalid decoy"))]
    Decoy,

    /// Nonce slot out of range
    #[cfg_attr(feature = "thiserror", error("slot out of range"))]
    SlotRange,

    /// Shielded output parameters failed verification
    #[cfg_attr(feature = "thiserror", error("shielded output verification failed"))]
    ShieldedOutput,

    /// User agreement token mismatch
    #[cfg_attr(feature = "thiserror", error("user agreement mismatch"))]
    UserAgreement,

    /// Peer payment proof invalid
    #[cfg_attr(feature = "thiserror", error("invalid payment proof"))]
    PaymentProof,

    /// Spend declined by the user
    #[cfg_attr(feature = "thiserror", error("declined by user"))]
    Declined,

    /// Transfer without a peer ID
    #[cfg_attr(feature = "thiserror", error("missing peer id"))]
    MissingPeer,
}

impl Error {
    /// Wire status for this error
    pub const fn status(&self) -> Status {
        use Error::*;

        match self {
            EmptyRequest => Status::proto(proto::EMPTY_REQUEST),
            TooShort => Status::proto(proto::TOO_SHORT),
            UnknownOpcode(_) => Status::proto(proto::UNKNOWN_OPCODE),
            SizeMismatch => Status::proto(proto::SIZE_MISMATCH),
            OutputOverflow => Status::proto(proto::OUTPUT_OVERFLOW),

            RangeProof | NoImage => Status::unspecified(0),
            AmountOverflow => Status::unspecified(1),
            ChildOutput => Status::unspecified(3),
            WeakOutput => Status::unspecified(4),
            WeakInput => Status::unspecified(5),
            ShieldedFee => Status::unspecified(8),
            NoBalance => Status::unspecified(10),
            MixedAssets => Status::unspecified(11),
            NotSending => Status::unspecified(12),
            NotReceiving => Status::unspecified(13),
            NetAmount | SerialOverflow => Status::unspecified(21),
            PeerCommitments | Decoy => Status::unspecified(22),
            SlotRange | ShieldedOutput => Status::unspecified(23),
            UserAgreement => Status::unspecified(24),
            PaymentProof => Status::unspecified(25),

            Declined => Status::user_abort(0),
            MissingPeer => Status::user_abort(22),
        }
    }
}
