// Copyright (c) 2023 The Beam Team

//! Prelude to simplify downstream use of request / response objects
//!

pub use crate::{
    info::{
        DisplayAddressReq, ImageFlags, ImageReq, ImageResp, NumSlotsReq, NumSlotsResp, PKdfReq,
        PKdfResp, VersionReq, VersionResp,
    },
    output::{CreateOutputReq, CreateOutputResp},
    shielded::{
        CreateShieldedInputReq, CreateShieldedInputResp, CreateShieldedVouchersReq,
        CreateShieldedVouchersResp, VOUCHERS_MAX,
    },
    status::{Status, StatusMajor},
    tx::{
        TxAddCoinsReq, TxReceiveReq, TxReceiveResp, TxSend1Req, TxSend1Resp, TxSend2Req,
        TxSend2Resp, TxSendShieldedReq, TxSendShieldedResp, TxSplitReq, TxSplitResp,
    },
    types::*,
    Opcode,
};
