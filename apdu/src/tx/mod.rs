// Copyright (c) 2023 The Beam Team

//! Transaction requests
//!
//! A transaction is built by first loading the balance with one or more
//! [`TxAddCoinsReq`] requests, then issuing exactly one finalizer
//! ([`TxSplitReq`], [`TxReceiveReq`], [`TxSend1Req`] + [`TxSend2Req`] or
//! [`TxSendShieldedReq`]) which signs the kernel and returns the blinding offset.

mod coins;
pub use coins::*;

mod kernel;
pub use kernel::*;
