// Copyright (c) 2023 The Beam Team

//! Beam hardware wallet core
//!
//! This provides the cryptographic primitives and the [KeyKeeper][engine::KeyKeeper]
//! state machine for execution on hardware wallets. Secret keys never leave
//! the key keeper, hosts drive it with APDU-style requests (see [beam_hw_apdu])
//! and receive commitments, proofs and signatures.
//!
//! ## Operations
//!
//! Prior to interacting with a key keeper the client should issue a
//! [`VersionReq`][beam_hw_apdu::info::VersionReq] to check the protocol version,
//! then may fetch the public Kdf via [`PKdfReq`][beam_hw_apdu::info::PKdfReq]
//! for wallet scanning.
//!
//! ### Creating outputs
//!
//! [`CreateOutputReq`][beam_hw_apdu::output::CreateOutputReq] runs the device side of
//! the bulletproof for a coin, returning `T1`, `T2` and `tauX` for the host to
//! complete the proof.
//!
//! ### Executing a transaction
//!
//! 1. Issue [`TxAddCoinsReq`][beam_hw_apdu::tx::TxAddCoinsReq] (with `reset` set on the
//!    first request) to accumulate inputs, outputs and shielded inputs into
//!    the transaction balance
//! 2. Finalise the kernel with one of:
//!     - [`TxSplitReq`][beam_hw_apdu::tx::TxSplitReq] for a split back to the owner
//!     - [`TxReceiveReq`][beam_hw_apdu::tx::TxReceiveReq] to co-sign as receiver
//!     - [`TxSend1Req`][beam_hw_apdu::tx::TxSend1Req] then
//!       [`TxSend2Req`][beam_hw_apdu::tx::TxSend2Req] as sender
//!     - [`TxSendShieldedReq`][beam_hw_apdu::tx::TxSendShieldedReq] to pay a shielded voucher
//!
//! Spending operations request user confirmation via the [Driver][engine::Driver].

#![cfg_attr(not(feature = "std"), no_std)]

pub use beam_hw_apdu::{self as apdu};

pub mod crypto;

pub mod engine;
