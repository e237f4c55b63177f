// Copyright (c) 2023 The Beam Team

//! Protocol definitions for Beam hardware wallet communication
//!
//! This module provides the request / response structures exchanged between a host wallet
//! and the key keeper running on a signing device.
//!
//! Each request is a single opcode byte followed by the encoded request structure,
//! each response is a single [`StatusMajor`] byte followed by the encoded response
//! structure on success, or by a minor status byte on failure (see [status]).
//!
//! Encodings are packed, fields are written in declaration order and
//! all integer fields are little-endian.
//! Curve points are transmitted in [`CompactPoint`][types::CompactPoint] form
//! (32-byte big-endian x coordinate and a y parity byte), scalars as 32-byte
//! big-endian values.

#![no_std]

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

pub use ledger_proto::{ApduError, ApduReq, ApduStatic};

pub mod info;
pub mod output;
pub mod prelude;
pub mod shielded;
pub mod status;
pub mod tx;
pub mod types;

mod helpers;

/// Beam APDU class
pub const BEAM_APDU_CLA: u8 = 0xbe;

/// Protocol version signature returned by [`VersionReq`][info::VersionReq]
pub const BEAM_PROTO_SIGNATURE: [u8; 8] = *b"BeamHW\x00\x01";

/// Beam key keeper opcodes, sent as the first byte of each request
#[derive(Copy, Clone, Debug, PartialEq, TryFromPrimitive, Display, EnumIter)]
#[repr(u8)]
pub enum Opcode {
    // General requests
    /// Fetch protocol signature
    Version = 0x01,

    /// Fetch number of nonce slots
    GetNumSlots = 0x02,

    /// Fetch owner (or child) public Kdf
    GetPKdf = 0x03,

    /// Fetch key images for a derived key
    GetImage = 0x04,

    // Outputs
    /// Compute the device part of an output range proof
    CreateOutput = 0x10,

    // Transactions
    /// Add coins to transaction balance
    TxAddCoins = 0x20,

    /// Sign a split (self-transfer) transaction
    TxSplit = 0x21,

    /// Co-sign an incoming transaction
    TxReceive = 0x22,

    /// Start an outgoing transaction
    TxSend1 = 0x23,

    /// Finalise an outgoing transaction
    TxSend2 = 0x24,

    /// Sign an outgoing shielded transaction
    TxSendShielded = 0x25,

    // Addresses & shielded pool
    /// Display own address for user verification
    DisplayAddress = 0x30,

    /// Generate shielded vouchers for an owned address
    CreateShieldedVouchers = 0x31,

    /// Compute a shielded input (spend) proof
    CreateShieldedInput = 0x32,
}

/// Helper macro for encoding `bitflags` types
#[macro_export]
macro_rules! encdec_bitflags {
    ($b:ty) => {
        impl encdec::Encode for $b {
            type Error = $crate::ApduError;

            fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode(&bits, buff).map_err(|e| e.into())
            }

            fn encode_len(&self) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode_len(&bits).map_err(|e| e.into())
            }
        }

        impl encdec::DecodeOwned for $b {
            type Output = $b;
            type Error = $crate::ApduError;

            fn decode_owned(buff: &[u8]) -> Result<(Self, usize), Self::Error> {
                if buff.is_empty() {
                    return Err($crate::ApduError::InvalidLength);
                }

                let v = <$b>::from_bits_truncate(buff[0]);
                Ok((v, 1))
            }
        }
    };
}

/// Helper macro for requests without a payload
macro_rules! encdec_empty {
    ($b:ty) => {
        impl encdec::Encode for $b {
            type Error = $crate::ApduError;

            fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
                Ok(0)
            }

            fn encode_len(&self) -> Result<usize, Self::Error> {
                Ok(0)
            }
        }

        impl encdec::DecodeOwned for $b {
            type Output = $b;
            type Error = $crate::ApduError;

            fn decode_owned(_buff: &[u8]) -> Result<(Self, usize), Self::Error> {
                Ok((Self {}, 0))
            }
        }
    };
}
pub(crate) use encdec_empty;
