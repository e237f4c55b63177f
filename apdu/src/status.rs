// Copyright (c) 2023 The Beam Team

//! Response status codes
//!
//! Every response starts with a [`StatusMajor`] byte. Failed responses carry
//! a single minor byte qualifying the failure, successful responses carry
//! the encoded response structure.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     MAJOR     |     MINOR     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::Display;

use crate::ApduError;

/// Major status code
#[derive(Copy, Clone, PartialEq, Eq, Debug, TryFromPrimitive, Display)]
#[repr(u8)]
pub enum StatusMajor {
    Ok = 0,
    Unspecified = 1,
    UserAbort = 2,
    ProtoError = 3,
}

/// Protocol error minor codes
pub mod proto {
    /// Request size does not match the expected request size
    pub const SIZE_MISMATCH: u8 = 0x00;
    /// Response does not fit the output buffer
    pub const OUTPUT_OVERFLOW: u8 = 0x01;
    /// Empty request
    pub const EMPTY_REQUEST: u8 = 0xfd;
    /// Request or response buffer too short
    pub const TOO_SHORT: u8 = 0xfe;
    /// Unknown opcode
    pub const UNKNOWN_OPCODE: u8 = 0xff;
}

/// Two-part status, packed as `minor << 8 | major` for transports using 16-bit status words
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Status {
    pub major: StatusMajor,
    pub minor: u8,
}

impl Status {
    /// Encoded length of a failed response
    pub const LEN: usize = 2;

    pub const OK: Status = Status::new(StatusMajor::Ok, 0);

    pub const fn new(major: StatusMajor, minor: u8) -> Self {
        Self { major, minor }
    }

    pub const fn unspecified(minor: u8) -> Self {
        Self::new(StatusMajor::Unspecified, minor)
    }

    pub const fn user_abort(minor: u8) -> Self {
        Self::new(StatusMajor::UserAbort, minor)
    }

    pub const fn proto(minor: u8) -> Self {
        Self::new(StatusMajor::ProtoError, minor)
    }

    pub fn is_ok(&self) -> bool {
        self.major == StatusMajor::Ok
    }

    /// Pack status into a 16-bit word
    pub const fn packed(&self) -> u16 {
        (self.minor as u16) << 8 | self.major as u16
    }

    /// Unpack status from a 16-bit word
    pub fn from_packed(v: u16) -> Result<Self, ApduError> {
        let major =
            StatusMajor::try_from((v & 0xff) as u8).map_err(|_| ApduError::InvalidEncoding)?;
        Ok(Self::new(major, (v >> 8) as u8))
    }
}

impl Encode for Status {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.major as u8;
        buff[1] = self.minor;

        Ok(Self::LEN)
    }
}

impl DecodeOwned for Status {
    type Output = Self;
    type Error = ApduError;

    /// Decode a status from a response, successful responses decode as [`Status::OK`]
    /// consuming only the major byte
    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let major = StatusMajor::try_from(buff[0]).map_err(|_| ApduError::InvalidEncoding)?;
        if major == StatusMajor::Ok {
            return Ok((Self::OK, 1));
        }

        if buff.len() < Self::LEN {
            return Err(ApduError::InvalidLength);
        }

        Ok((Self::new(major, buff[1]), Self::LEN))
    }
}

#[cfg(test)]
mod test {
    use encdec::Decode;

    use super::*;

    #[test]
    fn status_packing() {
        let s = Status::unspecified(25);
        assert_eq!(s.packed(), 0x1901);
        assert_eq!(Status::from_packed(0x1901).unwrap(), s);

        assert_eq!(Status::proto(proto::UNKNOWN_OPCODE).packed(), 0xff03);
        assert_eq!(Status::OK.packed(), 0);
        assert!(Status::from_packed(0x0004).is_err());
    }

    #[test]
    fn status_encode_decode() {
        let mut buff = [0u8; 4];

        let s = Status::user_abort(22);
        assert_eq!(s.encode(&mut buff).unwrap(), 2);
        assert_eq!(&buff[..2], &[0x02, 22]);
        assert_eq!(Status::decode(&buff[..2]).ok(), Some((s, 2)));

        assert_eq!(Status::decode(&[0x00, 0xaa]).ok(), Some((Status::OK, 1)));
        assert!(matches!(
            Status::decode(&[0x01]),
            Err(ApduError::InvalidLength)
        ));
    }
}
