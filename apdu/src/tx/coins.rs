// Copyright (c) 2023 The Beam Team

use encdec::{Decode, Encode};

use crate::{
    types::{CoinId, ShieldedInputBlob, ShieldedInputFmt},
    ApduError, ApduStatic, Opcode, BEAM_APDU_CLA,
};

/// Add coins to the transaction balance
///
/// The header is followed by `num_inputs` then `num_outputs` [`CoinId`]s,
/// then `num_shielded` ([`ShieldedInputBlob`], [`ShieldedInputFmt`]) pairs.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     RESET     |  NUM_INPUTS   |  NUM_OUTPUTS  | NUM_SHIELDED  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    INPUTS (28-byte each)...                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    OUTPUTS (28-byte each)...                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /             SHIELDED INPUTS (33 + 24-byte each)...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Decoding does not check the payload length, the receiver must compare
/// [`TxAddCoinsReq::payload`] against [`TxAddCoinsReq::expected_payload_len`].
#[derive(Clone, PartialEq, Debug)]
pub struct TxAddCoinsReq<'a> {
    /// Discard any existing balance prior to adding coins
    pub reset: u8,
    pub num_inputs: u8,
    pub num_outputs: u8,
    pub num_shielded: u8,

    /// Encoded coin list
    pub payload: &'a [u8],
}

impl<'a> ApduStatic for TxAddCoinsReq<'a> {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxAddCoins as u8;
}

/// Encoded length of a shielded input entry
pub const SHIELDED_ENTRY_LEN: usize = ShieldedInputBlob::LEN + ShieldedInputFmt::LEN;

impl<'a> TxAddCoinsReq<'a> {
    /// Header length
    pub const HEADER_LEN: usize = 4;

    /// Encode a coin list into `buff`, returning a request referencing the written payload
    pub fn build(
        buff: &'a mut [u8],
        reset: bool,
        inputs: &[CoinId],
        outputs: &[CoinId],
        shielded: &[(ShieldedInputBlob, ShieldedInputFmt)],
    ) -> Result<Self, ApduError> {
        if inputs.len() > u8::MAX as usize
            || outputs.len() > u8::MAX as usize
            || shielded.len() > u8::MAX as usize
        {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;
        for c in inputs.iter().chain(outputs.iter()) {
            index += c.encode(&mut buff[index..])?;
        }
        for (blob, fmt) in shielded {
            index += blob.encode(&mut buff[index..])?;
            index += fmt.encode(&mut buff[index..])?;
        }

        let buff: &'a [u8] = buff;

        Ok(Self {
            reset: reset as u8,
            num_inputs: inputs.len() as u8,
            num_outputs: outputs.len() as u8,
            num_shielded: shielded.len() as u8,
            payload: &buff[..index],
        })
    }

    /// Payload length implied by the header counts
    pub fn expected_payload_len(&self) -> usize {
        (self.num_inputs as usize + self.num_outputs as usize) * CoinId::LEN
            + self.num_shielded as usize * SHIELDED_ENTRY_LEN
    }

    /// Iterate over input coins
    pub fn inputs(&self) -> CoinIter<'a> {
        CoinIter {
            buff: self.payload,
            remaining: self.num_inputs as usize,
        }
    }

    /// Iterate over output coins
    pub fn outputs(&self) -> CoinIter<'a> {
        let offset = (self.num_inputs as usize * CoinId::LEN).min(self.payload.len());

        CoinIter {
            buff: &self.payload[offset..],
            remaining: self.num_outputs as usize,
        }
    }

    /// Iterate over shielded inputs
    pub fn shielded(&self) -> ShieldedIter<'a> {
        let offset = ((self.num_inputs as usize + self.num_outputs as usize) * CoinId::LEN)
            .min(self.payload.len());

        ShieldedIter {
            buff: &self.payload[offset..],
            remaining: self.num_shielded as usize,
        }
    }
}

/// Iterator over encoded [`CoinId`]s
pub struct CoinIter<'a> {
    buff: &'a [u8],
    remaining: usize,
}

impl<'a> Iterator for CoinIter<'a> {
    type Item = Result<CoinId, ApduError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match CoinId::decode(self.buff) {
            Ok((c, n)) => {
                self.buff = &self.buff[n..];
                Some(Ok(c))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over encoded shielded inputs
pub struct ShieldedIter<'a> {
    buff: &'a [u8],
    remaining: usize,
}

impl<'a> Iterator for ShieldedIter<'a> {
    type Item = Result<(ShieldedInputBlob, ShieldedInputFmt), ApduError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let r = ShieldedInputBlob::decode(self.buff).and_then(|(blob, n)| {
            let (fmt, m) = ShieldedInputFmt::decode(&self.buff[n..])?;
            Ok((blob, fmt, n + m))
        });

        match r {
            Ok((blob, fmt, n)) => {
                self.buff = &self.buff[n..];
                Some(Ok((blob, fmt)))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

impl<'a> Encode for TxAddCoinsReq<'a> {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = Self::HEADER_LEN + self.payload.len();
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.reset;
        buff[1] = self.num_inputs;
        buff[2] = self.num_outputs;
        buff[3] = self.num_shielded;
        buff[Self::HEADER_LEN..n].copy_from_slice(self.payload);

        Ok(n)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(Self::HEADER_LEN + self.payload.len())
    }
}

impl<'a> Decode<'a> for TxAddCoinsReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < Self::HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        let apdu = Self {
            reset: buff[0],
            num_inputs: buff[1],
            num_outputs: buff[2],
            num_shielded: buff[3],
            payload: &buff[Self::HEADER_LEN..],
        };

        Ok((apdu, buff.len()))
    }
}
