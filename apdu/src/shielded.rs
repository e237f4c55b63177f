// Copyright (c) 2023 The Beam Team

//! Shielded pool requests

use encdec::{Decode, DecodeOwned, Encode};
use heapless::Vec;

use crate::{
    helpers::*,
    types::{
        CompactPoint, ShieldedInputBlob, ShieldedInputFmt, ShieldedSpendParams, ShieldedVoucher,
    },
    ApduError, ApduStatic, Opcode, BEAM_APDU_CLA,
};

/// Maximum number of vouchers per response
pub const VOUCHERS_MAX: usize = 16;

/// Generate shielded vouchers for an own address
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     ADDR_ID (u64, 8-byte)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     NONCE_0 (32-byte)                         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            COUNT                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CreateShieldedVouchersReq {
    pub addr_id: u64,

    /// Nonce for the first voucher
    #[encdec(with = "arr")]
    pub nonce: [u8; 32],

    pub count: u32,
}

impl ApduStatic for CreateShieldedVouchersReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::CreateShieldedVouchers as u8;
}

impl CreateShieldedVouchersReq {
    pub fn new(addr_id: u64, nonce: [u8; 32], count: u32) -> Self {
        Self {
            addr_id,
            nonce,
            count,
        }
    }
}

/// Generated vouchers, a `u32` count followed by the vouchers
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CreateShieldedVouchersResp {
    pub vouchers: Vec<ShieldedVoucher, VOUCHERS_MAX>,
}

impl CreateShieldedVouchersResp {
    /// Encoded length for `count` vouchers
    pub const fn len_for(count: usize) -> usize {
        4 + count * ShieldedVoucher::LEN
    }
}

impl Encode for CreateShieldedVouchersResp {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = Self::len_for(self.vouchers.len());
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = (self.vouchers.len() as u32).encode(buff)?;
        for v in &self.vouchers {
            index += v.encode(&mut buff[index..])?;
        }

        Ok(index)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(Self::len_for(self.vouchers.len()))
    }
}

impl DecodeOwned for CreateShieldedVouchersResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let (count, mut index) = u32::decode_owned(buff)?;
        if count as usize > VOUCHERS_MAX {
            return Err(ApduError::InvalidLength);
        }

        let mut vouchers = Vec::new();
        for _ in 0..count {
            let (v, n) = ShieldedVoucher::decode(&buff[index..])?;
            index += n;

            vouchers.push(v).map_err(|_| ApduError::InvalidLength)?;
        }

        Ok((Self { vouchers }, index))
    }
}

/// Compute the device part of a shielded input (Lelantus spend) proof
///
/// The fixed fields are followed by `spend.sigma_m` decoy generator points
/// (33 bytes each), the first of which is combined with the device blinding.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                 BLOB, FMT (33 + 24-byte)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                   SPEND_PARAMS (32-byte)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  SHIELDED_STATE (32-byte)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     ASSET_GEN (33-byte)                       /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                 ASSET_SK, OUTP_SK (2 x 32-byte)               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      ABCD (4 x 33-byte)                       /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                   DECOYS (M x 33-byte)...                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct CreateShieldedInputReq<'a> {
    pub blob: ShieldedInputBlob,
    pub fmt: ShieldedInputFmt,
    pub spend: ShieldedSpendParams,

    pub shielded_state: [u8; 32],

    /// Asset generator (zero for none)
    pub asset_gen: CompactPoint,

    /// Asset blinding scalar
    pub asset_sk: [u8; 32],

    /// Output blinding scalar
    pub outp_sk: [u8; 32],

    pub abcd: [CompactPoint; 4],

    /// Encoded decoy points
    pub decoys: &'a [u8],
}

impl<'a> ApduStatic for CreateShieldedInputReq<'a> {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::CreateShieldedInput as u8;
}

impl<'a> CreateShieldedInputReq<'a> {
    /// Length of the fixed request fields
    pub const FIXED_LEN: usize = ShieldedInputBlob::LEN
        + ShieldedInputFmt::LEN
        + 32
        + 32
        + CompactPoint::LEN
        + 64
        + 4 * CompactPoint::LEN;

    /// Fetch asset generator if set
    pub fn asset_gen(&self) -> Option<&CompactPoint> {
        match self.asset_gen.x.iter().all(|v| *v == 0) {
            true => None,
            false => Some(&self.asset_gen),
        }
    }

    /// Iterate over decoy points
    pub fn decoys(&self) -> impl Iterator<Item = Result<CompactPoint, ApduError>> + 'a {
        let decoys: &'a [u8] = self.decoys;
        decoys
            .chunks(CompactPoint::LEN)
            .map(|c| CompactPoint::decode(c).map(|(p, _n)| p))
    }

    /// Number of encoded decoy points, `None` if not a whole number
    pub fn num_decoys(&self) -> Option<usize> {
        match self.decoys.len() % CompactPoint::LEN {
            0 => Some(self.decoys.len() / CompactPoint::LEN),
            _ => None,
        }
    }
}

impl<'a> Encode for CreateShieldedInputReq<'a> {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < Self::FIXED_LEN + self.decoys.len() {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;
        index += self.blob.encode(&mut buff[index..])?;
        index += self.fmt.encode(&mut buff[index..])?;
        index += self.spend.encode(&mut buff[index..])?;
        index += arr::enc(&self.shielded_state, &mut buff[index..])?;
        index += self.asset_gen.encode(&mut buff[index..])?;
        index += arr::enc(&self.asset_sk, &mut buff[index..])?;
        index += arr::enc(&self.outp_sk, &mut buff[index..])?;
        index += items::enc(&self.abcd, &mut buff[index..])?;

        buff[index..][..self.decoys.len()].copy_from_slice(self.decoys);
        index += self.decoys.len();

        Ok(index)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(Self::FIXED_LEN + self.decoys.len())
    }
}

impl<'a> Decode<'a> for CreateShieldedInputReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < Self::FIXED_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        let (blob, n) = ShieldedInputBlob::decode(&buff[index..])?;
        index += n;
        let (fmt, n) = ShieldedInputFmt::decode(&buff[index..])?;
        index += n;
        let (spend, n) = ShieldedSpendParams::decode(&buff[index..])?;
        index += n;
        let (shielded_state, n) = arr::dec(&buff[index..])?;
        index += n;
        let (asset_gen, n) = CompactPoint::decode(&buff[index..])?;
        index += n;
        let (asset_sk, n) = arr::dec(&buff[index..])?;
        index += n;
        let (outp_sk, n) = arr::dec(&buff[index..])?;
        index += n;
        let (abcd, n) = items::dec(&buff[index..])?;
        index += n;

        let decoys = &buff[index..];

        Ok((
            Self {
                blob,
                fmt,
                spend,
                shielded_state,
                asset_gen,
                asset_sk,
                outp_sk,
                abcd,
                decoys,
            },
            buff.len(),
        ))
    }
}

/// Shielded input proof device part
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct CreateShieldedInputResp {
    /// Signature nonce
    pub nonce_pub: CompactPoint,

    /// Generalised Schnorr signature responses
    #[encdec(with = "arr2")]
    pub sig: [[u8; 32]; 2],

    /// First decoy generator with device blinding applied
    pub g0: CompactPoint,

    #[encdec(with = "arr")]
    pub z_r: [u8; 32],
}

impl CreateShieldedInputResp {
    pub const LEN: usize = 2 * CompactPoint::LEN + 96;
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn encode_decode_vouchers_resp() {
        let mut r = CreateShieldedVouchersResp::default();
        for _ in 0..3 {
            let v = ShieldedVoucher {
                serial_pub: CompactPoint::new(random(), 1),
                shared_secret: random(),
                k: [random(), random()],
                ..Default::default()
            };
            r.vouchers.push(v).unwrap();
        }

        let mut buff = [0u8; 1024];
        let n = encode_decode_apdu(&mut buff, &r);
        assert_eq!(n, CreateShieldedVouchersResp::len_for(3));
        assert_eq!(&buff[..4], &[3, 0, 0, 0]);
    }

    #[test]
    fn encode_decode_shielded_input() {
        let mut decoys = [0u8; 3 * 33];
        for (i, c) in decoys.chunks_mut(33).enumerate() {
            c[0] = i as u8 + 1;
            c[32] = 1;
        }

        let apdu = CreateShieldedInputReq {
            blob: ShieldedInputBlob {
                k_ser_g: random(),
                is_created_by_viewer: 0,
            },
            fmt: ShieldedInputFmt {
                fee: random(),
                amount: random(),
                asset_id: 0,
                viewer_idx: 0,
            },
            spend: ShieldedSpendParams {
                h_min: random(),
                h_max: random(),
                window_end: random(),
                sigma_n: 4,
                sigma_m: 3,
            },
            shielded_state: random(),
            asset_gen: CompactPoint::INFINITY,
            asset_sk: random(),
            outp_sk: random(),
            abcd: [CompactPoint::new(random(), 1); 4],
            decoys: &decoys,
        };

        assert_eq!(apdu.num_decoys(), Some(3));
        assert!(apdu.asset_gen().is_none());

        let mut buff = [0u8; 1024];
        let n = apdu.encode(&mut buff).unwrap();
        assert_eq!(n, CreateShieldedInputReq::FIXED_LEN + 99);
        assert_eq!(n, apdu.encode_len().unwrap());

        let (decoded, m) = CreateShieldedInputReq::decode(&buff[..n]).unwrap();
        assert_eq!(m, n);
        assert_eq!(decoded, apdu);

        let p: heapless::Vec<_, 4> = decoded.decoys().map(|p| p.unwrap()).collect();
        assert_eq!(p.len(), 3);
        assert_eq!(p[2].x[0], 3);
        assert_eq!(p[2].y, 1);
    }
}
