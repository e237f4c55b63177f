// Copyright (c) 2023 The Beam Team

use encdec::{Decode, Encode};

use crate::{
    helpers::*,
    types::{
        CompactPoint, RangeProofPacked, ShieldedTxoUser, ShieldedVoucher, Signature,
        TxKernelCommitments, TxKernelUser, TxMutual, TxSig,
    },
    ApduError, ApduStatic, Opcode, BEAM_APDU_CLA,
};

/// Sign a split transaction, spending the balance back to the owner
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSplitReq {
    pub krn: TxKernelUser,
}

impl ApduStatic for TxSplitReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxSplit as u8;
}

impl TxSplitReq {
    pub fn new(krn: TxKernelUser) -> Self {
        Self { krn }
    }
}

/// Kernel commitments and signature for a split transaction
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSplitResp {
    pub comms: TxKernelCommitments,
    pub sig: TxSig,
}

impl TxSplitResp {
    pub const LEN: usize = 2 * CompactPoint::LEN + 64;
}

/// Co-sign a transaction initiated by a peer
///
/// `comms` are the sender's kernel commitments (from [`TxSend1Resp`]).
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                       KERNEL (24-byte)                        /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    PEER_ID (32-byte)                          /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     ADDR_ID (u64, 8-byte)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /              COMMITMENT, NONCE_PUB (2 x 33-byte)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxReceiveReq {
    pub krn: TxKernelUser,
    pub mutual: TxMutual,
    pub comms: TxKernelCommitments,
}

impl ApduStatic for TxReceiveReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxReceive as u8;
}

/// Receiver kernel commitments, signature and payment proof
///
/// The payment proof is all zero when no own address was specified.
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxReceiveResp {
    pub comms: TxKernelCommitments,
    pub sig: TxSig,
    pub payment_proof: Signature,
}

impl TxReceiveResp {
    pub const LEN: usize = TxSplitResp::LEN + Signature::LEN;
}

/// Start an outgoing transaction, returning commitments for the receiver
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSend1Req {
    pub krn: TxKernelUser,
    pub mutual: TxMutual,

    /// Nonce slot index
    pub slot: u32,
}

impl ApduStatic for TxSend1Req {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxSend1 as u8;
}

impl TxSend1Req {
    pub fn new(krn: TxKernelUser, mutual: TxMutual, slot: u32) -> Self {
        Self { krn, mutual, slot }
    }
}

/// Sender token and kernel commitments
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSend1Resp {
    /// Token binding the two send phases
    #[encdec(with = "arr")]
    pub user_agreement: [u8; 32],

    pub comms: TxKernelCommitments,
}

impl TxSend1Resp {
    pub const LEN: usize = 32 + 2 * CompactPoint::LEN;
}

/// Finalise an outgoing transaction with the receiver's commitments and payment proof
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                 KERNEL, MUTUAL (24 + 40-byte)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           SLOT (u32)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                   PAYMENT_PROOF (65-byte)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  USER_AGREEMENT (32-byte)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /              COMMITMENT, NONCE_PUB (2 x 33-byte)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSend2Req {
    pub krn: TxKernelUser,
    pub mutual: TxMutual,
    pub slot: u32,

    pub payment_proof: Signature,

    #[encdec(with = "arr")]
    pub user_agreement: [u8; 32],

    /// Combined kernel commitments returned by the receiver
    pub comms: TxKernelCommitments,
}

impl ApduStatic for TxSend2Req {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxSend2 as u8;
}

/// Sender signature and offset
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSend2Resp {
    pub sig: TxSig,
}

impl TxSend2Resp {
    pub const LEN: usize = 64;
}

/// Sign an outgoing shielded transaction
///
/// Carries the receiver's voucher, the host-built output range proof and
/// the output parameters needed to verify it.
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSendShieldedReq {
    pub krn: TxKernelUser,
    pub mutual: TxMutual,

    pub voucher: ShieldedVoucher,
    pub user: ShieldedTxoUser,
    pub range_proof: RangeProofPacked,

    /// Blind the asset generator even for the native asset
    pub hide_asset_always: u8,

    /// Asset generator (zero for none)
    pub asset_gen: CompactPoint,
}

impl ApduStatic for TxSendShieldedReq {
    const CLA: u8 = BEAM_APDU_CLA;
    const INS: u8 = Opcode::TxSendShielded as u8;
}

impl TxSendShieldedReq {
    /// Fetch asset generator if set
    pub fn asset_gen(&self) -> Option<&CompactPoint> {
        match self.asset_gen.x.iter().all(|v| *v == 0) {
            true => None,
            false => Some(&self.asset_gen),
        }
    }
}

/// Kernel commitments and signature for a shielded send
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSendShieldedResp {
    pub comms: TxKernelCommitments,
    pub sig: TxSig,
}

impl TxSendShieldedResp {
    pub const LEN: usize = TxSplitResp::LEN;
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_decode_apdu;

    fn mutual() -> TxMutual {
        TxMutual {
            peer: random(),
            addr_id: random(),
        }
    }

    fn comms() -> TxKernelCommitments {
        TxKernelCommitments {
            commitment: CompactPoint::new(random(), 1),
            nonce_pub: CompactPoint::new(random(), 0),
        }
    }

    #[test]
    fn encode_decode_send2() {
        let apdu = TxSend2Req {
            krn: TxKernelUser::new(random(), random(), random()),
            mutual: mutual(),
            slot: random(),
            payment_proof: Signature {
                nonce_pub: CompactPoint::new(random(), 1),
                k: random(),
            },
            user_agreement: random(),
            comms: comms(),
        };

        let mut buff = [0u8; 512];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 24 + 40 + 4 + 65 + 32 + 66);
    }

    #[test]
    fn encode_decode_receive() {
        let apdu = TxReceiveReq {
            krn: TxKernelUser::new(random(), random(), random()),
            mutual: mutual(),
            comms: comms(),
        };

        let mut buff = [0u8; 512];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 24 + 40 + 66);

        // Fee leads the request
        assert_eq!(&buff[..8], &apdu.krn.fee.to_le_bytes());
    }

    #[test]
    fn encode_decode_send_shielded() {
        let apdu = TxSendShieldedReq {
            krn: TxKernelUser::new(random(), random(), random()),
            mutual: mutual(),
            voucher: ShieldedVoucher {
                serial_pub: CompactPoint::new(random(), 1),
                shared_secret: random(),
                ..Default::default()
            },
            user: ShieldedTxoUser {
                sender: random(),
                message: [random(), random()],
            },
            range_proof: RangeProofPacked {
                taux: random(),
                ..Default::default()
            },
            hide_asset_always: 1,
            asset_gen: CompactPoint::INFINITY,
        };
        assert!(apdu.asset_gen().is_none());

        let mut buff = [0u8; 2048];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(
            n,
            24 + 40 + ShieldedVoucher::LEN + 96 + RangeProofPacked::LEN + 1 + 33
        );
    }
}
