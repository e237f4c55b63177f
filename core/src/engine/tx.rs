// Copyright (c) 2023 The Beam Team

//! Transaction kernel signing

use k256::Scalar;
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{Driver, Error, KeyKeeper, SpendRequest};
use crate::{
    apdu::prelude::*,
    crypto::{
        address::{address, payment_confirmation},
        export, finish, import,
        kernel::kernel_id,
        scalar_bytes,
        shielded::verify_output,
        signature::{challenge, sign_partial},
        Context, HashWriter, NonceGenerator, SignatureExt,
    },
};

/// Kernel blinding and nonce keys
#[derive(Zeroize, ZeroizeOnDrop)]
struct KernelKeys {
    k_krn: Scalar,
    k_nonce: Scalar,
}

impl KernelKeys {
    /// Derive both keys from a transaction hash
    fn derive(salt: &[u8], hv: &[u8; 32]) -> Self {
        let mut ng = NonceGenerator::new(salt, hv);

        Self {
            k_krn: ng.next_scalar(),
            k_nonce: ng.next_scalar(),
        }
    }

    /// Public commitments, combined with the peer's if provided
    fn commitments(
        &self,
        ctx: &Context,
        peer: Option<&TxKernelCommitments>,
    ) -> Result<TxKernelCommitments, Error> {
        let mut commitment = ctx.mul_g(&self.k_krn);
        let mut nonce_pub = ctx.mul_g(&self.k_nonce);

        if let Some(p) = peer {
            commitment += import(&p.commitment).ok_or(Error::PeerCommitments)?;
            nonce_pub += import(&p.nonce_pub).ok_or(Error::PeerCommitments)?;
        }

        Ok(TxKernelCommitments {
            commitment: export(&commitment),
            nonce_pub: export(&nonce_pub),
        })
    }

    /// Partial kernel signature over the (aggregate) nonce
    fn sign(&self, nonce_pub: &CompactPoint, krn_id: &[u8; 32]) -> [u8; 32] {
        let e = challenge(nonce_pub, krn_id);
        let k = Zeroizing::new(sign_partial(&e, &self.k_krn, &self.k_nonce));
        scalar_bytes(&k)
    }
}

/// Keys and parameters shared by both send phases
struct SendContext {
    net: u64,
    aid: u32,
    my_id: [u8; 32],
    token: [u8; 32],
    keys: KernelKeys,
}

impl<DRV: Driver, RNG: CryptoRngCore> KeyKeeper<DRV, RNG> {
    /// Sign a split, returning the balance to the wallet minus the fee
    pub(crate) fn tx_split(&mut self, req: &TxSplitReq) -> Result<TxSplitResp, Error> {
        let krn = &req.krn;

        let b = self.tx_balance()?;
        let (net, _aid) = b.net(Some(krn.fee))?;
        if net != 0 {
            return Err(Error::NetAmount);
        }

        let mut sha = Sha256::new();
        sha.write_num(krn.h_min)
            .write_num(krn.h_max)
            .write_num(krn.fee)
            .write_scalar(b.sk());
        let hv = Zeroizing::new(finish(sha));

        let keys = KernelKeys::derive(b"hw-wlt-split\0", &hv);
        let comms = keys.commitments(&self.ctx, None)?;
        let id = kernel_id(krn, &comms, &[]);

        self.confirm(&SpendRequest {
            amount: 0,
            asset_id: 0,
            peer: None,
            krn,
            krn_id: Some(&id),
        })?;

        let sig = self.sign_kernel(&keys, &keys.k_krn, &comms.nonce_pub, &id, krn.fee)?;

        #[cfg(feature = "log")]
        log::debug!("split signed, fee {}", krn.fee);

        Ok(TxSplitResp { comms, sig })
    }

    /// Co-sign a transaction sending funds to this wallet
    pub(crate) fn tx_receive(&mut self, req: &TxReceiveReq) -> Result<TxReceiveResp, Error> {
        let (krn, mutual) = (&req.krn, &req.mutual);

        let b = self.tx_balance()?;
        let (net, aid) = b.net(None)?;

        // Bind every visible parameter, the peer ID is not final yet
        let mut sha = Sha256::new();
        sha.write_bytes(&kernel_id(krn, &req.comms, &[]))
            .write_point(&req.comms.nonce_pub)
            .write_bytes(&[0])
            .write_bytes(&mutual.peer)
            .write_num(mutual.addr_id)
            .write_scalar(b.sk())
            .write_num(net)
            .write_num(aid as u64);
        let hv = Zeroizing::new(finish(sha));

        let keys = KernelKeys::derive(b"hw-wlt-rcv\0", &hv);
        let comms = keys.commitments(&self.ctx, Some(&req.comms))?;
        let id = kernel_id(krn, &comms, &[]);

        let k_sig = keys.sign(&comms.nonce_pub, &id);
        let k_offset = self.tx_balance()?.offset(&keys.k_krn);

        let payment_proof = match mutual.addr_id {
            0 => Signature::default(),
            addr_id => {
                let (sk, _) = address(&self.ctx, &self.master, addr_id);
                let sk = Zeroizing::new(sk);

                let msg = payment_confirmation(&mutual.peer, &id, net, aid);
                Signature::sign(&self.ctx, &msg, &sk)
            }
        };

        #[cfg(feature = "log")]
        log::debug!("receive signed: {net} (asset {aid})");

        Ok(TxReceiveResp {
            comms,
            sig: TxSig { k_sig, k_offset },
            payment_proof,
        })
    }

    /// First send phase, returning the user agreement token and our commitments
    pub(crate) fn tx_send1(&mut self, req: &TxSend1Req) -> Result<TxSend1Resp, Error> {
        let c = self.send_context(&req.krn, &req.mutual, req.slot)?;

        self.confirm(&SpendRequest {
            amount: c.net,
            asset_id: c.aid,
            peer: Some(&req.mutual.peer),
            krn: &req.krn,
            krn_id: None,
        })?;

        let comms = c.keys.commitments(&self.ctx, None)?;

        Ok(TxSend1Resp {
            user_agreement: c.token,
            comms,
        })
    }

    /// Second send phase, signing once the receiver's payment proof checks out
    pub(crate) fn tx_send2(&mut self, req: &TxSend2Req) -> Result<TxSend2Resp, Error> {
        let c = self.send_context(&req.krn, &req.mutual, req.slot)?;

        if req.user_agreement != c.token {
            return Err(Error::UserAgreement);
        }

        let id = kernel_id(&req.krn, &req.comms, &[]);

        let msg = payment_confirmation(&c.my_id, &id, c.net, c.aid);
        if !req
            .payment_proof
            .is_valid_x(&self.ctx, &msg, &req.mutual.peer)
        {
            return Err(Error::PaymentProof);
        }

        // The spend was approved in the first phase, the slot must
        // not be reused once a signature is released
        self.regenerate_slot(req.slot);

        let sig = self.sign_kernel(
            &c.keys,
            &c.keys.k_krn,
            &req.comms.nonce_pub,
            &id,
            req.krn.fee,
        )?;

        #[cfg(feature = "log")]
        log::debug!("send signed: {} (asset {}) fee {}", c.net, c.aid, req.krn.fee);

        Ok(TxSend2Resp { sig })
    }

    /// Sign the outer kernel of a send to a shielded voucher
    pub(crate) fn tx_send_shielded(
        &mut self,
        req: &TxSendShieldedReq,
    ) -> Result<TxSendShieldedResp, Error> {
        let (krn, mutual) = (&req.krn, &req.mutual);

        let (net, aid) = self.tx_balance()?.net(Some(krn.fee))?;
        if net == 0 {
            return Err(Error::NetAmount);
        }
        if mutual.peer == [0u8; 32] {
            return Err(Error::MissingPeer);
        }

        let (sk_krn1, krn1_id) =
            verify_output(&self.ctx, &self.master, req, net, aid).ok_or(Error::ShieldedOutput)?;

        let mut sha = Sha256::new();
        sha.write_bytes(&krn1_id)
            .write_num(krn.h_min)
            .write_num(krn.h_max)
            .write_num(krn.fee)
            .write_scalar(self.tx_balance()?.sk());
        let hv = Zeroizing::new(finish(sha));

        let keys = KernelKeys::derive(b"hw-wlt-snd-sh\0", &hv);
        let comms = keys.commitments(&self.ctx, None)?;
        let id = kernel_id(krn, &comms, &[krn1_id]);

        // Sends to an own address move no value out of the wallet
        let spend = match mutual.addr_id {
            0 => SpendRequest {
                amount: net,
                asset_id: aid,
                peer: Some(&mutual.peer),
                krn,
                krn_id: Some(&id),
            },
            _ => SpendRequest {
                amount: 0,
                asset_id: 0,
                peer: None,
                krn,
                krn_id: Some(&id),
            },
        };
        self.confirm(&spend)?;

        // The offset also covers the nested output kernel
        let k_offs = Zeroizing::new(keys.k_krn + *sk_krn1);
        let sig = self.sign_kernel(&keys, &k_offs, &comms.nonce_pub, &id, krn.fee)?;

        #[cfg(feature = "log")]
        log::debug!("shielded send signed: {net} (asset {aid}) fee {}", krn.fee);

        Ok(TxSendShieldedResp { comms, sig })
    }

    /// Sign a kernel and compute the balance offset, recording the fee
    fn sign_kernel(
        &mut self,
        keys: &KernelKeys,
        k_offs: &Scalar,
        nonce_pub: &CompactPoint,
        krn_id: &[u8; 32],
        fee: u64,
    ) -> Result<TxSig, Error> {
        let b = self.tx_balance_mut()?;

        let sig = TxSig {
            k_sig: keys.sign(nonce_pub, krn_id),
            k_offset: b.offset(k_offs),
        };
        b.settle(fee);

        Ok(sig)
    }

    /// Derive the send keys and agreement token for a slot
    fn send_context(
        &self,
        krn: &TxKernelUser,
        mutual: &TxMutual,
        slot: u32,
    ) -> Result<SendContext, Error> {
        let b = self.tx_balance()?;

        let (net, aid) = b.net(Some(krn.fee))?;
        if net == 0 {
            return Err(Error::NetAmount);
        }
        if mutual.peer == [0u8; 32] {
            return Err(Error::MissingPeer);
        }
        if slot >= self.config.num_slots {
            return Err(Error::SlotRange);
        }

        let (mut addr_sk, my_id) = address(&self.ctx, &self.master, mutual.addr_id);
        addr_sk.zeroize();

        let slot_value = Zeroizing::new(self.drv.slot_read(slot));
        let k_nonce = Zeroizing::new(self.master.derive_skey(&slot_value));

        // Heights and commitments change during negotiation, only the fee is bound
        let mut sha = Sha256::new();
        sha.write_num(krn.fee)
            .write_bytes(&mutual.peer)
            .write_bytes(&my_id)
            .write_bytes(&[0])
            .write_scalar(b.sk())
            .write_num(net)
            .write_num(aid as u64)
            .write_scalar(&k_nonce);
        let hv = Zeroizing::new(finish(sha));

        let mut ng = NonceGenerator::new(b"hw-wlt-snd\0", &hv);
        let keys = KernelKeys {
            k_krn: ng.next_scalar(),
            k_nonce: *k_nonce,
        };

        let mut sha = Sha256::new();
        sha.write_str(b"tx.token\0").write_scalar(&keys.k_krn);
        let mut token = finish(sha);

        if token == [0u8; 32] {
            token[31] = 1;
        }

        Ok(SendContext {
            net,
            aid,
            my_id,
            token,
            keys,
        })
    }
}
