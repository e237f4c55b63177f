// Copyright (c) 2023 The Beam Team

//! Shielded pool vouchers and input proofs

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use super::{Driver, Error, KeyKeeper};
use crate::{
    apdu::prelude::*,
    crypto::{
        address::address,
        shielded::{next_voucher_nonce, spend_proof, voucher_hash, SpendError, Viewer},
        SignatureExt,
    },
};

impl From<SpendError> for Error {
    fn from(e: SpendError) -> Self {
        match e {
            SpendError::SerialOverflow => Error::SerialOverflow,
            SpendError::Decoy => Error::Decoy,
        }
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> KeyKeeper<DRV, RNG> {
    /// Generate vouchers for an own address, signed by the address key
    ///
    /// `capacity` is the number of vouchers fitting the response buffer.
    pub(crate) fn create_vouchers(
        &self,
        req: &CreateShieldedVouchersReq,
        capacity: usize,
    ) -> Result<CreateShieldedVouchersResp, Error> {
        let count = req.count as usize;

        let mut resp = CreateShieldedVouchersResp::default();
        if count == 0 {
            return Ok(resp);
        }
        if count > capacity {
            return Err(Error::OutputOverflow);
        }

        let viewer = Viewer::new(&self.master, 0);
        let (sk, _id) = address(&self.ctx, &self.master, req.addr_id);
        let sk = Zeroizing::new(sk);

        let mut nonce = req.nonce;
        for i in 0..count {
            if i > 0 {
                nonce = next_voucher_nonce(&nonce);
            }

            let mut v = viewer.voucher(&self.ctx, &nonce);
            v.signature = Signature::sign(&self.ctx, &voucher_hash(&v), &sk);

            resp.vouchers.push(v).map_err(|_| Error::OutputOverflow)?;
        }

        #[cfg(feature = "log")]
        log::debug!("{} vouchers for address {}", count, req.addr_id);

        Ok(resp)
    }

    /// Device part of a shielded input proof
    pub(crate) fn create_shielded_input(
        &self,
        req: &CreateShieldedInputReq,
    ) -> Result<CreateShieldedInputResp, Error> {
        if req.num_decoys() != Some(req.spend.sigma_m as usize) {
            return Err(Error::SizeMismatch);
        }

        let r = spend_proof(&self.ctx, &self.master, req)?;

        #[cfg(feature = "log")]
        log::debug!(
            "shielded input: {} (asset {})",
            req.fmt.amount,
            req.fmt.asset_id
        );

        Ok(r)
    }
}
