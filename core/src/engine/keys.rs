// Copyright (c) 2023 The Beam Team

//! Key export, images and output range proofs

use rand_core::CryptoRngCore;
use zeroize::{Zeroize, Zeroizing};

use super::{Driver, Error, KeyKeeper};
use crate::{
    apdu::prelude::*,
    crypto::{address::address, export, range_proof, scalar_bytes},
};

/// Child Kdf exported by [`PKdfReq`] with a non-zero kind
pub const PKDF_CHILD: u32 = u32::MAX;

impl<DRV: Driver, RNG: CryptoRngCore> KeyKeeper<DRV, RNG> {
    /// Public owner Kdf, or the public child Kdf for non-zero kinds
    pub(crate) fn get_pkdf(&self, req: &PKdfReq) -> PKdfResp {
        let kdf = match req.kind {
            0 => self.master.to_pub(&self.ctx),
            _ => self.master.child(PKDF_CHILD).to_pub(&self.ctx),
        };

        PKdfResp { kdf }
    }

    /// Images `sk·G` and / or `sk·J` of a child key
    pub(crate) fn get_image(&self, req: &ImageReq) -> Result<ImageResp, Error> {
        if req.flags.is_empty() {
            return Err(Error::NoImage);
        }

        let sk = Zeroizing::new(self.master.child(req.child).derive_skey(&req.hv));

        let image_g = match req.flags.contains(ImageFlags::G) {
            true => export(&self.ctx.mul_g(&sk)),
            false => CompactPoint::INFINITY,
        };
        let image_j = match req.flags.contains(ImageFlags::J) {
            true => export(&self.ctx.mul_j(&sk)),
            false => CompactPoint::INFINITY,
        };

        Ok(ImageResp { image_g, image_j })
    }

    /// Device part of the range proof for an own output
    pub(crate) fn create_output(&self, req: &CreateOutputReq) -> Result<CreateOutputResp, Error> {
        let p = range_proof::calculate(
            &self.ctx,
            &self.master,
            &req.cid,
            &req.t,
            req.k_extra(),
            req.asset_gen(),
        )
        .ok_or(Error::RangeProof)?;

        #[cfg(feature = "log")]
        log::debug!("output created: {} (asset {})", req.cid.amount, req.cid.asset_id);

        Ok(CreateOutputResp {
            t: p.t_out,
            tau_x: scalar_bytes(&p.tau_x),
        })
    }

    /// Show an own address on the device
    pub(crate) fn display_address(&mut self, req: &DisplayAddressReq) {
        let (mut sk, id) = address(&self.ctx, &self.master, req.addr_id);
        sk.zeroize();

        self.drv.display_address(req.addr_id, &id);
    }
}
