// Copyright (c) 2023 The Beam Team

//! Transaction balance accumulation

use k256::Scalar;
use rand_core::CryptoRngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{Config, Driver, Error, KeyKeeper};
use crate::{
    apdu::{
        tx::TxAddCoinsReq,
        types::{CoinId, ShieldedInputBlob, ShieldedInputFmt},
    },
    crypto::{
        coin::{CoinIdExt, SCHEME_BB21, SCHEME_V0},
        scalar_bytes,
        shielded::input_sk,
        Context, Kdf,
    },
};

/// Key keeper session state
#[derive(Debug, Default)]
pub enum Session {
    /// No transaction in progress
    #[default]
    None,
    /// Coins are being accumulated for a transaction
    TxBalance(TxBalance),
}

/// Accumulated transaction balance
///
/// Amounts are signed from the wallet's point of view: outputs add to the
/// received value, inputs subtract from it.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct TxBalance {
    /// Sum of output blindings minus input blindings
    sk: Scalar,
    /// Net native asset received
    pub rcv_beam: i64,
    /// Net non-native asset received
    pub rcv_asset: i64,
    /// Non-native asset ID, zero if none seen
    pub aid: u32,
    /// Fees paid by shielded inputs
    pub implicit_fee: u64,
    /// Implicit fees plus kernel fees signed against this balance
    pub total_fee: u64,
}

impl core::fmt::Debug for TxBalance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TxBalance")
            .field("rcv_beam", &self.rcv_beam)
            .field("rcv_asset", &self.rcv_asset)
            .field("aid", &self.aid)
            .field("implicit_fee", &self.implicit_fee)
            .field("total_fee", &self.total_fee)
            .finish_non_exhaustive()
    }
}

impl TxBalance {
    fn add_amount(&mut self, amount: u64, aid: u32, is_out: bool) -> Result<(), Error> {
        let rcv = match aid {
            0 => &mut self.rcv_beam,
            _ => {
                // Only one non-native asset per transaction
                if self.aid != 0 && self.aid != aid {
                    return Err(Error::AmountOverflow);
                }
                self.aid = aid;
                &mut self.rcv_asset
            }
        };

        let v = match is_out {
            true => rcv.checked_add_unsigned(amount),
            false => rcv.checked_sub_unsigned(amount),
        };
        *rcv = v.ok_or(Error::AmountOverflow)?;

        Ok(())
    }

    /// Add a coin owned by `master`
    fn add_coin(
        &mut self,
        ctx: &Context,
        master: &Kdf,
        config: &Config,
        cid: &CoinId,
        is_out: bool,
    ) -> Result<(), Error> {
        // Outputs to child subkeys may belong to miners
        if cid.subkey() != 0 && is_out {
            return Err(Error::ChildOutput);
        }

        let scheme = cid.scheme();
        if scheme == SCHEME_V0 || scheme == SCHEME_BB21 {
            if is_out {
                return Err(Error::WeakOutput);
            }
            if !config.allow_weak_inputs {
                return Err(Error::WeakInput);
            }
        }

        self.add_amount(cid.amount, cid.asset_id, is_out)?;

        let sk = Zeroizing::new(cid.sk(master, ctx));
        match is_out {
            true => self.sk += *sk,
            false => self.sk -= *sk,
        }

        Ok(())
    }

    /// Add a shielded input, paying any attached fee from the native balance
    fn add_shielded(
        &mut self,
        master: &Kdf,
        config: &Config,
        blob: &ShieldedInputBlob,
        fmt: &ShieldedInputFmt,
    ) -> Result<(), Error> {
        self.add_amount(fmt.amount, fmt.asset_id, false)?;

        if fmt.fee != 0 {
            if fmt.fee > config.max_shielded_fee {
                return Err(Error::ShieldedFee);
            }

            self.implicit_fee = self
                .implicit_fee
                .checked_add(fmt.fee)
                .ok_or(Error::AmountOverflow)?;
            self.total_fee = self.total_fee.saturating_add(fmt.fee);

            self.add_amount(fmt.fee, 0, true)?;
        }

        let sk = Zeroizing::new(input_sk(master, blob, fmt));
        self.sk -= *sk;

        Ok(())
    }

    /// Net transferred amount and asset
    ///
    /// With `fee` set the wallet is sending and pays the kernel fee, the
    /// returned amount is what leaves the wallet (zero for a split).
    /// Without, the wallet is receiving and the amount must be positive.
    pub fn net(&self, fee: Option<u64>) -> Result<(u64, u32), Error> {
        let mut rcv = self.rcv_beam;
        if let Some(fee) = fee {
            rcv = rcv
                .checked_add_unsigned(fee)
                .ok_or(Error::AmountOverflow)?;
        }

        let aid = match self.rcv_asset {
            0 => 0,
            v => {
                if rcv != 0 {
                    return Err(Error::MixedAssets);
                }
                rcv = v;
                self.aid
            }
        };

        match fee {
            Some(_) if rcv > 0 => Err(Error::NotSending),
            Some(_) => Ok((rcv.unsigned_abs(), aid)),
            None if rcv <= 0 => Err(Error::NotReceiving),
            None => Ok((rcv as u64, aid)),
        }
    }

    /// Blinding factor for the balance
    pub(crate) fn sk(&self) -> &Scalar {
        &self.sk
    }

    /// Kernel offset `-(sk + k_krn)`
    pub(crate) fn offset(&self, k_krn: &Scalar) -> [u8; 32] {
        scalar_bytes(&-(self.sk + k_krn))
    }

    /// Record a kernel fee signed off against this balance
    pub(crate) fn settle(&mut self, fee: u64) {
        self.total_fee = self.total_fee.saturating_add(fee);
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> KeyKeeper<DRV, RNG> {
    /// Add coins to the balance, erasing the session on any failure
    pub(crate) fn tx_add_coins(&mut self, req: &TxAddCoinsReq) -> Result<(), Error> {
        if req.reset != 0 || !matches!(self.session, Session::TxBalance(_)) {
            #[cfg(feature = "log")]
            log::debug!("new transaction balance");

            self.session = Session::TxBalance(TxBalance::default());
        }

        let r = self.add_all_coins(req);

        if r.is_err() {
            self.session = Session::None;
        }

        #[cfg(feature = "log")]
        log::debug!("balance: {:?}", self.balance());

        r
    }

    fn add_all_coins(&mut self, req: &TxAddCoinsReq) -> Result<(), Error> {
        if req.payload.len() != req.expected_payload_len() {
            return Err(Error::SizeMismatch);
        }

        let b = match &mut self.session {
            Session::TxBalance(b) => b,
            Session::None => return Err(Error::NoBalance),
        };

        for c in req.inputs() {
            let cid = c.map_err(|_| Error::SizeMismatch)?;
            b.add_coin(&self.ctx, &self.master, &self.config, &cid, false)?;
        }

        for c in req.outputs() {
            let cid = c.map_err(|_| Error::SizeMismatch)?;
            b.add_coin(&self.ctx, &self.master, &self.config, &cid, true)?;
        }

        for s in req.shielded() {
            let (blob, fmt) = s.map_err(|_| Error::SizeMismatch)?;
            b.add_shielded(&self.master, &self.config, &blob, &fmt)?;
        }

        Ok(())
    }

    /// Open transaction balance
    pub(crate) fn tx_balance(&self) -> Result<&TxBalance, Error> {
        self.balance().ok_or(Error::NoBalance)
    }

    pub(crate) fn tx_balance_mut(&mut self) -> Result<&mut TxBalance, Error> {
        match &mut self.session {
            Session::TxBalance(b) => Ok(b),
            Session::None => Err(Error::NoBalance),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{
        coin::{SCHEME_V1, SUBKEY_BITS},
        test::context,
    };

    fn coin(idx: u64, amount: u64, aid: u32) -> CoinId {
        CoinId::new(idx, 0, (SCHEME_V1 as u32) << SUBKEY_BITS, amount, aid)
    }

    fn balance(ins: &[CoinId], outs: &[CoinId]) -> Result<TxBalance, Error> {
        let ctx = context();
        let kdf = Kdf::new(&[2u8; 32]);
        let config = Config::default();

        let mut b = TxBalance::default();
        for c in ins {
            b.add_coin(ctx, &kdf, &config, c, false)?;
        }
        for c in outs {
            b.add_coin(ctx, &kdf, &config, c, true)?;
        }
        Ok(b)
    }

    #[test]
    fn blinding_sums() {
        let ctx = context();
        let kdf = Kdf::new(&[2u8; 32]);

        let (i, o) = (coin(1, 100, 0), coin(2, 60, 0));
        let b = balance(&[i], &[o]).unwrap();

        assert_eq!(b.rcv_beam, -40);
        assert_eq!(b.sk, o.sk(&kdf, ctx) - i.sk(&kdf, ctx));
    }

    #[test]
    fn net_amounts() {
        // Send 30, fee 10
        let b = balance(&[coin(1, 100, 0)], &[coin(2, 60, 0)]).unwrap();
        assert_eq!(b.net(Some(10)), Ok((30, 0)));
        assert_eq!(b.net(None), Err(Error::NotReceiving));

        // Split, everything spent on outputs and fee
        assert_eq!(b.net(Some(40)), Ok((0, 0)));

        // Fee exceeds the spend
        assert_eq!(b.net(Some(41)), Err(Error::NotSending));

        // Receive
        let b = balance(&[], &[coin(2, 60, 0)]).unwrap();
        assert_eq!(b.net(None), Ok((60, 0)));
    }

    #[test]
    fn net_assets() {
        // Asset send, fee paid in native coins exactly
        let b = balance(&[coin(1, 100, 7), coin(2, 5, 0)], &[coin(3, 20, 7)]).unwrap();
        assert_eq!(b.net(Some(5)), Ok((80, 7)));

        // Native remainder alongside an asset transfer
        assert_eq!(b.net(Some(4)), Err(Error::MixedAssets));

        // Second asset type
        assert_eq!(
            balance(&[coin(1, 100, 7)], &[coin(3, 20, 8)]).err(),
            Some(Error::AmountOverflow)
        );
    }

    #[test]
    fn amount_overflow() {
        let r = balance(&[], &[coin(1, u64::MAX, 0)]);
        assert_eq!(r.err(), Some(Error::AmountOverflow));

        let r = balance(&[], &[coin(1, i64::MAX as u64, 0), coin(2, 1, 0)]);
        assert_eq!(r.err(), Some(Error::AmountOverflow));
    }

    #[test]
    fn scheme_policy() {
        let mut child = coin(1, 10, 0);
        child.sub_idx |= 3;
        assert_eq!(balance(&[], &[child]).err(), Some(Error::ChildOutput));
        assert!(balance(&[child], &[]).is_ok());

        let weak = CoinId::new(1, 0, (SCHEME_V0 as u32) << SUBKEY_BITS, 10, 0);
        assert_eq!(balance(&[], &[weak]).err(), Some(Error::WeakOutput));
        assert_eq!(balance(&[weak], &[]).err(), Some(Error::WeakInput));

        let ctx = context();
        let kdf = Kdf::new(&[2u8; 32]);
        let config = Config {
            allow_weak_inputs: true,
            ..Default::default()
        };
        let mut b = TxBalance::default();
        assert!(b.add_coin(ctx, &kdf, &config, &weak, false).is_ok());
    }

    #[test]
    fn shielded_fees() {
        let kdf = Kdf::new(&[2u8; 32]);
        let blob = ShieldedInputBlob {
            k_ser_g: [5u8; 32],
            is_created_by_viewer: 0,
        };
        let fmt = ShieldedInputFmt {
            fee: 3,
            amount: 50,
            asset_id: 0,
            viewer_idx: 0,
        };

        // Fees above the default cap of zero are rejected
        let mut b = TxBalance::default();
        assert_eq!(
            b.add_shielded(&kdf, &Config::default(), &blob, &fmt),
            Err(Error::ShieldedFee)
        );

        let config = Config {
            max_shielded_fee: 5,
            ..Default::default()
        };
        let mut b = TxBalance::default();
        b.add_shielded(&kdf, &config, &blob, &fmt).unwrap();

        assert_eq!(b.rcv_beam, -47);
        assert_eq!(b.implicit_fee, 3);
        assert_eq!(b.total_fee, 3);

        assert_eq!(b.sk, -input_sk(&kdf, &blob, &fmt));
    }
}
