// Copyright (c) 2023 The Beam Team

//! The [KeyKeeper] provides the device side of the Beam wallet protocol.
//!
//! Requests are handled by [KeyKeeper::invoke], which decodes a single
//! opcode-prefixed request and always writes a status-prefixed response,
//! see [apdu][crate::apdu] for encoding specifications.

use encdec::{Decode, Encode};
use rand_core::{CryptoRngCore, OsRng};
use zeroize::Zeroizing;

use crate::{
    apdu::{prelude::*, ApduError},
    crypto::{Context, Kdf},
};

mod error;
pub use error::Error;

mod balance;
pub use balance::{Session, TxBalance};

mod keys;

mod shielded;

mod tx;

/// Key keeper policy
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Config {
    /// Number of nonce slots held by the driver
    pub num_slots: u32,
    /// Accept inputs using the weak (V0, BB21) key schemes
    pub allow_weak_inputs: bool,
    /// Largest fee accepted on a shielded input
    pub max_shielded_fee: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_slots: 32,
            allow_weak_inputs: false,
            max_shielded_fee: 0,
        }
    }
}

/// Spend pending user confirmation
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SpendRequest<'a> {
    /// Net amount leaving the wallet, zero for splits and sends to own addresses
    pub amount: u64,
    /// Asset of `amount`, zero for the native asset
    pub asset_id: u32,
    /// Receiving peer, if any
    pub peer: Option<&'a [u8; 32]>,
    /// Kernel parameters, including the fee
    pub krn: &'a TxKernelUser,
    /// Kernel ID, if already known
    pub krn_id: Option<&'a [u8; 32]>,
}

/// [`Driver`] trait provides platform support for [`KeyKeeper`] instances
pub trait Driver {
    /// Read nonce slot `index`
    fn slot_read(&self, index: u32) -> [u8; 32];

    /// Replace nonce slot `index`
    fn slot_write(&mut self, index: u32, value: &[u8; 32]);

    /// Ask the user to approve a spend, returning `true` if approved
    fn confirm_spend(&mut self, req: &SpendRequest) -> bool;

    /// Show an own address to the user
    fn display_address(&mut self, addr_id: u64, id: &[u8; 32]);
}

impl<T: Driver> Driver for &mut T {
    fn slot_read(&self, index: u32) -> [u8; 32] {
        T::slot_read(self, index)
    }

    fn slot_write(&mut self, index: u32, value: &[u8; 32]) {
        T::slot_write(self, index, value)
    }

    fn confirm_spend(&mut self, req: &SpendRequest) -> bool {
        T::confirm_spend(self, req)
    }

    fn display_address(&mut self, addr_id: u64, id: &[u8; 32]) {
        T::display_address(self, addr_id, id)
    }
}

/// [KeyKeeper] holds the master key and transaction balance of a wallet
pub struct KeyKeeper<DRV: Driver, RNG: CryptoRngCore = OsRng> {
    master: Kdf,
    session: Session,
    config: Config,

    ctx: Context,

    drv: DRV,
    rng: RNG,
}

impl<DRV: Driver> KeyKeeper<DRV> {
    /// Create a key keeper with the default [Config], using [OsRng] for slot regeneration
    pub fn new(master: Kdf, drv: DRV) -> Self {
        Self::new_with_rng(master, Config::default(), drv, OsRng {})
    }

    /// Create a key keeper with the provided [Config]
    pub fn new_with_config(master: Kdf, config: Config, drv: DRV) -> Self {
        Self::new_with_rng(master, config, drv, OsRng {})
    }
}

impl<DRV: Driver, RNG: CryptoRngCore> KeyKeeper<DRV, RNG> {
    /// Create a key keeper with the provided [Config] and rng
    pub fn new_with_rng(master: Kdf, config: Config, drv: DRV, rng: RNG) -> Self {
        Self {
            master,
            session: Session::None,
            config,
            ctx: Context::new(),
            drv,
            rng,
        }
    }

    /// Handle an opcode-prefixed request, writing the response to `resp`
    ///
    /// The first response byte is the [`StatusMajor`], followed by the
    /// response structure on success or the minor status on failure.
    /// Returns the response length.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn invoke(&mut self, req: &[u8], resp: &mut [u8]) -> usize {
        let r = match req.split_first() {
            Some((op, payload)) => self.dispatch(*op, payload, resp),
            None => Err(Error::EmptyRequest),
        };

        match r {
            Ok(n) => n,
            Err(e) => {
                let s = e.status();

                #[cfg(feature = "log")]
                log::debug!("request failed: {:?} ({:?}/{})", e, s.major, s.minor);

                let b = [s.major as u8, s.minor];
                let n = b.len().min(resp.len());
                resp[..n].copy_from_slice(&b[..n]);
                n
            }
        }
    }

    fn dispatch(&mut self, op: u8, req: &[u8], resp: &mut [u8]) -> Result<usize, Error> {
        let op = Opcode::try_from(op).map_err(|_| Error::UnknownOpcode(op))?;

        #[cfg(feature = "log")]
        log::debug!("request: {op} ({} bytes)", req.len());

        // Check the fixed response fits before any state changes
        if resp.len() < 1 + min_resp_len(op) {
            return Err(Error::TooShort);
        }
        let out = &mut resp[1..];

        let n = match op {
            Opcode::Version => {
                decode_exact::<VersionReq>(req)?;
                encode(&VersionResp::new(), out)?
            }
            Opcode::GetNumSlots => {
                decode_exact::<NumSlotsReq>(req)?;
                let r = NumSlotsResp {
                    num_slots: self.config.num_slots,
                };
                encode(&r, out)?
            }
            Opcode::GetPKdf => {
                let r = self.get_pkdf(&decode_exact(req)?);
                encode(&r, out)?
            }
            Opcode::GetImage => {
                let r = self.get_image(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::CreateOutput => {
                let r = self.create_output(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::TxAddCoins => {
                let (r, _) = TxAddCoinsReq::decode(req).map_err(|_| Error::TooShort)?;
                self.tx_add_coins(&r)?;
                0
            }
            Opcode::TxSplit => {
                let r = self.tx_split(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::TxReceive => {
                let r = self.tx_receive(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::TxSend1 => {
                let r = self.tx_send1(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::TxSend2 => {
                let r = self.tx_send2(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::TxSendShielded => {
                let r = self.tx_send_shielded(&decode_exact(req)?)?;
                encode(&r, out)?
            }
            Opcode::DisplayAddress => {
                self.display_address(&decode_exact(req)?);
                0
            }
            Opcode::CreateShieldedVouchers => {
                let capacity = (out.len() - CreateShieldedVouchersResp::len_for(0))
                    / ShieldedVoucher::LEN;

                let r = self.create_vouchers(&decode_exact(req)?, capacity)?;
                encode(&r, out)?
            }
            Opcode::CreateShieldedInput => {
                let (r, _) = CreateShieldedInputReq::decode(req).map_err(|_| Error::TooShort)?;
                let r = self.create_shielded_input(&r)?;
                encode(&r, out)?
            }
        };

        resp[0] = StatusMajor::Ok as u8;

        Ok(1 + n)
    }

    /// Current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Transaction balance, if one is open
    pub fn balance(&self) -> Option<&TxBalance> {
        match &self.session {
            Session::TxBalance(b) => Some(b),
            Session::None => None,
        }
    }

    /// Erase any open transaction balance
    pub fn reset(&mut self) {
        #[cfg(feature = "log")]
        log::debug!("session reset");

        self.session = Session::None;
    }

    /// Key keeper policy
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generator context
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Platform driver
    pub fn driver(&self) -> &DRV {
        &self.drv
    }

    /// Mutable platform driver
    pub fn driver_mut(&mut self) -> &mut DRV {
        &mut self.drv
    }

    /// Request user confirmation, mapping a refusal to [`Error::Declined`]
    fn confirm(&mut self, req: &SpendRequest) -> Result<(), Error> {
        #[cfg(feature = "log")]
        log::debug!(
            "confirm spend: {} (asset {}) fee {}",
            req.amount,
            req.asset_id,
            req.krn.fee
        );

        match self.drv.confirm_spend(req) {
            true => Ok(()),
            false => Err(Error::Declined),
        }
    }

    /// Replace nonce slot `index` with a fresh random value
    fn regenerate_slot(&mut self, index: u32) {
        let mut v = Zeroizing::new([0u8; 32]);
        self.rng.fill_bytes(&mut v[..]);

        self.drv.slot_write(index, &v);

        #[cfg(feature = "log")]
        log::debug!("regenerated slot {index}");
    }
}

/// Fixed (or minimum) response length by opcode, excluding the status byte
const fn min_resp_len(op: Opcode) -> usize {
    match op {
        Opcode::Version => VersionResp::LEN,
        Opcode::GetNumSlots => NumSlotsResp::LEN,
        Opcode::GetPKdf => PKdfResp::LEN,
        Opcode::GetImage => ImageResp::LEN,
        Opcode::CreateOutput => CreateOutputResp::LEN,
        Opcode::TxAddCoins => 0,
        Opcode::TxSplit => TxSplitResp::LEN,
        Opcode::TxReceive => TxReceiveResp::LEN,
        Opcode::TxSend1 => TxSend1Resp::LEN,
        Opcode::TxSend2 => TxSend2Resp::LEN,
        Opcode::TxSendShielded => TxSendShieldedResp::LEN,
        Opcode::DisplayAddress => 0,
        Opcode::CreateShieldedVouchers => CreateShieldedVouchersResp::len_for(0),
        Opcode::CreateShieldedInput => CreateShieldedInputResp::LEN,
    }
}

/// Decode a fixed-size request, rejecting trailing bytes
fn decode_exact<'a, T>(buff: &'a [u8]) -> Result<T, Error>
where
    T: Decode<'a, Output = T, Error = ApduError>,
{
    let (v, n) = T::decode(buff).map_err(|_| Error::TooShort)?;
    if n != buff.len() {
        return Err(Error::SizeMismatch);
    }
    Ok(v)
}

fn encode<T: Encode<Error = ApduError>>(v: &T, buff: &mut [u8]) -> Result<usize, Error> {
    v.encode(buff).map_err(|_| Error::TooShort)
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashMap;

    use super::*;
    use crate::apdu::ApduStatic;

    /// Recorded spend confirmation
    #[derive(Clone, PartialEq, Debug)]
    pub struct Confirmation {
        pub amount: u64,
        pub asset_id: u32,
        pub peer: Option<[u8; 32]>,
        pub fee: u64,
        pub krn_id: Option<[u8; 32]>,
    }

    /// In-memory driver recording prompts
    #[derive(Default)]
    pub struct TestDriver {
        pub slots: HashMap<u32, [u8; 32]>,
        pub decline: bool,
        pub confirmations: Vec<Confirmation>,
        pub displayed: Vec<(u64, [u8; 32])>,
    }

    impl Driver for TestDriver {
        fn slot_read(&self, index: u32) -> [u8; 32] {
            self.slots.get(&index).copied().unwrap_or([index as u8; 32])
        }

        fn slot_write(&mut self, index: u32, value: &[u8; 32]) {
            self.slots.insert(index, *value);
        }

        fn confirm_spend(&mut self, req: &SpendRequest) -> bool {
            self.confirmations.push(Confirmation {
                amount: req.amount,
                asset_id: req.asset_id,
                peer: req.peer.copied(),
                fee: req.krn.fee,
                krn_id: req.krn_id.copied(),
            });
            !self.decline
        }

        fn display_address(&mut self, addr_id: u64, id: &[u8; 32]) {
            self.displayed.push((addr_id, *id));
        }
    }

    pub fn keeper(seed: u8) -> KeyKeeper<TestDriver> {
        let mut s = [0u8; 32];
        s[0] = seed;
        KeyKeeper::new(Kdf::new(&s), TestDriver::default())
    }

    /// Encode and invoke a request, returning the status and response payload
    pub fn call<'a, R: Encode<Error = ApduError> + ApduStatic>(
        kk: &mut KeyKeeper<TestDriver>,
        req: &R,
        resp: &'a mut [u8],
    ) -> (Status, &'a [u8]) {
        let mut buff = [0u8; 2048];
        buff[0] = R::INS;
        let n = req.encode(&mut buff[1..]).expect("encode request");

        let m = kk.invoke(&buff[..1 + n], resp);
        status(&resp[..m])
    }

    /// Split a raw response into status and payload
    pub fn status(resp: &[u8]) -> (Status, &[u8]) {
        let major = StatusMajor::try_from(resp[0]).expect("major status");
        match major {
            StatusMajor::Ok => (Status::OK, &resp[1..]),
            _ => (Status::new(major, resp[1]), &[]),
        }
    }

    #[test]
    fn version_and_slots() {
        let mut kk = keeper(0);
        let mut resp = [0u8; 64];

        let (s, r) = call(&mut kk, &VersionReq {}, &mut resp);
        assert!(s.is_ok());
        assert_eq!(r, b"BeamHW\x00\x01");

        let (s, r) = call(&mut kk, &NumSlotsReq {}, &mut resp);
        assert!(s.is_ok());
        assert_eq!(r, &32u32.to_le_bytes());
    }

    #[test]
    fn dispatch_errors() {
        let mut kk = keeper(0);
        let mut resp = [0u8; 64];

        // Empty request
        let n = kk.invoke(&[], &mut resp);
        assert_eq!(&resp[..n], &[3, 0xfd]);

        // Unknown opcode
        let n = kk.invoke(&[0x7e], &mut resp);
        assert_eq!(&resp[..n], &[3, 0xff]);

        // Trailing bytes
        let n = kk.invoke(&[Opcode::Version as u8, 0], &mut resp);
        assert_eq!(&resp[..n], &[3, 0]);

        // Truncated request
        let n = kk.invoke(&[Opcode::DisplayAddress as u8, 1, 2], &mut resp);
        assert_eq!(&resp[..n], &[3, 0xfe]);

        // Response buffer too small
        let n = kk.invoke(&[Opcode::Version as u8], &mut resp[..4]);
        assert_eq!(&resp[..n], &[3, 0xfe]);

        // Status truncated to the available buffer
        let n = kk.invoke(&[], &mut resp[..1]);
        assert_eq!(n, 1);
        assert_eq!(resp[0], 3);
    }

    #[test]
    fn custom_config() {
        let config = Config {
            num_slots: 4,
            ..Default::default()
        };
        let master = Kdf::new(&[1u8; 32]);
        let mut kk = KeyKeeper::new_with_config(master, config, TestDriver::default());
        let mut resp = [0u8; 64];

        let n = kk.invoke(&[Opcode::GetNumSlots as u8], &mut resp);
        assert_eq!(&resp[..n], &[0, 4, 0, 0, 0]);
    }
}
