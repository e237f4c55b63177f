#![allow(unused)]

use std::{collections::HashMap, fmt::Debug};

use anyhow::anyhow;
use encdec::{Decode, Encode};
use log::{debug, trace};

use beam_hw_core::{
    apdu::{prelude::*, ApduError, ApduStatic},
    crypto::{
        address::address,
        coin::{CoinIdExt, SCHEME_V1, SUBKEY_BITS},
        Context, Kdf,
    },
    engine::{Driver, KeyKeeper, SpendRequest},
};

pub const SENDER_SEED: [u8; 32] = [0x5a; 32];
pub const RECEIVER_SEED: [u8; 32] = [0xa5; 32];

pub fn init_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

/// Spend prompt recorded by [TestDriver]
#[derive(Clone, PartialEq, Debug)]
pub struct Spend {
    pub amount: u64,
    pub asset_id: u32,
    pub peer: Option<[u8; 32]>,
    pub fee: u64,
}

/// Driver implementation for test use
#[derive(Default)]
pub struct TestDriver {
    pub slots: HashMap<u32, [u8; 32]>,
    pub decline: bool,
    pub spends: Vec<Spend>,
}

impl Driver for TestDriver {
    fn slot_read(&self, index: u32) -> [u8; 32] {
        self.slots
            .get(&index)
            .copied()
            .unwrap_or([0x10 + index as u8; 32])
    }

    fn slot_write(&mut self, index: u32, value: &[u8; 32]) {
        debug!("slot {index} regenerated");
        self.slots.insert(index, *value);
    }

    fn confirm_spend(&mut self, req: &SpendRequest) -> bool {
        debug!("confirm: {req:?}");

        self.spends.push(Spend {
            amount: req.amount,
            asset_id: req.asset_id,
            peer: req.peer.copied(),
            fee: req.krn.fee,
        });

        !self.decline
    }

    fn display_address(&mut self, addr_id: u64, id: &[u8; 32]) {
        debug!("address {addr_id}: {id:02x?}");
    }
}

/// Key keeper wrapper exchanging encoded requests
pub struct TestKeeper {
    pub kk: KeyKeeper<TestDriver>,
    pub master: Kdf,
}

impl TestKeeper {
    pub fn new(seed: &[u8; 32]) -> Self {
        Self {
            kk: KeyKeeper::new(Kdf::new(seed), TestDriver::default()),
            master: Kdf::new(seed),
        }
    }

    pub fn ctx(&self) -> &Context {
        self.kk.context()
    }

    pub fn driver(&mut self) -> &mut TestDriver {
        self.kk.driver_mut()
    }

    /// Encode and invoke a request, returning the raw response payload or failure status
    pub fn exchange<REQ>(&mut self, req: &REQ) -> Result<Vec<u8>, Status>
    where
        REQ: Encode<Error = ApduError> + ApduStatic + Debug,
    {
        debug!("cmd: {req:?}");

        let mut buff = [0u8; 2048];
        buff[0] = REQ::INS;
        let n = req.encode(&mut buff[1..]).expect("encode request");

        trace!("encoded: {:02x?}", &buff[..1 + n]);

        let mut resp = [0u8; 1024];
        let m = self.kk.invoke(&buff[..1 + n], &mut resp);

        let major = StatusMajor::try_from(resp[0]).expect("response status");
        match major {
            StatusMajor::Ok => Ok(resp[1..m].to_vec()),
            _ => {
                let s = Status::new(major, resp[1]);
                debug!("status: {s:?}");
                Err(s)
            }
        }
    }

    /// Exchange a request and decode the response
    pub fn request<REQ, ANS>(&mut self, req: &REQ) -> anyhow::Result<ANS>
    where
        REQ: Encode<Error = ApduError> + ApduStatic + Debug,
        ANS: for<'a> Decode<'a, Output = ANS, Error = ApduError> + Debug,
    {
        let r = self
            .exchange(req)
            .map_err(|s| anyhow!("request failed: {s:?}"))?;

        let (a, _) = ANS::decode(&r).map_err(|e| anyhow!("decode failed: {e:?}"))?;
        debug!("resp: {a:?}");

        Ok(a)
    }

    /// Add coins to a new transaction balance
    pub fn add_coins(&mut self, inputs: &[CoinId], outputs: &[CoinId]) -> Result<(), Status> {
        let mut payload = [0u8; 1024];
        let req = TxAddCoinsReq::build(&mut payload, true, inputs, outputs, &[])
            .expect("build coin list");

        self.exchange(&req).map(|_| ())
    }

    /// Own address ID
    pub fn address(&self, addr_id: u64) -> [u8; 32] {
        address(self.ctx(), &self.master, addr_id).1
    }
}

/// V1 coin on the master key
pub fn coin(idx: u64, amount: u64) -> CoinId {
    asset_coin(idx, amount, 0)
}

/// V1 coin of asset `aid` on the master key
pub fn asset_coin(idx: u64, amount: u64, aid: u32) -> CoinId {
    CoinId::new(idx, 0, (SCHEME_V1 as u32) << SUBKEY_BITS, amount, aid)
}
