use k256::{elliptic_curve::Group, ProjectivePoint};

use beam_hw_core::{
    apdu::prelude::*,
    crypto::{coin::CoinIdExt, import, kernel, scalar_bytes, scalar_reduce},
};

mod helpers;
use helpers::*;

/// Sum of output minus input commitments for a keeper's coins
fn coin_excess(k: &TestKeeper, inputs: &[CoinId], outputs: &[CoinId]) -> ProjectivePoint {
    let mut sum = ProjectivePoint::IDENTITY;

    for c in outputs {
        let (_, comm) = c.sk_comm(&k.master, k.ctx());
        sum += import(&comm).unwrap();
    }
    for c in inputs {
        let (_, comm) = c.sk_comm(&k.master, k.ctx());
        sum -= import(&comm).unwrap();
    }

    sum
}

#[test]
fn send_receive() -> anyhow::Result<()> {
    init_logging();

    let mut sender = TestKeeper::new(&SENDER_SEED);
    let mut receiver = TestKeeper::new(&RECEIVER_SEED);

    let (s_in, s_out) = ([coin(1, 700), coin(2, 300)], [coin(3, 450)]);
    let r_out = [coin(8, 500)];

    sender.add_coins(&s_in, &s_out).unwrap();
    receiver.add_coins(&[], &r_out).unwrap();

    let krn = TxKernelUser::new(50, 10, 1440);
    let s_mutual = TxMutual {
        peer: receiver.address(3),
        addr_id: 1,
    };
    let r_mutual = TxMutual {
        peer: sender.address(1),
        addr_id: 3,
    };

    let s1: TxSend1Resp = sender.request(&TxSend1Req::new(krn, s_mutual, 5))?;

    let r: TxReceiveResp = receiver.request(&TxReceiveReq {
        krn,
        mutual: r_mutual,
        comms: s1.comms,
    })?;

    let s2: TxSend2Resp = sender.request(&TxSend2Req {
        krn,
        mutual: s_mutual,
        slot: 5,
        payment_proof: r.payment_proof,
        user_agreement: s1.user_agreement,
        comms: r.comms,
    })?;

    // Aggregate kernel signature
    let k_sig = scalar_reduce(&s2.sig.k_sig) + scalar_reduce(&r.sig.k_sig);
    assert!(kernel::is_valid(
        sender.ctx(),
        &krn,
        &r.comms,
        &scalar_bytes(&k_sig)
    ));

    // Coins, kernel, offsets and fee balance out
    let offset = scalar_reduce(&s2.sig.k_offset) + scalar_reduce(&r.sig.k_offset);
    let total = coin_excess(&sender, &s_in, &s_out)
        + coin_excess(&receiver, &[], &r_out)
        + import(&r.comms.commitment).unwrap()
        + sender.ctx().commit(&offset, krn.fee, None);
    assert!(bool::from(total.is_identity()));

    // Sender asked once with the net amount
    let spends = &sender.driver().spends;
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0].amount, 500);
    assert_eq!(spends[0].peer, Some(receiver.address(3)));

    assert!(sender.driver().slots.contains_key(&5));
    assert_eq!(sender.kk.balance().map(|b| b.total_fee), Some(50));

    Ok(())
}

#[test]
fn send_receive_asset() -> anyhow::Result<()> {
    init_logging();

    let mut sender = TestKeeper::new(&SENDER_SEED);
    let mut receiver = TestKeeper::new(&RECEIVER_SEED);

    let s_in = [asset_coin(1, 100, 18), asset_coin(2, 8, 18)];
    let r_out = [asset_coin(4, 108, 18)];

    sender.add_coins(&s_in, &[]).unwrap();
    receiver.add_coins(&[], &r_out).unwrap();

    // No native coins, so no fee
    let krn = TxKernelUser::new(0, 0, 1000);
    let s_mutual = TxMutual {
        peer: receiver.address(2),
        addr_id: 7,
    };
    let r_mutual = TxMutual {
        peer: sender.address(7),
        addr_id: 2,
    };

    let s1: TxSend1Resp = sender.request(&TxSend1Req::new(krn, s_mutual, 1))?;
    let r: TxReceiveResp = receiver.request(&TxReceiveReq {
        krn,
        mutual: r_mutual,
        comms: s1.comms,
    })?;
    let s2: TxSend2Resp = sender.request(&TxSend2Req {
        krn,
        mutual: s_mutual,
        slot: 1,
        payment_proof: r.payment_proof,
        user_agreement: s1.user_agreement,
        comms: r.comms,
    })?;

    let k_sig = scalar_reduce(&s2.sig.k_sig) + scalar_reduce(&r.sig.k_sig);
    assert!(kernel::is_valid(
        sender.ctx(),
        &krn,
        &r.comms,
        &scalar_bytes(&k_sig)
    ));

    let offset = scalar_reduce(&s2.sig.k_offset) + scalar_reduce(&r.sig.k_offset);
    let total = coin_excess(&sender, &s_in, &[])
        + coin_excess(&receiver, &[], &r_out)
        + import(&r.comms.commitment).unwrap()
        + sender.ctx().commit(&offset, 0, None);
    assert!(bool::from(total.is_identity()));

    let spends = &sender.driver().spends;
    assert_eq!(spends.len(), 1);
    assert_eq!((spends[0].amount, spends[0].asset_id), (108, 18));

    Ok(())
}

#[test]
fn send_declined() -> anyhow::Result<()> {
    init_logging();

    let mut sender = TestKeeper::new(&SENDER_SEED);
    sender.add_coins(&[coin(1, 100)], &[]).unwrap();
    sender.driver().decline = true;

    let mutual = TxMutual {
        peer: [0x42; 32],
        addr_id: 0,
    };
    let r = sender.exchange(&TxSend1Req::new(TxKernelUser::new(10, 0, 100), mutual, 0));
    assert_eq!(r, Err(Status::user_abort(0)));

    // Balance kept for a retry
    assert!(sender.kk.balance().is_some());
    sender.driver().decline = false;

    let s1: TxSend1Resp =
        sender.request(&TxSend1Req::new(TxKernelUser::new(10, 0, 100), mutual, 0))?;
    assert_ne!(s1.user_agreement, [0u8; 32]);

    Ok(())
}

#[test]
fn split() -> anyhow::Result<()> {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);

    let (ins, outs) = ([coin(1, 1000)], [coin(2, 600), coin(3, 380)]);
    k.add_coins(&ins, &outs).unwrap();

    let krn = TxKernelUser::new(20, 0, 100);
    let r: TxSplitResp = k.request(&TxSplitReq::new(krn))?;

    assert!(kernel::is_valid(k.ctx(), &krn, &r.comms, &r.sig.k_sig));

    let offset = scalar_reduce(&r.sig.k_offset);
    let total = coin_excess(&k, &ins, &outs)
        + import(&r.comms.commitment).unwrap()
        + k.ctx().commit(&offset, krn.fee, None);
    assert!(bool::from(total.is_identity()));

    Ok(())
}

#[test]
fn balance_resets() {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);

    k.add_coins(&[coin(1, 1000)], &[coin(2, 600)]).unwrap();

    // A failed request erases the balance
    let weak = CoinId::new(4, 0, 0, 10, 0);
    assert_eq!(k.add_coins(&[], &[weak]), Err(Status::unspecified(4)));
    assert!(k.kk.balance().is_none());

    let r = k.exchange(&TxSplitReq::new(TxKernelUser::new(400, 0, 100)));
    assert_eq!(r, Err(Status::unspecified(10)));
}
