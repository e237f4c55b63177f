use strum::IntoEnumIterator;

use beam_hw_core::{
    apdu::{prelude::*, BEAM_PROTO_SIGNATURE},
    crypto::{shielded::voucher_hash, SignatureExt},
    engine::{Config, KeyKeeper},
};

mod helpers;
use helpers::*;

#[test]
fn version() -> anyhow::Result<()> {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);

    let v: VersionResp = k.request(&VersionReq {})?;
    assert_eq!(v.signature, BEAM_PROTO_SIGNATURE);

    let n: NumSlotsResp = k.request(&NumSlotsReq {})?;
    assert_eq!(n.num_slots, 32);

    Ok(())
}

#[test]
fn configured_slots() {
    init_logging();

    let config = Config {
        num_slots: 4,
        ..Default::default()
    };
    let mut kk = KeyKeeper::new_with_config(
        beam_hw_core::crypto::Kdf::new(&SENDER_SEED),
        config,
        TestDriver::default(),
    );

    let mut resp = [0u8; 16];
    let n = kk.invoke(&[Opcode::GetNumSlots as u8], &mut resp);
    assert_eq!(&resp[..n], &[0, 4, 0, 0, 0]);
}

#[test]
fn malformed_requests() {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);
    let mut resp = [0u8; 256];

    // Empty request
    let n = k.kk.invoke(&[], &mut resp);
    assert_eq!(&resp[..n], &[StatusMajor::ProtoError as u8, 0xfd]);

    // Unknown opcode
    let n = k.kk.invoke(&[0x7f, 1, 2], &mut resp);
    assert_eq!(&resp[..n], &[StatusMajor::ProtoError as u8, 0xff]);

    // Trailing bytes on a fixed size request
    let n = k.kk.invoke(&[Opcode::Version as u8, 0], &mut resp);
    assert_eq!(&resp[..n], &[StatusMajor::ProtoError as u8, 0]);

    // Truncated request
    let n = k.kk.invoke(&[Opcode::DisplayAddress as u8, 1, 2], &mut resp);
    assert_eq!(&resp[..n], &[StatusMajor::ProtoError as u8, 0xfe]);

    // Response buffer below the response size
    let mut short = [0u8; 4];
    let n = k.kk.invoke(&[Opcode::Version as u8], &mut short);
    assert_eq!(&short[..n], &[StatusMajor::ProtoError as u8, 0xfe]);

    // Single byte buffers still carry the major status
    let mut tiny = [0u8; 1];
    let n = k.kk.invoke(&[], &mut tiny);
    assert_eq!(&tiny[..n], &[StatusMajor::ProtoError as u8]);
}

#[test]
fn every_opcode_answers() {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);
    let mut resp = [0u8; 1024];

    // Bare opcodes are either handled or rejected with a status, never dropped
    for op in Opcode::iter() {
        let n = k.kk.invoke(&[op as u8], &mut resp);
        assert!(n >= 1, "no response for {op}");
        assert!(StatusMajor::try_from(resp[0]).is_ok(), "bad status for {op}");
    }
}

#[test]
fn vouchers() -> anyhow::Result<()> {
    init_logging();

    let mut k = TestKeeper::new(&RECEIVER_SEED);

    let req = CreateShieldedVouchersReq::new(9, [0x33; 32], 4);
    let r = k.exchange(&req).unwrap();

    let (count, mut rest) = r.split_at(4);
    assert_eq!(count, &4u32.to_le_bytes());

    let id = k.address(9);
    for _ in 0..4 {
        let (v, n) = <ShieldedVoucher as encdec::Decode>::decode(rest)
            .map_err(|e| anyhow::anyhow!("decode voucher: {e:?}"))?;
        assert!(v.signature.is_valid_x(k.ctx(), &voucher_hash(&v), &id));
        rest = &rest[n..];
    }
    assert!(rest.is_empty());

    // Vouchers are not spends
    assert!(k.driver().spends.is_empty());

    Ok(())
}

#[test]
fn images_and_pkdf() -> anyhow::Result<()> {
    init_logging();

    let mut k = TestKeeper::new(&SENDER_SEED);

    let owner: PKdfResp = k.request(&PKdfReq::new(false))?;
    let child: PKdfResp = k.request(&PKdfReq::new(true))?;
    assert_ne!(owner.kdf, child.kdf);

    let a: ImageResp = k.request(&ImageReq::new([1u8; 32], 0, ImageFlags::all()))?;
    let b: ImageResp = k.request(&ImageReq::new([1u8; 32], 7, ImageFlags::all()))?;
    assert_ne!(a.image_g, b.image_g);
    assert_ne!(a.image_g, a.image_j);

    let r = k.exchange(&ImageReq::new([1u8; 32], 0, ImageFlags::empty()));
    assert_eq!(r, Err(Status::unspecified(0)));

    Ok(())
}
