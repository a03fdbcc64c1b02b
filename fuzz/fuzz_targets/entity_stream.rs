#![no_main]

use std::sync::Arc;

use codec::{calc_delta, decode, merge_deltas, read_props, CodecLimits, EncodedProps, RecvDecoder};
use libfuzzer_sys::fuzz_target;
use schema::{PropFlags, PropKind, PropTemplate, PropValue, RecvTable, SendTable, FlatTable};

#[derive(Default)]
struct Target {
    health: i32,
    origin: [f32; 3],
    name: String,
    ammo: Vec<i32>,
}

fn tables() -> (Arc<SendTable<Target>>, Arc<RecvTable<Target>>) {
    let send = SendTable::builder("DT_Target")
        .int("health", 8, PropFlags::UNSIGNED, |t: &Target| t.health)
        .vector("origin", 0, 0.0, 0.0, PropFlags::COORD_MP, |t| t.origin)
        .string("name", |t| t.name.clone())
        .array(
            "ammo",
            8,
            PropTemplate::int(0, PropFlags::VARINT),
            |t, i| PropValue::Int(t.ammo.get(i).copied().unwrap_or(0)),
        )
        .build()
        .unwrap();
    let recv = RecvTable::builder("DT_Target")
        .int("health", |t: &mut Target, v| t.health = v)
        .vector("origin", |t, v| t.origin = v)
        .string("name", 32, |t, v| t.name = v)
        .array(
            "ammo",
            PropKind::Int,
            8,
            |t, i, value| {
                if let (PropValue::Int(n), Some(slot)) = (value, t.ammo.get_mut(i)) {
                    *slot = n;
                }
            },
            |t, _, len| t.ammo.resize(len, 0),
        )
        .build()
        .unwrap();
    (send, recv)
}

fuzz_target!(|data: &[u8]| {
    let (send, recv) = tables();
    let limits = CodecLimits::for_testing();
    let flat = FlatTable::build(&send).unwrap();
    let decoder = RecvDecoder::bind(&send.describe(), &recv, false, &limits).unwrap();

    let split = data.first().map_or(0, |b| usize::from(*b)).min(data.len());
    let (old, new) = data.split_at(split);
    let old = EncodedProps::new(old.to_vec(), old.len() * 8);
    let new = EncodedProps::new(new.to_vec(), new.len() * 8);

    let mut target = Target::default();
    let _ = decode(&decoder, &new, &mut target, 0);
    let _ = read_props(&flat, &new, &limits);
    let _ = calc_delta(&flat, &old, &new);
    if let Ok((merged, _)) = merge_deltas(&flat, Some(&old), &new) {
        let mut again = Target::default();
        assert!(decode(&decoder, &merged, &mut again, 0).is_ok());
    }
});
