use std::sync::Arc;

use codec::{
    calc_delta, decode, encode, merge_deltas, prop_indices, write_prop_list, CodecLimits,
    RecvDecoder,
};
use proptest::prelude::*;
use schema::{FlatTable, PropFlags, PropKind, PropTemplate, PropValue, RecvTable, SendTable};

#[derive(Clone, Debug, Default, PartialEq)]
struct Probe {
    small: i32,
    signed: i32,
    var: i32,
    wide: i64,
    ranged: f32,
    label: String,
    items: Vec<i32>,
}

fn send_table() -> Arc<SendTable<Probe>> {
    SendTable::builder("DT_Probe")
        .int("small", 10, PropFlags::UNSIGNED, |p: &Probe| p.small)
        .int("signed", 16, PropFlags::NONE, |p| p.signed)
        .int("var", 0, PropFlags::VARINT, |p| p.var)
        .int64("wide", 64, PropFlags::NONE, |p| p.wide)
        .float("ranged", 20, -500.0, 500.0, PropFlags::NONE, |p| p.ranged)
        .string("label", |p| p.label.clone())
        .array_with_length(
            "items",
            6,
            PropTemplate::int(8, PropFlags::UNSIGNED),
            |p, i| PropValue::Int(p.items.get(i).copied().unwrap_or(0)),
            |p, _| p.items.len(),
        )
        .build()
        .unwrap()
}

fn recv_table() -> Arc<RecvTable<Probe>> {
    RecvTable::builder("DT_Probe")
        .int("small", |p: &mut Probe, v| p.small = v)
        .int("signed", |p, v| p.signed = v)
        .int("var", |p, v| p.var = v)
        .int64("wide", |p, v| p.wide = v)
        .float("ranged", |p, v| p.ranged = v)
        .string("label", 64, |p, v| p.label = v)
        .array(
            "items",
            PropKind::Int,
            6,
            |p, i, value| {
                if let (PropValue::Int(n), Some(slot)) = (value, p.items.get_mut(i)) {
                    *slot = n;
                }
            },
            |p, _, len| p.items.resize(len, 0),
        )
        .build()
        .unwrap()
}

fn probe_strategy() -> impl Strategy<Value = Probe> {
    (
        0i32..1024,
        -32768i32..32768,
        any::<i32>(),
        (i64::MIN + 1)..=i64::MAX,
        -500.0f32..=500.0,
        "[a-z]{0,40}",
        prop::collection::vec(0i32..256, 0..=6),
    )
        .prop_map(|(small, signed, var, wide, ranged, label, items)| Probe {
            small,
            signed,
            var,
            wide,
            ranged,
            label,
            items,
        })
}

fn setup() -> (FlatTable<Probe>, RecvDecoder<Probe>) {
    let send = send_table();
    let flat = FlatTable::build(&send).unwrap();
    let decoder =
        RecvDecoder::bind(&send.describe(), &recv_table(), false, &CodecLimits::default()).unwrap();
    (flat, decoder)
}

proptest! {
    #[test]
    fn prop_encode_decode_roundtrip(probe in probe_strategy()) {
        let (flat, decoder) = setup();
        let encoded = encode(&flat, &probe, 5).unwrap();

        let mut decoded = Probe::default();
        decode(&decoder, &encoded, &mut decoded, 5).unwrap();

        let step = 1000.0 / ((1u32 << 20) - 1) as f32;
        prop_assert!((decoded.ranged - probe.ranged).abs() <= step);
        decoded.ranged = probe.ranged;
        prop_assert_eq!(decoded, probe);
    }

    #[test]
    fn prop_merge_reproduces_new_state(old in probe_strategy(), new in probe_strategy()) {
        let (flat, decoder) = setup();
        let old_full = encode(&flat, &old, 1).unwrap();
        let new_full = encode(&flat, &new, 1).unwrap();

        let differing = calc_delta(&flat, &old_full, &new_full).unwrap();
        let delta = write_prop_list(&flat, &new_full, &differing).unwrap();
        prop_assert_eq!(prop_indices(&flat, &delta).unwrap(), differing.clone());

        let (merged, changed) = merge_deltas(&flat, Some(&old_full), &delta).unwrap();
        prop_assert_eq!(changed, differing);

        let mut from_merge = Probe::default();
        decode(&decoder, &merged, &mut from_merge, 1).unwrap();
        let mut from_full = Probe::default();
        decode(&decoder, &new_full, &mut from_full, 1).unwrap();
        prop_assert_eq!(from_merge, from_full);
    }

    #[test]
    fn prop_identical_states_have_no_delta(probe in probe_strategy()) {
        let (flat, _) = setup();
        let a = encode(&flat, &probe, 9).unwrap();
        let b = encode(&flat, &probe.clone(), 9).unwrap();
        prop_assert!(calc_delta(&flat, &a, &b).unwrap().is_empty());
    }
}
