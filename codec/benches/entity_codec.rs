//! Encode, decode and merge throughput for a typical player-sized object.

use std::sync::Arc;

use codec::{calc_delta, decode, encode, merge_deltas, write_prop_list, CodecLimits, RecvDecoder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schema::{FlatTable, PropFlags, PropKind, PropTemplate, PropValue, RecvTable, SendTable};

#[derive(Clone, Default)]
struct Player {
    health: i32,
    armor: i32,
    origin: [f32; 3],
    angles: [f32; 2],
    name: String,
    weapons: Vec<i32>,
}

fn send_table() -> Arc<SendTable<Player>> {
    SendTable::builder("DT_Player")
        .int("health", 8, PropFlags::UNSIGNED, |p: &Player| p.health)
        .int("armor", 8, PropFlags::UNSIGNED, |p| p.armor)
        .vector("origin", 0, 0.0, 0.0, PropFlags::COORD_MP, |p| p.origin)
        .vector_xy("angles", 13, 0.0, 360.0, PropFlags::NONE, |p| p.angles)
        .string("name", |p| p.name.clone())
        .array_with_length(
            "weapons",
            16,
            PropTemplate::int(10, PropFlags::UNSIGNED),
            |p, i| PropValue::Int(p.weapons.get(i).copied().unwrap_or(0)),
            |p, _| p.weapons.len(),
        )
        .build()
        .unwrap()
}

fn recv_table() -> Arc<RecvTable<Player>> {
    RecvTable::builder("DT_Player")
        .int("health", |p: &mut Player, v| p.health = v)
        .int("armor", |p, v| p.armor = v)
        .vector("origin", |p, v| p.origin = v)
        .vector_xy("angles", |p, v| p.angles = v)
        .string("name", 32, |p, v| p.name = v)
        .array(
            "weapons",
            PropKind::Int,
            16,
            |p, i, value| {
                if let (PropValue::Int(n), Some(slot)) = (value, p.weapons.get_mut(i)) {
                    *slot = n;
                }
            },
            |p, _, len| p.weapons.resize(len, 0),
        )
        .build()
        .unwrap()
}

fn player(step: i32) -> Player {
    Player {
        health: 100 - step,
        armor: 50,
        origin: [1024.5 + step as f32, -310.25, 64.0],
        angles: [90.0, 12.5],
        name: "commander".to_owned(),
        weapons: (0..8).map(|w| w * 3 + step).collect(),
    }
}

fn bench_encode(c: &mut Criterion) {
    let flat = FlatTable::build(&send_table()).unwrap();
    let object = player(0);
    c.bench_function("encode_player", |b| {
        b.iter(|| encode(black_box(&flat), black_box(&object), 1).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let send = send_table();
    let flat = FlatTable::build(&send).unwrap();
    let decoder =
        RecvDecoder::bind(&send.describe(), &recv_table(), false, &CodecLimits::default()).unwrap();
    let encoded = encode(&flat, &player(0), 1).unwrap();
    let mut dst = Player::default();
    c.bench_function("decode_player", |b| {
        b.iter(|| decode(&decoder, black_box(&encoded), &mut dst, 1).unwrap());
    });
}

fn bench_merge(c: &mut Criterion) {
    let flat = FlatTable::build(&send_table()).unwrap();
    let base = encode(&flat, &player(0), 1).unwrap();
    let mut group = c.benchmark_group("merge_player");
    for step in [1, 5, 20] {
        let next = encode(&flat, &player(step), 1).unwrap();
        let changed = calc_delta(&flat, &base, &next).unwrap();
        let delta = write_prop_list(&flat, &next, &changed).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(step), &delta, |b, delta| {
            b.iter(|| merge_deltas(&flat, Some(black_box(&base)), delta).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_merge);
criterion_main!(benches);
