#![no_main]

use libfuzzer_sys::fuzz_target;
use schema::FlatTable;

fuzz_target!(|data: &[u8]| {
    let Ok(set) = wire::decode_table_set(data, &wire::Limits::for_testing()) else {
        return;
    };
    for table in &set.tables {
        let _ = FlatTable::build(table);
    }
});
