#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = BitReader::new(data);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 8;
        let arg = data.get(idx + 1).copied().unwrap_or(0);
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_bool();
            }
            1 => {
                let _ = reader.read_bits(arg % 64 + 1);
            }
            2 => {
                let _ = reader.seek(usize::from(arg) * 3);
            }
            3 => {
                let _ = reader.seek_relative(isize::from(arg as i8));
            }
            4 => {
                let _ = reader.read_varu32();
            }
            5 => {
                let _ = reader.read_vars64();
            }
            6 => {
                let _ = reader.read_cstring(usize::from(arg));
            }
            _ => {
                let mut other = BitReader::new(data);
                let _ = reader.compare_bits(&mut other, usize::from(arg));
            }
        }
        assert!(reader.bits_read() <= reader.bit_len());
    }
});
