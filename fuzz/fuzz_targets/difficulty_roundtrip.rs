#![no_main]

use libfuzzer_sys::fuzz_target;
use mimble_consensus::Difficulty;

// Every finite difficulty unpacks to a raw work value that packs back to itself.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let d = Difficulty(u32::from_le_bytes(data[..4].try_into().unwrap()));
    if !d.is_valid() {
        assert!(d.target().is_none());
        return;
    }
    if d == Difficulty::INF {
        return;
    }

    let raw = d.to_raw();
    assert!(!raw.is_zero());
    assert_eq!(Difficulty::pack_raw(&raw.to_biguint()), d);

    let next = Difficulty(d.0 + 1);
    if next.is_valid() && next != Difficulty::INF {
        assert!(next.to_raw() > raw, "to_raw must be monotonic");
    }
});
