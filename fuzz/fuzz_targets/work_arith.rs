#![no_main]

use libfuzzer_sys::fuzz_target;
use mimble_consensus::Work;
use num_bigint::BigUint;

// 256-bit work arithmetic against BigUint as the reference.
fuzz_target!(|data: &[u8]| {
    if data.len() < 66 {
        return;
    }
    let a = Work::from_be_bytes(data[..32].try_into().unwrap());
    let b = Work::from_be_bytes(data[32..64].try_into().unwrap());
    let num = u16::from_le_bytes([data[64], data[65]]);

    let (ba, bb) = (a.to_biguint(), b.to_biguint());
    let modulus = BigUint::from(1u8) << 256;

    match a.checked_add(&b) {
        Some(s) => assert_eq!(s.to_biguint(), &ba + &bb),
        None => assert!(&ba + &bb >= modulus),
    }
    match a.checked_sub(&b) {
        Some(d) => assert_eq!(d.to_biguint(), &ba - &bb),
        None => assert!(ba < bb),
    }
    assert_eq!(
        a.wrapping_add(&b).to_biguint(),
        (&ba + &bb) % &modulus,
        "wrapping_add"
    );
    assert_eq!(
        a.mul_fraction(num).to_biguint(),
        (&ba * BigUint::from(num)) >> 16u32,
        "mul_fraction"
    );

    let n = a.bit_len();
    assert_eq!(n as u64, ba.bits());
    assert_eq!(a.low_bits(n), a);
    assert_eq!(Work::from_biguint(&ba), Some(a));
});
