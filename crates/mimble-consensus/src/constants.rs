pub const HEIGHT_GENESIS: u64 = 1;
pub const MAX_HEIGHT: u64 = u64::MAX;

pub const KERNEL_MAX_NESTING: usize = 2;

pub const DIFFICULTY_MANTISSA_BITS: u32 = 24;
pub const DIFFICULTY_MAX_ORDER: u32 = 256 - DIFFICULTY_MANTISSA_BITS - 1;
pub const DIFFICULTY_INF: u32 = (DIFFICULTY_MAX_ORDER + 1) << DIFFICULTY_MANTISSA_BITS;

/// Numerator over 2^16 of the work-axis fraction sampled per proof step.
/// 635 / 65536 ~ 1/103: with an attacker below 2/3 of honest power, 103 samples
/// in any suffix bound the forgery probability near 2^-60.
pub const CWP_SAMPLING_FRACTION: u16 = 635;

pub const COIN: u64 = 100_000_000;

pub const EMISSION_VALUE0: u64 = 80 * COIN;
pub const EMISSION_DROP0: u64 = 1440 * 365;
pub const EMISSION_DROP1: u64 = 1440 * 365 * 4;

pub const MATURITY_COINBASE: u64 = 240;

pub const FORK1_HEIGHT: u64 = 321_321;
