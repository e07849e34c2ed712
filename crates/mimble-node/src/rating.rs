//! Peer reliability score. Higher is better; zero means banned.

pub const INITIAL: u32 = 1024;
pub const REWARD_HEADER: u32 = 64;
pub const REWARD_BLOCK: u32 = 512;
pub const PENALTY_TIMEOUT: u32 = 256;
pub const PENALTY_NETWORK_ERR: u32 = 128;
pub const MAX: u32 = 10_240;

pub const BANNED: u32 = 0;

pub fn is_banned(r: u32) -> bool {
    r == BANNED
}

/// Saturates at `MAX`. A banned peer stays banned.
pub fn inc(r: &mut u32, delta: u32) {
    if is_banned(*r) {
        return;
    }
    *r = r.saturating_add(delta).min(MAX);
}

/// Never reaches zero: only an explicit ban does.
pub fn dec(r: &mut u32, delta: u32) {
    if is_banned(*r) {
        return;
    }
    *r = r.saturating_sub(delta).max(1);
}

pub fn ban(r: &mut u32) {
    *r = BANNED;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewards_saturate_and_penalties_floor() {
        let mut r = INITIAL;
        for _ in 0..100 {
            inc(&mut r, REWARD_BLOCK);
        }
        assert_eq!(r, MAX);
        for _ in 0..100 {
            dec(&mut r, PENALTY_TIMEOUT);
        }
        assert_eq!(r, 1);
    }

    #[test]
    fn ban_is_sticky() {
        let mut r = INITIAL;
        ban(&mut r);
        inc(&mut r, REWARD_HEADER);
        dec(&mut r, PENALTY_NETWORK_ERR);
        assert!(is_banned(r));
    }
}
