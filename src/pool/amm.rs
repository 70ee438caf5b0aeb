//! Constant-product swap math of the v4 AMM
//!
//! All amounts are raw integer token units. The trade fee is taken from
//! the input side before the curve is applied.

pub const TRADE_FEE_NUMERATOR: u64 = 25;
pub const TRADE_FEE_DENOMINATOR: u64 = 10_000;
/// Default slippage tolerance, basis points
pub const DEFAULT_SLIPPAGE_BPS: u64 = 100;

const BPS_DENOMINATOR: u64 = 10_000;

fn ceil_div(num: u128, den: u128) -> u128 {
    num.div_ceil(den)
}

/// Fee charged on `amount_in`, rounded up
pub fn trade_fee(amount_in: u64) -> u64 {
    ceil_div(
        amount_in as u128 * TRADE_FEE_NUMERATOR as u128,
        TRADE_FEE_DENOMINATOR as u128,
    ) as u64
}

/// Output for an exact input
pub fn amount_out(amount_in: u64, reserve_in: u64, reserve_out: u64) -> u64 {
    let in_after_fee = (amount_in - trade_fee(amount_in)) as u128;
    let denominator = reserve_in as u128 + in_after_fee;
    if denominator == 0 {
        return 0;
    }
    (reserve_out as u128 * in_after_fee / denominator) as u64
}

/// Input needed for an exact output; `None` if the pool cannot supply it
pub fn amount_in(amount_out: u64, reserve_in: u64, reserve_out: u64) -> Option<u64> {
    if amount_out == 0 {
        return Some(0);
    }
    if amount_out >= reserve_out {
        return None;
    }
    let in_after_fee = ceil_div(
        reserve_in as u128 * amount_out as u128,
        (reserve_out - amount_out) as u128,
    );
    let gross = ceil_div(
        in_after_fee * TRADE_FEE_DENOMINATOR as u128,
        (TRADE_FEE_DENOMINATOR - TRADE_FEE_NUMERATOR) as u128,
    );
    u64::try_from(gross).ok()
}

/// Upper bound of `amount` after slippage, rounded up
pub fn max_with_slippage(amount: u64, slippage_bps: u64) -> u64 {
    let scaled = ceil_div(
        amount as u128 * (BPS_DENOMINATOR + slippage_bps) as u128,
        BPS_DENOMINATOR as u128,
    );
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Lower bound of `amount` after slippage, rounded down
pub fn min_with_slippage(amount: u64, slippage_bps: u64) -> u64 {
    let kept = BPS_DENOMINATOR.saturating_sub(slippage_bps) as u128;
    (amount as u128 * kept / BPS_DENOMINATOR as u128) as u64
}

/// Raw amount for a UI amount: `amount * 10^decimals`
pub fn ui_to_raw(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)).round() as u64
}

pub fn raw_to_ui(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

/// `raw * fraction`, with the fraction rounded to a whole percent
pub fn percent_amount(raw: u64, fraction: f64) -> u64 {
    let percent = (fraction * 100.0).round().max(0.0) as u128;
    (raw as u128 * percent / 100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_quote() {
        // 1 SOL into a 100 SOL / 1_000_000 token pool
        let out = amount_out(1_000_000_000, 100_000_000_000, 1_000_000_000_000);
        assert_eq!(trade_fee(1_000_000_000), 2_500_000);
        assert_eq!(out, 9_876_482_091);
    }

    #[test]
    fn test_amount_in_unavailable() {
        assert_eq!(amount_in(1_000, 50, 1_000), None);
        assert_eq!(amount_in(0, 50, 1_000), Some(0));
    }

    #[test]
    fn test_slippage_bounds() {
        assert_eq!(max_with_slippage(10_000, DEFAULT_SLIPPAGE_BPS), 10_100);
        assert_eq!(min_with_slippage(10_000, DEFAULT_SLIPPAGE_BPS), 9_900);
        assert_eq!(max_with_slippage(1, DEFAULT_SLIPPAGE_BPS), 2);
    }

    #[test]
    fn test_unit_helpers() {
        assert_eq!(ui_to_raw(1.5, 9), 1_500_000_000);
        assert_eq!(ui_to_raw(1000.0, 6), 1_000_000_000);
        assert_eq!(percent_amount(1_000, 0.5), 500);
        assert_eq!(percent_amount(999, 0.333), 329);
        assert_eq!(percent_amount(1_000, 1.0), 1_000);
        assert_eq!(raw_to_ui(2_500_000, 6), 2.5);
    }

    proptest! {
        #[test]
        fn prop_exact_in_never_drains_pool(
            amount in 1u64..1_000_000_000_000,
            reserve_in in 1u64..1_000_000_000_000_000,
            reserve_out in 1u64..1_000_000_000_000_000,
        ) {
            prop_assert!(amount_out(amount, reserve_in, reserve_out) < reserve_out);
        }

        #[test]
        fn prop_amount_in_buys_at_least_requested(
            reserve_in in 1_000u64..1_000_000_000_000,
            reserve_out in 1_000u64..1_000_000_000_000,
            share in 1u64..9_000,
        ) {
            let want = reserve_out / 10_000 * share;
            prop_assume!(want > 0);
            let needed = amount_in(want, reserve_in, reserve_out).unwrap();
            prop_assert!(amount_out(needed, reserve_in, reserve_out) >= want);
        }

        #[test]
        fn prop_slippage_brackets_amount(amount in 0u64..u64::MAX / 2, bps in 0u64..5_000) {
            prop_assert!(min_with_slippage(amount, bps) <= amount);
            prop_assert!(max_with_slippage(amount, bps) >= amount);
        }
    }
}
