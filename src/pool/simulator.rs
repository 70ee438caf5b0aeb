//! Off-chain model of a freshly created pool
//!
//! Bundled buys are built before the pool exists on chain, so each buy is
//! priced against a local copy of the reserves that is advanced after every
//! simulated trade.

use super::{amm, reserves::PoolReserves};
use crate::errors::{LaunchError, LaunchResult};

/// Which way base tokens move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    /// Quote in, exact base out
    Buy,
    /// Exact base in, quote out
    Sell,
}

#[derive(Debug, Clone)]
pub struct PoolSimulator {
    reserves: PoolReserves,
    slippage_bps: u64,
}

impl PoolSimulator {
    /// Seed from the initial liquidity, in UI units
    pub fn new(base_decimals: u8, quote_decimals: u8, base_amount: f64, quote_amount: f64) -> Self {
        let base_reserve = amm::ui_to_raw(base_amount, base_decimals);
        Self {
            reserves: PoolReserves {
                status: 0,
                base_decimals,
                quote_decimals,
                lp_decimals: base_decimals,
                base_reserve,
                quote_reserve: amm::ui_to_raw(quote_amount, quote_decimals),
                lp_supply: base_reserve,
                start_time: 0,
            },
            slippage_bps: amm::DEFAULT_SLIPPAGE_BPS,
        }
    }

    pub fn with_slippage_bps(mut self, slippage_bps: u64) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    pub fn reserves(&self) -> &PoolReserves {
        &self.reserves
    }

    /// Raw quote amount for trading `base_amount` (UI units)
    ///
    /// Buy: the most quote that may be spent. Sell: the least quote
    /// accepted.
    pub fn compute_quote_amount(&self, base_amount: f64, side: SwapSide) -> LaunchResult<u64> {
        let base_raw = amm::ui_to_raw(base_amount, self.reserves.base_decimals);
        let r = &self.reserves;
        match side {
            SwapSide::Buy => {
                let needed = amm::amount_in(base_raw, r.quote_reserve, r.base_reserve).ok_or_else(|| {
                    LaunchError::invalid(format!(
                        "cannot buy {} base units from a pool holding {}",
                        base_raw, r.base_reserve
                    ))
                })?;
                Ok(amm::max_with_slippage(needed, self.slippage_bps))
            }
            SwapSide::Sell => {
                let out = amm::amount_out(base_raw, r.base_reserve, r.quote_reserve);
                Ok(amm::min_with_slippage(out, self.slippage_bps))
            }
        }
    }

    /// Quote per base, UI units
    pub fn current_price(&self) -> f64 {
        let base = amm::raw_to_ui(self.reserves.base_reserve, self.reserves.base_decimals);
        if base == 0.0 {
            return 0.0;
        }
        amm::raw_to_ui(self.reserves.quote_reserve, self.reserves.quote_decimals) / base
    }

    /// Apply a buy of `base_amount`; returns the raw quote spent
    pub fn apply_buy(&mut self, base_amount: f64) -> LaunchResult<u64> {
        let quote_in = self.compute_quote_amount(base_amount, SwapSide::Buy)?;
        let base_out = amm::amount_out(quote_in, self.reserves.quote_reserve, self.reserves.base_reserve);
        self.reserves.quote_reserve = self
            .reserves
            .quote_reserve
            .checked_add(quote_in)
            .ok_or_else(|| LaunchError::invalid(format!("buy of {} quote units overflows the pool", quote_in)))?;
        self.reserves.base_reserve -= base_out;
        Ok(quote_in)
    }

    /// Apply a sell of `base_amount`; returns the raw quote received
    pub fn apply_sell(&mut self, base_amount: f64) -> LaunchResult<u64> {
        let base_in = amm::ui_to_raw(base_amount, self.reserves.base_decimals);
        let quote_out = amm::amount_out(base_in, self.reserves.base_reserve, self.reserves.quote_reserve);
        self.reserves.base_reserve = self
            .reserves
            .base_reserve
            .checked_add(base_in)
            .ok_or_else(|| LaunchError::invalid(format!("sell of {} base units overflows the pool", base_in)))?;
        self.reserves.quote_reserve -= quote_out;
        Ok(quote_out)
    }
}
