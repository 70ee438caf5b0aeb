//! Raydium AMM v4 pool address derivation

use super::market::{market_vault_signer, MarketStateV3};
use crate::{config::ProgramIds, errors::LaunchResult};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";
const AMM_CONFIG_SEED: &[u8] = b"amm_config_account_seed";

/// Every account a v4 pool instruction touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKeys {
    pub id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub program_id: Pubkey,
    pub authority: Pubkey,
    pub nonce: u8,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub config_id: Pubkey,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub market_authority: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
}

/// PDA of `seed` scoped to `market` under the AMM program
pub fn associated_address(program_id: &Pubkey, market_id: &Pubkey, seed: &[u8]) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref(), market_id.as_ref(), seed], program_id).0
}

pub fn amm_authority(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], program_id)
}

pub fn amm_config_id(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[AMM_CONFIG_SEED], program_id).0
}

/// Derive the pool keys for a market
pub fn derive_pool_keys(
    market_id: &Pubkey,
    market: &MarketStateV3,
    base_decimals: u8,
    quote_decimals: u8,
    programs: &ProgramIds,
) -> LaunchResult<PoolKeys> {
    let program_id = programs.amm_v4;
    let (authority, nonce) = amm_authority(&program_id);
    let associated = |seed: &[u8]| associated_address(&program_id, market_id, seed);
    let market_authority = market_vault_signer(
        market_id,
        market.vault_signer_nonce,
        &programs.openbook_market,
    )?;

    Ok(PoolKeys {
        id: associated(b"amm_associated_seed"),
        base_mint: market.base_mint,
        quote_mint: market.quote_mint,
        lp_mint: associated(b"lp_mint_associated_seed"),
        base_decimals,
        quote_decimals,
        lp_decimals: base_decimals,
        program_id,
        authority,
        nonce,
        open_orders: associated(b"open_order_associated_seed"),
        target_orders: associated(b"target_associated_seed"),
        base_vault: associated(b"coin_vault_associated_seed"),
        quote_vault: associated(b"pc_vault_associated_seed"),
        withdraw_queue: associated(b"withdraw_associated_seed"),
        lp_vault: associated(b"temp_lp_token_associated_seed"),
        config_id: amm_config_id(&program_id),
        market_program_id: programs.openbook_market,
        market_id: *market_id,
        market_authority,
        market_base_vault: market.base_vault,
        market_quote_vault: market.quote_vault,
        market_bids: market.bids,
        market_asks: market.asks,
        market_event_queue: market.event_queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::NetworkMode, pool::market::find_vault_signer};
    use solana_sdk::pubkey;

    fn market_for(market_id: &Pubkey, programs: &ProgramIds) -> MarketStateV3 {
        let (_, nonce) = find_vault_signer(market_id, &programs.openbook_market).unwrap();
        MarketStateV3 {
            own_address: *market_id,
            vault_signer_nonce: nonce,
            base_mint: Pubkey::new_unique(),
            quote_mint: spl_token::native_mint::id(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1,
            quote_lot_size: 1,
            fee_rate_bps: 0,
        }
    }

    #[test]
    fn test_mainnet_authority_matches_known_address() {
        let (authority, _) = amm_authority(&NetworkMode::Main.program_ids().amm_v4);
        assert_eq!(authority, pubkey!("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1"));
    }

    #[test]
    fn test_derivation_is_deterministic_and_distinct() {
        let programs = NetworkMode::Dev.program_ids();
        let market_id = Pubkey::new_unique();
        let market = market_for(&market_id, &programs);

        let a = derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap();
        let b = derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap();
        assert_eq!(a, b);

        let derived = [
            a.id,
            a.lp_mint,
            a.open_orders,
            a.target_orders,
            a.base_vault,
            a.quote_vault,
            a.withdraw_queue,
            a.lp_vault,
        ];
        for (i, x) in derived.iter().enumerate() {
            for y in &derived[i + 1..] {
                assert_ne!(x, y);
            }
        }
        assert_eq!(a.market_bids, market.bids);
        assert_eq!(a.lp_decimals, 6);
        assert_eq!(a.program_id, programs.amm_v4);
    }

    #[test]
    fn test_bad_nonce_is_an_error() {
        let programs = NetworkMode::Dev.program_ids();
        let market_id = Pubkey::new_unique();
        let mut market = market_for(&market_id, &programs);
        let mut bad = market.vault_signer_nonce + 1;
        while market_vault_signer(&market_id, bad, &programs.openbook_market).is_ok() {
            bad += 1;
        }
        market.vault_signer_nonce = bad;

        assert!(derive_pool_keys(&market_id, &market, 6, 9, &programs).is_err());
    }
}
