//! Raydium AMM v4 instruction builders

use crate::{
    errors::{LaunchError, LaunchResult},
    pool::PoolKeys,
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

const INITIALIZE2_TAG: u8 = 1;
const SWAP_BASE_IN_TAG: u8 = 9;

/// `initialize2`: create the pool and deposit the initial liquidity
pub fn initialize2(
    keys: &PoolKeys,
    fee_destination: &Pubkey,
    owner: &Pubkey,
    open_time: u64,
    init_quote_amount: u64,
    init_base_amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(26);
    data.push(INITIALIZE2_TAG);
    data.push(keys.nonce);
    data.extend_from_slice(&open_time.to_le_bytes());
    data.extend_from_slice(&init_quote_amount.to_le_bytes());
    data.extend_from_slice(&init_base_amount.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.lp_mint, false),
        AccountMeta::new_readonly(keys.base_mint, false),
        AccountMeta::new_readonly(keys.quote_mint, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new_readonly(keys.config_id, false),
        AccountMeta::new(*fee_destination, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new_readonly(keys.market_id, false),
        AccountMeta::new(*owner, true),
        AccountMeta::new(get_associated_token_address(owner, &keys.base_mint), false),
        AccountMeta::new(get_associated_token_address(owner, &keys.quote_mint), false),
        AccountMeta::new(get_associated_token_address(owner, &keys.lp_mint), false),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

/// `swap_base_in`: sell exactly `amount_in` of the source token
pub fn swap_base_in(
    keys: &PoolKeys,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    owner: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(17);
    data.push(SWAP_BASE_IN_TAG);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&minimum_amount_out.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*user_destination, false),
        AccountMeta::new_readonly(*owner, true),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

/// Create the owner's WSOL account if needed and fund it with `lamports`
pub fn wrap_sol(owner: &Pubkey, lamports: u64) -> LaunchResult<Vec<Instruction>> {
    let mint = spl_token::native_mint::id();
    let wsol_account = get_associated_token_address(owner, &mint);
    let sync = spl_token::instruction::sync_native(&spl_token::id(), &wsol_account)
        .map_err(|e| LaunchError::fail(format!("sync_native: {}", e)))?;

    Ok(vec![
        create_associated_token_account_idempotent(owner, owner, &mint, &spl_token::id()),
        system_instruction::transfer(owner, &wsol_account, lamports),
        sync,
    ])
}

/// Close the owner's WSOL account, returning its lamports to the owner
pub fn unwrap_sol(owner: &Pubkey) -> LaunchResult<Instruction> {
    let wsol_account = get_associated_token_address(owner, &spl_token::native_mint::id());
    spl_token::instruction::close_account(&spl_token::id(), &wsol_account, owner, owner, &[])
        .map_err(|e| LaunchError::fail(format!("close_account: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::NetworkMode,
        pool::{derive_pool_keys, market::find_vault_signer, MarketStateV3},
    };

    fn keys() -> PoolKeys {
        let programs = NetworkMode::Main.program_ids();
        let market_id = Pubkey::new_unique();
        let (_, nonce) = find_vault_signer(&market_id, &programs.openbook_market).unwrap();
        let market = MarketStateV3 {
            own_address: market_id,
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
        };
        derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap()
    }

    #[test]
    fn test_swap_layout() {
        let keys = keys();
        let owner = Pubkey::new_unique();
        let ix = swap_base_in(&keys, &Pubkey::new_unique(), &Pubkey::new_unique(), &owner, 1_000, 950);

        assert_eq!(ix.program_id, keys.program_id);
        assert_eq!(ix.data[0], 9);
        assert_eq!(&ix.data[1..9], &1_000u64.to_le_bytes());
        assert_eq!(&ix.data[9..17], &950u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 18);
        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, owner);
    }

    #[test]
    fn test_initialize2_layout() {
        let keys = keys();
        let owner = Pubkey::new_unique();
        let fee = NetworkMode::Main.program_ids().pool_fee_destination;
        let ix = initialize2(&keys, &fee, &owner, 1_700_000_000, 5_000, 7_000);

        assert_eq!(ix.data.len(), 26);
        assert_eq!(ix.data[0], 1);
        assert_eq!(ix.data[1], keys.nonce);
        assert_eq!(&ix.data[10..18], &5_000u64.to_le_bytes());
        assert_eq!(&ix.data[18..26], &7_000u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 21);
        assert_eq!(ix.accounts[4].pubkey, keys.id);
        assert_eq!(ix.accounts[14].pubkey, fee);
        assert_eq!(ix.accounts[17].pubkey, owner);
        assert!(ix.accounts[17].is_signer);
        assert_eq!(
            ix.accounts[20].pubkey,
            get_associated_token_address(&owner, &keys.lp_mint)
        );
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let owner = Pubkey::new_unique();
        let wrap = wrap_sol(&owner, 1_000).unwrap();
        assert_eq!(wrap.len(), 3);
        assert_eq!(wrap[2].program_id, spl_token::id());

        let close = unwrap_sol(&owner).unwrap();
        assert_eq!(close.accounts[1].pubkey, owner);
    }
}
