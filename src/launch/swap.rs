//! Pool creation, buy and sell transactions
//!
//! Each builder returns an unsigned v0 transaction with a placeholder
//! blockhash; the bundle coordinator stamps and signs it.

use crate::{
    dex::raydium::{initialize2, swap_base_in, unwrap_sol, wrap_sol},
    errors::{LaunchError, LaunchResult},
    pool::PoolKeys,
    tx_helper::build_v0_transaction,
};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// Share of the expected base amount a buy must receive
const BUY_MIN_OUT_RATIO: f64 = 0.95;

fn quote_is_native(keys: &PoolKeys) -> bool {
    keys.quote_mint == spl_token::native_mint::id()
}

/// Fund the owner's quote account with `amount` when the quote is WSOL
fn fund_quote(keys: &PoolKeys, owner: &Pubkey, amount: u64) -> LaunchResult<Vec<Instruction>> {
    if quote_is_native(keys) {
        wrap_sol(owner, amount)
    } else {
        Ok(Vec::new())
    }
}

/// `initialize2` with the owner's liquidity, opening at `open_time`
pub fn create_pool(
    keys: &PoolKeys,
    owner: &Pubkey,
    fee_destination: &Pubkey,
    base_amount: u64,
    quote_amount: u64,
    open_time: u64,
) -> LaunchResult<VersionedTransaction> {
    if base_amount == 0 || quote_amount == 0 {
        return Err(LaunchError::invalid("pool liquidity must be positive on both sides"));
    }

    let mut ixs = fund_quote(keys, owner, quote_amount)?;
    ixs.push(initialize2(keys, fee_destination, owner, open_time, quote_amount, base_amount));
    build_v0_transaction(owner, &ixs, Hash::default())
}

/// Spend exactly `quote_in` for at least 95 % of `base_out`
pub fn buy_token(
    keys: &PoolKeys,
    buyer: &Pubkey,
    quote_in: u64,
    base_out: u64,
) -> LaunchResult<VersionedTransaction> {
    if quote_in == 0 || base_out == 0 {
        return Err(LaunchError::invalid("buy amounts must be positive"));
    }

    let min_out = (base_out as f64 * BUY_MIN_OUT_RATIO).floor() as u64;
    let quote_account = get_associated_token_address(buyer, &keys.quote_mint);
    let base_account = get_associated_token_address(buyer, &keys.base_mint);

    let mut ixs = fund_quote(keys, buyer, quote_in)?;
    ixs.push(create_associated_token_account_idempotent(
        buyer,
        buyer,
        &keys.base_mint,
        &spl_token::id(),
    ));
    ixs.push(swap_base_in(keys, &quote_account, &base_account, buyer, quote_in, min_out));
    if quote_is_native(keys) {
        ixs.push(unwrap_sol(buyer)?);
    }
    build_v0_transaction(buyer, &ixs, Hash::default())
}

/// Sell exactly `base_in` for any amount of quote
pub fn sell_token(keys: &PoolKeys, seller: &Pubkey, base_in: u64) -> LaunchResult<VersionedTransaction> {
    if base_in == 0 {
        return Err(LaunchError::invalid("nothing to sell"));
    }

    let base_account = get_associated_token_address(seller, &keys.base_mint);
    let quote_account = get_associated_token_address(seller, &keys.quote_mint);

    let mut ixs = vec![create_associated_token_account_idempotent(
        seller,
        seller,
        &keys.quote_mint,
        &spl_token::id(),
    )];
    ixs.push(swap_base_in(keys, &base_account, &quote_account, seller, base_in, 0));
    if quote_is_native(keys) {
        ixs.push(unwrap_sol(seller)?);
    }
    build_v0_transaction(seller, &ixs, Hash::default())
}
