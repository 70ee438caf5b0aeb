use super::keys::PoolKeys;
use crate::{
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
};
use serde::{Deserialize, Serialize};

/// Size of the v4 AMM state account
pub const AMM_INFO_LEN: usize = 752;

const STATUS_OFFSET: usize = 0;
const POOL_OPEN_TIME_OFFSET: usize = 224;
const LP_AMOUNT_OFFSET: usize = 720;

/// Pool state relevant to pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    pub status: u64,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_supply: u64,
    /// Unix seconds the pool opens for swaps
    pub start_time: u64,
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Read the live reserves of an existing pool
///
/// Reserves are the vault balances; amounts parked in open orders are not
/// counted.
pub async fn fetch_pool_reserves(ledger: &dyn LedgerClient, keys: &PoolKeys) -> LaunchResult<PoolReserves> {
    let data = ledger
        .account_data(&keys.id)
        .await?
        .ok_or_else(|| LaunchError::fail(format!("pool {} not found", keys.id)))?;
    if data.len() != AMM_INFO_LEN {
        return Err(LaunchError::fail(format!(
            "pool account must be {} bytes, got {}",
            AMM_INFO_LEN,
            data.len()
        )));
    }

    let base_reserve = ledger.token_balance(&keys.base_vault).await?;
    let quote_reserve = ledger.token_balance(&keys.quote_vault).await?;

    Ok(PoolReserves {
        status: read_u64(&data, STATUS_OFFSET),
        base_decimals: keys.base_decimals,
        quote_decimals: keys.quote_decimals,
        lp_decimals: keys.lp_decimals,
        base_reserve,
        quote_reserve,
        lp_supply: read_u64(&data, LP_AMOUNT_OFFSET),
        start_time: read_u64(&data, POOL_OPEN_TIME_OFFSET),
    })
}
