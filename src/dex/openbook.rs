//! OpenBook (Serum v3) market initialization

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    sysvar,
};

pub const EVENT_QUEUE_ITEMS: usize = 128;
pub const REQUEST_QUEUE_ITEMS: usize = 63;
pub const ORDERBOOK_ITEMS: usize = 201;

/// Account header plus padding around the queue/book slabs
const SLAB_OVERHEAD: usize = 44 + 48;

pub const fn event_queue_space() -> usize {
    EVENT_QUEUE_ITEMS * 88 + SLAB_OVERHEAD
}

pub const fn request_queue_space() -> usize {
    REQUEST_QUEUE_ITEMS * 80 + SLAB_OVERHEAD
}

pub const fn orderbook_space() -> usize {
    ORDERBOOK_ITEMS * 80 + SLAB_OVERHEAD
}

/// Accounts and parameters of a new market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketInit {
    pub market: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub fee_rate_bps: u16,
    pub vault_signer_nonce: u64,
    pub quote_dust_threshold: u64,
}

pub fn initialize_market(program_id: &Pubkey, init: &MarketInit) -> Instruction {
    let mut data = Vec::with_capacity(39);
    data.push(0); // version
    data.extend_from_slice(&0u32.to_le_bytes()); // InitializeMarket
    data.extend_from_slice(&init.base_lot_size.to_le_bytes());
    data.extend_from_slice(&init.quote_lot_size.to_le_bytes());
    data.extend_from_slice(&init.fee_rate_bps.to_le_bytes());
    data.extend_from_slice(&init.vault_signer_nonce.to_le_bytes());
    data.extend_from_slice(&init.quote_dust_threshold.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(init.market, false),
            AccountMeta::new(init.request_queue, false),
            AccountMeta::new(init.event_queue, false),
            AccountMeta::new(init.bids, false),
            AccountMeta::new(init.asks, false),
            AccountMeta::new(init.base_vault, false),
            AccountMeta::new(init.quote_vault, false),
            AccountMeta::new_readonly(init.base_mint, false),
            AccountMeta::new_readonly(init.quote_mint, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_sizes() {
        assert_eq!(event_queue_space(), 11_356);
        assert_eq!(request_queue_space(), 5_132);
        assert_eq!(orderbook_space(), 16_172);
    }

    #[test]
    fn test_initialize_market_data() {
        let init = MarketInit {
            market: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            base_lot_size: 1_000_000,
            quote_lot_size: 10_000_000,
            fee_rate_bps: 0,
            vault_signer_nonce: 2,
            quote_dust_threshold: 100,
        };
        let ix = initialize_market(&Pubkey::new_unique(), &init);

        assert_eq!(ix.data.len(), 39);
        assert_eq!(&ix.data[0..5], &[0, 0, 0, 0, 0]);
        assert_eq!(&ix.data[5..13], &1_000_000u64.to_le_bytes());
        assert_eq!(&ix.data[23..31], &2u64.to_le_bytes());
        assert_eq!(&ix.data[31..39], &100u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 10);
        assert_eq!(ix.accounts[9].pubkey, sysvar::rent::id());
    }
}
