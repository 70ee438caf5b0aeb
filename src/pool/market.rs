//! OpenBook (Serum v3) market account decoding

use crate::{
    errors::{LaunchError, LaunchResult},
    ledger::{AccountFilter, LedgerClient},
};
use solana_sdk::pubkey::Pubkey;

/// Size of a v3 market state account
pub const MARKET_STATE_LEN: usize = 388;
/// Upper bound of the vault-signer nonce search
pub const MAX_VAULT_SIGNER_NONCE: u64 = 25_555;

const BASE_MINT_OFFSET: usize = 53;
const QUOTE_MINT_OFFSET: usize = 85;

/// Fields of the market state the pool and swaps need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketStateV3 {
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub fee_rate_bps: u64,
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

impl MarketStateV3 {
    pub fn decode(data: &[u8]) -> LaunchResult<Self> {
        if data.len() != MARKET_STATE_LEN {
            return Err(LaunchError::invalid(format!(
                "market state must be {} bytes, got {}",
                MARKET_STATE_LEN,
                data.len()
            )));
        }

        Ok(Self {
            own_address: read_pubkey(data, 13),
            vault_signer_nonce: read_u64(data, 45),
            base_mint: read_pubkey(data, BASE_MINT_OFFSET),
            quote_mint: read_pubkey(data, QUOTE_MINT_OFFSET),
            base_vault: read_pubkey(data, 117),
            quote_vault: read_pubkey(data, 165),
            request_queue: read_pubkey(data, 221),
            event_queue: read_pubkey(data, 253),
            bids: read_pubkey(data, 285),
            asks: read_pubkey(data, 317),
            base_lot_size: read_u64(data, 349),
            quote_lot_size: read_u64(data, 357),
            fee_rate_bps: read_u64(data, 365),
        })
    }

    /// Encode into a zeroed 388-byte account image (padding and counters left at 0)
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; MARKET_STATE_LEN];
        data[0..5].copy_from_slice(b"serum");
        data[381..388].copy_from_slice(b"padding");
        let mut put_key = |offset: usize, key: &Pubkey| {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        };
        put_key(13, &self.own_address);
        put_key(BASE_MINT_OFFSET, &self.base_mint);
        put_key(QUOTE_MINT_OFFSET, &self.quote_mint);
        put_key(117, &self.base_vault);
        put_key(165, &self.quote_vault);
        put_key(221, &self.request_queue);
        put_key(253, &self.event_queue);
        put_key(285, &self.bids);
        put_key(317, &self.asks);
        for (offset, value) in [
            (45, self.vault_signer_nonce),
            (349, self.base_lot_size),
            (357, self.quote_lot_size),
            (365, self.fee_rate_bps),
        ] {
            data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        }
        data
    }
}

/// Vault signer PDA for a given nonce
pub fn market_vault_signer(market: &Pubkey, nonce: u64, program_id: &Pubkey) -> LaunchResult<Pubkey> {
    Pubkey::create_program_address(&[market.as_ref(), &nonce.to_le_bytes()], program_id)
        .map_err(|e| LaunchError::fail(format!("invalid vault signer nonce {}: {}", nonce, e)))
}

/// First nonce that yields a valid vault signer
pub fn find_vault_signer(market: &Pubkey, program_id: &Pubkey) -> LaunchResult<(Pubkey, u64)> {
    (0..=MAX_VAULT_SIGNER_NONCE)
        .find_map(|nonce| {
            market_vault_signer(market, nonce, program_id)
                .ok()
                .map(|signer| (signer, nonce))
        })
        .ok_or_else(|| LaunchError::fail("no vault signer nonce found"))
}

/// Markets of `program_id` trading `base_mint` against `quote_mint`
pub async fn find_markets_by_mints(
    ledger: &dyn LedgerClient,
    base_mint: &Pubkey,
    quote_mint: &Pubkey,
    program_id: &Pubkey,
) -> LaunchResult<Vec<(Pubkey, MarketStateV3)>> {
    let filters = vec![
        AccountFilter::DataSize(MARKET_STATE_LEN as u64),
        AccountFilter::Memcmp {
            offset: BASE_MINT_OFFSET,
            bytes: base_mint.to_bytes().to_vec(),
        },
        AccountFilter::Memcmp {
            offset: QUOTE_MINT_OFFSET,
            bytes: quote_mint.to_bytes().to_vec(),
        },
    ];

    ledger
        .program_accounts(program_id, filters)
        .await?
        .into_iter()
        .map(|(address, data)| Ok((address, MarketStateV3::decode(&data)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedger;

    fn sample_market(base_mint: Pubkey, quote_mint: Pubkey) -> MarketStateV3 {
        MarketStateV3 {
            own_address: Pubkey::new_unique(),
            vault_signer_nonce: 3,
            base_mint,
            quote_mint,
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1_000_000,
            quote_lot_size: 10_000_000,
            fee_rate_bps: 0,
        }
    }

    #[test]
    fn test_decode_reads_layout_offsets() {
        let market = sample_market(Pubkey::new_unique(), Pubkey::new_unique());
        let data = market.encode();
        assert_eq!(&data[BASE_MINT_OFFSET..BASE_MINT_OFFSET + 32], market.base_mint.as_ref());
        assert_eq!(MarketStateV3::decode(&data).unwrap(), market);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        assert!(matches!(
            MarketStateV3::decode(&[0u8; 100]),
            Err(LaunchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_vault_signer_matches_nonce() {
        let program = Pubkey::new_unique();
        let market = Pubkey::new_unique();
        let (signer, nonce) = find_vault_signer(&market, &program).unwrap();
        assert!(nonce <= MAX_VAULT_SIGNER_NONCE);
        assert_eq!(market_vault_signer(&market, nonce, &program).unwrap(), signer);
    }

    #[tokio::test]
    async fn test_find_markets_by_mints_filters() {
        let ledger = MockLedger::new();
        let program = Pubkey::new_unique();
        let base = Pubkey::new_unique();
        let quote = Pubkey::new_unique();

        let wanted = sample_market(base, quote);
        let other = sample_market(Pubkey::new_unique(), quote);
        let wanted_id = Pubkey::new_unique();
        ledger.set_account(wanted_id, program, wanted.encode());
        ledger.set_account(Pubkey::new_unique(), program, other.encode());
        ledger.set_account(Pubkey::new_unique(), Pubkey::new_unique(), wanted.encode());

        let found = find_markets_by_mints(&ledger, &base, &quote, &program).await.unwrap();
        assert_eq!(found, vec![(wanted_id, wanted)]);
    }
}
