//! OpenBook market creation for a base/quote pair

use crate::{
    config::TokenInfo,
    dex::openbook::{self, initialize_market, MarketInit},
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
    pool::market::{find_vault_signer, MARKET_STATE_LEN},
    tx_helper::{build_v0_transaction, send_and_confirm_all},
};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_token::solana_program::program_pack::Pack;
use tracing::{debug, info, instrument};

/// Base lot of one whole token
pub const LOT_SIZE: f64 = 1.0;
/// Price increment, in quote units
pub const TICK_SIZE: f64 = 0.01;
const FEE_RATE_BPS: u16 = 0;
const QUOTE_DUST_THRESHOLD: u64 = 100;

/// Addresses of a newly created market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAddresses {
    pub market: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub vault_signer: Pubkey,
    pub vault_signer_nonce: u64,
}

/// Account derived from the owner with a random seed
struct SeededAccount {
    seed: String,
    address: Pubkey,
}

impl SeededAccount {
    fn generate(base: &Pubkey, program_id: &Pubkey) -> LaunchResult<Self> {
        let seed: String = Keypair::new().pubkey().to_string().chars().take(32).collect();
        let address = Pubkey::create_with_seed(base, &seed, program_id)
            .map_err(|e| LaunchError::fail(format!("create_with_seed: {}", e)))?;
        Ok(Self { seed, address })
    }

    fn create(&self, owner: &Pubkey, lamports: u64, space: usize, program_id: &Pubkey) -> Instruction {
        system_instruction::create_account_with_seed(
            owner,
            &self.address,
            owner,
            &self.seed,
            lamports,
            space as u64,
            program_id,
        )
    }
}

/// Raw base and quote lot sizes
pub fn lot_sizes(base_decimals: u8, quote_decimals: u8) -> LaunchResult<(u64, u64)> {
    let base_lot = (10f64.powi(base_decimals as i32) * LOT_SIZE).round() as u64;
    let quote_lot = (LOT_SIZE * 10f64.powi(quote_decimals as i32) * TICK_SIZE).round() as u64;
    if base_lot == 0 {
        return Err(LaunchError::invalid("lot size is too small"));
    }
    if quote_lot == 0 {
        return Err(LaunchError::invalid("tick size or lot size is too small"));
    }
    Ok((base_lot, quote_lot))
}

/// Create the market accounts and initialize the market
///
/// Two transactions: the token vaults first, then the market, queues and
/// order books together with `InitializeMarket`.
#[instrument(skip_all, fields(base = %base.address, quote = %quote.address))]
pub async fn create_openbook_market(
    ledger: &dyn LedgerClient,
    owner: &Keypair,
    base: &TokenInfo,
    quote: &TokenInfo,
    program_id: &Pubkey,
) -> LaunchResult<MarketAddresses> {
    let (base_lot_size, quote_lot_size) = lot_sizes(base.decimals, quote.decimals)?;
    let owner_key = owner.pubkey();
    let token_program = spl_token::id();

    let market = SeededAccount::generate(&owner_key, program_id)?;
    let request_queue = SeededAccount::generate(&owner_key, program_id)?;
    let event_queue = SeededAccount::generate(&owner_key, program_id)?;
    let bids = SeededAccount::generate(&owner_key, program_id)?;
    let asks = SeededAccount::generate(&owner_key, program_id)?;
    let base_vault = SeededAccount::generate(&owner_key, &token_program)?;
    let quote_vault = SeededAccount::generate(&owner_key, &token_program)?;
    let (vault_signer, vault_signer_nonce) = find_vault_signer(&market.address, program_id)?;
    debug!(market = %market.address, nonce = vault_signer_nonce, "Vault signer found");

    let vault_len = spl_token::state::Account::LEN;
    let vault_rent = ledger.minimum_balance_for_rent_exemption(vault_len).await?;
    let init_vault = |vault: &SeededAccount, mint: &Pubkey| {
        spl_token::instruction::initialize_account(&token_program, &vault.address, mint, &vault_signer)
            .map_err(|e| LaunchError::fail(format!("initialize_account: {}", e)))
    };
    let vault_ixs = vec![
        base_vault.create(&owner_key, vault_rent, vault_len, &token_program),
        quote_vault.create(&owner_key, vault_rent, vault_len, &token_program),
        init_vault(&base_vault, &base.address)?,
        init_vault(&quote_vault, &quote.address)?,
    ];

    let mut market_ixs = Vec::with_capacity(6);
    for (account, space) in [
        (&market, MARKET_STATE_LEN),
        (&request_queue, openbook::request_queue_space()),
        (&event_queue, openbook::event_queue_space()),
        (&bids, openbook::orderbook_space()),
        (&asks, openbook::orderbook_space()),
    ] {
        let rent = ledger.minimum_balance_for_rent_exemption(space).await?;
        market_ixs.push(account.create(&owner_key, rent, space, program_id));
    }

    let addresses = MarketAddresses {
        market: market.address,
        request_queue: request_queue.address,
        event_queue: event_queue.address,
        bids: bids.address,
        asks: asks.address,
        base_vault: base_vault.address,
        quote_vault: quote_vault.address,
        vault_signer,
        vault_signer_nonce,
    };
    market_ixs.push(initialize_market(
        program_id,
        &MarketInit {
            market: addresses.market,
            request_queue: addresses.request_queue,
            event_queue: addresses.event_queue,
            bids: addresses.bids,
            asks: addresses.asks,
            base_vault: addresses.base_vault,
            quote_vault: addresses.quote_vault,
            base_mint: base.address,
            quote_mint: quote.address,
            base_lot_size,
            quote_lot_size,
            fee_rate_bps: FEE_RATE_BPS,
            vault_signer_nonce,
            quote_dust_threshold: QUOTE_DUST_THRESHOLD,
        },
    ));

    let transactions = vec![
        build_v0_transaction(&owner_key, &vault_ixs, Hash::default())?,
        build_v0_transaction(&owner_key, &market_ixs, Hash::default())?,
    ];
    send_and_confirm_all(ledger, transactions, owner).await?;

    info!(market = %addresses.market, "OpenBook market created");
    Ok(addresses)
}
