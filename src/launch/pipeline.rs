//! Top-level launch run
//!
//! Stages run in order, each gated by its toggle: token, market, pool with
//! bundled buys, then the optional delayed bundled sell. The first failing
//! stage ends the run.

use super::{
    market::{create_openbook_market, MarketAddresses},
    swap::{buy_token, create_pool, sell_token},
    token::create_token,
};
use crate::{
    bundle::{BundleCoordinator, PendingBundleEntry},
    config::{AppConfig, TokenInfo},
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
    observability::TraceContext,
    pool::{
        amm::{percent_amount, ui_to_raw},
        derive_pool_keys, find_markets_by_mints, PoolKeys, PoolSimulator,
    },
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchReport {
    pub mint: Option<Pubkey>,
    pub market: Option<MarketAddresses>,
    pub pool: Option<Pubkey>,
    pub sold: bool,
}

pub struct Launcher<'a> {
    config: &'a AppConfig,
    ledger: Arc<dyn LedgerClient>,
    coordinator: BundleCoordinator,
}

impl<'a> Launcher<'a> {
    pub fn new(config: &'a AppConfig, ledger: Arc<dyn LedgerClient>, coordinator: BundleCoordinator) -> Self {
        Self {
            config,
            ledger,
            coordinator,
        }
    }

    fn owner(&self) -> LaunchResult<&Arc<Keypair>> {
        self.config
            .owner
            .as_ref()
            .ok_or_else(|| LaunchError::invalid("OWNER_PRIVATE is not set"))
    }

    /// Mint this run works on, with its decimals
    fn base_token(&self, created: Option<Pubkey>) -> LaunchResult<TokenInfo> {
        let (address, decimals) = match created {
            Some(mint) => (mint, self.config.token.decimals),
            None => (
                self.config
                    .pool
                    .mint_address
                    .ok_or_else(|| LaunchError::invalid("MINT_ADDRESS is not set"))?,
                self.config.pool.mint_decimals,
            ),
        };
        Ok(TokenInfo {
            address,
            decimals,
            symbol: self.config.token.symbol.clone(),
            name: self.config.token.name.clone(),
        })
    }

    pub async fn run(&self) -> LaunchResult<LaunchReport> {
        let stages = self.config.stages;
        let mut report = LaunchReport::default();
        let trace = TraceContext::new("launch");
        info!(trace_id = %trace.trace_id, correlation_id = %trace.correlation_id, "Launch started");

        if stages.create_token {
            let mint = create_token(self.ledger.as_ref(), self.owner()?, &self.config.token)
                .instrument(trace.child_span("create_token").span())
                .await?;
            info!(mint = %mint, "Token created");
            report.mint = Some(mint);
        }

        if stages.create_market {
            let base = self.base_token(report.mint)?;
            let market = create_openbook_market(
                self.ledger.as_ref(),
                self.owner()?,
                &base,
                &self.config.quote,
                &self.config.program_ids().openbook_market,
            )
            .instrument(trace.child_span("create_market").span())
            .await?;
            report.market = Some(market);
        }

        if stages.create_pool {
            let base = self.base_token(report.mint)?;
            let preferred = report.market.as_ref().map(|m| m.market);
            let keys = async {
                let keys = self.pool_keys(&base, preferred).await?;
                self.launch_pool(&keys).await?;
                Ok::<_, LaunchError>(keys)
            }
            .instrument(trace.child_span("create_pool").span())
            .await?;
            report.pool = Some(keys.id);

            if stages.sell_after_create {
                async {
                    if !self.config.sell.delay.is_zero() {
                        info!(delay_ms = self.config.sell.delay.as_millis() as u64, "Waiting before sell");
                        tokio::time::sleep(self.config.sell.delay).await;
                    }
                    self.sell(&keys).await
                }
                .instrument(trace.child_span("sell").span())
                .await?;
                report.sold = true;
            }
        }

        Ok(report)
    }

    /// Pool keys for the market trading `base` against the quote token
    async fn pool_keys(&self, base: &TokenInfo, preferred: Option<Pubkey>) -> LaunchResult<PoolKeys> {
        let programs = self.config.program_ids();
        let markets = find_markets_by_mints(
            self.ledger.as_ref(),
            &base.address,
            &self.config.quote.address,
            &programs.openbook_market,
        )
        .await?;

        let (market_id, market) = match preferred {
            Some(id) => markets.into_iter().find(|(address, _)| *address == id),
            None => markets.into_iter().next(),
        }
        .ok_or_else(|| LaunchError::fail(format!("no OpenBook market found for {}", base.address)))?;
        info!(market = %market_id, "Using OpenBook market");

        derive_pool_keys(&market_id, &market, base.decimals, self.config.quote.decimals, &programs)
    }

    /// Create the pool and place every configured buy in one bundle
    async fn launch_pool(&self, keys: &PoolKeys) -> LaunchResult<()> {
        let owner = self.owner()?;
        let pool = &self.config.pool;
        let max_entries = self.coordinator.settings().max_transactions.saturating_sub(1);
        if 1 + pool.buyers.len() > max_entries {
            return Err(LaunchError::invalid(format!(
                "a pool bundle fits at most {} buyers, {} configured",
                max_entries.saturating_sub(1),
                pool.buyers.len()
            )));
        }

        let base_raw = ui_to_raw(pool.lp_token_amount, keys.base_decimals);
        let quote_raw = ui_to_raw(pool.lp_quote_amount, keys.quote_decimals);
        let open_time = chrono::Utc::now().timestamp().max(0) as u64;
        let mut entries = vec![PendingBundleEntry::new(
            create_pool(
                keys,
                &owner.pubkey(),
                &self.config.program_ids().pool_fee_destination,
                base_raw,
                quote_raw,
                open_time,
            )?,
            Arc::clone(owner),
        )];

        let mut simulator = PoolSimulator::new(
            keys.base_decimals,
            keys.quote_decimals,
            pool.lp_token_amount,
            pool.lp_quote_amount,
        );
        for buyer in &pool.buyers {
            let quote_in = simulator.apply_buy(buyer.token_amount)?;
            let base_out = ui_to_raw(buyer.token_amount, keys.base_decimals);
            info!(
                buyer = %buyer.wallet.pubkey(),
                base_out,
                quote_in,
                price = simulator.current_price(),
                "Bundled buy priced"
            );
            entries.push(PendingBundleEntry::new(
                buy_token(keys, &buyer.wallet.pubkey(), quote_in, base_out)?,
                Arc::clone(&buyer.wallet),
            ));
        }

        if !self
            .coordinator
            .submit_bundle(entries, self.config.relay.tip_lamports, owner)
            .await
        {
            return Err(LaunchError::fail(format!("pool bundle for {} did not land", keys.id)));
        }
        info!(pool = %keys.id, buyers = pool.buyers.len(), "Pool created");
        Ok(())
    }

    /// Sell each seller's configured share of their balance in one bundle
    async fn sell(&self, keys: &PoolKeys) -> LaunchResult<()> {
        let sellers = &self.config.sell.sellers;
        let fee_payer = sellers
            .first()
            .map(|s| Arc::clone(&s.wallet))
            .ok_or_else(|| LaunchError::invalid("no sellers configured"))?;

        let balances = futures::future::try_join_all(sellers.iter().map(|seller| {
            let account = get_associated_token_address(&seller.wallet.pubkey(), &keys.base_mint);
            let ledger = Arc::clone(&self.ledger);
            async move { ledger.token_balance(&account).await }
        }))
        .await?;

        let mut entries = Vec::with_capacity(sellers.len());
        for (seller, balance) in sellers.iter().zip(balances) {
            let amount = percent_amount(balance, seller.fraction);
            if amount == 0 {
                warn!(seller = %seller.wallet.pubkey(), balance, "Nothing to sell");
                continue;
            }
            entries.push(PendingBundleEntry::new(
                sell_token(keys, &seller.wallet.pubkey(), amount)?,
                Arc::clone(&seller.wallet),
            ));
        }
        if entries.is_empty() {
            return Err(LaunchError::fail("no seller holds tokens to sell"));
        }

        let count = entries.len();
        if !self
            .coordinator
            .submit_bundle(entries, self.config.relay.tip_lamports, &fee_payer)
            .await
        {
            return Err(LaunchError::fail("sell bundle did not land"));
        }
        info!(sellers = count, "Sell bundle landed");
        Ok(())
    }
}
