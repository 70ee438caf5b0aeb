//! SPL token creation: mint, Metaplex metadata, full supply to the owner

use crate::{
    config::TokenParams,
    dex::metadata::create_metadata_account_v3,
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
    pool::amm::ui_to_raw,
    tx_helper::{build_v0_transaction, send_and_confirm_with_check},
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::solana_program::program_pack::Pack;
use tracing::{info, instrument};

/// Inputs checked before anything touches the ledger
struct ValidatedToken<'a> {
    metadata_uri: &'a str,
    supply_raw: u64,
}

fn validate(params: &TokenParams) -> LaunchResult<ValidatedToken<'_>> {
    if params.name.trim().is_empty() || params.symbol.trim().is_empty() {
        return Err(LaunchError::invalid("token name and symbol are required"));
    }
    if params.decimals == 0 {
        return Err(LaunchError::invalid("token decimals must be positive"));
    }
    if params.total_supply.is_nan() || params.total_supply <= 0.0 {
        return Err(LaunchError::invalid("token total supply must be positive"));
    }
    let metadata_uri = params
        .metadata_uri
        .as_deref()
        .filter(|uri| !uri.trim().is_empty())
        .ok_or_else(|| LaunchError::invalid("a hosted metadata URI is required"))?;

    Ok(ValidatedToken {
        metadata_uri,
        supply_raw: ui_to_raw(params.total_supply, params.decimals),
    })
}

/// Create a new token owned by `owner` and mint the whole supply to them
///
/// The owner is both mint and freeze authority. Returns the mint address.
#[instrument(skip_all, fields(symbol = %params.symbol))]
pub async fn create_token(
    ledger: &dyn LedgerClient,
    owner: &Keypair,
    params: &TokenParams,
) -> LaunchResult<Pubkey> {
    let token = validate(params)?;
    let owner_key = owner.pubkey();
    let mint = Keypair::new();
    let mint_key = mint.pubkey();

    let rent = ledger
        .minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
        .await?;
    let create_mint = vec![
        system_instruction::create_account(
            &owner_key,
            &mint_key,
            rent,
            spl_token::state::Mint::LEN as u64,
            &spl_token::id(),
        ),
        spl_token::instruction::initialize_mint(
            &spl_token::id(),
            &mint_key,
            &owner_key,
            Some(&owner_key),
            params.decimals,
        )
        .map_err(|e| LaunchError::fail(format!("initialize_mint: {}", e)))?,
    ];
    let tx = build_v0_transaction(&owner_key, &create_mint, Hash::default())?;
    send_and_confirm_with_check(ledger, tx, &[owner, &mint]).await?;
    info!(mint = %mint_key, decimals = params.decimals, "Mint created");

    let metadata = create_metadata_account_v3(
        &mint_key,
        &owner_key,
        &owner_key,
        &owner_key,
        &params.name,
        &params.symbol,
        token.metadata_uri,
    );
    let tx = build_v0_transaction(&owner_key, &[metadata], Hash::default())
        .map_err(|e| LaunchError::CreateMetaFailed(e.to_string()))?;
    send_and_confirm_with_check(ledger, tx, &[owner])
        .await
        .map_err(|e| LaunchError::CreateMetaFailed(e.to_string()))?;
    info!(mint = %mint_key, uri = token.metadata_uri, "Metadata created");

    let owner_ata = get_associated_token_address(&owner_key, &mint_key);
    let mint_supply = spl_token::instruction::mint_to(
        &spl_token::id(),
        &mint_key,
        &owner_ata,
        &owner_key,
        &[],
        token.supply_raw,
    )
    .map_err(|e| LaunchError::TotalMintFailed(e.to_string()))?;
    let ixs = vec![
        create_associated_token_account_idempotent(&owner_key, &owner_key, &mint_key, &spl_token::id()),
        mint_supply,
    ];
    let tx = build_v0_transaction(&owner_key, &ixs, Hash::default())
        .map_err(|e| LaunchError::TotalMintFailed(e.to_string()))?;
    send_and_confirm_with_check(ledger, tx, &[owner])
        .await
        .map_err(|e| LaunchError::TotalMintFailed(e.to_string()))?;
    info!(mint = %mint_key, supply = token.supply_raw, "Total supply minted");

    Ok(mint_key)
}
