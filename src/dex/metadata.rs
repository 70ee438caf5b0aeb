//! Metaplex token metadata (`CreateMetadataAccountV3`)

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program,
};

pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

const CREATE_METADATA_ACCOUNT_V3: u8 = 33;

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .0
}

fn put_string(data: &mut Vec<u8>, value: &str) {
    data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    data.extend_from_slice(value.as_bytes());
}

/// Mutable metadata with no creators, collection or uses
pub fn create_metadata_account_v3(
    mint: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
    update_authority: &Pubkey,
    name: &str,
    symbol: &str,
    uri: &str,
) -> Instruction {
    let mut data = vec![CREATE_METADATA_ACCOUNT_V3];
    put_string(&mut data, name);
    put_string(&mut data, symbol);
    put_string(&mut data, uri);
    data.extend_from_slice(&0u16.to_le_bytes()); // seller fee bps
    data.push(0); // creators: None
    data.push(0); // collection: None
    data.push(0); // uses: None
    data.push(1); // is_mutable
    data.push(0); // collection_details: None

    Instruction {
        program_id: METADATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(metadata_address(mint), false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*mint_authority, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(*update_authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_encoding() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_metadata_account_v3(&mint, &owner, &owner, &owner, "Moon", "MOON", "https://x/y.json");

        let mut expected = vec![33u8, 4, 0, 0, 0];
        expected.extend_from_slice(b"Moon");
        expected.extend_from_slice(&[4, 0, 0, 0]);
        expected.extend_from_slice(b"MOON");
        expected.extend_from_slice(&[16, 0, 0, 0]);
        expected.extend_from_slice(b"https://x/y.json");
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(ix.data, expected);
        assert_eq!(ix.accounts[0].pubkey, metadata_address(&mint));
    }
}
