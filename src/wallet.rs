//! Keypair loading
//!
//! Wallet secrets arrive through the environment in one of three shapes:
//! a base58 secret key, an inline JSON byte array, or a path to a keypair
//! file (raw 64 bytes or JSON array).

use anyhow::{Context, Result};
use solana_sdk::signature::Keypair;
use std::path::Path;

/// Parse a keypair from a base58 secret, inline JSON array or file path
pub fn parse_keypair(raw: &str) -> Result<Keypair> {
    let raw = raw.trim();

    if raw.starts_with('[') {
        let bytes: Vec<u8> =
            serde_json::from_str(raw).context("Failed to parse inline keypair JSON")?;
        return keypair_from_bytes(&bytes);
    }

    if Path::new(raw).is_file() {
        return keypair_from_file(raw);
    }

    let bytes = bs58::decode(raw)
        .into_vec()
        .context("Keypair is neither a file, a JSON array nor base58")?;
    keypair_from_bytes(&bytes)
}

/// Load a keypair file in raw 64-byte or JSON array format
pub fn keypair_from_file(path: impl AsRef<Path>) -> Result<Keypair> {
    let path = path.as_ref();
    let contents = std::fs::read(path)
        .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

    if contents.len() == 64 {
        return keypair_from_bytes(&contents);
    }

    let bytes: Vec<u8> =
        serde_json::from_slice(&contents).context("Failed to parse keypair JSON")?;
    keypair_from_bytes(&bytes)
}

fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != 64 {
        anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
    }
    if bytes.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(bytes).context("Invalid keypair bytes")
}
