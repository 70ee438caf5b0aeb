//! On-chain program instruction builders

pub mod metadata;
pub mod openbook;
pub mod raydium;
