//! Launch stages: token, OpenBook market, pool with bundled buys, sell

pub mod market;
pub mod pipeline;
pub mod swap;
pub mod token;

pub use market::{create_openbook_market, MarketAddresses};
pub use pipeline::{LaunchReport, Launcher};
pub use token::create_token;
