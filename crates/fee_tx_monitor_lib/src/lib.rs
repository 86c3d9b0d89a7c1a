pub mod cip64;
pub mod config;
pub mod error;
pub mod eth;
pub mod model;
pub mod node;
pub mod outcome;
pub mod price_bump;
pub mod process;
pub mod replacement;
pub mod setup;
pub mod signer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transaction;
pub mod utils;
pub mod wait;
