use thiserror::Error;
use web3::ethabi::ethereum_types::FromDecStrErr;
use web3::types::H256;

use super::custom::{CustomError, RejectedError, ReplacementUnderpricedError};

#[derive(Error, Debug)]
pub enum ErrorBag {
    #[error("Hex conversion error: {0}")]
    HexError(#[from] rustc_hex::FromHexError),
    #[error("Dec conversion error: {0}")]
    DecError(#[from] FromDecStrErr),
    #[error("conversion error: {0}")]
    ConversionError(#[from] crate::utils::ConversionError),
    #[error("web3 error: {0}")]
    Web3Error(#[from] web3::Error),
    #[error("secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
    #[error("json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    Rejected(#[from] RejectedError),
    #[error("{0}")]
    ReplacementUnderpriced(#[from] ReplacementUnderpricedError),
    #[error("Replacement transaction {tx_hash:#x} not confirmed after {waited_secs}s")]
    ReplacementNotConfirmed { tx_hash: H256, waited_secs: u64 },
    #[error("{0}")]
    CustomError(#[from] CustomError),
}
