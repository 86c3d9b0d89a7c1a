use serde::Deserialize;
use std::collections::btree_map::BTreeMap as Map;

use std::fs;
use std::path::Path;

use crate::err_from;
use crate::error::MonitorError;
use web3::types::Address;

pub const DEFAULT_RPC_ENDPOINT: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CHAIN_NAME: &str = "dev";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub chain: Map<String, Chain>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub network_id: u64,
    pub rpc_endpoints: Vec<String>,
    pub currency_symbol: Option<String>,
    /// gwei
    pub priority_fee: f64,
    /// gwei, estimated from the base fee when absent
    pub max_fee_per_gas: Option<f64>,
    pub sink_address: Option<Address>,
    pub fee_currency: Option<Address>,
    pub price_bump_percent: Option<u64>,
    pub transfer: Option<TransferSettings>,
    pub wait: Option<WaitSettings>,
    pub replacement: Option<ReplacementSettings>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TransferSettings {
    /// wei
    pub value: u64,
    pub gas_limit: u64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WaitKind {
    Blocks,
    Delay,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct WaitSettings {
    pub strategy: WaitKind,
    pub blocks: Option<u64>,
    pub delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ReplacementSettings {
    /// wei
    pub priority_fee_bump: u64,
    pub gas_limit: Option<u64>,
    pub confirmations: Option<u64>,
    /// 0 - no limit
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MonitorError> {
        let content = fs::read(path).map_err(err_from!())?;
        toml::from_slice(&content).map_err(err_from!())
    }

    pub fn parse(content: &str) -> Result<Self, MonitorError> {
        toml::from_str(content).map_err(err_from!())
    }

    /// Local dev chain with every setting at its default.
    pub fn dev(network_id: u64) -> Self {
        let mut chain = Map::new();
        chain.insert(
            DEFAULT_CHAIN_NAME.to_string(),
            Chain {
                network_id,
                rpc_endpoints: vec![DEFAULT_RPC_ENDPOINT.to_string()],
                currency_symbol: None,
                priority_fee: 0.0,
                max_fee_per_gas: Some(2.0),
                sink_address: None,
                fee_currency: None,
                price_bump_percent: None,
                transfer: None,
                wait: None,
                replacement: None,
            },
        );
        Config { chain }
    }
}
