use crate::config::{Chain, Config, WaitKind};
use crate::err_custom_create;
use crate::err_from;
use crate::error::MonitorError;
use crate::replacement::{ReplacementPolicy, TRANSFER_GAS_LIMIT};
use crate::transaction::TransferParams;
use crate::utils::gwei_to_u256;
use crate::wait::WaitStrategy;
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use web3::transports::Http;
use web3::types::{Address, U256};
use web3::Web3;

pub const DEFAULT_TRANSFER_VALUE: u64 = 2;
pub const DEFAULT_TRANSFER_GAS_LIMIT: u64 = 90000;
pub const DEFAULT_WAIT_BLOCKS: u64 = 2;
pub const DEFAULT_WAIT_DELAY_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_PRICE_BUMP_PERCENT: u64 = 10;
pub const DEFAULT_REPLACEMENT_TIMEOUT_SECS: u64 = 120;

/// Well-known sink the transfers under test are sent to.
pub fn sink_address() -> Address {
    Address::from_low_u64_be(0xdeadbeef)
}

#[derive(Clone, Debug)]
pub struct ProviderSetup {
    pub provider: Web3<Http>,
    pub url: String,
}

/// Values supplied from the command line or environment, taking precedence over the file.
#[derive(Clone, Debug, Default)]
pub struct SetupOverrides {
    pub chain_id: Option<u64>,
    pub rpc_url: Option<String>,
    pub fee_currency: Option<Address>,
    pub wait_strategy: Option<WaitStrategy>,
}

#[derive(Clone, Debug)]
pub struct ChainSetup {
    pub chain_name: String,
    pub chain_id: u64,
    pub providers: Vec<ProviderSetup>,
    pub currency_symbol: String,
    pub transfer: TransferParams,
    pub wait_strategy: WaitStrategy,
    pub replacement: ReplacementPolicy,
    pub price_bump_percent: u64,
}

#[derive(Clone, Debug)]
pub struct MonitorSetup {
    pub chain_setup: BTreeMap<String, ChainSetup>,
}

fn wait_strategy_from_config(chain: &Chain) -> WaitStrategy {
    let poll_interval = Duration::from_millis(
        chain
            .wait
            .as_ref()
            .and_then(|w| w.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    );
    match &chain.wait {
        Some(wait) if wait.strategy == WaitKind::Delay => WaitStrategy::FixedDelay {
            delay: Duration::from_millis(wait.delay_ms.unwrap_or(DEFAULT_WAIT_DELAY_MS)),
        },
        Some(wait) => WaitStrategy::BlockCount {
            blocks: wait.blocks.unwrap_or(DEFAULT_WAIT_BLOCKS),
            poll_interval,
        },
        None => WaitStrategy::BlockCount {
            blocks: DEFAULT_WAIT_BLOCKS,
            poll_interval,
        },
    }
}

fn replacement_from_config(chain: &Chain, poll_interval: Duration) -> ReplacementPolicy {
    let defaults = ReplacementPolicy::default();
    match &chain.replacement {
        Some(r) => ReplacementPolicy {
            priority_fee_bump: U256::from(r.priority_fee_bump),
            gas_limit: r.gas_limit.unwrap_or(TRANSFER_GAS_LIMIT),
            confirmations: r.confirmations.unwrap_or(defaults.confirmations),
            poll_interval,
            timeout: match r.timeout_secs.unwrap_or(DEFAULT_REPLACEMENT_TIMEOUT_SECS) {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        },
        None => ReplacementPolicy {
            poll_interval,
            ..defaults
        },
    }
}

/// Rejected here so a bad policy fails before anything is broadcast.
fn check_replacement_policy(
    chain_name: &str,
    replacement: &ReplacementPolicy,
    wait_strategy: &WaitStrategy,
) -> Result<(), MonitorError> {
    if replacement.priority_fee_bump.is_zero() {
        return Err(err_custom_create!(
            "priority-fee-bump must be positive for chain {}",
            chain_name
        ));
    }
    if replacement.confirmations == 0 {
        return Err(err_custom_create!(
            "Replacement confirmations must be at least 1 for chain {}",
            chain_name
        ));
    }
    // replacement wait may not be shallower than the stall window
    if let WaitStrategy::BlockCount { blocks, .. } = wait_strategy {
        if replacement.confirmations < *blocks {
            return Err(err_custom_create!(
                "Replacement confirmations {} shallower than stall window of {} blocks for chain {}",
                replacement.confirmations,
                blocks,
                chain_name
            ));
        }
    }
    Ok(())
}

impl ChainSetup {
    pub fn new(
        chain_name: &str,
        chain: &Chain,
        overrides: &SetupOverrides,
    ) -> Result<Self, MonitorError> {
        let endpoints = match &overrides.rpc_url {
            Some(url) => vec![url.clone()],
            None => chain.rpc_endpoints.clone(),
        };
        let mut providers = Vec::new();
        for endp in &endpoints {
            let Ok(transport) = web3::transports::Http::new(endp) else {
                return Err(err_custom_create!("Failed to create transport for endpoint: {}", endp));
            };
            providers.push(ProviderSetup {
                provider: Web3::new(transport),
                url: endp.clone(),
            });
        }
        if providers.is_empty() {
            return Err(err_custom_create!(
                "No rpc endpoints configured for chain {}",
                chain_name
            ));
        }

        let wait_strategy = overrides
            .wait_strategy
            .clone()
            .unwrap_or_else(|| wait_strategy_from_config(chain));
        let poll_interval = match &wait_strategy {
            WaitStrategy::BlockCount { poll_interval, .. } => *poll_interval,
            WaitStrategy::FixedDelay { .. } => Duration::from_millis(
                chain
                    .wait
                    .as_ref()
                    .and_then(|w| w.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        };

        let max_fee_per_gas = chain
            .max_fee_per_gas
            .map(gwei_to_u256)
            .transpose()
            .map_err(err_from!())?;
        let transfer = TransferParams {
            to: chain.sink_address.unwrap_or_else(sink_address),
            value: U256::from(
                chain
                    .transfer
                    .as_ref()
                    .map(|t| t.value)
                    .unwrap_or(DEFAULT_TRANSFER_VALUE),
            ),
            gas_limit: chain
                .transfer
                .as_ref()
                .map(|t| t.gas_limit)
                .unwrap_or(DEFAULT_TRANSFER_GAS_LIMIT),
            fee_currency: overrides.fee_currency.or(chain.fee_currency),
            max_fee_per_gas,
            max_priority_fee_per_gas: gwei_to_u256(chain.priority_fee).map_err(err_from!())?,
            nonce: None,
            data: vec![],
        };

        let replacement = replacement_from_config(chain, poll_interval);
        check_replacement_policy(chain_name, &replacement, &wait_strategy)?;

        Ok(ChainSetup {
            chain_name: chain_name.to_string(),
            chain_id: overrides.chain_id.unwrap_or(chain.network_id),
            providers,
            currency_symbol: chain
                .currency_symbol
                .clone()
                .unwrap_or_else(|| "CELO".to_string()),
            transfer,
            replacement,
            wait_strategy,
            price_bump_percent: chain
                .price_bump_percent
                .unwrap_or(DEFAULT_PRICE_BUMP_PERCENT),
        })
    }

    pub fn get_provider(&self) -> Result<&Web3<Http>, MonitorError> {
        let mut rng = rand::thread_rng();
        let provider = self
            .providers
            .get(rng.gen_range(0..self.providers.len()))
            .ok_or_else(|| {
                err_custom_create!("No providers found for chain: {}", self.chain_name)
            })?;
        log::debug!("Using provider {}", provider.url);
        Ok(&provider.provider)
    }
}

impl MonitorSetup {
    /// Only `selected_chain` receives the overrides.
    pub fn new(
        config: &Config,
        selected_chain: &str,
        overrides: &SetupOverrides,
    ) -> Result<Self, MonitorError> {
        let mut ms = MonitorSetup {
            chain_setup: BTreeMap::new(),
        };
        let no_overrides = SetupOverrides::default();
        for (name, chain) in &config.chain {
            let chain_overrides = if name == selected_chain {
                overrides
            } else {
                &no_overrides
            };
            ms.chain_setup
                .insert(name.clone(), ChainSetup::new(name, chain, chain_overrides)?);
        }
        ms.get_chain_setup(selected_chain)?;
        Ok(ms)
    }

    pub fn get_chain_setup(&self, chain_name: &str) -> Result<&ChainSetup, MonitorError> {
        self.chain_setup
            .get(chain_name)
            .ok_or_else(|| err_custom_create!("No chain setup for chain: {}", chain_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_setup_defaults() {
        let config = Config::dev(1337);
        let setup = MonitorSetup::new(&config, "dev", &SetupOverrides::default()).unwrap();
        let chain = setup.get_chain_setup("dev").unwrap();
        assert_eq!(chain.chain_id, 1337);
        assert_eq!(chain.transfer.to, sink_address());
        assert_eq!(chain.transfer.value, U256::from(2));
        assert_eq!(chain.transfer.gas_limit, 90000);
        assert_eq!(
            chain.transfer.max_fee_per_gas,
            Some(U256::from(2_000_000_000u64))
        );
        assert_eq!(chain.transfer.max_priority_fee_per_gas, U256::zero());
        assert_eq!(
            chain.wait_strategy,
            WaitStrategy::BlockCount {
                blocks: 2,
                poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
            }
        );
        assert_eq!(chain.replacement.priority_fee_bump, U256::from(1000));
        assert_eq!(chain.replacement.confirmations, 2);
        assert_eq!(chain.price_bump_percent, 10);
        assert!(chain.get_provider().is_ok());
    }

    #[test]
    fn test_overrides_apply() {
        let config = Config::dev(1337);
        let overrides = SetupOverrides {
            chain_id: Some(99),
            rpc_url: Some("http://10.0.0.1:8545".to_string()),
            fee_currency: Some(Address::from_low_u64_be(0xfee)),
            wait_strategy: Some(WaitStrategy::FixedDelay {
                delay: Duration::from_millis(1500),
            }),
        };
        let setup = MonitorSetup::new(&config, "dev", &overrides).unwrap();
        let chain = setup.get_chain_setup("dev").unwrap();
        assert_eq!(chain.chain_id, 99);
        assert_eq!(chain.providers.len(), 1);
        assert_eq!(chain.providers[0].url, "http://10.0.0.1:8545");
        assert_eq!(chain.transfer.fee_currency, overrides.fee_currency);
        assert_eq!(
            chain.wait_strategy,
            WaitStrategy::FixedDelay {
                delay: Duration::from_millis(1500)
            }
        );
    }

    #[test]
    fn test_unknown_chain() {
        let config = Config::dev(1337);
        assert!(MonitorSetup::new(&config, "mainnet", &SetupOverrides::default()).is_err());
    }

    #[test]
    fn test_replacement_timeout_zero_means_unbounded() {
        let config = Config::parse(
            r#"
[chain.dev]
network-id = 1337
rpc-endpoints = ["http://127.0.0.1:8545"]
priority-fee = 0.0

[chain.dev.replacement]
priority-fee-bump = 5000
timeout-secs = 0
"#,
        )
        .unwrap();
        let setup = MonitorSetup::new(&config, "dev", &SetupOverrides::default()).unwrap();
        let chain = setup.get_chain_setup("dev").unwrap();
        assert_eq!(chain.replacement.timeout, None);
        assert_eq!(chain.replacement.priority_fee_bump, U256::from(5000));
        assert_eq!(chain.transfer.max_fee_per_gas, None);
    }

    fn parse_dev(extra: &str) -> Config {
        Config::parse(&format!(
            r#"
[chain.dev]
network-id = 1337
rpc-endpoints = ["http://127.0.0.1:8545"]
priority-fee = 0.0
{}
"#,
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_zero_fee_bump_rejected_at_setup() {
        let config = parse_dev(
            r#"
[chain.dev.replacement]
priority-fee-bump = 0
"#,
        );
        let err = MonitorSetup::new(&config, "dev", &SetupOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("priority-fee-bump must be positive"));
    }

    #[test]
    fn test_shallow_replacement_wait_rejected() {
        let config = parse_dev(
            r#"
[chain.dev.wait]
strategy = "blocks"
blocks = 3

[chain.dev.replacement]
priority-fee-bump = 1000
confirmations = 1
"#,
        );
        let err = MonitorSetup::new(&config, "dev", &SetupOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("shallower than stall window"));
    }

    #[test]
    fn test_wait_blocks_override_checked_against_confirmations() {
        let overrides = SetupOverrides {
            wait_strategy: Some(WaitStrategy::BlockCount {
                blocks: 5,
                poll_interval: Duration::from_millis(1),
            }),
            ..Default::default()
        };
        assert!(MonitorSetup::new(&Config::dev(1337), "dev", &overrides).is_err());

        let overrides = SetupOverrides {
            wait_strategy: Some(WaitStrategy::FixedDelay {
                delay: Duration::from_millis(1),
            }),
            ..Default::default()
        };
        assert!(MonitorSetup::new(&Config::dev(1337), "dev", &overrides).is_ok());
    }
}
