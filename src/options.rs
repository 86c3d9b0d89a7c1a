use fee_tx_monitor_lib::{err_create, err_custom_create};
use fee_tx_monitor_lib::error::MonitorError;
use fee_tx_monitor_lib::eth::load_private_key;
use fee_tx_monitor_lib::price_bump::FeeCap;
use fee_tx_monitor_lib::setup::SetupOverrides;
use fee_tx_monitor_lib::wait::WaitStrategy;
use secp256k1::SecretKey;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;
use web3::types::{Address, U256};

pub const DEFAULT_CONFIG_FILE: &str = "config-monitor.toml";

#[derive(Debug, StructOpt)]
struct ChainOptions {
    #[structopt(long = "config", help = "Config file, built-in dev chain defaults when missing")]
    config: Option<String>,

    #[structopt(long = "chain-name", help = "Chain section of the config, defaults to $NETWORK or dev")]
    chain_name: Option<String>,

    #[structopt(long = "rpc-url", help = "Overrides configured endpoints, defaults to $ETH_RPC_URL")]
    rpc_url: Option<String>,
}

#[derive(Debug, StructOpt)]
struct SendOptions {
    #[structopt(help = "Chain id used for signing")]
    chain_id: u64,

    #[structopt(help = "Private key, defaults to $ETH_PRIVATE_KEY or $ACC_PRIVKEY")]
    private_key: Option<String>,

    #[structopt(help = "Fee currency token address, defaults to $FEE_CURRENCY")]
    fee_currency: Option<String>,

    #[structopt(flatten)]
    chain: ChainOptions,

    #[structopt(long = "wait-blocks", help = "Blocks to wait before declaring a stall")]
    wait_blocks: Option<u64>,

    #[structopt(
        long = "wait-delay-ms",
        help = "Fixed delay before declaring a stall, for instant-mining chains"
    )]
    wait_delay_ms: Option<u64>,
}

#[derive(Debug, StructOpt)]
struct PriceBumpOptions {
    #[structopt(long = "chain-id")]
    chain_id: Option<u64>,

    #[structopt(long = "private-key")]
    private_key: Option<String>,

    #[structopt(flatten)]
    chain: ChainOptions,

    #[structopt(long = "first-cap", help = "Fee cap of the first transaction, wei")]
    first_cap: String,

    #[structopt(long = "first-currency")]
    first_currency: Option<String>,

    #[structopt(long = "second-cap", help = "Fee cap of the competing transaction, wei")]
    second_cap: String,

    #[structopt(long = "second-currency")]
    second_currency: Option<String>,

    #[structopt(long = "should-replace", help = "Second transaction is expected to win")]
    should_replace: bool,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "send_tx",
    about = "Sends a transaction and replaces it at the same nonce when it stalls"
)]
enum CliOptions {
    /// Send one transfer and print the verdict.
    #[structopt(name = "send")]
    Send(SendOptions),
    /// Offer two transactions at one nonce and check the replacement rule.
    #[structopt(name = "price-bump")]
    PriceBump(PriceBumpOptions),
}

pub enum Command {
    Send,
    PriceBump {
        first: FeeCap,
        second: FeeCap,
        should_replace: bool,
    },
}

pub struct ValidatedOptions {
    pub command: Command,
    pub config_path: Option<String>,
    pub chain_name: String,
    pub chain_id: Option<u64>,
    pub private_key: SecretKey,
    pub overrides: SetupOverrides,
}

fn parse_address(value: &str, what: &str) -> Result<Address, MonitorError> {
    Address::from_str(value.trim_start_matches("0x")).map_err(|e| {
        log::error!("Invalid {} when parsing input: {}", what, value);
        err_create!(e)
    })
}

fn parse_wei(value: &str, what: &str) -> Result<U256, MonitorError> {
    U256::from_dec_str(value).map_err(|e| {
        log::error!("Invalid {} when parsing input: {}", what, value);
        err_create!(e)
    })
}

fn private_key_or_env(private_key: Option<String>) -> Result<SecretKey, MonitorError> {
    let key = private_key
        .or_else(|| env::var("ETH_PRIVATE_KEY").ok())
        .or_else(|| env::var("ACC_PRIVKEY").ok())
        .ok_or_else(|| {
            err_custom_create!("No private key given and neither ETH_PRIVATE_KEY nor ACC_PRIVKEY set")
        })?;
    load_private_key(&key)
}

fn chain_name_or_env(chain: &ChainOptions) -> String {
    chain
        .chain_name
        .clone()
        .or_else(|| env::var("NETWORK").ok())
        .unwrap_or_else(|| fee_tx_monitor_lib::config::DEFAULT_CHAIN_NAME.to_string())
}

fn rpc_url_or_env(chain: &ChainOptions) -> Option<String> {
    chain
        .rpc_url
        .clone()
        .or_else(|| env::var("ETH_RPC_URL").ok())
}

pub fn validated_cli() -> Result<ValidatedOptions, MonitorError> {
    let opt: CliOptions = CliOptions::from_args();
    match opt {
        CliOptions::Send(send_options) => {
            if send_options.wait_blocks.is_some() && send_options.wait_delay_ms.is_some() {
                return Err(err_custom_create!(
                    "Can't specify both wait-blocks and wait-delay-ms"
                ));
            }
            let wait_strategy = match (send_options.wait_blocks, send_options.wait_delay_ms) {
                (Some(blocks), _) => Some(WaitStrategy::BlockCount {
                    blocks,
                    poll_interval: Duration::from_millis(
                        fee_tx_monitor_lib::setup::DEFAULT_POLL_INTERVAL_MS,
                    ),
                }),
                (None, Some(delay_ms)) => Some(WaitStrategy::FixedDelay {
                    delay: Duration::from_millis(delay_ms),
                }),
                (None, None) => None,
            };
            let fee_currency = send_options
                .fee_currency
                .or_else(|| env::var("FEE_CURRENCY").ok())
                .filter(|s| !s.is_empty())
                .map(|s| parse_address(&s, "fee currency"))
                .transpose()?;

            Ok(ValidatedOptions {
                command: Command::Send,
                config_path: send_options.chain.config.clone(),
                chain_name: chain_name_or_env(&send_options.chain),
                chain_id: Some(send_options.chain_id),
                private_key: private_key_or_env(send_options.private_key)?,
                overrides: SetupOverrides {
                    chain_id: Some(send_options.chain_id),
                    rpc_url: rpc_url_or_env(&send_options.chain),
                    fee_currency,
                    wait_strategy,
                },
            })
        }
        CliOptions::PriceBump(bump_options) => {
            let first = FeeCap {
                cap: parse_wei(&bump_options.first_cap, "first cap")?,
                fee_currency: bump_options
                    .first_currency
                    .map(|s| parse_address(&s, "first currency"))
                    .transpose()?,
            };
            let second = FeeCap {
                cap: parse_wei(&bump_options.second_cap, "second cap")?,
                fee_currency: bump_options
                    .second_currency
                    .map(|s| parse_address(&s, "second currency"))
                    .transpose()?,
            };
            Ok(ValidatedOptions {
                command: Command::PriceBump {
                    first,
                    second,
                    should_replace: bump_options.should_replace,
                },
                config_path: bump_options.chain.config.clone(),
                chain_name: chain_name_or_env(&bump_options.chain),
                chain_id: bump_options.chain_id,
                private_key: private_key_or_env(bump_options.private_key)?,
                overrides: SetupOverrides {
                    chain_id: bump_options.chain_id,
                    rpc_url: rpc_url_or_env(&bump_options.chain),
                    fee_currency: None,
                    wait_strategy: None,
                },
            })
        }
    }
}
