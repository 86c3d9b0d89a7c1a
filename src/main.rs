mod options;

use std::path::Path;

use fee_tx_monitor_lib::config::{Config, DEFAULT_CHAIN_NAME};
use fee_tx_monitor_lib::error::MonitorError;
use fee_tx_monitor_lib::node::Web3Node;
use fee_tx_monitor_lib::outcome::OutcomeReporter;
use fee_tx_monitor_lib::price_bump::verify_price_bump;
use fee_tx_monitor_lib::process::process_transaction;
use fee_tx_monitor_lib::setup::MonitorSetup;
use fee_tx_monitor_lib::signer::{SecretKeySigner, TransactionSigner};

use crate::options::{validated_cli, Command, DEFAULT_CONFIG_FILE};

const DEFAULT_DEV_CHAIN_ID: u64 = 1337;

fn load_config(path: Option<&str>, chain_id: Option<u64>) -> Result<Config, MonitorError> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE),
        None => {
            log::info!("No config file, using {} chain defaults", DEFAULT_CHAIN_NAME);
            Ok(Config::dev(chain_id.unwrap_or(DEFAULT_DEV_CHAIN_ID)))
        }
    }
}

async fn main_internal() -> Result<(), MonitorError> {
    if let Err(err) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", err);
    }
    env_logger::init();

    let cli = validated_cli()?;
    let config = load_config(cli.config_path.as_deref(), cli.chain_id)?;
    let setup = MonitorSetup::new(&config, &cli.chain_name, &cli.overrides)?;
    let chain_setup = setup.get_chain_setup(&cli.chain_name)?;
    log::debug!("Monitor setup: {:#?}", chain_setup);

    let web3 = chain_setup.get_provider()?.clone();
    let node = Web3Node::new(web3.clone());
    let signer = SecretKeySigner::new(cli.private_key, web3);
    log::info!(
        "Using account {:#x} on chain {} ({}), native currency {}",
        signer.address(),
        chain_setup.chain_name,
        chain_setup.chain_id,
        chain_setup.currency_symbol
    );

    match cli.command {
        Command::Send => {
            let (report, _) = process_transaction(
                &node,
                &signer,
                chain_setup,
                &chain_setup.transfer,
                OutcomeReporter::stdout(),
            )
            .await?;
            log::info!(
                "Run {} finished as {:?} in {}ms",
                report.run_id,
                report.result,
                (report.finished - report.started).num_milliseconds()
            );
        }
        Command::PriceBump {
            first,
            second,
            should_replace,
        } => {
            let verdict =
                verify_price_bump(&node, &signer, chain_setup, &first, &second, should_replace)
                    .await?;
            println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "replaced": verdict.replaced,
                    "mined": format!("{:#x}", verdict.mined),
                })
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    match main_internal().await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}
