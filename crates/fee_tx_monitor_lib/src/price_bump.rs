use web3::types::{Address, H256, U256};

use crate::err_custom_create;
use crate::error::MonitorError;
use crate::model::TxRequest;
use crate::node::NodeClient;
use crate::replacement::min_replacement_cap;
use crate::setup::ChainSetup;
use crate::signer::TransactionSigner;
use crate::wait::wait_for_confirmations;

const COMPETING_GAS_LIMIT: u64 = 171000;
const BARRIER_GAS_LIMIT: u64 = 22000;

/// Fee cap of one competing transaction, used as both max fee and tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeCap {
    pub cap: U256,
    pub fee_currency: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBumpVerdict {
    /// Transaction that ended up mined at the contested nonce.
    pub mined: H256,
    pub first: H256,
    pub second: Option<H256>,
    pub replaced: bool,
}

fn transfer_at(
    from: Address,
    chain_setup: &ChainSetup,
    nonce: u64,
    value: u64,
    gas_limit: u64,
    fee: &FeeCap,
) -> TxRequest {
    TxRequest {
        from,
        to: chain_setup.transfer.to,
        value: U256::from(value),
        gas_limit,
        max_fee_per_gas: fee.cap,
        max_priority_fee_per_gas: fee.cap,
        fee_currency: fee.fee_currency,
        nonce,
        chain_id: chain_setup.chain_id,
        data: vec![],
    }
}

/// Races two transactions for one nonce and checks the pool's replacement rule.
///
/// The contested nonce sits behind a barrier transaction that is only sent at the
/// end, so neither competitor can be mined before both were offered. When
/// `should_replace` is false the second submission has to fail as underpriced and
/// the first one has to be mined.
pub async fn verify_price_bump<N, S>(
    node: &N,
    signer: &S,
    chain_setup: &ChainSetup,
    first: &FeeCap,
    second: &FeeCap,
    should_replace: bool,
) -> Result<PriceBumpVerdict, MonitorError>
where
    N: NodeClient + ?Sized,
    S: TransactionSigner + ?Sized,
{
    let account = signer.address();
    let required_cap = min_replacement_cap(first.cap, chain_setup.price_bump_percent);
    log::info!(
        "Second cap {} against required {} ({}% bump), replacement expected: {}",
        second.cap,
        required_cap,
        chain_setup.price_bump_percent,
        should_replace
    );
    if (second.cap >= required_cap) != should_replace {
        log::warn!(
            "Expectation disagrees with the configured {}% bump rule",
            chain_setup.price_bump_percent
        );
    }
    let barrier_nonce = node.transaction_count(account, true).await?;
    let contested_nonce = barrier_nonce + 1;
    let barrier_fee = FeeCap {
        cap: chain_setup
            .transfer
            .max_fee_per_gas
            .unwrap_or(first.cap),
        fee_currency: None,
    };
    let barrier = transfer_at(
        account,
        chain_setup,
        barrier_nonce,
        2,
        BARRIER_GAS_LIMIT,
        &barrier_fee,
    );

    let first_tx = transfer_at(account, chain_setup, contested_nonce, 2, COMPETING_GAS_LIMIT, first);
    let first_hash = node
        .submit_raw_transaction(&signer.sign(&first_tx).await?)
        .await?;
    log::info!(
        "First transaction {:#x} at nonce {} with cap {}",
        first_hash,
        contested_nonce,
        first.cap
    );

    let second_tx = transfer_at(account, chain_setup, contested_nonce, 3, COMPETING_GAS_LIMIT, second);
    let second_hash = match node
        .submit_raw_transaction(&signer.sign(&second_tx).await?)
        .await
    {
        Ok(hash) => {
            if !should_replace {
                return Err(err_custom_create!(
                    "Replacement {:#x} with cap {} was accepted, expected underpriced",
                    hash,
                    second.cap
                ));
            }
            log::info!("Second transaction {:#x} replaced the first one", hash);
            Some(hash)
        }
        Err(err) if err.is_replacement_underpriced() && !should_replace => {
            log::info!("Second transaction refused as expected: {}", err);
            None
        }
        Err(err) => return Err(err),
    };

    let barrier_hash = node
        .submit_raw_transaction(&signer.sign(&barrier).await?)
        .await?;
    let poll_interval = chain_setup.replacement.poll_interval;
    let timeout = chain_setup.replacement.timeout;
    wait_for_confirmations(node, barrier_hash, 1, poll_interval, timeout).await?;

    let mined = match second_hash {
        Some(hash) => hash,
        None => first_hash,
    };
    wait_for_confirmations(node, mined, 1, poll_interval, timeout).await?;
    Ok(PriceBumpVerdict {
        mined,
        first: first_hash,
        second: second_hash,
        replaced: second_hash.is_some(),
    })
}
