use std::time::Duration;
use web3::types::H256;

use crate::error::{ErrorBag, MonitorError};
use crate::model::TxReceipt;
use crate::node::NodeClient;

/// How long to give a freshly submitted transaction before calling it stalled.
///
/// Both strategies end in exactly one receipt lookup; retrying past that is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Wait until `blocks` new blocks are observed, polling the head every `poll_interval`.
    BlockCount { blocks: u64, poll_interval: Duration },
    /// Sleep once. Meant for instant-mining dev chains.
    FixedDelay { delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    Receipt(TxReceipt),
    Stalled,
}

impl WaitStrategy {
    pub async fn wait_for_receipt<N: NodeClient + ?Sized>(
        &self,
        node: &N,
        tx_hash: H256,
    ) -> Result<WaitResult, MonitorError> {
        match self {
            WaitStrategy::BlockCount {
                blocks,
                poll_interval,
            } => {
                let start = node.block_number().await?;
                let target = start + blocks;
                log::debug!(
                    "Waiting for block {} (started at {}) before checking {:#x}",
                    target,
                    start,
                    tx_hash
                );
                loop {
                    let current = node.block_number().await?;
                    if current >= target {
                        break;
                    }
                    tokio::time::sleep(*poll_interval).await;
                }
            }
            WaitStrategy::FixedDelay { delay } => {
                log::debug!("Sleeping {:?} before checking {:#x}", delay, tx_hash);
                tokio::time::sleep(*delay).await;
            }
        }
        match node.transaction_receipt(tx_hash).await? {
            Some(receipt) => Ok(WaitResult::Receipt(receipt)),
            None => Ok(WaitResult::Stalled),
        }
    }
}

/// Polls until the receipt is `confirmations` blocks deep (the mining block counts as one).
///
/// Gives up with [`ErrorBag::ReplacementNotConfirmed`] once `timeout` has passed.
pub async fn wait_for_confirmations<N: NodeClient + ?Sized>(
    node: &N,
    tx_hash: H256,
    confirmations: u64,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<TxReceipt, MonitorError> {
    let started = tokio::time::Instant::now();
    loop {
        if let Some(receipt) = node.transaction_receipt(tx_hash).await? {
            let current = node.block_number().await?;
            let depth = (current + 1).saturating_sub(receipt.block_number);
            if depth >= confirmations {
                return Ok(receipt);
            }
            log::info!(
                "Waiting for confirmations: tx {:#x}. Current block {}, expected at least: {}",
                tx_hash,
                current,
                receipt.block_number + confirmations - 1
            );
        } else {
            log::debug!("Receipt not found yet: {:#x}", tx_hash);
        }
        if let Some(timeout) = timeout {
            if started.elapsed() >= timeout {
                return Err(crate::err_create!(ErrorBag::ReplacementNotConfirmed {
                    tx_hash,
                    waited_secs: started.elapsed().as_secs(),
                }));
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}
