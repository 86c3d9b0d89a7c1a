use chrono::{DateTime, Utc};
use std::io::Write;
use uuid::Uuid;

use crate::error::MonitorError;
use crate::model::{MonitorState, Outcome, TxReceipt, TxRequest};
use crate::node::NodeClient;
use crate::outcome::OutcomeReporter;
use crate::replacement::create_replacement;
use crate::setup::ChainSetup;
use crate::signer::TransactionSigner;
use crate::transaction::{create_transfer, TransferParams};
use crate::wait::{wait_for_confirmations, WaitResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessTransactionResult {
    /// Original transaction mined within the wait window.
    Confirmed,
    /// Original stalled; a replacement at the same nonce was mined instead.
    Replaced,
    /// Node refused the original, or the replacement, at broadcast.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub run_id: Uuid,
    pub result: ProcessTransactionResult,
    pub outcome: Outcome,
    /// Receipt of whichever transaction ended up mined.
    pub receipt: Option<TxReceipt>,
    pub original: TxRequest,
    pub replacement: Option<TxRequest>,
    pub trace: Vec<MonitorState>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

struct Lifecycle {
    run_id: Uuid,
    trace: Vec<MonitorState>,
}

impl Lifecycle {
    fn new(run_id: Uuid) -> Self {
        log::info!("[{}] Entering {}", run_id, MonitorState::Building);
        Lifecycle {
            run_id,
            trace: vec![MonitorState::Building],
        }
    }

    fn enter(&mut self, state: MonitorState) {
        log::info!(
            "[{}] {} -> {}",
            self.run_id,
            self.trace.last().copied().unwrap_or(MonitorState::Building),
            state
        );
        self.trace.push(state);
    }
}

/// Node refusals end the run with the refusal attached to the verdict.
fn report_rejection<W: Write>(
    mut lifecycle: Lifecycle,
    reporter: OutcomeReporter<W>,
    err: &MonitorError,
    original: TxRequest,
    replacement: Option<TxRequest>,
    started: DateTime<Utc>,
) -> Result<(MonitorReport, W), MonitorError> {
    lifecycle.enter(MonitorState::Rejected);
    let outcome = Outcome::rejected(
        err.rejection_payload()
            .unwrap_or_else(|| serde_json::Value::String(err.to_string())),
    );
    let writer = reporter.report(&outcome)?;
    lifecycle.enter(MonitorState::Done);
    Ok((
        MonitorReport {
            run_id: lifecycle.run_id,
            result: ProcessTransactionResult::Rejected,
            outcome,
            receipt: None,
            original,
            replacement,
            trace: lifecycle.trace,
            started,
            finished: Utc::now(),
        },
        writer,
    ))
}

/// Submits one transfer and follows it to a verdict.
///
/// A stall leads to exactly one same-nonce replacement. The verdict is handed to
/// `reporter` once, on every non-fatal path, including a node refusing the
/// replacement. Transport failures abort the run without a verdict.
pub async fn process_transaction<N, S, W>(
    node: &N,
    signer: &S,
    chain_setup: &ChainSetup,
    params: &TransferParams,
    reporter: OutcomeReporter<W>,
) -> Result<(MonitorReport, W), MonitorError>
where
    N: NodeClient + ?Sized,
    S: TransactionSigner + ?Sized,
    W: Write,
{
    let run_id = Uuid::new_v4();
    let started = Utc::now();
    let mut lifecycle = Lifecycle::new(run_id);
    let account = signer.address();

    let original = create_transfer(node, account, chain_setup.chain_id, params).await?;
    log::info!(
        "[{}] Built transfer to {:#x}, value {}, nonce {}, fee currency {:?}",
        run_id,
        original.to,
        original.value,
        original.nonce,
        original.fee_currency
    );
    let signed = signer.sign(&original).await?;
    lifecycle.enter(MonitorState::Signed);

    let tx_hash = match node.submit_raw_transaction(&signed).await {
        Ok(tx_hash) => tx_hash,
        Err(err) if err.is_rejection() => {
            log::warn!("[{}] Transaction rejected by node: {}", run_id, err);
            return report_rejection(lifecycle, reporter, &err, original, None, started);
        }
        Err(err) => return Err(err),
    };
    if tx_hash != signed.tx_hash {
        log::warn!(
            "[{}] Node returned hash {:#x}, signed hash was {:#x}",
            run_id,
            tx_hash,
            signed.tx_hash
        );
    }
    lifecycle.enter(MonitorState::Submitted);
    log::info!(
        "[{}] Transaction sent, tx hash: {:#x}, nonce {}",
        run_id,
        tx_hash,
        original.nonce
    );

    let (result, receipt, replacement) = match chain_setup
        .wait_strategy
        .wait_for_receipt(node, tx_hash)
        .await?
    {
        WaitResult::Receipt(receipt) => {
            lifecycle.enter(MonitorState::Confirmed);
            log::info!(
                "[{}] Receipt found: tx_hash {:#x} in block {}",
                run_id,
                tx_hash,
                receipt.block_number
            );
            (ProcessTransactionResult::Confirmed, receipt, None)
        }
        WaitResult::Stalled => {
            lifecycle.enter(MonitorState::Stalled);
            log::warn!(
                "[{}] No receipt for {:#x} within {:?}, replacing nonce {}",
                run_id,
                tx_hash,
                chain_setup.wait_strategy,
                original.nonce
            );
            lifecycle.enter(MonitorState::Replacing);
            let replacement = create_replacement(&original, account, &chain_setup.replacement)?;
            let signed_replacement = signer.sign(&replacement).await?;
            let replacement_hash = match node.submit_raw_transaction(&signed_replacement).await {
                Ok(hash) => hash,
                Err(err) if err.is_rejection() => {
                    log::warn!("[{}] Replacement rejected by node: {}", run_id, err);
                    return report_rejection(
                        lifecycle,
                        reporter,
                        &err,
                        original,
                        Some(replacement),
                        started,
                    );
                }
                Err(err) => return Err(err),
            };
            lifecycle.enter(MonitorState::Resubmitted);
            log::info!(
                "[{}] Replacement sent, tx hash: {:#x}, priority fee {} -> {}",
                run_id,
                replacement_hash,
                original.max_priority_fee_per_gas,
                replacement.max_priority_fee_per_gas
            );
            let receipt = wait_for_confirmations(
                node,
                replacement_hash,
                chain_setup.replacement.confirmations,
                chain_setup.replacement.poll_interval,
                chain_setup.replacement.timeout,
            )
            .await?;
            lifecycle.enter(MonitorState::Confirmed);
            (ProcessTransactionResult::Replaced, receipt, Some(replacement))
        }
    };
    if !receipt.succeeded() {
        log::warn!(
            "[{}] Mined transaction {:#x} has status {:?}",
            run_id,
            receipt.tx_hash,
            receipt.status
        );
    }

    let outcome = match result {
        ProcessTransactionResult::Confirmed => Outcome::confirmed(),
        _ => Outcome::replaced(),
    };
    let writer = reporter.report(&outcome)?;
    lifecycle.enter(MonitorState::Done);
    Ok((
        MonitorReport {
            run_id,
            result,
            outcome,
            receipt: Some(receipt),
            original,
            replacement,
            trace: lifecycle.trace,
            started,
            finished: Utc::now(),
        },
        writer,
    ))
}
