//! Scriptable in-memory node and signer for exercising the monitor without a chain.

use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use web3::types::{Address, Bytes, H256, U256};

use crate::err_create;
use crate::error::{MonitorError, RejectedError, ReplacementUnderpricedError};
use crate::model::{SignedTransaction, TxReceipt, TxRequest};
use crate::node::NodeClient;
use crate::signer::TransactionSigner;

/// What the fake node does with the next broadcast.
#[derive(Debug, Clone)]
pub enum SubmitBehaviour {
    /// Accept and include in the current head block.
    Mine,
    /// Accept and never include.
    Stall,
    Reject(RejectedError),
    Underpriced,
    TransportFailure,
}

#[derive(Debug)]
pub struct FakeNodeState {
    pub block_number: u64,
    /// Head advance after every `block_number` call.
    pub block_step: u64,
    pub base_fee: U256,
    pub pending_nonce: u64,
    /// Consumed front to back; `Mine` once empty.
    pub submit_script: VecDeque<SubmitBehaviour>,
    pub receipts: HashMap<H256, TxReceipt>,
    pub fail_receipts: bool,
    pub submitted: Vec<SignedTransaction>,
    pub receipt_lookups: Vec<H256>,
    pub block_number_calls: usize,
    pub base_fee_calls: usize,
}

#[derive(Debug)]
pub struct FakeNode {
    state: Mutex<FakeNodeState>,
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNode {
    pub fn new() -> Self {
        FakeNode {
            state: Mutex::new(FakeNodeState {
                block_number: 0,
                block_step: 1,
                base_fee: U256::from(1_000_000_000u64),
                pending_nonce: 0,
                submit_script: VecDeque::new(),
                receipts: HashMap::new(),
                fail_receipts: false,
                submitted: Vec::new(),
                receipt_lookups: Vec::new(),
                block_number_calls: 0,
                base_fee_calls: 0,
            }),
        }
    }

    pub fn with_script(script: Vec<SubmitBehaviour>) -> Self {
        let node = Self::new();
        node.state().submit_script = script.into();
        node
    }

    pub fn state(&self) -> MutexGuard<'_, FakeNodeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_receipt(&self, tx_hash: H256, block_number: u64) {
        self.state().receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number,
                status: Some(1),
            },
        );
    }
}

fn transport_failure() -> MonitorError {
    err_create!(web3::Error::Transport(
        web3::error::TransportError::Message("fake transport failure".to_string())
    ))
}

#[async_trait]
impl NodeClient for FakeNode {
    async fn submit_raw_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> Result<H256, MonitorError> {
        let mut state = self.state();
        let behaviour = state
            .submit_script
            .pop_front()
            .unwrap_or(SubmitBehaviour::Mine);
        match behaviour {
            SubmitBehaviour::Mine => {
                let block_number = state.block_number;
                state.receipts.insert(
                    signed.tx_hash,
                    TxReceipt {
                        tx_hash: signed.tx_hash,
                        block_number,
                        status: Some(1),
                    },
                );
            }
            SubmitBehaviour::Stall => {}
            SubmitBehaviour::Reject(rejected) => return Err(err_create!(rejected)),
            SubmitBehaviour::Underpriced => {
                return Err(err_create!(ReplacementUnderpricedError::new(
                    "replacement transaction underpriced"
                )))
            }
            SubmitBehaviour::TransportFailure => return Err(transport_failure()),
        }
        state.submitted.push(signed.clone());
        state.pending_nonce += 1;
        Ok(signed.tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, MonitorError> {
        let mut state = self.state();
        state.receipt_lookups.push(tx_hash);
        if state.fail_receipts {
            return Err(transport_failure());
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> Result<u64, MonitorError> {
        let mut state = self.state();
        state.block_number_calls += 1;
        let current = state.block_number;
        state.block_number += state.block_step;
        Ok(current)
    }

    async fn transaction_count(
        &self,
        _address: Address,
        _pending: bool,
    ) -> Result<u64, MonitorError> {
        Ok(self.state().pending_nonce)
    }

    async fn latest_base_fee(&self) -> Result<U256, MonitorError> {
        let mut state = self.state();
        state.base_fee_calls += 1;
        Ok(state.base_fee)
    }
}

/// Records every request it signs; hashes are unique per signature.
#[derive(Debug)]
pub struct FakeSigner {
    address: Address,
    signed: Mutex<Vec<TxRequest>>,
}

impl FakeSigner {
    pub fn new(address: Address) -> Self {
        FakeSigner {
            address,
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_requests(&self) -> Vec<TxRequest> {
        match self.signed.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, request: &TxRequest) -> Result<SignedTransaction, MonitorError> {
        let mut signed = match self.signed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let raw = format!(
            "{}:{}:{}:{}",
            request.nonce,
            request.max_priority_fee_per_gas,
            request.max_fee_per_gas,
            signed.len()
        )
        .into_bytes();
        let tx_hash = H256::from_slice(Keccak256::digest(&raw).as_slice());
        signed.push(request.clone());
        Ok(SignedTransaction {
            raw: Bytes(raw),
            tx_hash,
        })
    }
}
