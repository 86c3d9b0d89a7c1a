use serde::Serialize;
use std::fmt::{Display, Formatter};
use web3::types::{Address, Bytes, H256, U256};

/// Unsigned transaction intent. The nonce is fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub fee_currency: Option<Address>,
    pub nonce: u64,
    pub chain_id: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub tx_hash: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: u64,
    // 1 - success, 0 - reverted
    pub status: Option<u64>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

/// The single verdict of a monitor run, printed for the wrapping shell process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub error: Option<serde_json::Value>,
}

impl Outcome {
    pub fn confirmed() -> Self {
        Outcome {
            success: true,
            error: None,
        }
    }

    pub fn replaced() -> Self {
        Outcome {
            success: false,
            error: None,
        }
    }

    pub fn rejected(error: serde_json::Value) -> Self {
        Outcome {
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Building,
    Signed,
    Submitted,
    Confirmed,
    Stalled,
    Replacing,
    Resubmitted,
    Rejected,
    Done,
}

impl Display for MonitorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MonitorState::Building => "BUILDING",
            MonitorState::Signed => "SIGNED",
            MonitorState::Submitted => "SUBMITTED",
            MonitorState::Confirmed => "CONFIRMED",
            MonitorState::Stalled => "STALLED",
            MonitorState::Replacing => "REPLACING",
            MonitorState::Resubmitted => "RESUBMITTED",
            MonitorState::Rejected => "REJECTED",
            MonitorState::Done => "DONE",
        };
        write!(f, "{}", name)
    }
}
