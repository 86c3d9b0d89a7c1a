use web3::types::{Address, U256};

use crate::error::MonitorError;
use crate::model::TxRequest;
use crate::node::NodeClient;
use crate::utils::format_fee;

/// Caller-side parameters of the transfer under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub fee_currency: Option<Address>,
    // None - estimate from the latest base fee
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: U256,
    // None - take the pending transaction count
    pub nonce: Option<u64>,
    pub data: Vec<u8>,
}

/// `(max_fee_per_gas, max_priority_fee_per_gas)` with headroom for a doubling base fee.
pub async fn estimate_fees<N: NodeClient + ?Sized>(
    node: &N,
    tip: U256,
) -> Result<(U256, U256), MonitorError> {
    let base_fee = node.latest_base_fee().await?;
    let max_fee = base_fee
        .checked_mul(U256::from(2))
        .and_then(|fee| fee.checked_add(tip))
        .ok_or_else(|| crate::err_custom_create!("Fee overflow for base fee {}", base_fee))?;
    Ok((max_fee, tip))
}

pub async fn create_transfer<N: NodeClient + ?Sized>(
    node: &N,
    from: Address,
    chain_id: u64,
    params: &TransferParams,
) -> Result<TxRequest, MonitorError> {
    let nonce = match params.nonce {
        Some(nonce) => nonce,
        None => node.transaction_count(from, true).await?,
    };
    let (max_fee_per_gas, max_priority_fee_per_gas) = match params.max_fee_per_gas {
        Some(max_fee) => (max_fee, params.max_priority_fee_per_gas),
        None => estimate_fees(node, params.max_priority_fee_per_gas).await?,
    };
    log::debug!(
        "Transfer fees: max fee {}, priority fee {}",
        format_fee(max_fee_per_gas),
        format_fee(max_priority_fee_per_gas)
    );
    Ok(TxRequest {
        from,
        to: params.to,
        value: params.value,
        gas_limit: params.gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        fee_currency: params.fee_currency,
        nonce,
        chain_id,
        data: params.data.clone(),
    })
}
