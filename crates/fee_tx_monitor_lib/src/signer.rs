use async_trait::async_trait;
use secp256k1::SecretKey;
use web3::transports::Http;
use web3::types::{Bytes, TransactionParameters, U256, U64};
use web3::Web3;

use crate::cip64::sign_cip64;
use crate::error::MonitorError;
use crate::eth::get_eth_addr_from_secret;
use crate::model::{SignedTransaction, TxRequest};
use crate::{err_custom_create, err_from};
use web3::types::Address;

const EIP1559_TX_TYPE: u64 = 2;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign(&self, request: &TxRequest) -> Result<SignedTransaction, MonitorError>;
}

pub fn request_to_transaction(request: &TxRequest) -> TransactionParameters {
    TransactionParameters {
        nonce: Some(U256::from(request.nonce)),
        to: Some(request.to),
        gas: U256::from(request.gas_limit),
        gas_price: None,
        value: request.value,
        data: Bytes(request.data.clone()),
        chain_id: Some(request.chain_id),
        transaction_type: Some(U64::from(EIP1559_TX_TYPE)),
        access_list: None,
        max_fee_per_gas: Some(request.max_fee_per_gas),
        max_priority_fee_per_gas: Some(request.max_priority_fee_per_gas),
    }
}

/// Signs with a local key. Requests with a fee currency become CIP-64 envelopes,
/// all others EIP-1559 transactions signed by web3. Every field is filled in
/// advance, so signing does not touch the network.
#[derive(Clone, Debug)]
pub struct SecretKeySigner {
    secret_key: SecretKey,
    address: Address,
    web3: Web3<Http>,
}

impl SecretKeySigner {
    pub fn new(secret_key: SecretKey, web3: Web3<Http>) -> Self {
        Self {
            address: get_eth_addr_from_secret(&secret_key),
            secret_key,
            web3,
        }
    }
}

#[async_trait]
impl TransactionSigner for SecretKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, request: &TxRequest) -> Result<SignedTransaction, MonitorError> {
        if request.from != self.address {
            return Err(err_custom_create!(
                "From addr not match with secret key {:#x} != {:#x}",
                request.from,
                self.address
            ));
        }
        if let Some(fee_currency) = request.fee_currency {
            log::debug!(
                "Signing CIP-64 transaction nonce {} fee currency {:#x}",
                request.nonce,
                fee_currency
            );
            return sign_cip64(request, fee_currency, &self.secret_key);
        }

        let tx_object = request_to_transaction(request);
        log::debug!("Signing transaction: {:#?}", tx_object);
        let signed = self
            .web3
            .accounts()
            .sign_transaction(tx_object, &self.secret_key)
            .await
            .map_err(err_from!())?;
        Ok(SignedTransaction {
            raw: signed.raw_transaction,
            tx_hash: signed.transaction_hash,
        })
    }
}
