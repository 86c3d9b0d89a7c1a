use async_trait::async_trait;
use web3::transports::Http;
use web3::types::{Address, BlockId, BlockNumber, TransactionReceipt, H256, U256};
use web3::Web3;

use crate::error::{MonitorError, RejectedError, ReplacementUnderpricedError};
use crate::model::{SignedTransaction, TxReceipt};
use crate::{err_create, err_custom_create, err_from};

const REPLACEMENT_UNDERPRICED: &str = "replacement transaction underpriced";

/// Narrow view of the node used by the monitor.
///
/// Every call is a suspension point; nothing here retries.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Broadcasts a signed payload. A synchronous refusal is returned as a
    /// rejection ([`MonitorError::is_rejection`]), anything else is a transport failure.
    async fn submit_raw_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> Result<H256, MonitorError>;

    /// `Ok(None)` while the transaction is not mined.
    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, MonitorError>;

    async fn block_number(&self) -> Result<u64, MonitorError>;

    async fn transaction_count(&self, address: Address, pending: bool)
        -> Result<u64, MonitorError>;

    async fn latest_base_fee(&self) -> Result<U256, MonitorError>;
}

#[derive(Clone, Debug)]
pub struct Web3Node {
    web3: Web3<Http>,
}

impl Web3Node {
    pub fn new(web3: Web3<Http>) -> Self {
        Self { web3 }
    }
}

/// Splits a broadcast failure into node rejections and transport errors.
pub fn classify_send_error(err: web3::Error) -> MonitorError {
    match err {
        web3::Error::Rpc(rpc_err) => {
            if rpc_err
                .message
                .to_lowercase()
                .contains(REPLACEMENT_UNDERPRICED)
            {
                err_create!(ReplacementUnderpricedError::new(&rpc_err.message))
            } else {
                err_create!(RejectedError {
                    code: rpc_err.code.code(),
                    message: rpc_err.message,
                    data: rpc_err.data,
                })
            }
        }
        other => err_create!(other),
    }
}

/// A receipt without a block number is still pending on some nodes.
fn receipt_from_web3(receipt: TransactionReceipt) -> Option<TxReceipt> {
    let block_number = receipt.block_number?.as_u64();
    Some(TxReceipt {
        tx_hash: receipt.transaction_hash,
        block_number,
        status: receipt.status.map(|s| s.as_u64()),
    })
}

#[async_trait]
impl NodeClient for Web3Node {
    async fn submit_raw_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> Result<H256, MonitorError> {
        log::debug!(
            "Broadcasting raw transaction 0x{}",
            hex::encode(&signed.raw.0)
        );
        self.web3
            .eth()
            .send_raw_transaction(signed.raw.clone())
            .await
            .map_err(classify_send_error)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, MonitorError> {
        // a null result is the only "not mined yet"; every RPC error propagates
        let receipt = self
            .web3
            .eth()
            .transaction_receipt(tx_hash)
            .await
            .map_err(err_from!())?
            .and_then(receipt_from_web3);
        if receipt.is_none() {
            log::debug!("No mined receipt yet for {:#x}", tx_hash);
        }
        Ok(receipt)
    }

    async fn block_number(&self) -> Result<u64, MonitorError> {
        Ok(self
            .web3
            .eth()
            .block_number()
            .await
            .map_err(err_from!())?
            .as_u64())
    }

    async fn transaction_count(
        &self,
        address: Address,
        pending: bool,
    ) -> Result<u64, MonitorError> {
        let nonce_type = match pending {
            true => BlockNumber::Pending,
            false => BlockNumber::Latest,
        };
        let nonce = self
            .web3
            .eth()
            .transaction_count(address, Some(nonce_type))
            .await
            .map_err(err_from!())?;
        Ok(nonce.as_u64())
    }

    async fn latest_base_fee(&self) -> Result<U256, MonitorError> {
        let block = self
            .web3
            .eth()
            .block(BlockId::Number(BlockNumber::Latest))
            .await
            .map_err(err_from!())?
            .ok_or_else(|| err_custom_create!("Latest block not found"))?;
        block
            .base_fee_per_gas
            .ok_or_else(|| err_custom_create!("Latest block has no base fee"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorBag;

    fn rpc_error(message: &str) -> web3::Error {
        web3::Error::Rpc(jsonrpc_error(message))
    }

    fn jsonrpc_error(message: &str) -> jsonrpc_core::Error {
        jsonrpc_core::Error {
            code: jsonrpc_core::ErrorCode::ServerError(-32000),
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_classify_rejection() {
        let err = classify_send_error(rpc_error("unregistered fee-currency address"));
        assert!(err.is_rejection());
        assert!(!err.is_replacement_underpriced());
        match &err.inner {
            ErrorBag::Rejected(rejected) => {
                assert_eq!(rejected.code, -32000);
                assert_eq!(rejected.message, "unregistered fee-currency address");
            }
            other => panic!("unexpected error {:?}", other),
        }
        let payload = err.rejection_payload().unwrap();
        assert_eq!(payload["message"], "unregistered fee-currency address");
    }

    #[test]
    fn test_classify_underpriced() {
        let err = classify_send_error(rpc_error("replacement transaction underpriced"));
        assert!(err.is_replacement_underpriced());
        assert!(err.is_rejection());
    }

    #[test]
    fn test_classify_transport() {
        let err = classify_send_error(web3::Error::Transport(
            web3::error::TransportError::Message("connection refused".to_string()),
        ));
        assert!(!err.is_rejection());
        assert!(err.rejection_payload().is_none());
        assert!(matches!(err.inner, ErrorBag::Web3Error(_)));
    }

    /// Answers a single JSON-RPC request over plain HTTP with `reply` merged into the envelope.
    async fn serve_once(reply: serde_json::Value) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + length {
                        break buf[split + 4..split + 4 + length].to_vec();
                    }
                }
                assert!(n > 0, "connection closed before full request");
            };
            let request: serde_json::Value = serde_json::from_slice(&body).unwrap();
            let mut response = serde_json::json!({"jsonrpc": "2.0", "id": request["id"]});
            for (k, v) in reply.as_object().unwrap() {
                response[k] = v.clone();
            }
            let payload = response.to_string();
            let http = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                payload.len(),
                payload
            );
            socket.write_all(http.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        });
        url
    }

    fn node(url: &str) -> Web3Node {
        Web3Node::new(Web3::new(Http::new(url).unwrap()))
    }

    fn receipt_json(block_number: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "transactionHash": format!("{:#x}", H256::from_low_u64_be(0xab)),
            "transactionIndex": "0x0",
            "blockHash": null,
            "blockNumber": block_number,
            "from": format!("{:#x}", Address::from_low_u64_be(7)),
            "to": null,
            "cumulativeGasUsed": "0x5208",
            "gasUsed": "0x5208",
            "contractAddress": null,
            "logs": [],
            "status": "0x1",
            "root": null,
            "logsBloom": format!("0x{}", "0".repeat(512)),
        })
    }

    #[tokio::test]
    async fn test_receipt_lookup_propagates_method_not_found() {
        let url = serve_once(serde_json::json!({
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .await;
        let err = node(&url)
            .transaction_receipt(H256::from_low_u64_be(0xab))
            .await
            .unwrap_err();
        assert!(matches!(err.inner, ErrorBag::Web3Error(web3::Error::Rpc(_))));
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn test_receipt_lookup_propagates_header_not_found() {
        let url = serve_once(serde_json::json!({
            "error": {"code": -32000, "message": "header not found"}
        }))
        .await;
        let err = node(&url)
            .transaction_receipt(H256::from_low_u64_be(0xab))
            .await
            .unwrap_err();
        assert!(matches!(err.inner, ErrorBag::Web3Error(web3::Error::Rpc(_))));
    }

    #[tokio::test]
    async fn test_null_receipt_is_not_mined() {
        let url = serve_once(serde_json::json!({ "result": null })).await;
        let receipt = node(&url)
            .transaction_receipt(H256::from_low_u64_be(0xab))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_receipt_without_block_is_not_mined() {
        let url = serve_once(serde_json::json!({
            "result": receipt_json(serde_json::Value::Null)
        }))
        .await;
        let receipt = node(&url)
            .transaction_receipt(H256::from_low_u64_be(0xab))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_mined_receipt() {
        let url = serve_once(serde_json::json!({ "result": receipt_json("0x10".into()) })).await;
        let receipt = node(&url)
            .transaction_receipt(H256::from_low_u64_be(0xab))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.tx_hash, H256::from_low_u64_be(0xab));
        assert_eq!(receipt.block_number, 16);
        assert!(receipt.succeeded());
    }
}
