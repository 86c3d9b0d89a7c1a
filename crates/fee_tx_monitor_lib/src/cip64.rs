//! CIP-64 envelope: an EIP-1559 transaction with an extra `feeCurrency` field,
//! typed `0x7b`, signed over `keccak256(0x7b || rlp(fields))`.

use rlp::RlpStream;
use secp256k1::{Message, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use web3::types::{Address, Bytes, H256, U256};

use crate::err_from;
use crate::error::MonitorError;
use crate::model::{SignedTransaction, TxRequest};

pub const CIP64_TX_TYPE: u8 = 0x7b;

const UNSIGNED_FIELDS: usize = 10;
const SIGNED_FIELDS: usize = 13;

fn append_u256(stream: &mut RlpStream, value: U256) {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    stream.append(&buf[first..].to_vec());
}

fn append_fields(stream: &mut RlpStream, request: &TxRequest, fee_currency: Address) {
    stream.append(&request.chain_id);
    stream.append(&request.nonce);
    append_u256(stream, request.max_priority_fee_per_gas);
    append_u256(stream, request.max_fee_per_gas);
    stream.append(&request.gas_limit);
    stream.append(&request.to.as_bytes().to_vec());
    append_u256(stream, request.value);
    stream.append(&request.data);
    // access list
    stream.begin_list(0);
    stream.append(&fee_currency.as_bytes().to_vec());
}

fn typed_payload(stream: RlpStream) -> Vec<u8> {
    let mut payload = vec![CIP64_TX_TYPE];
    payload.extend_from_slice(&stream.out());
    payload
}

pub fn signing_hash(request: &TxRequest, fee_currency: Address) -> H256 {
    let mut stream = RlpStream::new_list(UNSIGNED_FIELDS);
    append_fields(&mut stream, request, fee_currency);
    H256::from_slice(Keccak256::digest(&typed_payload(stream)).as_slice())
}

pub fn sign_cip64(
    request: &TxRequest,
    fee_currency: Address,
    secret_key: &SecretKey,
) -> Result<SignedTransaction, MonitorError> {
    let sighash = signing_hash(request, fee_currency);
    let message = Message::from_slice(sighash.as_bytes()).map_err(err_from!())?;
    let (recovery_id, signature) = Secp256k1::signing_only()
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut stream = RlpStream::new_list(SIGNED_FIELDS);
    append_fields(&mut stream, request, fee_currency);
    stream.append(&(recovery_id.to_i32() as u64));
    append_u256(&mut stream, U256::from_big_endian(&signature[..32]));
    append_u256(&mut stream, U256::from_big_endian(&signature[32..]));
    let raw = typed_payload(stream);
    let tx_hash = H256::from_slice(Keccak256::digest(&raw).as_slice());
    Ok(SignedTransaction {
        raw: Bytes(raw),
        tx_hash,
    })
}
