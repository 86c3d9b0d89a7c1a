use secp256k1::{PublicKey, SecretKey};
use sha3::Digest;
use sha3::Keccak256;
use std::str::FromStr;
use web3::types::Address;

use crate::err_from;
use crate::error::MonitorError;

pub fn get_eth_addr_from_secret(secret_key: &SecretKey) -> Address {
    get_eth_addr_from_public(&PublicKey::from_secret_key(
        &secp256k1::Secp256k1::new(),
        secret_key,
    ))
}

pub fn get_eth_addr_from_public(public_key: &PublicKey) -> Address {
    Address::from_slice(
        &Keccak256::digest(&public_key.serialize_uncompressed()[1..65]).as_slice()[12..],
    )
}

/// Accepts the key with or without `0x` prefix.
pub fn load_private_key(key: &str) -> Result<SecretKey, MonitorError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    SecretKey::from_str(key).map_err(err_from!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_eth_addr_from_secret() {
        let sk = SecretKey::from_str(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let addr = format!("{:#x}", get_eth_addr_from_secret(&sk));
        assert_eq!(addr, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_load_private_key_prefixed() {
        let sk = load_private_key(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            format!("{:#x}", get_eth_addr_from_secret(&sk)),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert!(load_private_key("0xnothex").is_err());
    }
}
