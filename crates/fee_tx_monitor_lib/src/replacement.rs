use std::time::Duration;
use web3::types::{Address, U256};

use crate::err_custom_create;
use crate::error::MonitorError;
use crate::model::TxRequest;

/// Gas of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPolicy {
    /// Added to both fee fields of the stalled transaction, in wei.
    pub priority_fee_bump: U256,
    pub gas_limit: u64,
    /// Depth required before the replacement counts as mined.
    pub confirmations: u64,
    pub poll_interval: Duration,
    /// None - wait for the replacement without limit.
    pub timeout: Option<Duration>,
}

impl Default for ReplacementPolicy {
    fn default() -> Self {
        ReplacementPolicy {
            priority_fee_bump: U256::from(1000),
            gas_limit: TRANSFER_GAS_LIMIT,
            confirmations: 2,
            poll_interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Zero-value self-transfer at the stalled nonce with a strictly higher tip.
///
/// Only clears the nonce; the original call is not retried. The max fee moves up by
/// the same amount so the gap between the two fee fields is kept.
pub fn create_replacement(
    original: &TxRequest,
    account: Address,
    policy: &ReplacementPolicy,
) -> Result<TxRequest, MonitorError> {
    if policy.priority_fee_bump.is_zero() {
        return Err(err_custom_create!(
            "Replacement fee bump must be positive for nonce {}",
            original.nonce
        ));
    }
    let max_priority_fee_per_gas = original
        .max_priority_fee_per_gas
        .checked_add(policy.priority_fee_bump)
        .ok_or_else(|| err_custom_create!("Priority fee overflow on replacement"))?;
    let max_fee_per_gas = original
        .max_fee_per_gas
        .checked_add(policy.priority_fee_bump)
        .ok_or_else(|| err_custom_create!("Max fee overflow on replacement"))?
        .max(max_priority_fee_per_gas);

    Ok(TxRequest {
        from: account,
        to: account,
        value: U256::zero(),
        gas_limit: policy.gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        fee_currency: None,
        nonce: original.nonce,
        chain_id: original.chain_id,
        data: vec![],
    })
}

/// Smallest fee cap the pool accepts as a replacement of `cap` under a `bump_percent` rule.
pub fn min_replacement_cap(cap: U256, bump_percent: u64) -> U256 {
    cap * U256::from(100 + bump_percent) / U256::from(100)
}

/// `cap * permille / 1000`, for expressing ratios like 1.05x as 1050.
pub fn scale_cap(cap: U256, permille: u64) -> U256 {
    cap * U256::from(permille) / U256::from(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> TxRequest {
        TxRequest {
            from: Address::from_low_u64_be(1),
            to: Address::from_low_u64_be(0xdeadbeef),
            value: U256::from(2),
            gas_limit: 90000,
            max_fee_per_gas: U256::from(2_000_000_000u64),
            max_priority_fee_per_gas: U256::zero(),
            fee_currency: Some(Address::from_low_u64_be(0xfee)),
            nonce: 42,
            chain_id: 1337,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_replacement_keeps_nonce_and_bumps_fees() {
        let account = Address::from_low_u64_be(1);
        let policy = ReplacementPolicy::default();
        let orig = original();
        let repl = create_replacement(&orig, account, &policy).unwrap();
        assert_eq!(repl.nonce, orig.nonce);
        assert_eq!(repl.to, account);
        assert_eq!(repl.value, U256::zero());
        assert_eq!(repl.gas_limit, TRANSFER_GAS_LIMIT);
        assert!(repl.data.is_empty());
        assert_eq!(repl.fee_currency, None);
        assert_eq!(
            repl.max_priority_fee_per_gas,
            orig.max_priority_fee_per_gas + policy.priority_fee_bump
        );
        assert_eq!(repl.max_fee_per_gas, U256::from(2_000_001_000u64));
    }

    #[test]
    fn test_replacement_max_fee_covers_tip() {
        let mut orig = original();
        orig.max_fee_per_gas = U256::from(10);
        orig.max_priority_fee_per_gas = U256::from(10);
        let mut policy = ReplacementPolicy::default();
        policy.priority_fee_bump = U256::from(5);
        let repl = create_replacement(&orig, orig.from, &policy).unwrap();
        assert_eq!(repl.max_priority_fee_per_gas, U256::from(15));
        assert!(repl.max_fee_per_gas >= repl.max_priority_fee_per_gas);
    }

    #[test]
    fn test_zero_bump_refused() {
        let mut policy = ReplacementPolicy::default();
        policy.priority_fee_bump = U256::zero();
        assert!(create_replacement(&original(), Address::zero(), &policy).is_err());
    }

    #[test]
    fn test_overflow_refused() {
        let mut orig = original();
        orig.max_fee_per_gas = U256::max_value();
        assert!(create_replacement(&orig, orig.from, &ReplacementPolicy::default()).is_err());
    }

    #[test]
    fn test_price_bump_caps() {
        let cap = U256::from(30_000_000_000u64);
        assert_eq!(min_replacement_cap(cap, 10), U256::from(33_000_000_000u64));
        assert_eq!(scale_cap(cap, 1050), U256::from(31_500_000_000u64));
        assert!(scale_cap(cap, 1050) < min_replacement_cap(cap, 10));
    }
}
