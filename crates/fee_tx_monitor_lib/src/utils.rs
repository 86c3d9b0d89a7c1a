use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use web3::types::U256;

#[derive(Debug, Clone)]
pub struct ConversionError {
    pub msg: String,
}

impl ConversionError {
    pub fn from(msg: String) -> Self {
        Self { msg }
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error during conversion: {}", self.msg)
    }
}

impl Error for ConversionError {}

pub fn gwei_to_u256(gas: f64) -> Result<U256, ConversionError> {
    pub const GWEI: f64 = 1.0E9;
    if gas.is_nan() {
        return Err(ConversionError {
            msg: "Gas price cannot be NaN".to_string(),
        });
    }
    if gas < 0.0 {
        return Err(ConversionError {
            msg: "Gas price cannot be negative".to_string(),
        });
    }
    if gas > 1.0E9 {
        return Err(ConversionError {
            msg: "Gas price cannot be greater than 1E9".to_string(),
        });
    }
    Ok(U256::from((gas * GWEI).round() as u64))
}

/// Scales a raw integer amount down by `decimals` (18 when not given), for display.
pub fn u256_to_rust_dec(amount: U256, decimals: Option<u32>) -> Result<Decimal, ConversionError> {
    let decimals = decimals.unwrap_or(18);
    let mut dec = Decimal::from_str(&amount.to_string()).map_err(|err| {
        ConversionError::from(format!("Amount {} does not fit decimal: {}", amount, err))
    })?;
    dec.set_scale(decimals).map_err(|err| {
        ConversionError::from(format!("Invalid scale {}: {}", decimals, err))
    })?;
    Ok(dec.normalize())
}

pub fn u256_to_gwei(amount: U256) -> Result<Decimal, ConversionError> {
    u256_to_rust_dec(amount, Some(9))
}

/// Gwei when it fits a decimal, raw wei otherwise. For log lines only.
pub fn format_fee(amount: U256) -> String {
    match u256_to_gwei(amount) {
        Ok(gwei) => format!("{} gwei", gwei),
        Err(_) => format!("{} wei", amount),
    }
}
