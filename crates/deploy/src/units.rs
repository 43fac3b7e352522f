//! Conversion of human-readable decimal amounts into the chain's smallest unit.

use alloy_core::primitives::{
    U256,
    utils::{self, ParseUnits},
};

use crate::DeploymentError;

/// Decimal exponent of the native currency on EVM chains.
pub const NATIVE_DECIMALS: u8 = 18;

/// Parse a non-negative decimal string (e.g. `"0.0001"`) into smallest units.
///
/// Fails when the value has a sign, is not a plain decimal, carries more significant
/// fractional digits than `decimals`, or overflows 256 bits.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256, DeploymentError> {
    let invalid = |reason: &str| DeploymentError::InvalidAmount {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (integer, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !integer.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("expected a non-negative decimal number"));
    }

    // alloy truncates extra fractional digits, the amount must stay exact.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!(
            "more than {decimals} fractional digits cannot be represented exactly"
        )));
    }

    let integer = if integer.is_empty() { "0" } else { integer };
    let normalized = if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    };

    match utils::parse_units(&normalized, decimals) {
        Ok(ParseUnits::U256(amount)) => Ok(amount),
        Ok(ParseUnits::I256(_)) => Err(invalid("expected a non-negative decimal number")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}
