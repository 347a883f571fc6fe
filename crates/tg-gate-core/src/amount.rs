//! Exact non-negative decimal amounts.
//!
//! Balances and thresholds are compared as rationals over arbitrary-precision
//! integers, so `"1.0"` equals `"1"` and an 18-decimal balance one wei short
//! of the threshold still fails.

use num::{BigUint, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tg_chain_client::U256;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount '{0}': expected a non-negative decimal number")]
    Invalid(String),
}

/// `digits / 10^scale`.
#[derive(Debug, Clone)]
pub struct TokenAmount {
    digits: BigUint,
    scale: u32,
}

impl TokenAmount {
    pub fn zero() -> Self {
        Self {
            digits: BigUint::zero(),
            scale: 0,
        }
    }

    /// Interprets an on-chain integer balance using the token's `decimals`.
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self {
            digits: BigUint::from_bytes_be(&raw.to_be_bytes_vec()),
            scale: u32::from(decimals),
        }
    }

    fn scaled_by(&self, exponent: u32) -> BigUint {
        &self.digits * BigUint::from(10_u32).pow(exponent)
    }
}

/// Renders a raw integer balance with `decimals` places, trailing zeros trimmed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    TokenAmount::from_raw(raw, decimals).to_string()
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        let empty = whole.is_empty() && fraction.is_empty();
        if empty || !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountError::Invalid(trimmed.to_owned()));
        }

        let combined = format!("{whole}{fraction}");
        let digits = BigUint::parse_bytes(combined.as_bytes(), 10)
            .ok_or_else(|| AmountError::Invalid(trimmed.to_owned()))?;
        let scale =
            u32::try_from(fraction.len()).map_err(|_| AmountError::Invalid(trimmed.to_owned()))?;

        Ok(Self { digits, scale })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.digits.to_str_radix(10);
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&text);
        }

        let padded = if text.len() <= scale {
            format!("{}{text}", "0".repeat(scale + 1 - text.len()))
        } else {
            text
        };
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            f.write_str(whole)
        } else {
            write!(f, "{whole}.{fraction}")
        }
    }
}

impl Ord for TokenAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scaled_by(other.scale).cmp(&other.scaled_by(self.scale))
    }
}

impl PartialOrd for TokenAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TokenAmount {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TokenAmount {}
