//! Merging holdings from the base account and the trading vault.

use std::collections::HashMap;
use std::str::FromStr;

use alloy_primitives::U256;

use crate::utils::error::{Error, Result};
use crate::utils::types::{TokenBalance, WalletBalances};

/// Parse a raw integer balance. Empty strings count as zero.
pub fn parse_raw(raw: &str) -> Result<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str(raw).map_err(|e| Error::Data(format!("invalid raw balance '{}': {}", raw, e)))
}

/// Render a raw integer amount with `decimals` fractional digits, trimming
/// trailing zeros (`1500000` with 6 decimals is `"1.5"`).
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Merge two holding lists keyed by lowercased token address.
///
/// Tokens in both lists get their raw balances summed as 256-bit integers
/// and their USD values added. Order is `first`'s order followed by tokens
/// only present in `second`.
pub fn merge_holdings(first: &[TokenBalance], second: &[TokenBalance]) -> Result<Vec<TokenBalance>> {
    let mut merged: Vec<TokenBalance> = Vec::with_capacity(first.len() + second.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for holding in first.iter().chain(second.iter()) {
        let key = holding.token.key();
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                let sum = parse_raw(&existing.balance)?
                    .checked_add(parse_raw(&holding.balance)?)
                    .ok_or_else(|| Error::Data(format!("balance overflow for {}", holding.token.symbol)))?;
                existing.balance = sum.to_string();
                existing.balance_formatted = format_units(sum, existing.token.decimals);
                existing.value_usd += holding.value_usd;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(holding.clone());
            }
        }
    }

    Ok(merged)
}

/// Combine the per-address balance results into one view
pub fn combine(base: &WalletBalances, trading: Option<&WalletBalances>) -> Result<WalletBalances> {
    match trading {
        None => Ok(base.clone()),
        Some(trading) => Ok(WalletBalances {
            address: base.address.clone(),
            holdings: merge_holdings(&base.holdings, &trading.holdings)?,
            total_portfolio_value: base.total_portfolio_value + trading.total_portfolio_value,
        }),
    }
}
