//! Deposit / withdraw form checks, evaluated before anything is submitted.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::utils::error::{Error, Result};

static EVM_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

/// Outcome of a form check: whether submission is allowed and why not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCheck {
    /// Largest amount the user may enter
    pub max_allowed: Decimal,
    pub can_submit: bool,
    pub reason: Option<String>,
}

impl FormCheck {
    fn ok(max_allowed: Decimal) -> Self {
        Self { max_allowed, can_submit: true, reason: None }
    }

    fn blocked(max_allowed: Decimal, reason: impl Into<String>) -> Self {
        Self { max_allowed, can_submit: false, reason: Some(reason.into()) }
    }

    pub fn into_result(self) -> Result<Decimal> {
        match self.reason {
            None => Ok(self.max_allowed),
            Some(reason) => Err(Error::Validation(reason)),
        }
    }
}

pub fn is_valid_address(address: &str) -> bool {
    EVM_ADDRESS.is_match(address)
}

/// Deposit check. ETH deposits keep `gas_reserve` back for fees; other tokens
/// may be deposited in full.
pub fn check_deposit(amount: Decimal, balance: Decimal, is_eth: bool, gas_reserve: Decimal) -> FormCheck {
    let reserve = if is_eth { gas_reserve } else { Decimal::ZERO };
    let max_allowed = (balance - reserve).max(Decimal::ZERO);

    if amount <= Decimal::ZERO {
        return FormCheck::blocked(max_allowed, "Amount must be greater than 0");
    }
    if amount + reserve > balance {
        let reason = if is_eth {
            format!("Insufficient balance: keep {} ETH for gas (max {})", reserve.normalize(), max_allowed.normalize())
        } else {
            format!("Insufficient balance (max {})", max_allowed.normalize())
        };
        return FormCheck::blocked(max_allowed, reason);
    }
    FormCheck::ok(max_allowed)
}

/// Withdraw check: destination must be a 0x-prefixed 20-byte hex address as
/// typed, with no surrounding whitespace, and `0 < amount <= available`.
pub fn check_withdraw(to_address: &str, amount: Decimal, available: Decimal) -> FormCheck {
    let max_allowed = available.max(Decimal::ZERO);
    if !is_valid_address(to_address) {
        return FormCheck::blocked(max_allowed, "Invalid destination address");
    }
    if amount <= Decimal::ZERO {
        return FormCheck::blocked(max_allowed, "Amount must be greater than 0");
    }
    if amount > available {
        return FormCheck::blocked(max_allowed, format!("Amount exceeds available balance ({})", max_allowed.normalize()));
    }
    FormCheck::ok(max_allowed)
}
