//! Picking the primary and trading wallets out of the server's list.

use log::warn;

use crate::utils::types::{Wallet, WalletType};

/// The user's active wallets: at most one base account and one trading vault
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletSet {
    pub base_account: Option<Wallet>,
    pub trading: Option<Wallet>,
}

impl WalletSet {
    /// Select one wallet per type. If the server returns several of a type the
    /// most recently created one wins.
    pub fn from_wallets(wallets: impl IntoIterator<Item = Wallet>) -> Self {
        let mut set = WalletSet::default();
        for wallet in wallets {
            let slot = match wallet.wallet_type {
                WalletType::BaseAccount => &mut set.base_account,
                WalletType::Trading => &mut set.trading,
            };
            match slot {
                Some(current) => {
                    warn!(
                        "duplicate {:?} wallets ({} and {}); keeping the newest",
                        wallet.wallet_type, current.address, wallet.address
                    );
                    if wallet.created_at > current.created_at {
                        *slot = Some(wallet);
                    }
                }
                None => *slot = Some(wallet),
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.base_account.is_none() && self.trading.is_none()
    }

    /// Trading vault, unless it shares the base account's address
    pub fn distinct_trading(&self) -> Option<&Wallet> {
        let trading = self.trading.as_ref()?;
        match &self.base_account {
            Some(base) if base.address.eq_ignore_ascii_case(&trading.address) => None,
            _ => Some(trading),
        }
    }

    /// Address balances are reported under: the base account, else the vault
    pub fn primary_address(&self) -> Option<&str> {
        self.base_account.as_ref().or(self.trading.as_ref()).map(|w| w.address.as_str())
    }
}
