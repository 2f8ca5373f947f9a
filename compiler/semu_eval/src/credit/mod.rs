//! Credit accounting.
//!
//! Every executed instruction costs its cycles in credits, and starting a
//! run costs the architecture fee. The ledger itself lives outside the
//! emulator; `CreditLedger` is the seam, with an unlimited and an
//! in-memory implementation provided.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CreditError {
    #[error("user `{user}` needs {requested} credits but has {available}")]
    Insufficient {
        user: String,
        requested: u64,
        available: u64,
    },
}

/// Per-user credit balances.
///
/// `charge` either takes the whole amount or nothing.
pub trait CreditLedger: Send + Sync {
    fn charge(&self, user: &str, amount: u64) -> Result<(), CreditError>;

    fn refund(&self, user: &str, amount: u64);

    /// Current balance, `None` when the ledger does not track one.
    fn balance(&self, user: &str) -> Option<u64>;
}

/// Ledger that never runs out.
#[derive(Copy, Clone, Debug, Default)]
pub struct UnlimitedCredits;

impl CreditLedger for UnlimitedCredits {
    fn charge(&self, _user: &str, _amount: u64) -> Result<(), CreditError> {
        Ok(())
    }

    fn refund(&self, _user: &str, _amount: u64) {}

    fn balance(&self, _user: &str) -> Option<u64> {
        None
    }
}

/// In-process balances keyed by user name. Unknown users hold 0.
#[derive(Debug, Default)]
pub struct InMemoryCredits {
    balances: Mutex<FxHashMap<String, u64>>,
}

impl InMemoryCredits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `user`, returning the new balance.
    pub fn deposit(&self, user: &str, amount: u64) -> u64 {
        let mut balances = self.balances.lock();
        let balance = balances.entry(user.to_owned()).or_insert(0);
        *balance = balance.saturating_add(amount);
        *balance
    }
}

impl CreditLedger for InMemoryCredits {
    fn charge(&self, user: &str, amount: u64) -> Result<(), CreditError> {
        if amount == 0 {
            return Ok(());
        }
        let mut balances = self.balances.lock();
        let available = balances.get(user).copied().unwrap_or(0);
        if available < amount {
            return Err(CreditError::Insufficient {
                user: user.to_owned(),
                requested: amount,
                available,
            });
        }
        balances.insert(user.to_owned(), available - amount);
        Ok(())
    }

    fn refund(&self, user: &str, amount: u64) {
        if amount > 0 {
            self.deposit(user, amount);
        }
    }

    fn balance(&self, user: &str) -> Option<u64> {
        Some(self.balances.lock().get(user).copied().unwrap_or(0))
    }
}

/// A ledger bound to one user.
#[derive(Clone)]
pub struct Account {
    ledger: Arc<dyn CreditLedger>,
    user: Arc<str>,
}

impl Account {
    pub fn new(ledger: Arc<dyn CreditLedger>, user: &str) -> Self {
        Account {
            ledger,
            user: Arc::from(user),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn charge(&self, amount: u64) -> Result<(), CreditError> {
        self.ledger.charge(&self.user, amount)
    }

    pub fn refund(&self, amount: u64) {
        self.ledger.refund(&self.user, amount);
    }

    pub fn balance(&self) -> Option<u64> {
        self.ledger.balance(&self.user)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("user", &self.user)
            .field("balance", &self.balance())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_fails() {
        let account = Account::new(Arc::new(UnlimitedCredits), "ada");
        assert_eq!(account.charge(u64::MAX), Ok(()));
        assert_eq!(account.balance(), None);
    }

    #[test]
    fn in_memory_charges_and_refunds() {
        let ledger = Arc::new(InMemoryCredits::new());
        assert_eq!(ledger.deposit("ada", 10), 10);
        let account = Account::new(ledger.clone(), "ada");

        assert_eq!(account.charge(4), Ok(()));
        assert_eq!(account.balance(), Some(6));
        account.refund(3);
        assert_eq!(account.balance(), Some(9));
    }

    #[test]
    fn insufficient_charge_takes_nothing() {
        let ledger = InMemoryCredits::new();
        ledger.deposit("bob", 2);
        assert_eq!(
            ledger.charge("bob", 5),
            Err(CreditError::Insufficient {
                user: "bob".to_owned(),
                requested: 5,
                available: 2,
            })
        );
        assert_eq!(ledger.balance("bob"), Some(2));
    }

    #[test]
    fn unknown_user_holds_zero() {
        let ledger = InMemoryCredits::new();
        assert_eq!(ledger.balance("nobody"), Some(0));
        assert_eq!(ledger.charge("nobody", 0), Ok(()));
        assert!(ledger.charge("nobody", 1).is_err());
    }
}
