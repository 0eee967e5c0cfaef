use smm_common::Money;

use crate::db_types::{Deposit, DepositStatus};

/// The result of a guarded wallet credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The wallet was credited. Carries the new balance.
    Credited(Money),
    /// A ledger entry for this cause already exists. Nothing was changed.
    AlreadyApplied,
    /// The amount was zero, so there was nothing to credit.
    NothingToCredit,
}

impl CreditOutcome {
    pub fn was_credited(&self) -> bool {
        matches!(self, Self::Credited(_))
    }
}

/// Who is asking for a deposit status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode {
    /// Reconciliation against a gateway. Terminal deposits are left alone.
    Automatic,
    /// An administrator. Any status may be written, but a deposit is still only ever credited once.
    Override,
}

#[derive(Debug, Clone)]
pub enum DepositTransition {
    Unchanged(Deposit),
    Changed { deposit: Deposit, previous: DepositStatus, credit: Option<CreditOutcome> },
}

impl DepositTransition {
    pub fn deposit(&self) -> &Deposit {
        match self {
            Self::Unchanged(d) => d,
            Self::Changed { deposit, .. } => deposit,
        }
    }

    pub fn into_deposit(self) -> Deposit {
        match self {
            Self::Unchanged(d) => d,
            Self::Changed { deposit, .. } => deposit,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}
