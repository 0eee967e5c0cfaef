use serde::{Deserialize, Serialize};
use smm_engine::{
    db_types::{Deposit, DepositStatus, OrderStatusType},
    DepositTransition,
};

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositStatusUpdate {
    pub status: DepositStatus,
}

/// The outcome of an admin deposit status change.
#[derive(Debug, Clone, Serialize)]
pub struct DepositStatusChange {
    pub deposit: Deposit,
    /// `None` if the deposit already had the requested status
    pub previous: Option<DepositStatus>,
    /// True if this change credited the wallet
    pub credited: bool,
}

impl From<DepositTransition> for DepositStatusChange {
    fn from(transition: DepositTransition) -> Self {
        match transition {
            DepositTransition::Unchanged(deposit) => Self { deposit, previous: None, credited: false },
            DepositTransition::Changed { deposit, previous, credit } => {
                let credited = credit.map(|c| c.was_credited()).unwrap_or(false);
                Self { deposit, previous: Some(previous), credited }
            },
        }
    }
}
