//! Translation tables from remote status vocabularies onto the internal order and deposit states.
//!
//! This is the only place where remote statuses are interpreted. `None` means "no change": the remote state is either
//! not final yet, or is something we do not recognise.
use smm_common::remote::{CryptomusPaymentStatus, PaypalOrderStatus, ProviderOrderState};

use crate::db_types::{DepositStatus, OrderStatusType};

pub fn order_status_for_provider_state(state: &ProviderOrderState) -> Option<OrderStatusType> {
    match state {
        ProviderOrderState::Pending => Some(OrderStatusType::Pending),
        ProviderOrderState::InProgress => Some(OrderStatusType::InProgress),
        ProviderOrderState::Processing => Some(OrderStatusType::Processing),
        ProviderOrderState::Completed => Some(OrderStatusType::Completed),
        ProviderOrderState::Partial => Some(OrderStatusType::Partial),
        ProviderOrderState::Canceled | ProviderOrderState::Refunded => Some(OrderStatusType::Canceled),
        ProviderOrderState::Fail => Some(OrderStatusType::Error),
        ProviderOrderState::Unknown(_) => None,
    }
}

pub fn deposit_status_for_paypal(status: &PaypalOrderStatus) -> Option<DepositStatus> {
    match status {
        PaypalOrderStatus::Completed => Some(DepositStatus::Payment),
        PaypalOrderStatus::Voided => Some(DepositStatus::Canceled),
        PaypalOrderStatus::Created |
        PaypalOrderStatus::Saved |
        PaypalOrderStatus::Approved |
        PaypalOrderStatus::PayerActionRequired |
        PaypalOrderStatus::Other(_) => None,
    }
}

pub fn deposit_status_for_cryptomus(status: &CryptomusPaymentStatus) -> Option<DepositStatus> {
    use CryptomusPaymentStatus::*;
    match status {
        Paid | PaidOver => Some(DepositStatus::Payment),
        Fail | SystemFail => Some(DepositStatus::Error),
        Cancel => Some(DepositStatus::Canceled),
        WrongAmount | Process | ConfirmCheck | WrongAmountWaiting | Check | RefundProcess | RefundFail | RefundPaid |
        Locked | Other(_) => None,
    }
}
