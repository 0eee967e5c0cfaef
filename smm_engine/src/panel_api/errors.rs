use std::fmt::Display;

use serde::Serialize;
use smm_common::{remote::RemoteApiError, Money};
use thiserror::Error;

use crate::db::traits::PanelDatabaseError;

/// A machine-readable classification of every failure the panel APIs can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed or not allowed. Nothing was changed.
    Validation,
    NotFound,
    InsufficientBalance,
    /// A remote service timed out, failed or answered with garbage. Try again later.
    Transient,
    /// A remote service explicitly refused the request.
    Rejected,
    /// Gateway or provider settings are missing or wrong. An operator needs to fix them.
    Configuration,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::InsufficientBalance => "insufficient_balance",
            Self::Transient => "transient",
            Self::Rejected => "rejected",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum PanelApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient balance. This costs {required}, but the balance is {balance}")]
    InsufficientBalance { balance: Money, required: Money },
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Remote(#[from] RemoteApiError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl PanelApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Remote(RemoteApiError::Configuration(_)) => ErrorKind::Configuration,
            Self::Remote(e) if e.is_transient() => ErrorKind::Transient,
            Self::Remote(_) => ErrorKind::Rejected,
            Self::DatabaseError(_) => ErrorKind::Internal,
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<PanelDatabaseError> for PanelApiError {
    fn from(e: PanelDatabaseError) -> Self {
        use PanelDatabaseError::*;
        match e {
            DatabaseError(s) => Self::DatabaseError(s),
            InvalidData(s) => Self::Validation(s),
            InsufficientBalance { balance, required } => Self::InsufficientBalance { balance, required },
            UserNotFound(_) | ServiceNotFound(_) | OrderNotFound(_) | DepositNotFound(_) | ProviderNotFound(_) |
            GatewayNotFound(_) => Self::NotFound(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn remote_errors_are_classified() {
        let timeout = PanelApiError::from(RemoteApiError::Transport("operation timed out".into()));
        assert_eq!(timeout.kind(), ErrorKind::Transient);
        let refused = PanelApiError::from(RemoteApiError::Rejected("Not enough funds on balance".into()));
        assert_eq!(refused.kind(), ErrorKind::Rejected);
        let unauthorized = PanelApiError::from(RemoteApiError::Http { status: 401, message: "invalid_client".into() });
        assert_eq!(unauthorized.kind(), ErrorKind::Rejected);
        let bad_key = PanelApiError::from(RemoteApiError::Configuration("no merchant id".into()));
        assert_eq!(bad_key.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn database_errors_are_classified() {
        let e = PanelApiError::from(PanelDatabaseError::OrderNotFound(7));
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert_eq!(e.to_string(), "Order #7 does not exist");
        let e = PanelApiError::from(PanelDatabaseError::InsufficientBalance {
            balance: "0.10".parse().unwrap(),
            required: "0.50".parse().unwrap(),
        });
        assert_eq!(e.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(PanelApiError::from(PanelDatabaseError::DatabaseError("locked".into())).kind(), ErrorKind::Internal);
    }
}
