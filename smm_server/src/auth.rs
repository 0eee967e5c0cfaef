//! Caller identity.
//!
//! The dashboard authenticates users and forwards who they are in two headers:
//! * `smm_user_id` - the id of the user making the request,
//! * `smm_role` - `MEMBER`, `RESELLER` or `ADMIN`. Optional; defaults to `MEMBER`.
//!
//! Handlers take a [`Caller`] argument to read them.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::debug;
use serde::Serialize;
use smm_engine::db_types::Role;

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "smm_user_id";
pub const ROLE_HEADER: &str = "smm_role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|e| AuthError::InvalidIdentity(format!("{USER_ID_HEADER} must be a user id. {e}")))?;
        let role = match headers.get(ROLE_HEADER) {
            None => Role::Member,
            Some(v) => v
                .to_str()
                .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?
                .parse::<Role>()
                .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?,
        };
        Ok(Self { user_id, role })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Users may act on their own records. Admins may act on anyone's.
    pub fn check_owner(&self, owner_id: i64) -> Result<(), AuthError> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            debug!("💻️ User #{} tried to access a record belonging to user #{owner_id}", self.user_id);
            Err(AuthError::InsufficientPermissions("That record belongs to someone else".into()))
        }
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_headers(req.headers()).map_err(ServerError::from))
    }
}
