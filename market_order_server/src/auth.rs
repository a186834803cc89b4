//! Caller identity.
//!
//! Authentication and authorization live outside this service: an upstream gateway validates the caller's
//! session and forwards the verdict in the `x-user-id` and `x-user-roles` headers. This module only reads
//! those headers; it never validates credentials itself.

use std::{
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The authenticated caller, as asserted by the upstream gateway.
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl AuthClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

impl FromRequest for AuthClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let Some(user_id) = user_id else {
            debug!("🔑️ Request without caller identity on an authenticated route");
            return ready(Err(ServerError::Unauthenticated));
        };
        let roles = req
            .headers()
            .get(USER_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').filter_map(|r| r.parse::<Role>().ok()).collect())
            .unwrap_or_else(|| vec![Role::Customer]);
        ready(Ok(AuthClaims { user_id: user_id.to_string(), roles }))
    }
}
