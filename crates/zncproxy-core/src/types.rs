//! Opaque entity identifiers and the small enums that appear in the
//! storage schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(TokenId);
uuid_id!(TransactionId);
uuid_id!(SessionId);
uuid_id!(BundleId);
uuid_id!(AuditLogId);
uuid_id!(PaymentIntentId);

/// Fixed durations a token may be purchased for; see the price table in
/// `zncproxy_tokens::price`.
pub type DurationHours = i32;

/// A token's coarse authorization label (spec.md §3, §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "access_scope", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    Full,
    CertificatesOnly,
}

/// The kind of an append-only ledger transaction (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Purchase,
    Refund,
    ReferralBonus,
}

/// Status of a mock (or real) payment intent; an explicit field rather
/// than text baked into a transaction description (spec.md §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Canceled,
}

/// Rate-limit class, keyed differently per spec.md §4.5.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitClass {
    Auth,
    Api,
    Proxy,
}

impl RateLimitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitClass::Auth => "auth",
            RateLimitClass::Api => "api",
            RateLimitClass::Proxy => "proxy",
        }
    }

    /// (limit, window_seconds) per spec.md §4.5's table.
    pub fn limit(&self) -> (u32, i64) {
        match self {
            RateLimitClass::Auth => (5, 3600),
            RateLimitClass::Api => (100, 60),
            RateLimitClass::Proxy => (1000, 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_class_has_a_distinct_window() {
        let (auth_limit, auth_window) = RateLimitClass::Auth.limit();
        let (api_limit, api_window) = RateLimitClass::Api.limit();
        let (proxy_limit, proxy_window) = RateLimitClass::Proxy.limit();

        assert_eq!((auth_limit, auth_window), (5, 3600));
        assert_eq!((api_limit, api_window), (100, 60));
        assert_eq!((proxy_limit, proxy_window), (1000, 60));
    }

    #[test]
    fn as_str_round_trips_through_cache_key_format() {
        for class in [RateLimitClass::Auth, RateLimitClass::Api, RateLimitClass::Proxy] {
            let key = format!("rate_limit:{}:user-1", class.as_str());
            assert!(key.starts_with("rate_limit:"));
        }
    }
}
