//! Redis-backed shared cache: the Token Cache's TTL key-value store
//! (spec.md §4.3) and the Rate Limiter's sliding-window sorted set
//! (spec.md §4.5).
//!
//! Grounded on `original_source/app/middleware/rate_limit.py` (the
//! zremrangebyscore/zcard/zadd/expire sequence) and
//! `original_source/app/services/token_service.py`'s `_cache_token`
//! helpers, reshaped into the teacher's one-method-per-operation struct
//! style (`chronx-state::db::StateDb`).

pub mod client;
pub mod sliding_window;

pub use client::CacheClient;
pub use sliding_window::SlidingWindowOutcome;
