//! Trigger matching and response delivery.
//!
//! - [`store`]: the trigger set, its persistence, and first-match evaluation.
//! - [`matcher`]: the exact, regex, and fuzzy strategies.
//! - [`cooldown`]: per-user, per-trigger rate limiting.
//! - [`dispatch`]: the DM → private thread → public notice fallback chain and its statistics.

pub mod cooldown;
pub mod dispatch;
pub mod matcher;
pub mod store;
