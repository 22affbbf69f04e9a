//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp for event envelopes
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
