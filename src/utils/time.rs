//! Wall-clock helpers for token issuance and expiry checks.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::constants::ERR_SYSTEM_TIME;
use crate::error::{Result, RpcError};

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| RpcError::Io(std::io::Error::other(ERR_SYSTEM_TIME)))
}
