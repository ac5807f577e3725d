//! Time helpers. The metadata store records `reftime` as unix seconds, so we standardize on
//! seconds here rather than milliseconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time, in seconds since the Unix epoch.
pub fn now_secs() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_secs() as i64
}
