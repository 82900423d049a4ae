use crate::model::Ms;

/// Every reservation lasts exactly this long.
pub const RESERVATION_DURATION_MS: Ms = 2 * 3_600_000;

pub const MAX_TABLES: usize = 10_000;
pub const MAX_CODE_LEN: usize = 32;

/// Upper bound on comma-separated tokens in a `features` query parameter.
pub const MAX_FEATURE_TOKENS: usize = 16;
