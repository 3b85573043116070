use crate::model::{DAY_MS, Ms};

pub const MAX_ATTENDANCE: u32 = 100_000;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4_096;
pub const MAX_REMARKS_LEN: usize = 1_024;

/// Longest bookable window.
pub const MAX_WINDOW_MS: Ms = 7 * DAY_MS;

/// 2000-01-01 to 2200-01-01.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

pub const MAX_SUGGESTIONS: usize = 5;

/// Same-hall date shifts tried for suggestions, nearest first.
pub const SUGGESTION_DAY_OFFSETS: [i64; 4] = [1, -1, 2, -2];
