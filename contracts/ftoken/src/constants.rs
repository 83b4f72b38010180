use exp_math::EXP_SCALE;

/// Repay amount meaning "everything currently owed".
pub const REPAY_FULL: u128 = u128::MAX;

/// Upper bound on the per-second borrow rate a model may report. Anything
/// above this would overflow the accrual arithmetic long before it made
/// economic sense.
pub const BORROW_RATE_MAX: u128 = EXP_SCALE / 100;
