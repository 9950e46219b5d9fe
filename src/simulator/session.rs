use chrono::{DateTime, Duration, Timelike, Utc};

/// Volatility multiplier per local hour of day.
///
/// Extended hours (06-20) trade at 1.5, overnight at 0.3. The opening and
/// closing hours double that; the midday lull (11-14) takes 70% of it.
pub const SESSION_MULTIPLIERS: [f64; 24] = [
    0.3, 0.3, 0.3, 0.3, 0.3, 0.3, // 00-05 overnight
    1.5, 1.5, 1.5, // 06-08 pre-market
    3.0, 3.0, // 09-10 open
    1.05, 1.05, 1.05, 1.05, // 11-14 midday
    3.0, 3.0, // 15-16 close
    1.5, 1.5, 1.5, 1.5, // 17-20 after hours
    0.3, 0.3, 0.3, // 21-23 overnight
];

pub fn local_hour(now: DateTime<Utc>, utc_offset_hours: i32) -> usize {
    (now + Duration::hours(i64::from(utc_offset_hours))).hour() as usize
}

pub fn session_multiplier(now: DateTime<Utc>, utc_offset_hours: i32) -> f64 {
    SESSION_MULTIPLIERS[local_hour(now, utc_offset_hours) % 24]
}
