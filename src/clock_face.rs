use chrono::NaiveTime;

/// Which half of the day a 12-hour dial reading refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    AM,
    PM,
}

/// Converts a 12-hour dial reading to a 24-hour value.
///
/// 12 AM is midnight (0) and 12 PM is noon, everything else is the usual
/// add-12-for-PM rule.
#[must_use]
pub const fn to_hour24(hour12: u32, time_of_day: TimeOfDay) -> u32 {
    match (hour12, time_of_day) {
        (12, TimeOfDay::AM) => 0,
        (12, TimeOfDay::PM) => 12,
        (h, TimeOfDay::AM) => h,
        (h, TimeOfDay::PM) => h + 12,
    }
}

/// Converts a 24-hour value back to what the dial shows.
#[must_use]
pub const fn from_hour24(hour24: u32) -> (u32, TimeOfDay) {
    match hour24 {
        0 => (12, TimeOfDay::AM),
        h if h < 12 => (h, TimeOfDay::AM),
        12 => (12, TimeOfDay::PM),
        h => (h - 12, TimeOfDay::PM),
    }
}

/// Builds a `NaiveTime` from a dial reading, `None` if the reading is out of
/// range (hour not in 1..=12 or minute not in 0..=59).
#[must_use]
pub fn dial_time(hour12: u32, minute: u32, time_of_day: TimeOfDay) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour12) {
        return None;
    }
    NaiveTime::from_hms_opt(to_hour24(hour12, time_of_day), minute, 0)
}

/// Snaps a dial angle (degrees clockwise from 12 o'clock) to the nearest of
/// the 12 hour positions.
#[must_use]
pub fn snap_hour12(angle: f32) -> u32 {
    // wraps at 0°/360°, so 359° snaps to 12, not 11
    let position = (angle.rem_euclid(360.0) / 30.0).round() as u32 % 12;
    if position == 0 {
        12
    } else {
        position
    }
}

/// Snaps a dial angle (degrees clockwise from 12 o'clock) to the nearest of
/// the 60 minute positions.
#[must_use]
pub fn snap_minute(angle: f32) -> u32 {
    (angle.rem_euclid(360.0) / 6.0).round() as u32 % 60
}
