//! Checkpoint interval options

/// Intervals offered to the user, in minutes.
pub const STANDARD_INTERVALS: [u32; 4] = [15, 30, 60, 120];

/// Display label for a checkpoint interval given in minutes.
///
/// Any other value falls back to `"<minutes> minutes"`.
pub fn interval_label(minutes: u32) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        120 => "2 hours".to_string(),
        other => format!("{other} minutes"),
    }
}

pub fn is_standard_interval(minutes: u32) -> bool {
    STANDARD_INTERVALS.contains(&minutes)
}
