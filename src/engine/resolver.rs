use crate::config::TimerConfig;

use super::state::IntervalKind;

pub const MS_PER_MINUTE: u64 = 60_000;

/// Duration of the next interval of `kind`, in milliseconds. Pure: the
/// outcome depends only on the arguments, and non-positive config values are
/// sanitized before the multiply. The session counter influences which break
/// kind gets armed (see [`next_break_kind`]), never the length of a kind.
pub fn resolve(kind: IntervalKind, _completed_focus_sessions: u32, config: &TimerConfig) -> u64 {
    let config = config.sanitized();
    let minutes = match kind {
        IntervalKind::Focus => config.focus_minutes,
        IntervalKind::ShortBreak => config.short_break_minutes,
        IntervalKind::LongBreak => config.long_break_minutes,
    };
    u64::from(minutes) * MS_PER_MINUTE
}

/// Break selection after a completed Focus interval. The counter has already
/// been incremented for that interval, so every 4th, 8th, 12th… completed
/// focus session earns the long break.
pub fn next_break_kind(completed_focus_sessions: u32) -> IntervalKind {
    if completed_focus_sessions > 0 && completed_focus_sessions % 4 == 0 {
        IntervalKind::LongBreak
    } else {
        IntervalKind::ShortBreak
    }
}
