use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::exam::descriptor::{ExamDescriptor, ExamTiming};
use crate::session::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Upcoming,
    Active,
    GracePeriod,
    Ended,
    Cancelled,
    Submitted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Submitted | Phase::Cancelled)
    }

    pub fn rank(self) -> u8 {
        match self {
            // The two pre-start faces of the same instant.
            Phase::NotStarted | Phase::Upcoming => 0,
            Phase::Active => 1,
            Phase::GracePeriod => 2,
            Phase::Ended => 3,
            Phase::Cancelled | Phase::Submitted => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExamWindow {
    pub(crate) start: OffsetDateTime,
    pub(crate) end: OffsetDateTime,
    pub(crate) grace_end: OffsetDateTime,
}

pub(crate) fn exam_window(descriptor: &ExamDescriptor, state: &SessionState) -> Option<ExamWindow> {
    let start = match descriptor.timing {
        ExamTiming::Scheduled { starts_at } => starts_at,
        ExamTiming::Anytime => state.effective_start()?,
    };

    let end = start + descriptor.duration();
    Some(ExamWindow { start, end, grace_end: end + descriptor.grace_period() })
}

pub fn compute_phase(
    descriptor: &ExamDescriptor,
    state: &SessionState,
    now: OffsetDateTime,
) -> Phase {
    if state.has_submitted() || descriptor.prior_submission.is_some() {
        return Phase::Submitted;
    }

    if descriptor.is_cancelled() {
        return Phase::Cancelled;
    }

    let Some(window) = exam_window(descriptor, state) else {
        return Phase::NotStarted;
    };

    if matches!(descriptor.timing, ExamTiming::Scheduled { .. }) && now < window.start {
        return Phase::Upcoming;
    }

    if now < window.end {
        Phase::Active
    } else if now < window.grace_end {
        Phase::GracePeriod
    } else {
        Phase::Ended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRemaining {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeRemaining {
    pub fn from_seconds(seconds_left: i64) -> Self {
        let clamped = seconds_left.max(0) as u64;
        Self {
            hours: (clamped / 3600) as u32,
            minutes: ((clamped % 3600) / 60) as u32,
            seconds: (clamped % 60) as u32,
        }
    }

    pub fn until(deadline: OffsetDateTime, now: OffsetDateTime) -> Self {
        Self::from_seconds((deadline - now).whole_seconds())
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}
