use time::OffsetDateTime;

use crate::exam::descriptor::ExamDescriptor;

#[derive(Debug, Clone)]
pub struct SessionState {
    effective_start: Option<OffsetDateTime>,
    warning_emitted: bool,
    grace_notice_emitted: bool,
    submission_in_flight: bool,
    has_submitted: bool,
}

impl SessionState {
    pub fn for_descriptor(descriptor: &ExamDescriptor) -> Self {
        Self {
            effective_start: None,
            warning_emitted: false,
            grace_notice_emitted: false,
            submission_in_flight: false,
            // A submission already on record keeps the session terminal
            // from the first evaluation.
            has_submitted: descriptor.prior_submission.is_some(),
        }
    }

    pub fn effective_start(&self) -> Option<OffsetDateTime> {
        self.effective_start
    }

    pub fn has_submitted(&self) -> bool {
        self.has_submitted
    }

    pub fn submission_in_flight(&self) -> bool {
        self.submission_in_flight
    }

    pub(crate) fn warning_emitted(&self) -> bool {
        self.warning_emitted
    }

    pub(crate) fn grace_notice_emitted(&self) -> bool {
        self.grace_notice_emitted
    }

    // The start is recorded at most once per session lifetime.
    pub(crate) fn begin(&mut self, started_at: OffsetDateTime) -> bool {
        if self.effective_start.is_some() || self.has_submitted {
            return false;
        }
        self.effective_start = Some(started_at);
        true
    }

    pub(crate) fn mark_warning_emitted(&mut self) {
        self.warning_emitted = true;
    }

    pub(crate) fn mark_grace_notice_emitted(&mut self) {
        self.grace_notice_emitted = true;
    }

    pub(crate) fn begin_submission(&mut self) -> bool {
        if self.has_submitted || self.submission_in_flight {
            return false;
        }
        self.submission_in_flight = true;
        true
    }

    pub(crate) fn finish_submission(&mut self, accepted: bool) {
        self.submission_in_flight = false;
        if accepted {
            self.has_submitted = true;
        }
    }
}
