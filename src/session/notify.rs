use tokio::sync::mpsc;

use crate::session::gate::SubmitTrigger;

// Each warning variant fires at most once per session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    OneMinuteLeft,
    GracePeriodStarted,
    SubmissionAccepted,
    SubmissionFailed { trigger: SubmitTrigger, detail: String },
    StartFailed { detail: String },
}

#[derive(Debug, Clone)]
pub(crate) struct NoticeSender {
    tx: mpsc::UnboundedSender<SessionNotice>,
}

impl NoticeSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, notice: SessionNotice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("Notice receiver detached, dropping notice");
        }
    }
}
