use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
pub struct ExamDescriptor {
    pub id: String,
    pub timing: ExamTiming,
    pub duration_seconds: u32,
    pub grace_period_seconds: u32,
    pub question_type: QuestionType,
    pub status: ExamStatus,
    pub prior_submission: Option<PriorSubmission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamTiming {
    Scheduled { starts_at: OffsetDateTime },
    Anytime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Written,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Published,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorSubmission {
    pub submitted_at: OffsetDateTime,
}

impl ExamDescriptor {
    pub fn is_cancelled(&self) -> bool {
        self.status == ExamStatus::Cancelled
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(i64::from(self.duration_seconds))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::seconds(i64::from(self.grace_period_seconds))
    }
}
