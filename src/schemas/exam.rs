use serde::de::Error as _;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::Validate;

use crate::exam::descriptor::{
    ExamDescriptor, ExamStatus, ExamTiming, PriorSubmission, QuestionType,
};

// The platform API serves camelCase; aliases accept both spellings.
#[derive(Debug, Deserialize, Validate)]
pub struct ExamDescriptorResponse {
    pub id: String,
    pub mode: ExamModeDto,
    #[serde(
        default,
        alias = "scheduledStart",
        deserialize_with = "deserialize_option_datetime_flexible"
    )]
    pub scheduled_start: Option<OffsetDateTime>,
    #[serde(alias = "durationSeconds")]
    #[validate(range(min = 1, message = "duration_seconds must be positive"))]
    pub duration_seconds: u32,
    #[serde(default, alias = "gracePeriodSeconds")]
    pub grace_period_seconds: u32,
    #[serde(alias = "questionType")]
    pub question_type: QuestionType,
    #[serde(default = "default_status")]
    pub status: ExamStatus,
    #[serde(default, alias = "priorSubmission")]
    pub prior_submission: Option<PriorSubmissionResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamModeDto {
    Scheduled,
    Anytime,
}

#[derive(Debug, Deserialize)]
pub struct PriorSubmissionResponse {
    #[serde(alias = "submittedAt", deserialize_with = "deserialize_datetime_flexible")]
    pub submitted_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid exam descriptor: {0}")]
    Invalid(String),
    #[error("scheduled exam {0} is missing its start time")]
    MissingScheduledStart(String),
}

impl ExamDescriptorResponse {
    pub fn into_domain(self) -> Result<ExamDescriptor, DescriptorError> {
        self.validate().map_err(|err| DescriptorError::Invalid(err.to_string()))?;

        let timing = match self.mode {
            ExamModeDto::Scheduled => ExamTiming::Scheduled {
                starts_at: self
                    .scheduled_start
                    .ok_or_else(|| DescriptorError::MissingScheduledStart(self.id.clone()))?,
            },
            ExamModeDto::Anytime => ExamTiming::Anytime,
        };

        Ok(ExamDescriptor {
            id: self.id,
            timing,
            duration_seconds: self.duration_seconds,
            grace_period_seconds: self.grace_period_seconds,
            question_type: self.question_type,
            status: self.status,
            prior_submission: self
                .prior_submission
                .map(|prior| PriorSubmission { submitted_at: prior.submitted_at }),
        })
    }
}

fn default_status() -> ExamStatus {
    ExamStatus::Published
}

fn parse_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Frontend's datetime-local often sends without timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    None
}

pub(crate) fn deserialize_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
