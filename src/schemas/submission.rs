use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::exam::descriptor::QuestionType;
use crate::schemas::exam::deserialize_datetime_flexible;
use crate::session::answers::Attachment;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub exam_id: String,
    pub learner_id: String,
    pub evaluation_mode: QuestionType,
    pub answers: BTreeMap<String, String>,
    // Attachments ride as multipart parts, attached by the HTTP client.
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAck {
    #[serde(alias = "submissionId")]
    pub submission_id: String,
    #[serde(alias = "submittedAt", deserialize_with = "deserialize_datetime_flexible")]
    pub submitted_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartExamResponse {
    #[serde(
        alias = "effectiveStartTimestamp",
        alias = "effectiveStart",
        deserialize_with = "deserialize_datetime_flexible"
    )]
    pub effective_start: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub exam_id: String,
    pub learner_id: String,
    pub answers: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn submit_request_serializes_camel_case_without_attachments() {
        let mut answers = BTreeMap::new();
        answers.insert("q1".to_string(), "b".to_string());

        let request = SubmitRequest {
            exam_id: "exam-9".to_string(),
            learner_id: "learner-3".to_string(),
            evaluation_mode: QuestionType::Mcq,
            answers,
            attachments: vec![Attachment::new("notes.pdf", "application/pdf", vec![1, 2])],
        };

        let value = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(value["examId"], "exam-9");
        assert_eq!(value["learnerId"], "learner-3");
        assert_eq!(value["evaluationMode"], "mcq");
        assert_eq!(value["answers"]["q1"], "b");
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn start_response_accepts_both_field_spellings() {
        let long: StartExamResponse =
            serde_json::from_value(serde_json::json!({
                "effectiveStartTimestamp": "2026-04-01T08:00:00Z"
            }))
            .expect("long form");
        let short: StartExamResponse =
            serde_json::from_value(serde_json::json!({ "effectiveStart": "2026-04-01T08:00:00Z" }))
                .expect("short form");

        assert_eq!(long.effective_start, datetime!(2026-04-01 08:00:00 UTC));
        assert_eq!(short.effective_start, long.effective_start);
    }

    #[test]
    fn submit_ack_decodes_camel_case() {
        let ack: SubmitAck = serde_json::from_value(serde_json::json!({
            "submissionId": "sub-17",
            "submittedAt": "2026-04-01T08:59:59Z"
        }))
        .expect("ack");

        assert_eq!(ack.submission_id, "sub-17");
        assert_eq!(ack.submitted_at, datetime!(2026-04-01 08:59:59 UTC));
    }
}
