use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::exam::descriptor::ExamDescriptor;
use crate::schemas::submission::{SubmitAck, SubmitRequest};
use crate::services::exam_api::ExamApi;
use crate::session::answers::AnswerCollector;
use crate::session::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitTrigger {
    Manual,
    Auto,
}

impl SubmitTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug)]
pub(crate) struct SubmitResolution {
    pub(crate) trigger: SubmitTrigger,
    pub(crate) result: anyhow::Result<SubmitAck>,
}

pub(crate) struct SubmissionGate {
    api: Arc<dyn ExamApi>,
    resolutions: mpsc::UnboundedSender<SubmitResolution>,
}

impl SubmissionGate {
    pub(crate) fn new(
        api: Arc<dyn ExamApi>,
        resolutions: mpsc::UnboundedSender<SubmitResolution>,
    ) -> Self {
        Self { api, resolutions }
    }

    // Dispatches at most one submission; duplicate calls while one is
    // airborne, or after one succeeded, return false without raising.
    pub(crate) fn trigger(
        &self,
        descriptor: &ExamDescriptor,
        learner_id: &str,
        state: &mut SessionState,
        answers: &AnswerCollector,
        trigger: SubmitTrigger,
    ) -> bool {
        if !answers.submittable(descriptor.question_type) {
            tracing::debug!(
                exam_id = %descriptor.id,
                trigger = trigger.as_str(),
                "Nothing submittable, skipping"
            );
            return false;
        }

        // Guard is claimed before the spawn so a manual click and the
        // same-tick auto trigger cannot both dispatch.
        if !state.begin_submission() {
            tracing::debug!(
                exam_id = %descriptor.id,
                trigger = trigger.as_str(),
                "Submission already settled or in flight, ignoring"
            );
            return false;
        }

        let request = SubmitRequest {
            exam_id: descriptor.id.clone(),
            learner_id: learner_id.to_string(),
            evaluation_mode: descriptor.question_type,
            answers: answers.selections().clone(),
            attachments: answers.attachments().to_vec(),
        };

        tracing::info!(
            exam_id = %descriptor.id,
            trigger = trigger.as_str(),
            answers = request.answers.len(),
            attachments = request.attachments.len(),
            "Dispatching submission"
        );

        let api = self.api.clone();
        let resolutions = self.resolutions.clone();
        tokio::spawn(async move {
            let result = api.submit_answers(request).await;
            // The session may already be torn down; the submission itself
            // still completed server-side either way.
            let _ = resolutions.send(SubmitResolution { trigger, result });
        });

        true
    }
}
